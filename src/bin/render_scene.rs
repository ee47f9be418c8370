//! Headless walk through one of the built-in scenes.
//!
//! ```bash
//! cargo run --release --bin render_scene -- --scene corridor --rooms 12 \
//!     --limits vanilla --frames 8 --ppm out.ppm
//! ```
//!
//! Renders `--frames` frames while the camera walks and turns, prints the
//! per-frame statistics and every limit message, and optionally dumps the
//! last frame as a PPM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use glam::Vec3;

use bsp_raster::config::{LimitProfile, RenderConfig, RenderLimits};
use bsp_raster::engine::Engine;
use bsp_raster::renderer::software::Software;
use bsp_raster::world::{Camera, Level, scenes};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Scene {
    Room,
    Sky,
    Corridor,
    Window,
    Trigger,
    Grate,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Limits {
    Vanilla,
    Raised,
}

/// CLI options handled via `clap` derive.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    #[arg(long, default_value_t = 320)]
    width: usize,

    #[arg(long, default_value_t = 200)]
    height: usize,

    /// Resource-pool limits
    #[arg(long, value_enum, default_value_t = Limits::Raised)]
    limits: Limits,

    #[arg(long, value_enum, default_value_t = Scene::Corridor)]
    scene: Scene,

    /// Number of rooms for the corridor scene
    #[arg(long, default_value_t = 8)]
    rooms: usize,

    #[arg(long, default_value_t = 4)]
    frames: usize,

    /// Write the last frame here as a binary PPM
    #[arg(long, value_name = "FILE")]
    ppm: Option<PathBuf>,
}

fn build_scene(scene: Scene, rooms: usize) -> Level {
    match scene {
        Scene::Room => scenes::single_room(),
        Scene::Sky => scenes::sky_room(),
        Scene::Corridor => scenes::corridor(rooms),
        Scene::Window => scenes::window_room(),
        Scene::Trigger => scenes::trigger_room(),
        Scene::Grate => scenes::masked_window(),
    }
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let profile = match opts.limits {
        Limits::Vanilla => LimitProfile::Vanilla,
        Limits::Raised => LimitProfile::Raised,
    };
    let config = RenderConfig::new(opts.width, opts.height, RenderLimits::for_profile(profile))
        .context("invalid view configuration")?;
    let mut engine = Engine::new(config).context("creating the rasterizer")?;

    let level = build_scene(opts.scene, opts.rooms);
    level
        .validate()
        .with_context(|| format!("scene `{}` failed validation", level.name))?;

    let eye = scenes::EYE_HEIGHT as f32;
    let mid = scenes::ROOM_WIDTH as f32 / 2.0;
    let mut camera = Camera::new(Vec3::new(32.0, mid, eye), 0.0);
    let mut sw = Software::new();

    println!(
        "{}: {} sectors, {} segs, {} nodes, {}x{} ({:?} limits)",
        level.name,
        level.sectors.len(),
        level.segs.len(),
        level.nodes.len(),
        opts.width,
        opts.height,
        profile,
    );

    for frame in 0..opts.frames {
        let report = engine.render_frame(&level, &camera.view(), None, &mut sw);
        let status = if report.status.is_aborted() {
            "ABORTED"
        } else {
            "ok"
        };
        println!("frame {frame:>3} [{status:>7}] {}", report.stats);
        for msg in report.messages() {
            eprintln!("frame {frame:>3}: {msg}");
        }

        camera.step(24.0, 0.0);
        camera.turn(0.05);
    }

    if let Some(path) = &opts.ppm {
        sw.write_ppm(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {}", path.display());
    }
    Ok(())
}
