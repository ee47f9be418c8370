use log::{debug, warn};

use crate::config::{ConfigError, RenderConfig, RenderLimits};
use crate::engine::clipper::SolidSegs;
use crate::engine::drawsegs::DrawSegs;
use crate::engine::openings::Openings;
use crate::engine::planes::{SpanScratch, VisplaneId, Visplanes};
use crate::engine::projection::Projection;
use crate::engine::stats::{FrameReport, FrameStats, FrameStatus};
use crate::renderer::Renderer;
use crate::world::{Level, SectorId, SectorPlanes, View};

/// Per-column vertical window still open after nearer walls.
#[derive(Clone, Debug)]
pub struct ClipBands {
    /// Last row covered from above (`-1` = none).
    pub ceil: Vec<i16>,
    /// First row covered from below (`height` = none).
    pub floor: Vec<i16>,
}

impl ClipBands {
    pub fn new(width: usize, height: usize) -> Self {
        let mut bands = Self {
            ceil: Vec::new(),
            floor: Vec::new(),
        };
        bands.reset(width, height);
        bands
    }

    pub fn reset(&mut self, width: usize, height: usize) {
        self.ceil.clear();
        self.ceil.resize(width, -1);
        self.floor.clear();
        self.floor.resize(width, height as i16);
    }
}

/// Pools and scratch reused from frame to frame.
#[derive(Debug)]
pub(crate) struct FrameState {
    pub solid: SolidSegs,
    pub clip: ClipBands,
    pub openings: Openings,
    pub drawsegs: DrawSegs,
    pub planes: Visplanes,
    pub spans: SpanScratch,
    pub stats: FrameStats,
}

impl FrameState {
    fn new(cfg: &RenderConfig) -> Self {
        let l = cfg.limits;
        Self {
            solid: SolidSegs::new(cfg.width),
            clip: ClipBands::new(cfg.width, cfg.height),
            openings: Openings::new(l.max_openings),
            drawsegs: DrawSegs::new(l.max_drawsegs),
            planes: Visplanes::new(cfg.width, l.max_visplanes),
            spans: SpanScratch::new(cfg.height),
            stats: FrameStats::default(),
        }
    }

    fn set_limits(&mut self, l: RenderLimits) {
        self.openings.set_limit(l.max_openings);
        self.drawsegs.set_limit(l.max_drawsegs);
        self.planes.set_limit(l.max_visplanes);
    }

    /// Empty every pool for a new frame.
    fn clear(&mut self, cfg: &RenderConfig) {
        self.solid.clear(cfg.width);
        self.clip.reset(cfg.width, cfg.height);
        self.openings.reset();
        self.drawsegs.reset();
        self.planes.reset(cfg.width);
        self.spans.reset(cfg.height);
        self.stats = FrameStats::default();
    }

    /// Copy the pool counters into the frame's stats.
    fn collect_stats(&mut self) -> FrameStats {
        let s = &mut self.stats;
        s.drawsegs = self.drawsegs.len();
        s.drawsegs_dropped = self.drawsegs.dropped();
        s.visplanes = self.planes.len();
        s.visplanes_found = self.planes.found();
        s.visplanes_extended = self.planes.extended();
        s.visplanes_cloned = self.planes.cloned();
        s.openings_used = self.openings.used();
        s.openings_capacity = self.openings.capacity();
        s.openings_growths = self.openings.growths();
        s.clone()
    }
}

/// Everything one frame's traversal reads and writes.
pub(crate) struct Frame<'a, R: Renderer + ?Sized> {
    pub proj: &'a Projection,
    pub level: &'a Level,
    pub heights: Option<&'a [SectorPlanes]>,
    pub view: View,
    pub st: &'a mut FrameState,
    pub out: &'a mut R,
    /// Planes of the subsector being drawn.
    pub floorplane: Option<VisplaneId>,
    pub ceilingplane: Option<VisplaneId>,
}

impl<R: Renderer + ?Sized> Frame<'_, R> {
    /// Heights used for this frame's geometry tests.
    #[inline]
    pub(crate) fn sector_planes(&self, sector: SectorId) -> SectorPlanes {
        self.heights
            .and_then(|h| h.get(sector as usize))
            .copied()
            .unwrap_or_else(|| (&self.level.sectors[sector as usize]).into())
    }
}

/// The rasterizer: projection tables for the current view size plus the
/// per-frame pools.
#[derive(Debug)]
pub struct Engine {
    config: RenderConfig,
    proj: Projection,
    state: FrameState,
}

impl Engine {
    pub fn new(config: RenderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            proj: Projection::new(config.width, config.height),
            state: FrameState::new(&config),
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    #[inline]
    pub fn projection(&self) -> &Projection {
        &self.proj
    }

    /// Rebuild the projection tables and per-column scratch.
    pub fn set_view_size(&mut self, width: usize, height: usize) -> Result<(), ConfigError> {
        let cfg = RenderConfig::new(width, height, self.config.limits)?;
        if (cfg.width, cfg.height) != (self.config.width, self.config.height) {
            debug!("view resized to {width}x{height}");
            self.proj = Projection::new(width, height);
            self.state = FrameState::new(&cfg);
        }
        self.config = cfg;
        Ok(())
    }

    pub fn set_limits(&mut self, limits: RenderLimits) -> Result<(), ConfigError> {
        let cfg = RenderConfig::new(self.config.width, self.config.height, limits)?;
        self.state.set_limits(limits);
        self.config = cfg;
        Ok(())
    }

    /// Render one frame of `level` seen from `view` into `out`.
    ///
    /// `heights`, when given, overrides the floor/ceiling height of each
    /// sector (indexed by sector id) for this frame only.  Running out of
    /// visplanes stops the traversal; whatever was collected until then is
    /// still drawn and the report says `Aborted`.
    pub fn render_frame<R: Renderer + ?Sized>(
        &mut self,
        level: &Level,
        view: &View,
        heights: Option<&[SectorPlanes]>,
        out: &mut R,
    ) -> FrameReport {
        debug_assert!(
            heights.is_none_or(|h| h.len() == level.sectors.len()),
            "one SectorPlanes per sector"
        );
        out.begin_frame(self.config.width, self.config.height);

        let mut frame = self.begin(level, view, heights, out);
        let status = match frame.render_node(level.root) {
            Ok(()) => FrameStatus::Complete,
            Err(abort) => {
                warn!("{abort}");
                FrameStatus::Aborted(abort)
            }
        };
        frame.draw_planes();
        frame.draw_masked();

        let stats = self.state.collect_stats();
        debug!("{}: {stats}", level.name);
        FrameReport { status, stats }
    }

    /// Reset the pools and open a frame context.
    pub(crate) fn begin<'a, R: Renderer + ?Sized>(
        &'a mut self,
        level: &'a Level,
        view: &View,
        heights: Option<&'a [SectorPlanes]>,
        out: &'a mut R,
    ) -> Frame<'a, R> {
        self.state.clear(&self.config);
        Frame {
            proj: &self.proj,
            level,
            heights,
            view: *view,
            st: &mut self.state,
            out,
            floorplane: None,
            ceilingplane: None,
        }
    }

    /*──────────────────────── read-only views ───────────────────────*/

    /// Solid-span list as left by the last frame.
    pub fn solid_segs(&self) -> &SolidSegs {
        &self.state.solid
    }

    pub fn drawsegs(&self) -> &DrawSegs {
        &self.state.drawsegs
    }

    pub fn visplanes(&self) -> &Visplanes {
        &self.state.planes
    }

    pub fn openings(&self) -> &Openings {
        &self.state.openings
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::engine::drawsegs::Silhouette;
    use crate::engine::stats::{FrameAbort, Overflow};
    use crate::fixed::{ANG90, ANG180, ANG270, Angle, FRACUNIT};
    use crate::renderer::{ColumnKind, Recorder};
    use crate::world::{NodeRef, scenes};

    fn engine(limits: RenderLimits) -> Engine {
        Engine::new(RenderConfig::new(320, 200, limits).unwrap()).unwrap()
    }

    fn view_at(x: i32, y: i32, angle: Angle) -> View {
        View {
            x: x * FRACUNIT,
            y: y * FRACUNIT,
            z: scenes::EYE_HEIGHT * FRACUNIT,
            angle,
            extralight: 0,
            fixed_colormap: None,
        }
    }

    #[test]
    fn single_room_draws_every_wall_with_two_planes() {
        let level = scenes::single_room();
        let mut eng = engine(RenderLimits::vanilla());
        let mut rec = Recorder::default();
        let mut walls = HashSet::new();

        for angle in [0, ANG90, ANG180, ANG270] {
            let report = eng.render_frame(&level, &view_at(128, 128, angle), None, &mut rec);
            assert_eq!(report.status, FrameStatus::Complete);
            assert!(report.stats.overflows.is_empty());
            assert_eq!(report.stats.visplanes, 2, "floor + ceiling");
            assert_eq!(report.stats.visplanes_cloned, 0);
            assert!(report.stats.drawsegs >= 1);
            // a closed room fills the screen
            assert!(eng.solid_segs().is_full());
            assert!(report.stats.spans > 0);
            walls.extend(eng.drawsegs().iter().map(|ds| ds.seg));
        }
        assert_eq!(walls.len(), 4);
    }

    #[test]
    fn wall_records_tile_the_screen_without_overlap() {
        let level = scenes::single_room();
        let mut eng = engine(RenderLimits::raised());
        let mut rec = Recorder::default();
        eng.render_frame(&level, &view_at(40, 60, ANG90 / 3), None, &mut rec);

        let mut cols = vec![0; 320];
        for ds in eng.drawsegs().iter() {
            assert_eq!(ds.silhouette, Silhouette::BOTH);
            for x in ds.x1..=ds.x2 {
                cols[x as usize] += 1;
            }
        }
        assert!(cols.iter().all(|&c| c == 1));
        // one wall column per screen column
        assert_eq!(rec.columns_of(ColumnKind::Wall).count(), 320);
    }

    #[test]
    fn invisible_trigger_line_adds_nothing() {
        let level = scenes::trigger_room();
        let portal = level
            .segs
            .iter()
            .position(|s| s.back.is_some())
            .unwrap() as u16;
        let mut eng = engine(RenderLimits::vanilla());
        let mut rec = Recorder::default();

        let report = eng.render_frame(&level, &view_at(64, 128, 0), None, &mut rec);
        assert_eq!(report.status, FrameStatus::Complete);
        assert!(eng.drawsegs().iter().all(|ds| ds.seg != portal));
        // both rooms share the floor and ceiling planes
        assert_eq!(report.stats.visplanes, 2);
        assert_eq!(report.stats.clip_pass_calls, 0);
        assert_eq!(report.stats.subsectors, 2);
    }

    #[test]
    fn window_line_passes_without_occluding() {
        let level = scenes::window_room();
        let portal = level
            .segs
            .iter()
            .position(|s| s.back.is_some())
            .unwrap() as u16;
        let wall = level.textures.id("STARTAN3").unwrap();
        let step = level.textures.id("STEP6").unwrap();
        let mut eng = engine(RenderLimits::vanilla());
        let mut rec = Recorder::default();

        let before = eng.solid_segs().ranges().to_vec();
        {
            let view = view_at(64, 128, 0);
            let mut frame = eng.begin(&level, &view, None, &mut rec);
            frame.render_subsector_planes(0).unwrap();
            frame.add_line(portal).unwrap();
            assert_eq!(frame.st.stats.clip_pass_calls, 1);
            assert_eq!(frame.st.stats.clip_solid_calls, 0);
            assert_eq!(frame.st.solid.ranges(), before.as_slice());
            assert_eq!(frame.st.drawsegs.len(), 1);
        }
        let ds = eng.drawsegs().get(0);
        assert_eq!(ds.seg, portal);
        assert!(ds.masked.is_none());

        // upper and lower textures both show, nothing in between
        let used: HashSet<_> = rec.columns.iter().map(|c| c.texture).collect();
        assert_eq!(used, HashSet::from([wall, step]));
        for x in ds.x1..=ds.x2 {
            let col: Vec<_> = rec.columns.iter().filter(|c| c.x == x).collect();
            assert!(col.len() <= 2);
            if let [upper, lower] = col.as_slice() {
                assert!(upper.yh < lower.yl, "gap left for the far room");
            }
        }
    }

    #[test]
    fn window_room_far_side_is_drawn() {
        let level = scenes::window_room();
        let mut eng = engine(RenderLimits::vanilla());
        let mut rec = Recorder::default();
        let report = eng.render_frame(&level, &view_at(64, 128, 0), None, &mut rec);
        assert_eq!(report.status, FrameStatus::Complete);
        assert_eq!(report.stats.subsectors, 2);
        assert_eq!(report.stats.clip_pass_calls, 1);
        // near floor + ceiling, far floor + ceiling
        assert_eq!(report.stats.visplanes, 4);
        assert!(eng.solid_segs().is_full());
    }

    #[test]
    fn visplane_overflow_aborts_once_and_keeps_the_limit() {
        let level = scenes::corridor(6);
        let limit = 3;
        let mut eng = engine(RenderLimits {
            max_visplanes: limit,
            ..RenderLimits::raised()
        });
        let mut rec = Recorder::default();

        let report = eng.render_frame(&level, &view_at(64, 128, 0), None, &mut rec);
        assert_eq!(
            report.status,
            FrameStatus::Aborted(FrameAbort::Visplanes { limit })
        );
        assert_eq!(report.stats.visplanes, limit);
        assert_eq!(report.messages().len(), 1);
        // the partial frame is still emitted
        assert!(report.stats.spans > 0);
        assert!(report.stats.wall_columns > 0);

        // next frame starts clean
        eng.set_limits(RenderLimits::raised()).unwrap();
        let report = eng.render_frame(&level, &view_at(64, 128, 0), None, &mut rec);
        assert_eq!(report.status, FrameStatus::Complete);
        assert!(report.stats.visplanes > limit);
    }

    #[test]
    fn drawseg_limit_degrades_without_abort() {
        let level = scenes::corridor(4);
        let mut eng = engine(RenderLimits {
            max_drawsegs: 2,
            ..RenderLimits::raised()
        });
        let mut rec = Recorder::default();
        let report = eng.render_frame(&level, &view_at(64, 128, 0), None, &mut rec);
        assert_eq!(report.status, FrameStatus::Complete);
        assert_eq!(report.stats.drawsegs, 2);
        assert!(report.stats.drawsegs_dropped > 0);
        assert_eq!(
            report.stats.overflows,
            vec![Overflow::Drawsegs { limit: 2 }]
        );
    }

    #[test]
    fn interpolated_heights_override_the_level() {
        let level = scenes::single_room();
        let mut eng = engine(RenderLimits::vanilla());
        let mut rec = Recorder::default();
        // floor raised above the eye: no floor plane
        let heights = [SectorPlanes {
            floor_h: 64 * FRACUNIT,
            ceil_h: 128 * FRACUNIT,
        }];
        let report = eng.render_frame(&level, &view_at(128, 128, 0), Some(&heights[..]), &mut rec);
        assert_eq!(report.stats.visplanes, 1);
        assert_eq!(level.sectors[0].floor_h, 0);
    }

    #[test]
    fn fixed_colormap_overrides_every_shade() {
        let level = scenes::single_room();
        let mut eng = engine(RenderLimits::vanilla());
        let mut rec = Recorder::default();
        let view = view_at(128, 128, ANG180).with_fixed_colormap(5);
        eng.render_frame(&level, &view, None, &mut rec);
        assert!(rec.columns.iter().all(|c| c.shade == 5));
        assert!(rec.spans.iter().all(|s| s.shade == 5));
    }

    #[test]
    fn sky_is_full_bright_columns() {
        let level = scenes::sky_room();
        let mut eng = engine(RenderLimits::vanilla());
        let mut rec = Recorder::default();
        // far enough from the east wall for the sky to reach below row 0
        let report = eng.render_frame(&level, &view_at(8, 128, 0), None, &mut rec);
        assert!(report.stats.sky_columns > 0);
        let sky: Vec<_> = rec.columns_of(ColumnKind::Sky).collect();
        assert_eq!(sky.len(), report.stats.sky_columns);
        assert!(sky.iter().all(|c| c.shade == 0 && c.texture == level.sky_texture));
        assert!(sky.iter().all(|c| c.yl <= c.yh && c.yl >= 0));
    }

    #[test]
    fn masked_window_draws_after_the_planes() {
        let level = scenes::masked_window();
        let grate = level.textures.id("MIDGRATE").unwrap();
        let mut eng = engine(RenderLimits::vanilla());
        let mut rec = Recorder::default();
        let report = eng.render_frame(&level, &view_at(64, 128, 0), None, &mut rec);
        assert_eq!(report.status, FrameStatus::Complete);
        assert!(report.stats.masked_columns > 0);

        let masked: Vec<_> = rec.columns_of(ColumnKind::Masked).collect();
        assert_eq!(masked.len(), report.stats.masked_columns);
        assert!(masked.iter().all(|c| c.texture == grate));
        // emitted last
        let first_masked = rec
            .columns
            .iter()
            .position(|c| c.kind == ColumnKind::Masked)
            .unwrap();
        assert!(rec.columns[first_masked..].iter().all(|c| c.kind == ColumnKind::Masked));

        let ds = eng.drawsegs().iter().find(|ds| ds.masked.is_some()).unwrap();
        let h = ds.masked.unwrap();
        assert!(eng.openings().slice(h).iter().all(|&c| c == i16::MAX));
        assert!(ds.silhouette.contains(Silhouette::BOTH));
    }

    #[test]
    fn opening_limit_skips_masked_columns() {
        let level = scenes::masked_window();
        let mut eng = engine(RenderLimits {
            max_openings: 8,
            ..RenderLimits::raised()
        });
        let mut rec = Recorder::default();
        let report = eng.render_frame(&level, &view_at(64, 128, 0), None, &mut rec);
        assert_eq!(report.status, FrameStatus::Complete);
        assert_eq!(report.stats.masked_columns, 0);
        assert!(report.stats.openings_refused > 0);
        assert_eq!(
            report.stats.overflows,
            vec![Overflow::Openings { limit: 8 }]
        );
    }

    #[test]
    fn resize_rebuilds_tables() {
        let mut eng = engine(RenderLimits::vanilla());
        eng.set_view_size(640, 400).unwrap();
        assert_eq!(eng.projection().width, 640);
        assert_eq!(eng.config().height, 400);
        assert!(eng.set_view_size(0, 400).is_err());
        assert_eq!(eng.config().width, 640);

        let level = scenes::single_room();
        let mut rec = Recorder::default();
        eng.render_frame(&level, &view_at(128, 128, 0), None, &mut rec);
        assert_eq!(rec.columns_of(ColumnKind::Wall).count(), 640);
        assert!(rec.columns.iter().all(|c| c.yh < 400));
    }

    #[test]
    fn root_leaf_needs_no_nodes() {
        let level = scenes::single_room();
        assert_eq!(level.root, NodeRef::Leaf(0));
        let mut eng = engine(RenderLimits::vanilla());
        let mut rec = Recorder::default();
        let report = eng.render_frame(&level, &view_at(128, 128, 0), None, &mut rec);
        assert_eq!((report.stats.nodes, report.stats.subsectors), (0, 1));
    }
}
