//! Doom-style BSP software rasterizer core.
//!
//! A [`world::Level`] is walked front to back from a [`world::View`]; walls
//! are clipped against what is already drawn, floors and ceilings are
//! gathered into visplanes, and every visible texture column and flat span
//! is handed to a [`renderer::Renderer`].

pub mod config;
pub mod engine;
pub mod fixed;
pub mod renderer;
pub mod world;
