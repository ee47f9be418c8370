//! The rasterizer core: BSP traversal, occlusion, wall setting and plane
//! collection for one frame at a time.

mod bsp;
mod clipper;
mod drawsegs;
#[allow(clippy::module_inception)]
mod engine;
mod masked;
mod openings;
mod planes;
mod projection;
mod segs;
mod stats;

pub use clipper::{ClipRange, Fragments, SolidSegs};
pub use drawsegs::{DrawSeg, DrawSegs, Silhouette, SpriteClip};
pub use engine::{ClipBands, Engine};
pub use masked::MASKED_DONE;
pub use openings::{OpeningHandle, Openings};
pub use planes::{PlaneKey, PlaneOrigin, UNUSED, Visplane, VisplaneId, Visplanes};
pub use projection::{FIELDOFVIEW, Projection, Shade};
pub use stats::{FrameAbort, FrameReport, FrameStats, FrameStatus, Overflow};
