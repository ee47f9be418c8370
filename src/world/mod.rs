mod bsp;
mod builder;
mod camera;
mod geometry;
pub mod scenes;
mod texture;

pub use geometry::{
    BBox, Level, Linedef, LinedefFlags, LinedefId, Node, NodeId, NodeRef, Sector, SectorId,
    SectorPlanes, Seg, SegmentId, Sidedef, SidedefId, Subsector, SubsectorId, Vertex, VertexId,
};

pub use bsp::LevelError;
pub use builder::{LevelBuilder, SideTextures};
pub use camera::{Camera, View};
pub use texture::{FlatId, NO_TEXTURE, TextureError, TextureId, TextureMeta, TextureTable};
