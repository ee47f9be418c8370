use bitflags::bitflags;

use crate::fixed::{Angle, Fixed};
use crate::world::texture::{FlatId, TextureId, TextureTable};

pub type SubsectorId = u16;
pub type LinedefId = u16;
pub type SegmentId = u16;
pub type VertexId = u16;
pub type SidedefId = u16;
pub type SectorId = u16;
pub type NodeId = u16;

/// Runtime snapshot of one map (immutable while rendering).
///
/// All coordinates are 16.16 fixed point in map units.
#[derive(Clone, Debug)]
pub struct Level {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub sectors: Vec<Sector>,
    pub sidedefs: Vec<Sidedef>,
    pub linedefs: Vec<Linedef>,
    pub segs: Vec<Seg>,
    pub subsectors: Vec<Subsector>,
    pub nodes: Vec<Node>,
    pub root: NodeRef,
    pub textures: TextureTable,
    pub flats: TextureTable,
    /// Ceiling/floor pic that means "open sky".
    pub sky_flat: Option<FlatId>,
    pub sky_texture: TextureId,
}

/*--------------------------- linedefs -------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct LinedefFlags: u16 {
        const IMPASSABLE      = 0x0001;
        const BLOCK_MONSTERS  = 0x0002;
        const TWO_SIDED       = 0x0004;
        const UPPER_UNPEGGED  = 0x0008;
        const LOWER_UNPEGGED  = 0x0010;
        const SECRET          = 0x0020;
        const BLOCK_SOUND     = 0x0040;
        const NOT_ON_MAP      = 0x0080;
        const ALREADY_ON_MAP  = 0x0100;
    }
}

#[derive(Clone, Debug)]
pub struct Linedef {
    pub v1: VertexId,
    pub v2: VertexId,
    pub flags: LinedefFlags,
    pub right_sidedef: Option<SidedefId>,
    pub left_sidedef: Option<SidedefId>,
}

/*--------------------------- sidedefs -------------------------------*/

#[derive(Clone, Debug)]
pub struct Sidedef {
    pub x_off: Fixed,
    pub y_off: Fixed,
    pub upper: TextureId,
    pub lower: TextureId,
    pub middle: TextureId,
    pub sector: SectorId,
}

/*----------------------- simple primitives --------------------------*/

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vertex {
    pub x: Fixed,
    pub y: Fixed,
}

/// One visible side of (part of) a linedef.
#[derive(Clone, Debug)]
pub struct Seg {
    pub v1: VertexId,
    pub v2: VertexId,
    /// Direction `v1 → v2`.
    pub angle: Angle,
    /// Distance along the linedef from its start to `v1`.
    pub offset: Fixed,
    pub linedef: LinedefId,
    pub sidedef: SidedefId,
    pub front: SectorId,
    /// `None` for one-sided lines.
    pub back: Option<SectorId>,
}

#[derive(Clone, Debug)]
pub struct Subsector {
    pub sector: SectorId,
    pub seg_count: u16,
    pub first_seg: SegmentId,
}

impl Subsector {
    #[inline]
    pub fn segs(&self) -> std::ops::Range<usize> {
        let first = self.first_seg as usize;
        first..first + self.seg_count as usize
    }
}

/// Axis-aligned box in the node's coordinate order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BBox {
    pub top: Fixed,
    pub bottom: Fixed,
    pub left: Fixed,
    pub right: Fixed,
}

impl BBox {
    pub fn empty() -> Self {
        Self {
            top: Fixed::MIN,
            bottom: Fixed::MAX,
            left: Fixed::MAX,
            right: Fixed::MIN,
        }
    }

    pub fn add_point(&mut self, x: Fixed, y: Fixed) {
        self.left = self.left.min(x);
        self.right = self.right.max(x);
        self.bottom = self.bottom.min(y);
        self.top = self.top.max(y);
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            top: self.top.max(other.top),
            bottom: self.bottom.min(other.bottom),
            left: self.left.min(other.left),
            right: self.right.max(other.right),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.left <= self.right && self.bottom <= self.top
    }
}

/// Child reference of a BSP node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Node(NodeId),
    Leaf(SubsectorId),
}

/// Partition line `(x, y) + t·(dx, dy)`; `child[0]` is the front (right)
/// side, `child[1]` the back.
#[derive(Clone, Debug)]
pub struct Node {
    pub x: Fixed,
    pub y: Fixed,
    pub dx: Fixed,
    pub dy: Fixed,
    pub bbox: [BBox; 2],
    pub child: [NodeRef; 2],
}

#[derive(Clone, Debug)]
pub struct Sector {
    pub floor_h: Fixed,
    pub ceil_h: Fixed,
    pub floor_pic: FlatId,
    pub ceil_pic: FlatId,
    pub light: i16,
}

/// Floor/ceiling heights used for one frame's geometry tests, e.g. a
/// blend of the current and previous tic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectorPlanes {
    pub floor_h: Fixed,
    pub ceil_h: Fixed,
}

impl From<&Sector> for SectorPlanes {
    fn from(s: &Sector) -> Self {
        Self {
            floor_h: s.floor_h,
            ceil_h: s.ceil_h,
        }
    }
}

impl Level {
    #[inline]
    pub fn vertex(&self, id: VertexId) -> Vertex {
        self.vertices[id as usize]
    }

    #[inline]
    pub fn is_sky(&self, pic: FlatId) -> bool {
        self.sky_flat == Some(pic)
    }
}
