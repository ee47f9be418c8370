//! Hand assembly of levels: vertices, sides and lines in map units, segs
//! and node boxes derived automatically.
//!
//! Real maps come from a node builder; this is for tests, demos and tools
//! that synthesise geometry.

use crate::fixed::{FRACUNIT, Fixed, point_to_angle};
use crate::world::bsp::LevelError;
use crate::world::geometry::{
    BBox, Level, Linedef, LinedefFlags, LinedefId, Node, NodeRef, Sector, SectorId, Seg,
    SegmentId, Sidedef, SidedefId, Subsector, SubsectorId, Vertex, VertexId,
};
use crate::world::texture::{FlatId, NO_TEXTURE, TextureError, TextureId, TextureMeta, TextureTable};

pub struct LevelBuilder {
    name: String,
    vertices: Vec<Vertex>,
    sectors: Vec<Sector>,
    sidedefs: Vec<Sidedef>,
    linedefs: Vec<Linedef>,
    segs: Vec<Seg>,
    subsectors: Vec<Subsector>,
    nodes: Vec<Node>,
    textures: TextureTable,
    flats: TextureTable,
    sky_flat: Option<FlatId>,
    sky_texture: TextureId,
}

/// Wall textures of one sidedef.
#[derive(Clone, Copy, Debug, Default)]
pub struct SideTextures {
    pub upper: TextureId,
    pub lower: TextureId,
    pub middle: TextureId,
}

impl SideTextures {
    pub fn solid(middle: TextureId) -> Self {
        Self {
            middle,
            ..Self::default()
        }
    }

    pub fn portal(upper: TextureId, lower: TextureId) -> Self {
        Self {
            upper,
            lower,
            middle: NO_TEXTURE,
        }
    }
}

#[inline]
fn units(v: i32) -> Fixed {
    v * FRACUNIT
}

impl LevelBuilder {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            sectors: Vec::new(),
            sidedefs: Vec::new(),
            linedefs: Vec::new(),
            segs: Vec::new(),
            subsectors: Vec::new(),
            nodes: Vec::new(),
            textures: TextureTable::default(),
            flats: TextureTable::default(),
            sky_flat: None,
            sky_texture: NO_TEXTURE,
        }
    }

    /*──────────────────────── assets ────────────────────────*/

    /// Register a wall texture, or return the id of an existing one with
    /// the same name.
    pub fn texture(
        &mut self,
        name: &str,
        width: u16,
        height: u16,
    ) -> Result<TextureId, TextureError> {
        match self.textures.id(name) {
            Some(id) => Ok(id),
            None => self.textures.insert(TextureMeta::new(name, width, height)),
        }
    }

    /// Flats are always 64×64.
    pub fn flat(&mut self, name: &str) -> Result<FlatId, TextureError> {
        match self.flats.id(name) {
            Some(id) => Ok(id),
            None => self.flats.insert(TextureMeta::new(name, 64, 64)),
        }
    }

    pub fn sky(&mut self, flat: FlatId, texture: TextureId) {
        self.sky_flat = Some(flat);
        self.sky_texture = texture;
    }

    /*──────────────────────── map data ──────────────────────*/

    pub fn vertex(&mut self, x: i32, y: i32) -> VertexId {
        let v = Vertex {
            x: units(x),
            y: units(y),
        };
        if let Some(i) = self.vertices.iter().position(|&o| o == v) {
            return i as VertexId;
        }
        self.vertices.push(v);
        (self.vertices.len() - 1) as VertexId
    }

    pub fn sector(
        &mut self,
        floor: i32,
        ceil: i32,
        floor_pic: FlatId,
        ceil_pic: FlatId,
        light: i16,
    ) -> SectorId {
        self.sectors.push(Sector {
            floor_h: units(floor),
            ceil_h: units(ceil),
            floor_pic,
            ceil_pic,
            light,
        });
        (self.sectors.len() - 1) as SectorId
    }

    pub fn side(&mut self, sector: SectorId, tex: SideTextures) -> SidedefId {
        self.sidedefs.push(Sidedef {
            x_off: 0,
            y_off: 0,
            upper: tex.upper,
            lower: tex.lower,
            middle: tex.middle,
            sector,
        });
        (self.sidedefs.len() - 1) as SidedefId
    }

    pub fn side_offsets(&mut self, side: SidedefId, x: i32, y: i32) {
        let sd = &mut self.sidedefs[side as usize];
        sd.x_off = units(x);
        sd.y_off = units(y);
    }

    /// A linedef; `TWO_SIDED` is implied by a left side.
    pub fn line(
        &mut self,
        v1: VertexId,
        v2: VertexId,
        mut flags: LinedefFlags,
        right: SidedefId,
        left: Option<SidedefId>,
    ) -> LinedefId {
        flags.set(LinedefFlags::TWO_SIDED, left.is_some());
        self.linedefs.push(Linedef {
            v1,
            v2,
            flags,
            right_sidedef: Some(right),
            left_sidedef: left,
        });
        (self.linedefs.len() - 1) as LinedefId
    }

    /// Whole-line seg on `side` (0 = right, 1 = left).
    fn seg(&mut self, line: LinedefId, side: usize) -> Result<SegmentId, LevelError> {
        let ld = self.linedefs.get(line as usize).ok_or(LevelError::Dangling {
            kind: "seg",
            index: self.segs.len(),
            target: "linedef",
            target_index: line as usize,
        })?;
        let (v1, v2, front_side, back_side) = if side == 0 {
            (ld.v1, ld.v2, ld.right_sidedef, ld.left_sidedef)
        } else {
            (ld.v2, ld.v1, ld.left_sidedef, ld.right_sidedef)
        };
        let front_side = front_side.ok_or(LevelError::MissingFrontSide(line as usize))?;
        let two_sided = ld.flags.contains(LinedefFlags::TWO_SIDED);

        let a = self.vertices[v1 as usize];
        let b = self.vertices[v2 as usize];
        self.segs.push(Seg {
            v1,
            v2,
            angle: point_to_angle(b.x - a.x, b.y - a.y),
            offset: 0,
            linedef: line,
            sidedef: front_side,
            front: self.sidedefs[front_side as usize].sector,
            back: back_side
                .filter(|_| two_sided)
                .map(|s| self.sidedefs[s as usize].sector),
        });
        Ok((self.segs.len() - 1) as SegmentId)
    }

    /// A convex subsector from `(line, side)` pairs listed clockwise.
    pub fn subsector(&mut self, sides: &[(LinedefId, usize)]) -> Result<NodeRef, LevelError> {
        let first_seg = self.segs.len() as SegmentId;
        for &(line, side) in sides {
            self.seg(line, side)?;
        }
        let sector = self
            .segs
            .get(first_seg as usize)
            .map(|s| s.front)
            .ok_or(LevelError::EmptySubsector(self.subsectors.len()))?;
        self.subsectors.push(Subsector {
            sector,
            seg_count: sides.len() as u16,
            first_seg,
        });
        Ok(NodeRef::Leaf((self.subsectors.len() - 1) as SubsectorId))
    }

    fn bounds(&self, child: NodeRef) -> BBox {
        match child {
            NodeRef::Leaf(ss) => {
                let mut bbox = BBox::empty();
                for seg in &self.segs[self.subsectors[ss as usize].segs()] {
                    for v in [seg.v1, seg.v2] {
                        let v = self.vertices[v as usize];
                        bbox.add_point(v.x, v.y);
                    }
                }
                bbox
            }
            NodeRef::Node(n) => {
                let node = &self.nodes[n as usize];
                node.bbox[0].union(&node.bbox[1])
            }
        }
    }

    /// Partition `(x, y) + t·(dx, dy)`; children must already exist.
    pub fn node(
        &mut self,
        x: i32,
        y: i32,
        dx: i32,
        dy: i32,
        front: NodeRef,
        back: NodeRef,
    ) -> NodeRef {
        let bbox = [self.bounds(front), self.bounds(back)];
        self.nodes.push(Node {
            x: units(x),
            y: units(y),
            dx: units(dx),
            dy: units(dy),
            bbox,
            child: [front, back],
        });
        NodeRef::Node((self.nodes.len() - 1) as u16)
    }

    pub fn build(self, root: NodeRef) -> Result<Level, LevelError> {
        let level = Level {
            name: self.name,
            vertices: self.vertices,
            sectors: self.sectors,
            sidedefs: self.sidedefs,
            linedefs: self.linedefs,
            segs: self.segs,
            subsectors: self.subsectors,
            nodes: self.nodes,
            root,
            textures: self.textures,
            flats: self.flats,
            sky_flat: self.sky_flat,
            sky_texture: self.sky_texture,
        };
        level.validate()?;
        Ok(level)
    }
}
