use crate::fixed::{FRACBITS, Fixed, fixed_mul};
use crate::world::geometry::{Level, Node, NodeId, NodeRef, SubsectorId};

/// Structural problems found by [`Level::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("{kind} {index} refers to missing {target} {target_index}")]
    Dangling {
        kind: &'static str,
        index: usize,
        target: &'static str,
        target_index: usize,
    },

    #[error("subsector {0} has no segs")]
    EmptySubsector(usize),

    #[error("BSP node {0} is reachable twice (cycle or shared child)")]
    NodeRevisited(NodeId),

    #[error("linedef {0} has no right side")]
    MissingFrontSide(usize),

    #[error("level has no subsectors")]
    NoSubsectors,
}

// ──────────────────────────────────────────────────────────────────────────
//                       Level – public helpers
// ──────────────────────────────────────────────────────────────────────────
impl Level {
    /// Walk the BSP and return the subsector containing `(x, y)`.
    pub fn locate_subsector(&self, x: Fixed, y: Fixed) -> SubsectorId {
        let mut child = self.root;
        loop {
            match child {
                NodeRef::Leaf(ss) => return ss,
                NodeRef::Node(n) => {
                    let node = &self.nodes[n as usize];
                    child = node.child[node.point_side(x, y)];
                }
            }
        }
    }

    /// Check every cross-reference the renderer follows without bounds
    /// handling, and that the node graph below `root` is a tree.
    pub fn validate(&self) -> Result<(), LevelError> {
        fn check(
            kind: &'static str,
            index: usize,
            target: &'static str,
            target_index: usize,
            len: usize,
        ) -> Result<(), LevelError> {
            if target_index < len {
                Ok(())
            } else {
                Err(LevelError::Dangling {
                    kind,
                    index,
                    target,
                    target_index,
                })
            }
        }

        if self.subsectors.is_empty() {
            return Err(LevelError::NoSubsectors);
        }

        for (i, s) in self.sectors.iter().enumerate() {
            check("sector", i, "flat", s.floor_pic as usize, self.flats.len())?;
            check("sector", i, "flat", s.ceil_pic as usize, self.flats.len())?;
        }
        for (i, sd) in self.sidedefs.iter().enumerate() {
            check("sidedef", i, "sector", sd.sector as usize, self.sectors.len())?;
            for tex in [sd.upper, sd.lower, sd.middle] {
                check("sidedef", i, "texture", tex as usize, self.textures.len())?;
            }
        }
        for (i, ld) in self.linedefs.iter().enumerate() {
            check("linedef", i, "vertex", ld.v1 as usize, self.vertices.len())?;
            check("linedef", i, "vertex", ld.v2 as usize, self.vertices.len())?;
            let right = ld.right_sidedef.ok_or(LevelError::MissingFrontSide(i))?;
            check("linedef", i, "sidedef", right as usize, self.sidedefs.len())?;
            if let Some(left) = ld.left_sidedef {
                check("linedef", i, "sidedef", left as usize, self.sidedefs.len())?;
            }
        }
        for (i, seg) in self.segs.iter().enumerate() {
            check("seg", i, "vertex", seg.v1 as usize, self.vertices.len())?;
            check("seg", i, "vertex", seg.v2 as usize, self.vertices.len())?;
            check("seg", i, "linedef", seg.linedef as usize, self.linedefs.len())?;
            check("seg", i, "sidedef", seg.sidedef as usize, self.sidedefs.len())?;
            check("seg", i, "sector", seg.front as usize, self.sectors.len())?;
            if let Some(back) = seg.back {
                check("seg", i, "sector", back as usize, self.sectors.len())?;
            }
        }
        for (i, ss) in self.subsectors.iter().enumerate() {
            if ss.seg_count == 0 {
                return Err(LevelError::EmptySubsector(i));
            }
            check("subsector", i, "sector", ss.sector as usize, self.sectors.len())?;
            check("subsector", i, "seg", ss.segs().end - 1, self.segs.len())?;
        }
        check("level", 0, "texture", self.sky_texture as usize, self.textures.len())?;

        // depth-first over the node graph; any second visit is a cycle or a
        // shared subtree, both of which break front-to-back ordering
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![(usize::MAX, self.root)];
        while let Some((parent, child)) = stack.pop() {
            match child {
                NodeRef::Leaf(ss) => {
                    check("node", parent, "subsector", ss as usize, self.subsectors.len())?
                }
                NodeRef::Node(n) => {
                    check("node", parent, "node", n as usize, self.nodes.len())?;
                    if std::mem::replace(&mut seen[n as usize], true) {
                        return Err(LevelError::NodeRevisited(n));
                    }
                    let node = &self.nodes[n as usize];
                    stack.push((n as usize, node.child[0]));
                    stack.push((n as usize, node.child[1]));
                }
            }
        }
        Ok(())
    }
}

// ──────────────────────────────────────────────────────────────────────────
//                       Node geometry helpers
// ──────────────────────────────────────────────────────────────────────────
impl Node {
    /// 0 = *front* (right) of splitter, 1 = *back*.
    pub fn point_side(&self, x: Fixed, y: Fixed) -> usize {
        if self.dx == 0 {
            return if x <= self.x {
                (self.dy > 0) as usize
            } else {
                (self.dy < 0) as usize
            };
        }
        if self.dy == 0 {
            return if y <= self.y {
                (self.dx < 0) as usize
            } else {
                (self.dx > 0) as usize
            };
        }

        let dx = x.wrapping_sub(self.x);
        let dy = y.wrapping_sub(self.y);

        // sign bits alone decide when the cross product terms differ in sign
        if (self.dy ^ self.dx ^ dx ^ dy) < 0 {
            return ((self.dy ^ dx) < 0) as usize;
        }

        let left = fixed_mul(self.dy >> FRACBITS, dx);
        let right = fixed_mul(dy, self.dx >> FRACBITS);
        if right < left { 0 } else { 1 }
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FRACUNIT;
    use crate::world::geometry::BBox;
    use crate::world::scenes;

    fn splitter(x: i32, y: i32, dx: i32, dy: i32) -> Node {
        Node {
            x: x * FRACUNIT,
            y: y * FRACUNIT,
            dx: dx * FRACUNIT,
            dy: dy * FRACUNIT,
            bbox: [BBox::default(); 2],
            child: [NodeRef::Leaf(0), NodeRef::Leaf(1)],
        }
    }

    #[test]
    fn vertical_and_horizontal_splitters() {
        // north-pointing line: east is the front
        let n = splitter(0, 0, 0, 64);
        assert_eq!(n.point_side(10 * FRACUNIT, 0), 0);
        assert_eq!(n.point_side(-10 * FRACUNIT, 0), 1);

        // east-pointing line: south is the front
        let n = splitter(0, 0, 64, 0);
        assert_eq!(n.point_side(0, -10 * FRACUNIT), 0);
        assert_eq!(n.point_side(0, 10 * FRACUNIT), 1);
    }

    #[test]
    fn diagonal_splitter_uses_cross_product() {
        let n = splitter(0, 0, 64, 64);
        assert_eq!(n.point_side(32 * FRACUNIT, 0), 0);
        assert_eq!(n.point_side(0, 32 * FRACUNIT), 1);
        assert_eq!(n.point_side(-32 * FRACUNIT, -40 * FRACUNIT), 0);
    }

    #[test]
    fn corridor_locates_each_room() {
        let level = scenes::corridor(4);
        for room in 0..4 {
            let x = (room * scenes::ROOM_LEN + scenes::ROOM_LEN / 2) * FRACUNIT;
            let y = scenes::ROOM_WIDTH / 2 * FRACUNIT;
            assert_eq!(level.locate_subsector(x, y), room as SubsectorId);
        }
    }

    #[test]
    fn validate_accepts_scenes_and_rejects_cycles() {
        let mut level = scenes::corridor(3);
        assert_eq!(level.validate(), Ok(()));

        // nodes are stored east to west; point the eastern split back at the root
        assert_eq!(level.root, NodeRef::Node(1));
        level.nodes[0].child[0] = NodeRef::Node(1);
        assert_eq!(level.validate(), Err(LevelError::NodeRevisited(1)));
    }

    #[test]
    fn validate_reports_dangling_indices() {
        let mut level = scenes::single_room();
        level.segs[2].front = 99;
        assert!(matches!(
            level.validate(),
            Err(LevelError::Dangling { kind: "seg", index: 2, target: "sector", .. })
        ));
    }
}
