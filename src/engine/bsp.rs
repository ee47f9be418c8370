//! Front-to-back BSP walk, bounding-box culling and per-line clipping.

use log::trace;

use crate::engine::engine::Frame;
use crate::engine::planes::{PlaneKey, PlaneOrigin, VisplaneId};
use crate::engine::stats::FrameAbort;
use crate::fixed::{ANG90, ANG180, Angle, Fixed, fine, point_to_angle};
use crate::renderer::Renderer;
use crate::world::{BBox, FlatId, NO_TEXTURE, NodeRef, SegmentId, SubsectorId};

/// For each of the nine view positions around a box (row-major, with a
/// spare slot per row), the two corners that bound its silhouette, as
/// indices into `[top, bottom, left, right]`: `x1, y1, x2, y2`.
const CHECKCOORD: [[usize; 4]; 12] = [
    [3, 0, 2, 1],
    [3, 0, 2, 0],
    [3, 1, 2, 0],
    [0; 4],
    [2, 0, 2, 1],
    [0; 4],
    [3, 1, 3, 0],
    [0; 4],
    [2, 0, 3, 1],
    [2, 1, 3, 1],
    [2, 1, 3, 0],
    [0; 4],
];

/// How a seg takes part in occlusion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LineClip {
    /// One-sided or closed door: hides everything behind it.
    Solid,
    /// Window: drawn, but the far side stays visible.
    Pass,
    /// Same sector properties on both sides and no texture.
    Invisible,
}

impl<R: Renderer + ?Sized> Frame<'_, R> {
    /// Render `node` and everything below it, nearest subtree first.
    pub(crate) fn render_node(&mut self, node: NodeRef) -> Result<(), FrameAbort> {
        match node {
            NodeRef::Leaf(ss) => self.render_subsector(ss),
            NodeRef::Node(n) => {
                self.st.stats.nodes += 1;
                let level = self.level;
                let bsp = &level.nodes[n as usize];
                let side = bsp.point_side(self.view.x, self.view.y);

                self.render_node(bsp.child[side])?;

                if self.check_bbox(&bsp.bbox[side ^ 1]) {
                    self.render_node(bsp.child[side ^ 1])
                } else {
                    trace!("node {n}: back child {:?} hidden", bsp.child[side ^ 1]);
                    self.st.stats.bbox_rejects += 1;
                    Ok(())
                }
            }
        }
    }

    /// Angle from the viewpoint to a map point.
    #[inline]
    fn angle_to(&self, x: Fixed, y: Fixed) -> Angle {
        point_to_angle(x.wrapping_sub(self.view.x), y.wrapping_sub(self.view.y))
    }

    /// Clip a view-relative angle pair (left edge first) to the field of
    /// view and map it to a half-open column range.  `None` when nothing
    /// is left or the range is empty.
    fn clip_angles(&self, mut angle1: Angle, mut angle2: Angle, span: Angle) -> Option<(i32, i32)> {
        let clipangle = self.proj.clipangle;
        let fov = clipangle.wrapping_mul(2);

        let tspan = angle1.wrapping_add(clipangle);
        if tspan > fov {
            // left edge off screen
            if tspan - fov >= span {
                return None;
            }
            angle1 = clipangle;
        }
        let tspan = clipangle.wrapping_sub(angle2);
        if tspan > fov {
            if tspan - fov >= span {
                return None;
            }
            angle2 = clipangle.wrapping_neg();
        }

        let x1 = self.proj.viewangletox[fine(angle1.wrapping_add(ANG90))];
        let x2 = self.proj.viewangletox[fine(angle2.wrapping_add(ANG90))];
        (x1 != x2).then_some((x1, x2))
    }

    /// Whether any part of `bbox` could still show on screen.
    pub(crate) fn check_bbox(&self, bbox: &BBox) -> bool {
        debug_assert!(bbox.is_valid(), "inverted bounding box {bbox:?}");
        let (vx, vy) = (self.view.x, self.view.y);

        let boxx = if vx <= bbox.left {
            0
        } else if vx < bbox.right {
            1
        } else {
            2
        };
        let boxy = if vy >= bbox.top {
            0
        } else if vy > bbox.bottom {
            1
        } else {
            2
        };
        let boxpos = (boxy << 2) + boxx;
        if boxpos == 5 {
            // viewpoint inside the box
            return true;
        }

        let coord = [bbox.top, bbox.bottom, bbox.left, bbox.right];
        let [x1, y1, x2, y2] = CHECKCOORD[boxpos].map(|i| coord[i]);

        let angle1 = self.angle_to(x1, y1).wrapping_sub(self.view.angle);
        let angle2 = self.angle_to(x2, y2).wrapping_sub(self.view.angle);
        let span = angle1.wrapping_sub(angle2);
        if span >= ANG180 {
            // sitting on an edge of the box
            return true;
        }

        match self.clip_angles(angle1, angle2, span) {
            Some((sx1, sx2)) => !self.st.solid.is_covered(sx1, sx2 - 1),
            None => false,
        }
    }

    /// Open the floor and ceiling planes of `ss` for its walls to extend.
    pub(crate) fn render_subsector_planes(&mut self, ss: SubsectorId) -> Result<(), FrameAbort> {
        let level = self.level;
        let sub = &level.subsectors[ss as usize];
        let sector = &level.sectors[sub.sector as usize];
        let planes = self.sector_planes(sub.sector);
        let origin = PlaneOrigin::Found { subsector: ss };

        self.floorplane = if planes.floor_h < self.view.z {
            Some(self.find_plane(planes.floor_h, sector.floor_pic, sector.light, origin)?)
        } else {
            None
        };
        self.ceilingplane = if planes.ceil_h > self.view.z || level.is_sky(sector.ceil_pic) {
            Some(self.find_plane(planes.ceil_h, sector.ceil_pic, sector.light, origin)?)
        } else {
            None
        };
        Ok(())
    }

    pub(crate) fn render_subsector(&mut self, ss: SubsectorId) -> Result<(), FrameAbort> {
        self.st.stats.subsectors += 1;
        trace!("subsector {ss}");
        self.render_subsector_planes(ss)?;
        for seg in self.level.subsectors[ss as usize].segs() {
            self.add_line(seg as SegmentId)?;
        }
        Ok(())
    }

    /// All sky surfaces share one identity whatever their height.
    pub(crate) fn find_plane(
        &mut self,
        height: Fixed,
        pic: FlatId,
        light: i16,
        origin: PlaneOrigin,
    ) -> Result<VisplaneId, FrameAbort> {
        let key = if self.level.is_sky(pic) {
            PlaneKey {
                height: 0,
                pic,
                light: 0,
            }
        } else {
            PlaneKey { height, pic, light }
        };
        self.st.planes.find(key, origin)
    }

    /// Decide how a seg with two sides clips.
    pub(crate) fn classify(&self, seg: SegmentId) -> LineClip {
        let level = self.level;
        let seg = &level.segs[seg as usize];
        let Some(back_id) = seg.back else {
            return LineClip::Solid;
        };
        let front = self.sector_planes(seg.front);
        let back = self.sector_planes(back_id);

        // closed door
        if back.ceil_h <= front.floor_h || back.floor_h >= front.ceil_h {
            return LineClip::Solid;
        }
        // window
        if back.ceil_h != front.ceil_h || back.floor_h != front.floor_h {
            return LineClip::Pass;
        }

        let fs = &level.sectors[seg.front as usize];
        let bs = &level.sectors[back_id as usize];
        let side = &level.sidedefs[seg.sidedef as usize];
        if bs.ceil_pic == fs.ceil_pic
            && bs.floor_pic == fs.floor_pic
            && bs.light == fs.light
            && side.middle == NO_TEXTURE
        {
            return LineClip::Invisible;
        }
        // floor or ceiling looks different
        LineClip::Pass
    }

    /// Clip one seg against the view and the solid list and store its
    /// visible pieces.
    pub(crate) fn add_line(&mut self, seg_id: SegmentId) -> Result<(), FrameAbort> {
        let level = self.level;
        let seg = &level.segs[seg_id as usize];
        let v1 = level.vertex(seg.v1);
        let v2 = level.vertex(seg.v2);

        let angle1 = self.angle_to(v1.x, v1.y);
        let angle2 = self.angle_to(v2.x, v2.y);
        let span = angle1.wrapping_sub(angle2);
        if span >= ANG180 {
            // back side
            return Ok(());
        }

        let rw_angle1 = angle1;
        let Some((x1, x2)) = self.clip_angles(
            angle1.wrapping_sub(self.view.angle),
            angle2.wrapping_sub(self.view.angle),
            span,
        ) else {
            return Ok(());
        };

        let fragments = match self.classify(seg_id) {
            LineClip::Solid => {
                self.st.stats.clip_solid_calls += 1;
                self.st.solid.clip_solid(x1, x2 - 1)
            }
            LineClip::Pass => {
                self.st.stats.clip_pass_calls += 1;
                self.st.solid.clip_pass(x1, x2 - 1)
            }
            LineClip::Invisible => return Ok(()),
        };

        for f in fragments {
            self.store_wall_range(seg_id, rw_angle1, f.first, f.last)?;
        }
        Ok(())
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RenderConfig, RenderLimits};
    use crate::engine::Engine;
    use crate::fixed::{ANG45, FRACUNIT};
    use crate::renderer::Recorder;
    use crate::world::{View, scenes};

    fn view(x: i32, y: i32, angle: Angle) -> View {
        View {
            x: x * FRACUNIT,
            y: y * FRACUNIT,
            z: 41 * FRACUNIT,
            angle,
            extralight: 0,
            fixed_colormap: None,
        }
    }

    fn bbox(left: i32, bottom: i32, right: i32, top: i32) -> BBox {
        BBox {
            top: top * FRACUNIT,
            bottom: bottom * FRACUNIT,
            left: left * FRACUNIT,
            right: right * FRACUNIT,
        }
    }

    #[test]
    fn bbox_visibility_follows_view_and_solid_list() {
        let level = scenes::single_room();
        let config = RenderConfig::new(320, 200, RenderLimits::vanilla()).unwrap();
        let mut eng = Engine::new(config).unwrap();
        let mut rec = Recorder::default();
        let v = view(0, 0, 0);
        let mut frame = eng.begin(&level, &v, None, &mut rec);

        // ahead, behind, containing the viewpoint
        assert!(frame.check_bbox(&bbox(100, -10, 120, 10)));
        assert!(!frame.check_bbox(&bbox(-120, -10, -100, 10)));
        assert!(frame.check_bbox(&bbox(-10, -10, 10, 10)));
        // far off to the side, outside the 90° cone
        assert!(!frame.check_bbox(&bbox(10, 100, 20, 120)));

        // a wall across the whole view hides everything behind it
        frame.st.solid.clip_solid(0, 319);
        assert!(!frame.check_bbox(&bbox(100, -10, 120, 10)));
        assert!(frame.check_bbox(&bbox(-10, -10, 10, 10)));
    }

    #[test]
    fn corridor_walk_skips_hidden_rooms() {
        let level = scenes::corridor(5);
        let mut eng = Engine::new(RenderConfig::default()).unwrap();
        let mut rec = Recorder::default();

        // looking west from room 0: the rooms to the east are behind
        let report = eng.render_frame(&level, &view(128, 128, ANG180), None, &mut rec);
        assert_eq!(report.stats.subsectors, 1);
        assert!(report.stats.bbox_rejects >= 1);

        // looking east down the corridor every room is seen
        let report = eng.render_frame(&level, &view(32, 128, 0), None, &mut rec);
        assert_eq!(report.stats.subsectors, 5);
    }

    #[test]
    fn segs_behind_or_beside_are_dropped() {
        let level = scenes::single_room();
        let mut eng = Engine::new(RenderConfig::default()).unwrap();
        let mut rec = Recorder::default();
        // facing north-east from the south-west corner
        let v = view(16, 16, ANG45);
        let mut frame = eng.begin(&level, &v, None, &mut rec);
        frame.render_subsector(0).unwrap();
        // only the north and east walls face the viewer inside the cone
        let seen: Vec<_> = frame.st.drawsegs.iter().map(|ds| ds.seg).collect();
        assert!(seen.contains(&0) && seen.contains(&1));
        assert!(!seen.contains(&3));
    }

    #[test]
    fn classify_lines() {
        let mut eng = Engine::new(RenderConfig::default()).unwrap();
        let mut rec = Recorder::default();
        let v = view(64, 128, 0);

        let level = scenes::trigger_room();
        let portal = level.segs.iter().position(|s| s.back.is_some()).unwrap() as SegmentId;
        let frame = eng.begin(&level, &v, None, &mut rec);
        assert_eq!(frame.classify(portal), LineClip::Invisible);
        assert_eq!(frame.classify(0), LineClip::Solid);

        let level = scenes::window_room();
        let frame = eng.begin(&level, &v, None, &mut rec);
        assert_eq!(frame.classify(portal), LineClip::Pass);

        // the same window with the far sector shut
        let heights = [
            (&level.sectors[0]).into(),
            crate::world::SectorPlanes {
                floor_h: 0,
                ceil_h: 0,
            },
        ];
        let frame = eng.begin(&level, &v, Some(&heights[..]), &mut rec);
        assert_eq!(frame.classify(portal), LineClip::Solid);
    }
}
