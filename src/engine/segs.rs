//! Wall setter: turns one visible column range of a seg into wall columns,
//! plane extents, clip band updates and a drawseg.

use log::warn;

use crate::engine::drawsegs::{DrawSeg, Silhouette, SpriteClip};
use crate::engine::engine::{Frame, FrameState};
use crate::engine::openings::OpeningHandle;
use crate::engine::projection::Projection;
use crate::engine::stats::{FrameAbort, Overflow};
use crate::fixed::{
    ANG90, ANG180, Angle, FINEANGLES, FRACBITS, FRACUNIT, Fixed, fine, finesine, finetangent,
    fixed_div, fixed_mul, point_to_dist,
};
use crate::renderer::{ColumnKind, Renderer, WallColumn};
use crate::world::{LinedefFlags, NO_TEXTURE, SegmentId, TextureId};

/// Wall heights are stepped in 20.12 to keep precision at small scales.
const HEIGHTBITS: i32 = 12;
const HEIGHTUNIT: i32 = 1 << HEIGHTBITS;

const MIN_SCALE: Fixed = 256;
const MAX_SCALE: Fixed = 64 * FRACUNIT;

/// A wall texture and the texture row at eye level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct WallTexture {
    pub id: TextureId,
    pub mid: Fixed,
}

impl WallTexture {
    fn new(id: TextureId, mid: Fixed) -> Option<Self> {
        (id != NO_TEXTURE).then_some(Self { id, mid })
    }
}

/// Stepping state of one wall range.
#[derive(Clone, Debug, Default)]
struct SegLoop {
    start: i32,
    stop: i32,

    scale: Fixed,
    scalestep: Fixed,
    /// Screen rows (20.12) of the front sector's ceiling and floor.
    topfrac: Fixed,
    topstep: Fixed,
    bottomfrac: Fixed,
    bottomstep: Fixed,
    /// Screen rows (20.12) of the back sector's ceiling and floor.
    pixhigh: Fixed,
    pixhighstep: Fixed,
    pixlow: Fixed,
    pixlowstep: Fixed,

    mid: Option<WallTexture>,
    top: Option<WallTexture>,
    bottom: Option<WallTexture>,
    masked: Option<(OpeningHandle, TextureId)>,

    markfloor: bool,
    markceiling: bool,

    textured: bool,
    offset: Fixed,
    centerangle: Angle,
    distance: Fixed,
    light_row: usize,
}

impl<R: Renderer + ?Sized> Frame<'_, R> {
    /// Projected scale of the wall point seen at `visangle`.
    pub(crate) fn scale_from_global_angle(
        &self,
        visangle: Angle,
        normal: Angle,
        distance: Fixed,
    ) -> Fixed {
        let anglea = ANG90.wrapping_add(visangle.wrapping_sub(self.view.angle));
        let angleb = ANG90.wrapping_add(visangle.wrapping_sub(normal));
        let sinea = finesine(fine(anglea));
        let sineb = finesine(fine(angleb));
        let num = fixed_mul(self.proj.projection, sineb);
        let den = fixed_mul(distance, sinea);

        if den > num >> FRACBITS {
            fixed_div(num, den).clamp(MIN_SCALE, MAX_SCALE)
        } else {
            MAX_SCALE
        }
    }

    /// Draw columns `start..=stop` of `seg_id`, whose first vertex lies at
    /// `rw_angle1` from the viewpoint, and record the drawseg.
    pub(crate) fn store_wall_range(
        &mut self,
        seg_id: SegmentId,
        rw_angle1: Angle,
        start: i32,
        stop: i32,
    ) -> Result<(), FrameAbort> {
        debug_assert!(
            0 <= start && start <= stop && stop < self.proj.width as i32,
            "bad wall range {start}..={stop}"
        );
        self.st.stats.wall_ranges += 1;

        if self.st.drawsegs.is_full() {
            self.st.drawsegs.drop_one();
            let limit = self.st.drawsegs.limit();
            let o = Overflow::Drawsegs { limit };
            if self.st.stats.overflow(o) {
                warn!("{o}");
            }
            return Ok(());
        }

        let level = self.level;
        let view = self.view;
        let seg = &level.segs[seg_id as usize];
        let side = &level.sidedefs[seg.sidedef as usize];
        let line = &level.linedefs[seg.linedef as usize];
        let fs = &level.sectors[seg.front as usize];
        let front = self.sector_planes(seg.front);
        let v1 = level.vertex(seg.v1);
        let tex_height = |id: TextureId| level.textures.meta(id).height_fixed();

        // perpendicular distance from the view to the wall
        let normal = seg.angle.wrapping_add(ANG90);
        let offsetangle = (normal.wrapping_sub(rw_angle1) as i32).unsigned_abs().min(ANG90);
        let hyp = point_to_dist(v1.x.wrapping_sub(view.x), v1.y.wrapping_sub(view.y));
        let distance = fixed_mul(hyp, finesine(fine(ANG90 - offsetangle)));

        let mut ds = DrawSeg::new(seg_id, start, stop);
        let xangle = |x: i32| view.angle.wrapping_add(self.proj.xtoviewangle[x as usize]);
        ds.scale1 = self.scale_from_global_angle(xangle(start), normal, distance);
        if stop > start {
            ds.scale2 = self.scale_from_global_angle(xangle(stop), normal, distance);
            ds.scalestep = (ds.scale2 - ds.scale1) / (stop - start);
        } else {
            ds.scale2 = ds.scale1;
        }

        let mut worldtop = front.ceil_h.wrapping_sub(view.z);
        let mut worldbottom = front.floor_h.wrapping_sub(view.z);
        let mut worldhigh = 0;
        let mut worldlow = 0;

        let mut lp = SegLoop {
            start,
            stop,
            ..SegLoop::default()
        };
        let mut masked_tex = None;

        match seg.back {
            None => {
                let mid = if line.flags.contains(LinedefFlags::LOWER_UNPEGGED) {
                    front.floor_h + tex_height(side.middle) - view.z
                } else {
                    worldtop
                };
                lp.mid = WallTexture::new(side.middle, mid.wrapping_add(side.y_off));
                lp.markfloor = true;
                lp.markceiling = true;

                ds.silhouette = Silhouette::BOTH;
                ds.top_clip = SpriteClip::Closed;
                ds.bottom_clip = SpriteClip::Closed;
                ds.bsilheight = Fixed::MAX;
                ds.tsilheight = Fixed::MIN;
            }
            Some(back_id) => {
                let bs = &level.sectors[back_id as usize];
                let back = self.sector_planes(back_id);

                if front.floor_h > back.floor_h {
                    ds.silhouette = Silhouette::BOTTOM;
                    ds.bsilheight = front.floor_h;
                } else if back.floor_h > view.z {
                    ds.silhouette = Silhouette::BOTTOM;
                    ds.bsilheight = Fixed::MAX;
                }
                if front.ceil_h < back.ceil_h {
                    ds.silhouette |= Silhouette::TOP;
                    ds.tsilheight = front.ceil_h;
                } else if back.ceil_h < view.z {
                    ds.silhouette |= Silhouette::TOP;
                    ds.tsilheight = Fixed::MIN;
                }

                let closed = back.ceil_h <= front.floor_h || back.floor_h >= front.ceil_h;
                if back.ceil_h <= front.floor_h {
                    ds.bottom_clip = SpriteClip::Closed;
                    ds.bsilheight = Fixed::MAX;
                    ds.silhouette |= Silhouette::BOTTOM;
                }
                if back.floor_h >= front.ceil_h {
                    ds.top_clip = SpriteClip::Closed;
                    ds.tsilheight = Fixed::MIN;
                    ds.silhouette |= Silhouette::TOP;
                }

                worldhigh = back.ceil_h.wrapping_sub(view.z);
                worldlow = back.floor_h.wrapping_sub(view.z);

                // sky above both sides: no upper wall in between
                if level.is_sky(fs.ceil_pic) && level.is_sky(bs.ceil_pic) {
                    worldtop = worldhigh;
                }

                lp.markfloor =
                    worldlow != worldbottom || bs.floor_pic != fs.floor_pic || bs.light != fs.light;
                lp.markceiling =
                    worldhigh != worldtop || bs.ceil_pic != fs.ceil_pic || bs.light != fs.light;
                if closed {
                    lp.markceiling = true;
                    lp.markfloor = true;
                }

                if worldhigh < worldtop {
                    let mid = if line.flags.contains(LinedefFlags::UPPER_UNPEGGED) {
                        worldtop
                    } else {
                        back.ceil_h + tex_height(side.upper) - view.z
                    };
                    lp.top = WallTexture::new(side.upper, mid.wrapping_add(side.y_off));
                }
                if worldlow > worldbottom {
                    let mid = if line.flags.contains(LinedefFlags::LOWER_UNPEGGED) {
                        worldtop
                    } else {
                        worldlow
                    };
                    lp.bottom = WallTexture::new(side.lower, mid.wrapping_add(side.y_off));
                }

                if side.middle != NO_TEXTURE {
                    masked_tex = Some(side.middle);
                    let len = (stop - start + 1) as usize;
                    match self.st.openings.reserve(start, len) {
                        Some(h) => {
                            lp.masked = Some((h, side.middle));
                            ds.masked = Some(h);
                        }
                        None => self.refuse_openings(),
                    }
                }
            }
        }

        lp.textured =
            lp.mid.is_some() || lp.top.is_some() || lp.bottom.is_some() || masked_tex.is_some();
        if lp.textured {
            let rel = normal.wrapping_sub(rw_angle1);
            let folded = if rel > ANG180 { rel.wrapping_neg() } else { rel }.min(ANG90);
            let mut offset = fixed_mul(hyp, finesine(fine(folded)));
            if rel < ANG180 {
                offset = -offset;
            }
            lp.offset = offset.wrapping_add(side.x_off).wrapping_add(seg.offset);
            lp.centerangle = ANG90.wrapping_add(view.angle).wrapping_sub(normal);
            lp.distance = distance;

            // axis-aligned walls get a touch of fake contrast
            let v2 = level.vertex(seg.v2);
            let contrast = if v1.y == v2.y {
                -1
            } else if v1.x == v2.x {
                1
            } else {
                0
            };
            lp.light_row = Projection::light_row(fs.light, view.extralight, contrast);
        }

        // planes the eye is level with or on the wrong side of
        if front.floor_h >= view.z {
            lp.markfloor = false;
        }
        if front.ceil_h <= view.z && !level.is_sky(fs.ceil_pic) {
            lp.markceiling = false;
        }

        let centery = self.proj.centeryfrac >> 4;
        worldtop >>= 4;
        worldbottom >>= 4;
        lp.scale = ds.scale1;
        lp.scalestep = ds.scalestep;
        lp.topstep = fixed_mul(ds.scalestep, worldtop).wrapping_neg();
        lp.topfrac = centery.wrapping_sub(fixed_mul(worldtop, ds.scale1));
        lp.bottomstep = fixed_mul(ds.scalestep, worldbottom).wrapping_neg();
        lp.bottomfrac = centery.wrapping_sub(fixed_mul(worldbottom, ds.scale1));

        if seg.back.is_some() {
            worldhigh >>= 4;
            worldlow >>= 4;
            if worldhigh < worldtop {
                lp.pixhigh = centery.wrapping_sub(fixed_mul(worldhigh, ds.scale1));
                lp.pixhighstep = fixed_mul(ds.scalestep, worldhigh).wrapping_neg();
            }
            if worldlow > worldbottom {
                lp.pixlow = centery.wrapping_sub(fixed_mul(worldlow, ds.scale1));
                lp.pixlowstep = fixed_mul(ds.scalestep, worldlow).wrapping_neg();
            }
        }

        if lp.markceiling {
            if let Some(id) = self.ceilingplane {
                self.ceilingplane = Some(self.st.planes.check(id, start, stop, seg_id)?);
            }
        }
        if lp.markfloor {
            if let Some(id) = self.floorplane {
                self.floorplane = Some(self.st.planes.check(id, start, stop, seg_id)?);
            }
        }

        self.render_seg_loop(&mut lp);

        // keep the clip bands this wall leaves behind for masked drawing
        let is_masked = masked_tex.is_some();
        if (ds.silhouette.contains(Silhouette::TOP) || is_masked) && ds.top_clip.is_open() {
            ds.top_clip = self.save_clip(start, stop, true);
        }
        if (ds.silhouette.contains(Silhouette::BOTTOM) || is_masked) && ds.bottom_clip.is_open() {
            ds.bottom_clip = self.save_clip(start, stop, false);
        }
        if ds.masked.is_some() {
            if !ds.silhouette.contains(Silhouette::TOP) {
                ds.silhouette |= Silhouette::TOP;
                ds.tsilheight = Fixed::MIN;
            }
            if !ds.silhouette.contains(Silhouette::BOTTOM) {
                ds.silhouette |= Silhouette::BOTTOM;
                ds.bsilheight = Fixed::MAX;
            }
        }

        self.st.drawsegs.push(ds);
        Ok(())
    }

    fn refuse_openings(&mut self) {
        self.st.stats.openings_refused += 1;
        let o = Overflow::Openings {
            limit: self.st.openings.limit(),
        };
        if self.st.stats.overflow(o) {
            warn!("{o}");
        }
    }

    /// Copy the current ceiling (`ceil`) or floor clip of `start..=stop`
    /// into the opening arena.
    fn save_clip(&mut self, start: i32, stop: i32, ceil: bool) -> SpriteClip {
        let st = &mut *self.st;
        let Some(h) = st.openings.reserve(start, (stop - start + 1) as usize) else {
            self.refuse_openings();
            return SpriteClip::Open;
        };
        let band = if ceil { &st.clip.ceil } else { &st.clip.floor };
        st.openings
            .slice_mut(h)
            .copy_from_slice(&band[start as usize..=stop as usize]);
        SpriteClip::Columns(h)
    }

    fn render_seg_loop(&mut self, lp: &mut SegLoop) {
        let Frame {
            proj,
            level,
            view,
            st,
            out,
            floorplane,
            ceilingplane,
            ..
        } = self;
        let FrameState {
            clip,
            planes,
            openings,
            stats,
            ..
        } = &mut **st;
        let viewheight = proj.height as i32;
        let band = |v: i32| v.clamp(-1, viewheight) as i16;

        for x in lp.start..=lp.stop {
            let xi = x as usize;
            let ceil = clip.ceil[xi] as i32;
            let floor = clip.floor[xi] as i32;

            let yl = (lp.topfrac.wrapping_add(HEIGHTUNIT - 1) >> HEIGHTBITS).max(ceil + 1);
            if let Some(id) = ceilingplane.filter(|_| lp.markceiling) {
                let top = ceil + 1;
                let bottom = (yl - 1).min(floor - 1);
                if top <= bottom {
                    planes.get_mut(id).set(x, top, bottom);
                }
            }

            let yh = (lp.bottomfrac >> HEIGHTBITS).min(floor - 1);
            if let Some(id) = floorplane.filter(|_| lp.markfloor) {
                let top = (yh + 1).max(ceil + 1);
                let bottom = floor - 1;
                if top <= bottom {
                    planes.get_mut(id).set(x, top, bottom);
                }
            }

            let (mut texcol, mut shade, mut iscale) = (0, 0, 0);
            if lp.textured {
                let angle = fine(lp.centerangle.wrapping_add(proj.xtoviewangle[xi]))
                    .min(FINEANGLES / 2 - 1);
                texcol =
                    lp.offset.wrapping_sub(fixed_mul(finetangent(angle), lp.distance)) >> FRACBITS;
                shade = view
                    .fixed_colormap
                    .unwrap_or_else(|| proj.wall_shade(lp.light_row, lp.scale));
                iscale = (u32::MAX / lp.scale.max(1) as u32) as Fixed;
            }

            let mut emit = |tex: WallTexture, yl: i32, yh: i32| {
                out.draw_column(&WallColumn {
                    x,
                    yl,
                    yh,
                    texture: tex.id,
                    column: level.textures.meta(tex.id).wrap_column(texcol),
                    texturemid: tex.mid,
                    iscale,
                    shade,
                    kind: ColumnKind::Wall,
                });
                stats.wall_columns += 1;
            };

            if let Some(mid) = lp.mid {
                if yl <= yh {
                    emit(mid, yl, yh);
                }
                clip.ceil[xi] = viewheight as i16;
                clip.floor[xi] = -1;
            } else {
                let mut ceil_now = ceil;
                if let Some(top) = lp.top {
                    let mid = (lp.pixhigh >> HEIGHTBITS).min(floor - 1);
                    lp.pixhigh = lp.pixhigh.wrapping_add(lp.pixhighstep);
                    if mid >= yl {
                        emit(top, yl, mid);
                        ceil_now = mid;
                    } else {
                        ceil_now = yl - 1;
                    }
                    clip.ceil[xi] = band(ceil_now);
                } else if lp.markceiling {
                    ceil_now = yl - 1;
                    clip.ceil[xi] = band(ceil_now);
                }

                if let Some(bottom) = lp.bottom {
                    let mid = (lp.pixlow.wrapping_add(HEIGHTUNIT - 1) >> HEIGHTBITS)
                        .max(ceil_now + 1);
                    lp.pixlow = lp.pixlow.wrapping_add(lp.pixlowstep);
                    if mid <= yh {
                        emit(bottom, mid, yh);
                        clip.floor[xi] = band(mid);
                    } else {
                        clip.floor[xi] = band(yh + 1);
                    }
                } else if lp.markfloor {
                    clip.floor[xi] = band(yh + 1);
                }

                if let Some((h, tex)) = lp.masked {
                    openings.set(h, x, level.textures.meta(tex).wrap_column(texcol) as i16);
                }
            }

            lp.scale = lp.scale.wrapping_add(lp.scalestep);
            lp.topfrac = lp.topfrac.wrapping_add(lp.topstep);
            lp.bottomfrac = lp.bottomfrac.wrapping_add(lp.bottomstep);
        }
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
    use crate::renderer::Recorder;
    use crate::world::{Level, View, scenes};

    fn engine() -> Engine {
        Engine::new(RenderConfig::new(320, 200, RenderLimits::vanilla()).unwrap()).unwrap()
    }

    fn view(x: i32, y: i32, angle: Angle) -> View {
        View {
            x: x * FRACUNIT,
            y: y * FRACUNIT,
            z: scenes::EYE_HEIGHT * FRACUNIT,
            angle,
            extralight: 0,
            fixed_colormap: None,
        }
    }

    fn portal(level: &Level) -> SegmentId {
        level.segs.iter().position(|s| s.back.is_some()).unwrap() as SegmentId
    }

    #[test]
    fn facing_wall_scale_is_projection_over_distance() {
        let level = scenes::single_room();
        let mut eng = engine();
        let mut rec = Recorder::default();
        let v = view(0, 0, 0);
        let frame = eng.begin(&level, &v, None, &mut rec);

        // projection is 160 columns: a wall 160 units away is drawn 1:1
        let s = frame.scale_from_global_angle(0, 0, 160 * FRACUNIT);
        assert!((s - FRACUNIT).abs() < 64, "scale {s}");
        assert_eq!(frame.scale_from_global_angle(0, 0, FRACUNIT / 4), MAX_SCALE);
        let far = frame.scale_from_global_angle(0, 0, 20_000 * FRACUNIT);
        assert!((MIN_SCALE..2 * MIN_SCALE + 64).contains(&far), "scale {far}");
    }

    #[test]
    fn one_sided_wall_closes_both_edges() {
        let level = scenes::single_room();
        let mut eng = engine();
        let mut rec = Recorder::default();
        {
            let v = view(128, 128, 0);
            let mut frame = eng.begin(&level, &v, None, &mut rec);
            frame.render_subsector(0).unwrap();
            let clip = &frame.st.clip;
            assert!(clip.ceil.iter().all(|&c| c == 200));
            assert!(clip.floor.iter().all(|&f| f == -1));
        }
        for ds in eng.drawsegs().iter() {
            assert_eq!(ds.silhouette, Silhouette::BOTH);
            assert_eq!(ds.top_clip, SpriteClip::Closed);
            assert_eq!(ds.bottom_clip, SpriteClip::Closed);
            assert_eq!((ds.bsilheight, ds.tsilheight), (Fixed::MAX, Fixed::MIN));
            assert!(ds.masked.is_none());
        }
        // ceiling 128, eye 41
        assert!(rec.columns.iter().all(|c| c.texturemid == 87 * FRACUNIT));
        assert!(rec.columns.iter().all(|c| c.yl <= 100 && c.yh >= 100));
    }

    #[test]
    fn lower_unpegged_hangs_the_texture_from_the_floor() {
        let mut level = scenes::single_room();
        level.sectors[0].floor_h = 16 * FRACUNIT;
        for ld in &mut level.linedefs {
            ld.flags |= LinedefFlags::LOWER_UNPEGGED;
        }
        for sd in &mut level.sidedefs {
            sd.y_off = 4 * FRACUNIT;
        }
        let mut eng = engine();
        let mut rec = Recorder::default();
        eng.render_frame(&level, &view(128, 128, 0), None, &mut rec);
        // floor 16 + texture 128 - eye 41 + row offset 4
        assert!(!rec.columns.is_empty());
        assert!(rec.columns.iter().all(|c| c.texturemid == 107 * FRACUNIT));
    }

    #[test]
    fn window_upper_and_lower_peg_to_the_back_sector() {
        let level = scenes::window_room();
        let wall = level.textures.id("STARTAN3").unwrap();
        let step = level.textures.id("STEP6").unwrap();
        let mut eng = engine();
        let mut rec = Recorder::default();
        {
            let v = view(64, 128, 0);
            let mut frame = eng.begin(&level, &v, None, &mut rec);
            frame.render_subsector_planes(0).unwrap();
            frame.add_line(portal(&level)).unwrap();
        }
        // back ceiling 96 + texture 128 - eye 41
        let upper: Vec<_> = rec.columns.iter().filter(|c| c.texture == wall).collect();
        assert!(!upper.is_empty());
        assert!(upper.iter().all(|c| c.texturemid == 183 * FRACUNIT));
        // back floor 24 - eye 41
        let lower: Vec<_> = rec.columns.iter().filter(|c| c.texture == step).collect();
        assert!(!lower.is_empty());
        assert!(lower.iter().all(|c| c.texturemid == -17 * FRACUNIT));

        // the far room sits inside the near one's height range: nothing to
        // hide sprites behind
        let ds = eng.drawsegs().get(0);
        assert_eq!(ds.silhouette, Silhouette::NONE);
        assert!(ds.top_clip.is_open() && ds.bottom_clip.is_open());
        assert_eq!(eng.openings().used(), 0);
    }

    #[test]
    fn sky_on_both_sides_hides_the_upper_wall() {
        let mut level = scenes::window_room();
        let sky = level.sky_flat.unwrap();
        for s in &mut level.sectors {
            s.ceil_pic = sky;
        }
        let wall = level.textures.id("STARTAN3").unwrap();
        let mut eng = engine();
        let mut rec = Recorder::default();
        {
            let v = view(64, 128, 0);
            let mut frame = eng.begin(&level, &v, None, &mut rec);
            frame.render_subsector_planes(0).unwrap();
            frame.add_line(portal(&level)).unwrap();
        }
        assert!(rec.columns.iter().all(|c| c.texture != wall));
        assert!(!rec.columns.is_empty(), "lower wall still drawn");
    }

    #[test]
    fn full_drawseg_pool_drops_ranges() {
        let level = scenes::single_room();
        let mut eng = Engine::new(
            RenderConfig::new(
                320,
                200,
                RenderLimits {
                    max_drawsegs: 1,
                    ..RenderLimits::vanilla()
                },
            )
            .unwrap(),
        )
        .unwrap();
        let mut rec = Recorder::default();
        let v = view(128, 128, 0);
        let mut frame = eng.begin(&level, &v, None, &mut rec);
        frame.store_wall_range(1, 0, 0, 10).unwrap();
        frame.store_wall_range(1, 0, 11, 20).unwrap();
        frame.store_wall_range(1, 0, 21, 30).unwrap();
        assert_eq!(frame.st.drawsegs.len(), 1);
        assert_eq!(frame.st.drawsegs.dropped(), 2);
        assert_eq!(frame.st.stats.wall_ranges, 3);
        assert_eq!(frame.st.stats.overflows, vec![Overflow::Drawsegs { limit: 1 }]);
    }
}
