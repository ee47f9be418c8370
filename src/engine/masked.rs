//! See-through mid textures, drawn after the planes from the farthest
//! drawseg to the nearest.

use crate::engine::drawsegs::DrawSeg;
use crate::engine::engine::Frame;
use crate::engine::projection::Projection;
use crate::fixed::{FRACBITS, FRACUNIT, Fixed, fixed_mul};
use crate::renderer::{ColumnKind, Renderer, WallColumn};
use crate::world::LinedefFlags;

/// Cell value of a masked column already drawn.
pub const MASKED_DONE: i16 = i16::MAX;

impl<R: Renderer + ?Sized> Frame<'_, R> {
    pub(crate) fn draw_masked(&mut self) {
        for i in (0..self.st.drawsegs.len()).rev() {
            let ds = self.st.drawsegs.get(i);
            if ds.masked.is_some() {
                let ds = ds.clone();
                self.render_masked_seg_range(&ds, ds.x1, ds.x2);
            }
        }
    }

    /// Draw the masked columns of `ds` within `x1..=x2` that are still
    /// pending, clipped to the bands the wall saved.
    pub(crate) fn render_masked_seg_range(&mut self, ds: &DrawSeg, x1: i32, x2: i32) {
        let Some(cols) = ds.masked else {
            return;
        };
        let level = self.level;
        let view = self.view;
        let seg = &level.segs[ds.seg as usize];
        let side = &level.sidedefs[seg.sidedef as usize];
        let line = &level.linedefs[seg.linedef as usize];
        let fs = &level.sectors[seg.front as usize];
        let tex = side.middle;
        let meta = level.textures.meta(tex);

        let v1 = level.vertex(seg.v1);
        let v2 = level.vertex(seg.v2);
        let contrast = if v1.y == v2.y {
            -1
        } else if v1.x == v2.x {
            1
        } else {
            0
        };
        let row = Projection::light_row(fs.light, view.extralight, contrast);

        let front = self.sector_planes(seg.front);
        let back = seg.back.map_or(front, |b| self.sector_planes(b));
        let texturemid = if line.flags.contains(LinedefFlags::LOWER_UNPEGGED) {
            front.floor_h.max(back.floor_h) + meta.height_fixed() - view.z
        } else {
            front.ceil_h.min(back.ceil_h) - view.z
        }
        .wrapping_add(side.y_off);

        let proj = self.proj;
        let viewheight = proj.height as i32;
        let st = &mut *self.st;
        let texheight = meta.height_fixed() as i64;

        let mut spryscale = ds.scale1.wrapping_add((x1 - ds.x1).wrapping_mul(ds.scalestep));
        for x in x1..=x2 {
            let col = st.openings.get(cols, x);
            if col != MASKED_DONE {
                let top = proj.centeryfrac as i64 - fixed_mul(texturemid, spryscale) as i64;
                let bottom = top + ((spryscale as i64 * texheight) >> FRACBITS);
                let mut yl = ((top + FRACUNIT as i64 - 1) >> FRACBITS) as i32;
                let mut yh = ((bottom - 1) >> FRACBITS) as i32;
                yl = yl.max(ds.top_clip.top_at(&st.openings, x, viewheight) + 1);
                yh = yh.min(ds.bottom_clip.bottom_at(&st.openings, x, viewheight) - 1);

                if yl <= yh {
                    let shade = view
                        .fixed_colormap
                        .unwrap_or_else(|| proj.wall_shade(row, spryscale));
                    self.out.draw_column(&WallColumn {
                        x,
                        yl,
                        yh,
                        texture: tex,
                        column: col as u16,
                        texturemid,
                        iscale: (u32::MAX / spryscale.max(1) as u32) as Fixed,
                        shade,
                        kind: ColumnKind::Masked,
                    });
                    st.stats.masked_columns += 1;
                }
                st.openings.set(cols, x, MASKED_DONE);
            }
            spryscale = spryscale.wrapping_add(ds.scalestep);
        }
    }
}
