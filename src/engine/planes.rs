//! Visplanes: floor and ceiling regions sharing height, flat and light,
//! collected per column during traversal and turned into horizontal spans
//! afterwards.

use std::collections::HashMap;

use log::trace;

use crate::config::SCREENHEIGHT;
use crate::engine::engine::{Frame, FrameState};
use crate::engine::projection::Projection;
use crate::engine::stats::FrameAbort;
use crate::fixed::{
    ANG90, ANGLETOFINESHIFT, FRACUNIT, Fixed, fine, finecosine, finesine, fixed_div,
    fixed_mul,
};
use crate::renderer::{ColumnKind, PlaneSpan, Renderer, WallColumn};
use crate::world::{FlatId, SegmentId, SubsectorId};

pub type VisplaneId = u32;

/// `top` value of a column the plane does not cover.
pub const UNUSED: u16 = u16::MAX;

/// Sky columns are indexed by view angle at a quarter of the fine
/// resolution: 1024 columns per full turn.
const ANGLETOSKYSHIFT: u32 = 22;
const SKY_TEXTUREMID: Fixed = (SCREENHEIGHT as Fixed / 2) * FRACUNIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneKey {
    pub height: Fixed,
    pub pic: FlatId,
    pub light: i16,
}

/// Who opened a visplane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneOrigin {
    /// Looked up at the start of a subsector.
    Found { subsector: SubsectorId },
    /// Split off an existing plane by a wall whose columns were taken.
    Checked { seg: SegmentId },
}

#[derive(Clone, Debug)]
pub struct Visplane {
    pub key: PlaneKey,
    /// Inclusive column range; `minx > maxx` while empty.
    pub minx: i32,
    pub maxx: i32,
    /// Indexed by `x + 1`: one padding slot on each side for the span
    /// sweep's sentinels.
    top: Vec<u16>,
    bottom: Vec<u16>,
    pub origin: PlaneOrigin,
    /// A later plane with the same key took over.
    pub superseded: bool,
}

impl Visplane {
    fn new(key: PlaneKey, origin: PlaneOrigin, width: usize) -> Self {
        let mut pl = Self {
            key,
            minx: 0,
            maxx: -1,
            top: Vec::new(),
            bottom: Vec::new(),
            origin,
            superseded: false,
        };
        pl.reinit(key, origin, width);
        pl
    }

    fn reinit(&mut self, key: PlaneKey, origin: PlaneOrigin, width: usize) {
        self.key = key;
        self.origin = origin;
        self.minx = width as i32;
        self.maxx = -1;
        self.superseded = false;
        self.top.clear();
        self.top.resize(width + 2, UNUSED);
        self.bottom.clear();
        self.bottom.resize(width + 2, 0);
    }

    #[inline]
    pub fn top(&self, x: i32) -> u16 {
        self.top[(x + 1) as usize]
    }

    #[inline]
    pub fn bottom(&self, x: i32) -> u16 {
        self.bottom[(x + 1) as usize]
    }

    #[inline]
    pub fn is_used(&self, x: i32) -> bool {
        self.top(x) != UNUSED
    }

    #[inline]
    pub fn set(&mut self, x: i32, top: i32, bottom: i32) {
        debug_assert!(x >= self.minx && x <= self.maxx, "column {x} outside plane");
        self.top[(x + 1) as usize] = top as u16;
        self.bottom[(x + 1) as usize] = bottom as u16;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.minx > self.maxx
    }
}

/// Fixed-capacity visplane pool for one frame.
#[derive(Debug)]
pub struct Visplanes {
    planes: Vec<Visplane>,
    count: usize,
    /// The one extendable plane per key.
    open: HashMap<PlaneKey, VisplaneId>,
    width: usize,
    limit: usize,
    found: usize,
    extended: usize,
    cloned: usize,
}

impl Visplanes {
    pub fn new(width: usize, limit: usize) -> Self {
        Self {
            planes: Vec::new(),
            count: 0,
            open: HashMap::new(),
            width,
            limit,
            found: 0,
            extended: 0,
            cloned: 0,
        }
    }

    pub fn reset(&mut self, width: usize) {
        if width != self.width {
            // stale column arrays have the wrong length
            self.planes.clear();
            self.width = width;
        }
        self.count = 0;
        self.open.clear();
        self.found = 0;
        self.extended = 0;
        self.cloned = 0;
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    fn alloc(&mut self, key: PlaneKey, origin: PlaneOrigin) -> Result<VisplaneId, FrameAbort> {
        if self.count >= self.limit {
            return Err(FrameAbort::Visplanes { limit: self.limit });
        }
        let id = self.count;
        match self.planes.get_mut(id) {
            Some(pl) => pl.reinit(key, origin, self.width),
            None => self.planes.push(Visplane::new(key, origin, self.width)),
        }
        self.count += 1;
        Ok(id as VisplaneId)
    }

    /// The open plane for `key`, or a fresh empty one.
    pub fn find(&mut self, key: PlaneKey, origin: PlaneOrigin) -> Result<VisplaneId, FrameAbort> {
        if let Some(&id) = self.open.get(&key) {
            return Ok(id);
        }
        let id = self.alloc(key, origin)?;
        self.open.insert(key, id);
        self.found += 1;
        trace!("visplane {id} opened for {key:?}");
        Ok(id)
    }

    /// Make `id` cover `start..=stop`.  Widens the plane when none of the
    /// overlapping columns are in use yet; otherwise opens a new plane with
    /// the same key for exactly that range and retires the old one.
    ///
    /// A retired `id` stands for the plane that replaced it.
    pub fn check(
        &mut self,
        id: VisplaneId,
        start: i32,
        stop: i32,
        seg: SegmentId,
    ) -> Result<VisplaneId, FrameAbort> {
        let retired = &self.planes[id as usize];
        let id = if retired.superseded {
            self.open.get(&retired.key).copied().unwrap_or(id)
        } else {
            id
        };
        let pl = &mut self.planes[id as usize];
        let (intrl, unionl) = if start < pl.minx {
            (pl.minx, start)
        } else {
            (start, pl.minx)
        };
        let (intrh, unionh) = if stop > pl.maxx {
            (pl.maxx, stop)
        } else {
            (stop, pl.maxx)
        };

        if (intrl..=intrh).all(|x| !pl.is_used(x)) {
            pl.minx = unionl;
            pl.maxx = unionh;
            self.extended += 1;
            return Ok(id);
        }

        let key = pl.key;
        let new = self.alloc(key, PlaneOrigin::Checked { seg })?;
        self.planes[id as usize].superseded = true;
        let pl = &mut self.planes[new as usize];
        pl.minx = start;
        pl.maxx = stop;
        self.open.insert(key, new);
        self.cloned += 1;
        trace!("visplane {id} split into {new} for {start}..={stop}");
        Ok(new)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn get(&self, id: VisplaneId) -> &Visplane {
        &self.planes[id as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: VisplaneId) -> &mut Visplane {
        &mut self.planes[id as usize]
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Visplane> + '_ {
        self.planes[..self.count].iter()
    }

    pub fn found(&self) -> usize {
        self.found
    }

    pub fn extended(&self) -> usize {
        self.extended
    }

    pub fn cloned(&self) -> usize {
        self.cloned
    }
}

/*──────────────────────────── span emission ─────────────────────────*/

/// Flat distance and steps cached per scanline while the height is
/// unchanged.
#[derive(Clone, Copy, Debug, Default)]
struct RowCache {
    height: Fixed,
    distance: Fixed,
    xstep: Fixed,
    ystep: Fixed,
}

/// Scanline scratch of the span sweep.
#[derive(Debug, Default)]
pub struct SpanScratch {
    spanstart: Vec<i32>,
    cache: Vec<RowCache>,
}

impl SpanScratch {
    pub fn new(height: usize) -> Self {
        let mut s = Self::default();
        s.reset(height);
        s
    }

    pub fn reset(&mut self, height: usize) {
        self.spanstart.clear();
        self.spanstart.resize(height, 0);
        self.cache.clear();
        self.cache.resize(height, RowCache::default());
    }
}

/// Turn the column extents of columns `x - 1` (`t1..=b1`) and `x`
/// (`t2..=b2`) into spans: rows that end at `x - 1` are emitted through
/// `map(y, x1, x2)`, rows that begin at `x` are remembered in `spanstart`.
pub(crate) fn make_spans(
    x: i32,
    mut t1: i32,
    mut b1: i32,
    mut t2: i32,
    mut b2: i32,
    spanstart: &mut [i32],
    mut map: impl FnMut(i32, i32, i32),
) {
    while t1 < t2 && t1 <= b1 {
        map(t1, spanstart[t1 as usize], x - 1);
        t1 += 1;
    }
    while b1 > b2 && b1 >= t1 {
        map(b1, spanstart[b1 as usize], x - 1);
        b1 -= 1;
    }
    while t2 < t1 && t2 <= b2 {
        spanstart[t2 as usize] = x;
        t2 += 1;
    }
    while b2 > b1 && b2 >= t2 {
        spanstart[b2 as usize] = x;
        b2 -= 1;
    }
}

impl<R: Renderer + ?Sized> Frame<'_, R> {
    /// Emit every visplane collected this frame: sky as columns, the rest
    /// as spans.
    pub(crate) fn draw_planes(&mut self) {
        let Frame {
            proj,
            level,
            view,
            st,
            out,
            ..
        } = self;
        let FrameState {
            planes,
            spans,
            stats,
            ..
        } = &mut **st;

        let a = fine(view.angle.wrapping_sub(ANG90));
        let basexscale = fixed_div(finecosine(a), proj.centerxfrac);
        let baseyscale = -fixed_div(finesine(a), proj.centerxfrac);
        let sky = level.textures.meta(level.sky_texture);

        for id in 0..planes.len() as VisplaneId {
            let pl = planes.get_mut(id);
            if pl.is_empty() {
                continue;
            }

            if level.is_sky(pl.key.pic) {
                for x in pl.minx..=pl.maxx {
                    let (t, b) = (pl.top(x) as i32, pl.bottom(x) as i32);
                    if t > b {
                        continue;
                    }
                    let angle = view.angle.wrapping_add(proj.xtoviewangle[x as usize]);
                    out.draw_column(&WallColumn {
                        x,
                        yl: t,
                        yh: b,
                        texture: level.sky_texture,
                        column: sky.wrap_column((angle >> ANGLETOSKYSHIFT) as i32),
                        texturemid: SKY_TEXTUREMID,
                        iscale: proj.sky_iscale,
                        shade: 0,
                        kind: ColumnKind::Sky,
                    });
                    stats.sky_columns += 1;
                }
                continue;
            }

            let planeheight = pl.key.height.wrapping_sub(view.z).wrapping_abs();
            let row = Projection::light_row(pl.key.light, view.extralight, 0);
            let flat = pl.key.pic;

            // close the sweep on both sides
            let (minx, maxx) = (pl.minx, pl.maxx);
            pl.top[minx as usize] = UNUSED;
            pl.top[(maxx + 2) as usize] = UNUSED;
            let pl = planes.get(id);

            let SpanScratch { spanstart, cache } = &mut *spans;
            let mut map_plane = |y: i32, x1: i32, x2: i32| {
                let c = &mut cache[y as usize];
                if c.height != planeheight {
                    c.height = planeheight;
                    c.distance = fixed_mul(planeheight, proj.yslope[y as usize]);
                    c.xstep = fixed_mul(c.distance, basexscale);
                    c.ystep = fixed_mul(c.distance, baseyscale);
                }
                let length = fixed_mul(c.distance, proj.distscale[x1 as usize]);
                let angle = (view.angle.wrapping_add(proj.xtoviewangle[x1 as usize])
                    >> ANGLETOFINESHIFT) as usize;
                out.draw_span(&PlaneSpan {
                    y,
                    x1,
                    x2,
                    flat,
                    xfrac: view.x.wrapping_add(fixed_mul(finecosine(angle), length)),
                    yfrac: view.y.wrapping_neg().wrapping_sub(fixed_mul(finesine(angle), length)),
                    xstep: c.xstep,
                    ystep: c.ystep,
                    shade: view
                        .fixed_colormap
                        .unwrap_or_else(|| proj.flat_shade(row, c.distance)),
                });
                stats.spans += 1;
            };

            for x in minx..=maxx + 1 {
                make_spans(
                    x,
                    pl.top(x - 1) as i32,
                    pl.bottom(x - 1) as i32,
                    pl.top(x) as i32,
                    pl.bottom(x) as i32,
                    spanstart,
                    &mut map_plane,
                );
            }
        }
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
