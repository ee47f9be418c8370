use bitflags::bitflags;

use crate::engine::openings::{OpeningHandle, Openings};
use crate::fixed::Fixed;
use crate::world::SegmentId;

bitflags! {
    /// Which vertical edges of a wall may still hide sprites behind it.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Silhouette: u8 {
        const NONE   = 0x0000;
        const BOTTOM = 0x0001;
        const TOP    = 0x0002;
        const BOTH   = 0x0003;
    }
}

/// Per-column clip bound a wall leaves behind for sprites and masked
/// textures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpriteClip {
    /// The wall does not clip on this edge.
    #[default]
    Open,
    /// Nothing on this edge is visible past the wall.
    Closed,
    /// Saved clip values, one per column of the wall.
    Columns(OpeningHandle),
}

impl SpriteClip {
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, SpriteClip::Open)
    }

    /// Last row hidden from above at `x` (`-1` = none).
    pub fn top_at(&self, openings: &Openings, x: i32, viewheight: i32) -> i32 {
        match *self {
            SpriteClip::Open => -1,
            SpriteClip::Closed => viewheight,
            SpriteClip::Columns(h) => openings.get(h, x) as i32,
        }
    }

    /// First row hidden from below at `x` (`viewheight` = none).
    pub fn bottom_at(&self, openings: &Openings, x: i32, viewheight: i32) -> i32 {
        match *self {
            SpriteClip::Open => viewheight,
            SpriteClip::Closed => -1,
            SpriteClip::Columns(h) => openings.get(h, x) as i32,
        }
    }
}

/// Wall-draw record, one per visible range of a seg.
#[derive(Clone, Debug)]
pub struct DrawSeg {
    pub seg: SegmentId,
    pub x1: i32,
    pub x2: i32,

    pub scale1: Fixed,
    pub scale2: Fixed,
    pub scalestep: Fixed,

    pub silhouette: Silhouette,
    /// Do not clip sprites above this.
    pub bsilheight: Fixed,
    /// Do not clip sprites below this.
    pub tsilheight: Fixed,

    pub top_clip: SpriteClip,
    pub bottom_clip: SpriteClip,

    /// Texture column per screen column of a see-through mid texture;
    /// `i16::MAX` once drawn.
    pub masked: Option<OpeningHandle>,
}

impl DrawSeg {
    pub fn new(seg: SegmentId, x1: i32, x2: i32) -> Self {
        Self {
            seg,
            x1,
            x2,
            scale1: 0,
            scale2: 0,
            scalestep: 0,
            silhouette: Silhouette::NONE,
            bsilheight: Fixed::MIN,
            tsilheight: Fixed::MAX,
            top_clip: SpriteClip::Open,
            bottom_clip: SpriteClip::Open,
            masked: None,
        }
    }
}

/// Fixed-capacity pool of [`DrawSeg`]s for one frame.
#[derive(Debug)]
pub struct DrawSegs {
    segs: Vec<DrawSeg>,
    limit: usize,
    dropped: usize,
}

impl DrawSegs {
    pub fn new(limit: usize) -> Self {
        Self {
            segs: Vec::with_capacity(limit.min(256)),
            limit,
            dropped: 0,
        }
    }

    pub fn reset(&mut self) {
        self.segs.clear();
        self.dropped = 0;
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.segs.len() >= self.limit
    }

    /// Count a wall range that found the pool full.
    pub fn drop_one(&mut self) {
        self.dropped += 1;
    }

    /// Store `ds`.  Callers check [`is_full`](Self::is_full) first and
    /// count refused ranges with [`drop_one`](Self::drop_one).
    pub fn push(&mut self, ds: DrawSeg) {
        debug_assert!(!self.is_full(), "drawseg pool over its limit");
        self.segs.push(ds);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    #[inline]
    pub fn get(&self, i: usize) -> &DrawSeg {
        &self.segs[i]
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, DrawSeg> {
        self.segs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_drops_past_its_limit() {
        let mut pool = DrawSegs::new(2);
        pool.push(DrawSeg::new(0, 0, 10));
        assert!(!pool.is_full());
        pool.push(DrawSeg::new(1, 11, 20));
        assert!(pool.is_full());
        pool.drop_one();
        assert_eq!((pool.len(), pool.dropped()), (2, 1));

        pool.reset();
        assert!(pool.is_empty());
        assert_eq!(pool.dropped(), 0);
    }

    #[test]
    fn clip_bounds_by_kind() {
        let mut o = Openings::new(64);
        let h = o.reserve(5, 2).unwrap();
        o.set(h, 6, 42);
        assert_eq!(SpriteClip::Open.top_at(&o, 6, 200), -1);
        assert_eq!(SpriteClip::Closed.top_at(&o, 6, 200), 200);
        assert_eq!(SpriteClip::Open.bottom_at(&o, 6, 200), 200);
        assert_eq!(SpriteClip::Closed.bottom_at(&o, 6, 200), -1);
        assert_eq!(SpriteClip::Columns(h).bottom_at(&o, 6, 200), 42);
        assert_eq!(Silhouette::BOTTOM | Silhouette::TOP, Silhouette::BOTH);
    }
}
