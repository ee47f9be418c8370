//! Solid-span clipper: the sorted list of screen-column ranges already
//! hidden behind nearer one-sided (or closed) walls this frame.

use smallvec::SmallVec;

/// Inclusive range of screen columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipRange {
    pub first: i32,
    pub last: i32,
}

impl ClipRange {
    #[inline]
    pub fn new(first: i32, last: i32) -> Self {
        Self { first, last }
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.last - self.first + 1).max(0) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }
}

/// Visible pieces of one clipped wall, left to right.
pub type Fragments = SmallVec<[ClipRange; 4]>;

#[derive(Clone, Debug)]
pub struct SolidSegs {
    ranges: Vec<ClipRange>,
}

impl SolidSegs {
    pub fn new(width: usize) -> Self {
        let mut segs = Self {
            ranges: Vec::with_capacity(64),
        };
        segs.clear(width);
        segs
    }

    /// Reset to the two sentinels that bracket the view, so the scans
    /// below never run off either end.
    pub fn clear(&mut self, width: usize) {
        self.ranges.clear();
        self.ranges.push(ClipRange::new(i32::MIN + 1, -1));
        self.ranges.push(ClipRange::new(width as i32, i32::MAX));
    }

    #[inline]
    pub fn ranges(&self) -> &[ClipRange] {
        &self.ranges
    }

    /// True once a single range spans the whole view.
    pub fn is_full(&self) -> bool {
        self.ranges.len() == 1
    }

    /// Index of the first range ending at or after `x`.
    #[inline]
    fn first_reaching(&self, x: i32) -> usize {
        self.ranges.partition_point(|r| r.last < x)
    }

    /// Clip `[first, last]` against the list, return the still-visible
    /// pieces, and mark the whole range as occluded.
    pub fn clip_solid(&mut self, first: i32, last: i32) -> Fragments {
        debug_assert!(first <= last, "clip_solid({first}, {last})");
        let mut out = Fragments::new();
        let start = self.first_reaching(first - 1);

        if first < self.ranges[start].first {
            if last < self.ranges[start].first - 1 {
                // entirely visible, new range of its own
                out.push(ClipRange::new(first, last));
                self.ranges.insert(start, ClipRange::new(first, last));
                return out;
            }
            // leading fragment, then grow the found range leftwards
            out.push(ClipRange::new(first, self.ranges[start].first - 1));
            self.ranges[start].first = first;
        }

        if last <= self.ranges[start].last {
            return out;
        }

        let mut next = start;
        while last >= self.ranges[next + 1].first - 1 {
            // gap between two existing ranges
            out.push(ClipRange::new(
                self.ranges[next].last + 1,
                self.ranges[next + 1].first - 1,
            ));
            next += 1;
            if last <= self.ranges[next].last {
                self.ranges[start].last = self.ranges[next].last;
                self.ranges.drain(start + 1..=next);
                return out;
            }
        }

        // trailing fragment
        out.push(ClipRange::new(self.ranges[next].last + 1, last));
        self.ranges[start].last = last;
        self.ranges.drain(start + 1..=next);
        out
    }

    /// Same gap search as [`Self::clip_solid`], list left untouched.
    pub fn clip_pass(&self, first: i32, last: i32) -> Fragments {
        debug_assert!(first <= last, "clip_pass({first}, {last})");
        let mut out = Fragments::new();
        let mut start = self.first_reaching(first - 1);

        if first < self.ranges[start].first {
            if last < self.ranges[start].first - 1 {
                out.push(ClipRange::new(first, last));
                return out;
            }
            out.push(ClipRange::new(first, self.ranges[start].first - 1));
        }

        if last <= self.ranges[start].last {
            return out;
        }

        while last >= self.ranges[start + 1].first - 1 {
            out.push(ClipRange::new(
                self.ranges[start].last + 1,
                self.ranges[start + 1].first - 1,
            ));
            start += 1;
            if last <= self.ranges[start].last {
                return out;
            }
        }

        out.push(ClipRange::new(self.ranges[start].last + 1, last));
        out
    }

    /// Whether one existing range already hides all of `[first, last]`.
    pub fn is_covered(&self, first: i32, last: i32) -> bool {
        let r = self.ranges[self.first_reaching(last)];
        first >= r.first && last <= r.last
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
