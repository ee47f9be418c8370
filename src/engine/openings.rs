//! Per-frame bump arena of `i16` column arrays ("openings"): sprite clip
//! bounds and masked texture columns.
//!
//! Arrays are handed out as [`OpeningHandle`]s, offsets rather than
//! pointers, so growing the backing vector never invalidates them.

use log::debug;

/// One reserved array, addressed by screen column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpeningHandle {
    offset: u32,
    len: u32,
    /// Screen column of the first cell.
    x1: i32,
}

impl OpeningHandle {
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn x1(&self) -> i32 {
        self.x1
    }

    #[inline]
    pub fn x2(&self) -> i32 {
        self.x1 + self.len as i32 - 1
    }

    #[inline]
    pub fn covers(&self, x: i32) -> bool {
        x >= self.x1 && x <= self.x2()
    }

    #[inline]
    fn index(&self, x: i32) -> usize {
        debug_assert!(self.covers(x), "column {x} outside {}..={}", self.x1, self.x2());
        self.offset as usize + (x - self.x1) as usize
    }
}

#[derive(Debug)]
pub struct Openings {
    cells: Vec<i16>,
    cursor: usize,
    max_cells: usize,
    growths: usize,
}

impl Openings {
    pub fn new(max_cells: usize) -> Self {
        Self {
            cells: Vec::new(),
            cursor: 0,
            max_cells,
            growths: 0,
        }
    }

    /// Forget every array; the storage is kept for the next frame.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.growths = 0;
    }

    pub fn set_limit(&mut self, max_cells: usize) {
        self.max_cells = max_cells;
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.max_cells
    }

    /// Reserve `len` cells for columns `x1..x1 + len`.  `None` once the
    /// frame would exceed the configured cell limit.
    pub fn reserve(&mut self, x1: i32, len: usize) -> Option<OpeningHandle> {
        let end = self.cursor + len;
        if end > self.max_cells {
            return None;
        }
        if end > self.cells.len() {
            let new_len = end.next_power_of_two().min(self.max_cells);
            debug!("openings: growing {} -> {new_len} cells", self.cells.len());
            self.cells.resize(new_len, 0);
            self.growths += 1;
        }
        let handle = OpeningHandle {
            offset: self.cursor as u32,
            len: len as u32,
            x1,
        };
        self.cursor = end;
        Some(handle)
    }

    #[inline]
    pub fn get(&self, h: OpeningHandle, x: i32) -> i16 {
        self.cells[h.index(x)]
    }

    #[inline]
    pub fn set(&mut self, h: OpeningHandle, x: i32, v: i16) {
        let i = h.index(x);
        self.cells[i] = v;
    }

    #[inline]
    pub fn slice(&self, h: OpeningHandle) -> &[i16] {
        &self.cells[h.offset as usize..h.offset as usize + h.len()]
    }

    #[inline]
    pub fn slice_mut(&mut self, h: OpeningHandle) -> &mut [i16] {
        let start = h.offset as usize;
        &mut self.cells[start..start + h.len()]
    }

    /// Cells handed out this frame.
    #[inline]
    pub fn used(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Times the backing storage grew this frame.
    #[inline]
    pub fn growths(&self) -> usize {
        self.growths
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn handles_address_by_screen_column() {
        let mut o = Openings::new(1024);
        let a = o.reserve(10, 5).unwrap();
        let b = o.reserve(100, 3).unwrap();
        o.set(a, 14, 7);
        o.set(b, 100, -1);
        assert_eq!(o.get(a, 14), 7);
        assert_eq!(o.get(b, 100), -1);
        assert_eq!(o.slice(a), &[0, 0, 0, 0, 7]);
        assert_eq!(o.used(), 8);
        assert!(a.covers(10) && a.covers(14) && !a.covers(15));
    }

    #[test]
    fn limit_refuses_without_growing_past_it() {
        let mut o = Openings::new(100);
        assert!(o.reserve(0, 64).is_some());
        assert!(o.reserve(0, 36).is_some());
        assert_eq!(o.capacity(), 100);
        assert!(o.reserve(0, 1).is_none());
        assert_eq!(o.used(), 100);

        o.reset();
        assert_eq!(o.used(), 0);
        assert!(o.reserve(0, 1).is_some());
        // storage survives the reset
        assert_eq!(o.growths(), 0);
    }

    proptest! {
        #[test]
        fn growth_keeps_earlier_arrays_intact(lens in prop::collection::vec(1usize..200, 1..40)) {
            let mut o = Openings::new(1 << 20);
            let mut written = Vec::new();
            for (n, len) in lens.into_iter().enumerate() {
                let x1 = (n as i32 * 7) % 300;
                let h = o.reserve(x1, len).unwrap();
                for (i, cell) in o.slice_mut(h).iter_mut().enumerate() {
                    *cell = (n * 31 + i) as i16;
                }
                written.push((h, n));
                // everything written before any growth still reads back
                for &(h, n) in &written {
                    for x in h.x1()..=h.x2() {
                        prop_assert_eq!(o.get(h, x), (n * 31 + (x - h.x1()) as usize) as i16);
                    }
                }
            }
            prop_assert!(o.growths() >= 1);
            prop_assert!(o.capacity() >= o.used());
        }
    }
}
