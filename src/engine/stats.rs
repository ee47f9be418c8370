//! Per-frame counters and the overflow signals the core reports.

use std::fmt;

/// Pool exhaustion that only degrades the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Overflow {
    #[error("drawseg limit of {limit} reached, further walls skipped")]
    Drawsegs { limit: usize },

    #[error("opening limit of {limit} cells reached, clip arrays skipped")]
    Openings { limit: usize },
}

/// Pool exhaustion that ends the traversal early.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameAbort {
    #[error("no more visplanes: limit of {limit} reached, frame aborted")]
    Visplanes { limit: usize },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameStatus {
    #[default]
    Complete,
    Aborted(FrameAbort),
}

impl FrameStatus {
    #[inline]
    pub fn is_aborted(&self) -> bool {
        matches!(self, FrameStatus::Aborted(_))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub nodes: usize,
    pub subsectors: usize,
    pub bbox_rejects: usize,

    pub clip_solid_calls: usize,
    pub clip_pass_calls: usize,
    /// Visible column ranges handed to the wall setter.
    pub wall_ranges: usize,
    pub drawsegs: usize,
    pub drawsegs_dropped: usize,

    /// New planes opened by the per-subsector lookup.
    pub visplanes_found: usize,
    /// Existing planes widened by a wall.
    pub visplanes_extended: usize,
    /// Planes duplicated because their columns were already in use.
    pub visplanes_cloned: usize,
    pub visplanes: usize,

    pub openings_used: usize,
    pub openings_capacity: usize,
    pub openings_growths: usize,
    pub openings_refused: usize,

    pub wall_columns: usize,
    pub sky_columns: usize,
    pub masked_columns: usize,
    pub spans: usize,

    pub overflows: Vec<Overflow>,
}

impl FrameStats {
    /// Record `o` once per frame; returns `true` the first time.
    pub fn overflow(&mut self, o: Overflow) -> bool {
        if self.overflows.contains(&o) {
            return false;
        }
        self.overflows.push(o);
        true
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes {:>4}  subsectors {:>3}  segs {:>3} (+{} dropped)  planes {:>3} \
             (found {}, extended {}, cloned {})  openings {}/{}  \
             cols {} sky {} masked {}  spans {}",
            self.nodes,
            self.subsectors,
            self.drawsegs,
            self.drawsegs_dropped,
            self.visplanes,
            self.visplanes_found,
            self.visplanes_extended,
            self.visplanes_cloned,
            self.openings_used,
            self.openings_capacity,
            self.wall_columns,
            self.sky_columns,
            self.masked_columns,
            self.spans,
        )
    }
}

/// What [`crate::engine::Engine::render_frame`] hands back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub status: FrameStatus,
    pub stats: FrameStats,
}

impl FrameReport {
    /// Every limit-exceeded message of this frame, abort first.
    pub fn messages(&self) -> Vec<String> {
        let abort = match self.status {
            FrameStatus::Aborted(a) => Some(a.to_string()),
            FrameStatus::Complete => None,
        };
        abort
            .into_iter()
            .chain(self.stats.overflows.iter().map(ToString::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflows_are_recorded_once_per_kind() {
        let mut s = FrameStats::default();
        assert!(s.overflow(Overflow::Drawsegs { limit: 4 }));
        assert!(!s.overflow(Overflow::Drawsegs { limit: 4 }));
        assert!(s.overflow(Overflow::Openings { limit: 9 }));
        assert_eq!(s.overflows.len(), 2);
    }

    #[test]
    fn report_messages_are_readable() {
        let report = FrameReport {
            status: FrameStatus::Aborted(FrameAbort::Visplanes { limit: 128 }),
            stats: FrameStats {
                overflows: vec![Overflow::Drawsegs { limit: 256 }],
                ..FrameStats::default()
            },
        };
        assert!(report.status.is_aborted());
        let msgs = report.messages();
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].contains("visplanes") && msgs[0].contains("128"));
        assert!(msgs[1].contains("256"));
    }
}
