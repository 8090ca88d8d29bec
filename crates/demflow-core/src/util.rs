//! Per-stage timing and result reporting for the flow pipeline.

use std::fmt;
use std::time::Instant;

/// Wall-clock timer for one pipeline stage.
///
/// [`finish`](StageClock::finish) logs the elapsed time together with a short
/// result summary for the stage — "4 flats labeled", "1289 cells resolved" —
/// so the log tells both how long a stage ran and what it accomplished.
/// A clock dropped without finishing (a stage that exits early) still logs
/// the elapsed time on its own.
pub(crate) struct StageClock {
    stage: &'static str,
    start: Instant,
    finished: bool,
}

impl StageClock {
    pub fn start(stage: &'static str) -> Self {
        log::trace!("{stage}...");
        Self {
            stage,
            start: Instant::now(),
            finished: false,
        }
    }

    /// Complete the stage, logging elapsed time and its result summary.
    ///
    /// Call as `clock.finish(format_args!("{count} flats labeled"))`.
    pub fn finish(mut self, summary: fmt::Arguments<'_>) {
        self.finished = true;
        log::debug!("{} took {:.3?}: {}", self.stage, self.start.elapsed(), summary);
    }
}

impl Drop for StageClock {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!("{} took {:.3?}", self.stage, self.start.elapsed());
        }
    }
}
