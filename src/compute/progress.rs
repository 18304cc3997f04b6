//! Progress reporting for clustering runs.

use std::time::Duration;

/// Snapshot of a run after one zoom pass completed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    /// Zoom passes finished so far, including this one
    pub completed: usize,
    /// Zoom passes still to run
    pub remaining: usize,
    /// Wall-clock time of this pass
    pub elapsed: Duration,
    /// Zoom level just finished
    pub zoom: u8,
    /// Estimated time until the run finishes, extrapolated from completed passes
    pub eta: Duration,
}

/// Receiver of per-zoom progress. Purely observational.
pub trait ProgressSink {
    fn report(&mut self, report: &ProgressReport);
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressReport),
{
    fn report(&mut self, report: &ProgressReport) {
        self(report)
    }
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _report: &ProgressReport) {}
}

/// Logs one `info` line per finished zoom pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&mut self, report: &ProgressReport) {
        log::info!(
            "zoom {}: {} done, {} left [{:.3} secs] [ETA {:.1} secs]",
            report.zoom,
            report.completed,
            report.remaining,
            report.elapsed.as_secs_f64(),
            report.eta.as_secs_f64()
        );
    }
}

/// Accumulates pass timings and builds reports.
#[derive(Debug, Clone)]
pub(crate) struct ProgressTracker {
    total: usize,
    completed: usize,
    spent: Duration,
}

impl ProgressTracker {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            spent: Duration::ZERO,
        }
    }

    pub(crate) fn finish_pass(&mut self, zoom: u8, elapsed: Duration) -> ProgressReport {
        self.completed += 1;
        self.spent += elapsed;

        let remaining = self.total.saturating_sub(self.completed);
        let average = self.spent.as_secs_f64() / self.completed as f64;

        ProgressReport {
            completed: self.completed,
            remaining,
            elapsed,
            zoom,
            eta: Duration::from_secs_f64(average * remaining as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eta_extrapolates_average() {
        let mut tracker = ProgressTracker::new(4);

        let first = tracker.finish_pass(0, Duration::from_secs(2));
        assert_eq!(first.completed, 1);
        assert_eq!(first.remaining, 3);
        assert_eq!(first.eta, Duration::from_secs(6));

        let second = tracker.finish_pass(1, Duration::from_secs(4));
        assert_eq!(second.remaining, 2);
        assert_eq!(second.eta, Duration::from_secs(6));
    }

    #[test]
    fn test_last_pass_has_no_eta() {
        let mut tracker = ProgressTracker::new(1);
        let report = tracker.finish_pass(5, Duration::from_millis(10));
        assert_eq!(report.remaining, 0);
        assert_eq!(report.eta, Duration::ZERO);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |report: &ProgressReport| seen.push(report.zoom);
            let mut tracker = ProgressTracker::new(2);
            sink.report(&tracker.finish_pass(3, Duration::ZERO));
            sink.report(&tracker.finish_pass(4, Duration::ZERO));
        }
        assert_eq!(seen, vec![3, 4]);
    }
}
