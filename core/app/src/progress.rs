//! Upload progress reporting.

use std::sync::atomic::{AtomicI16, Ordering};

/// Forwards upload progress to a callback, keeping it monotonic.
///
/// Values above 100 are clamped and values not greater than the last one
/// reported are dropped, so the callback sees a strictly increasing sequence
/// within `0..=100`.
pub struct ProgressTracker<F> {
    last: AtomicI16,
    sink: F,
}

impl<F: Fn(u8) + Send + Sync> ProgressTracker<F> {
    pub fn new(sink: F) -> Self {
        Self {
            last: AtomicI16::new(-1),
            sink,
        }
    }

    /// Report a percentage.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(i16::from(percent), Ordering::SeqCst);
        if i16::from(percent) > previous {
            (self.sink)(percent);
        }
    }

    /// Report completion if the backend did not.
    pub fn finish(&self) {
        self.report(100);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let seen = Mutex::new(Vec::new());
        let tracker = ProgressTracker::new(|p| seen.lock().unwrap().push(p));

        for p in [0, 10, 10, 5, 60, 250, 100] {
            tracker.report(p);
        }
        tracker.finish();

        assert_eq!(*seen.lock().unwrap(), vec![0, 10, 60, 100]);
    }

    #[test]
    fn test_finish_reports_100_once() {
        let seen = Mutex::new(Vec::new());
        let tracker = ProgressTracker::new(|p| seen.lock().unwrap().push(p));

        tracker.finish();
        tracker.finish();

        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }
}
