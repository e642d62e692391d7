//! Submit control state and progress reporting

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Something the applicant clicks to submit, disabled while a submission
/// is in flight.
pub trait SubmitControl: Send + Sync {
    /// Mark the control busy or ready.
    fn set_busy(&self, busy: bool);
}

/// Minimal [`SubmitControl`] holding a flag.
#[derive(Debug, Default)]
pub struct BusyFlag(AtomicBool);

impl BusyFlag {
    /// Create a ready flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl SubmitControl for BusyFlag {
    fn set_busy(&self, busy: bool) {
        self.0.store(busy, Ordering::SeqCst);
    }
}

/// Marks a control busy until dropped.
#[must_use = "the control is released as soon as the guard is dropped"]
pub struct BusyGuard<'a> {
    control: &'a dyn SubmitControl,
}

impl<'a> BusyGuard<'a> {
    /// Set `control` busy.
    pub fn acquire(control: &'a dyn SubmitControl) -> Self {
        control.set_busy(true);
        Self { control }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.control.set_busy(false);
    }
}

/// Submission stage reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Checking the form against the rule table.
    Validating,
    /// Compressing images; `done` of `total` attachments finished.
    Compressing { done: usize, total: usize },
    /// Upload in flight; file bytes handed to the transport so far.
    Uploading { sent: u64, total: u64 },
    /// Response received.
    Finished,
}

/// Progress callback.
pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// A callback that ignores every event.
pub fn no_progress() -> ProgressFn {
    Arc::new(|_| {})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_clears_on_drop() {
        let flag = BusyFlag::new();
        {
            let _guard = BusyGuard::acquire(&flag);
            assert!(flag.is_busy());
        }
        assert!(!flag.is_busy());
    }

    #[test]
    fn test_guard_clears_on_unwind() {
        let flag = BusyFlag::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = BusyGuard::acquire(&flag);
            panic!("render failed");
        }));
        assert!(result.is_err());
        assert!(!flag.is_busy());
    }
}
