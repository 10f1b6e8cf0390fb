//! Per-run shared state.

use super::ProgressRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag.
///
/// Checked between item dispatches and between stages, never inside an item,
/// so a cancelled stage still leaves every started file in a consistent state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear a previous request so the token can be reused for the next run
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Everything a run shares across threads: progress, cancellation and the
/// "run in progress" flag.
#[derive(Debug, Default)]
pub struct RunContext {
    pub progress: ProgressRegistry,
    pub cancel: CancellationToken,
    processing: AtomicBool,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run is currently executing against this context
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Mark the context busy until the returned guard is dropped, even if
    /// the job unwinds. Only the orchestrator and the service call this.
    pub(crate) fn begin_processing(&self) -> ProcessingGuard<'_> {
        self.processing.store(true, Ordering::SeqCst);
        ProcessingGuard { ctx: self }
    }
}

/// Clears the processing flag on drop
#[must_use = "the context stops being busy when the guard is dropped"]
pub(crate) struct ProcessingGuard<'a> {
    ctx: &'a RunContext,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.ctx.processing.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let observer = token.clone();

        token.cancel();
        assert!(observer.is_cancelled());

        observer.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn new_context_is_idle() {
        let ctx = RunContext::new();
        assert!(!ctx.is_processing());
        assert!(!ctx.cancel.is_cancelled());
        assert_eq!(ctx.progress.snapshot().total_jobs, 0);
    }

    #[test]
    fn processing_clears_when_guard_unwinds() {
        let ctx = RunContext::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _processing = ctx.begin_processing();
            assert!(ctx.is_processing());
            panic!("job blew up");
        }));

        assert!(result.is_err());
        assert!(!ctx.is_processing());
    }
}
