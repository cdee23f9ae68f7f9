//! Cooperative cancellation token threaded through C3 and C7 (spec §5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheap, cloneable flag checked between Newton iterations and between
/// split-half Monte-Carlo splits. No locks are involved: a single relaxed
/// load per check point.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// A token that is never cancelled, for callers that don't need to
    /// interrupt long-running fits.
    #[must_use]
    pub fn never() -> Self {
        Self::default()
    }

    /// Signal cancellation. Safe to call from another thread.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once [`Cancellation::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
