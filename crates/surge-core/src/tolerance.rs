use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::error;

/// Failure counter with a single cancel-once transition.
///
/// Up to `limit` failures are absorbed; the failure after that fires `signal` exactly once.
/// Failures recorded afterwards (units already in flight) are still counted.
#[derive(Debug)]
pub struct ToleranceBudget {
    limit: usize,
    failures: AtomicUsize,
    fired: AtomicBool,
    signal: CancellationToken,
}

impl ToleranceBudget {
    pub fn new(limit: usize, signal: CancellationToken) -> Self {
        Self {
            limit,
            failures: AtomicUsize::new(0),
            fired: AtomicBool::new(false),
            signal,
        }
    }

    #[inline]
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    /// Returns `true` only for the failure that exceeded the limit.
    pub fn record_failure(&self) -> bool {
        let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures <= self.limit {
            return false;
        }
        if self
            .fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        error!(target: "surge.core.tolerance", failures, limit = self.limit, "failure tolerance exceeded; cancelling remaining units");
        self.signal.cancel();
        true
    }
}
