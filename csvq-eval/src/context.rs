use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::EvalError;

/// A cooperative cancellation signal threaded through every long-running
/// operation (table load, join, sort, set operation, recursive CTE). The
/// evaluator checks it between rows or between batches; on cancellation the
/// operation drops its intermediate buffers and returns
/// [`EvalError::cancelled`] verbatim to the caller.
#[derive(Clone, Default)]
pub struct CancellationContext {
    cancelled: Arc<AtomicBool>,
}

impl CancellationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns `Err(EvalError::cancelled())` if cancellation has been
    /// requested. Call between rows in any loop bounded by external input.
    pub fn check(&self) -> Result<(), EvalError> {
        if self.is_cancelled() {
            Err(EvalError::cancelled())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_succeeds_until_cancelled() {
        let ctx = CancellationContext::new();
        assert!(ctx.check().is_ok());
        ctx.cancel();
        assert!(ctx.check().is_err());
    }
}
