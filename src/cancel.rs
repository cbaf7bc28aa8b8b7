use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{EngineError, EngineResult};

/// Caller-owned cancellation handle.
///
/// The engine polls it between detection chunks and between DTW matrix
/// rows. Cloning shares the same stop flag, so a UI thread can keep one
/// clone and hand the other to the worker running the analysis.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    stop: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that never fires unless `cancel` is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also fires once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Request cancellation. Visible to every clone of this token.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return true;
        }
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Checkpoint: `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> EngineResult<()> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_passes_checkpoint() {
        assert!(CancelToken::new().check().is_ok());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let worker = token.clone();
        token.cancel();
        assert_eq!(worker.check(), Err(EngineError::Cancelled));
    }

    #[test]
    fn elapsed_deadline_fires() {
        let token = CancelToken::with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
    }
}
