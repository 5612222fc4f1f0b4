//! Progress notifications and cooperative cancellation.

use crate::error::{AppError, Result};
use crate::estimate::SizeEstimate;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Milestones reported while a run progresses.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressEvent {
    CollectionStarted { root: PathBuf },
    CollectionComplete { candidates: usize },
    EstimateReady(SizeEstimate),
    FilesRead { done: usize, total: usize },
    ChunkWritten { index: usize, total: usize, path: PathBuf },
    Warning(String),
}

/// Receives progress events. Implementations must return quickly; the engine never waits on them.
pub trait ProgressObserver: Sync {
    fn notify(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Sync,
{
    fn notify(&self, event: &ProgressEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn notify(&self, _event: &ProgressEvent) {}
}

/// Shared flag checked between collection steps and read batches.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            log::debug!("Cancellation observed");
            Err(AppError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn clones_share_cancellation_state() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(token.check().is_ok());
        handle.cancel();
        assert!(matches!(token.check(), Err(AppError::Cancelled)));
    }

    #[test]
    fn closures_are_observers() {
        let seen = Mutex::new(Vec::new());
        let observer = |event: &ProgressEvent| seen.lock().unwrap().push(event.clone());
        observer.notify(&ProgressEvent::CollectionComplete { candidates: 3 });
        assert_eq!(
            seen.into_inner().unwrap(),
            vec![ProgressEvent::CollectionComplete { candidates: 3 }]
        );
    }
}
