//! Request Context
//!
//! Cancellation and deadline propagation for API exchanges. Every
//! [`ResourceClient`](crate::ResourceClient) operation takes a context;
//! call sites with nothing to cancel pass [`RequestContext::background`].

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Done {
    Cancelled,
    DeadlineExceeded,
}

/// Cancellation signal and optional deadline carried into a request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: Vec<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Cancels every context derived from the matching [`RequestContext::with_cancel`] call
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel the context (idempotent)
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a cancellable child context
    ///
    /// The child is done when either the returned handle or any ancestor
    /// is cancelled.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let mut child = self.clone();
        child.cancel.push(rx);
        (child, CancelHandle { tx })
    }

    /// Derive a child context that expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child context that expires at `deadline`
    ///
    /// A parent deadline that is earlier wins.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.clone();
        child.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        child
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Check without waiting whether the context is already done
    pub fn err(&self) -> Option<Done> {
        if self.cancel.iter().any(|rx| *rx.borrow()) {
            return Some(Done::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Done::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the context is cancelled or its deadline passes
    ///
    /// Never resolves for a background context.
    pub async fn done(&self) -> Done {
        let cancelled = async {
            if self.cancel.is_empty() {
                return std::future::pending::<()>().await;
            }
            let waits = self.cancel.iter().cloned().map(|mut rx| {
                Box::pin(async move {
                    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                    // A dropped handle can no longer cancel
                    if closed {
                        std::future::pending::<()>().await;
                    }
                })
            });
            futures::future::select_all(waits).await;
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = cancelled => Done::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Done::DeadlineExceeded,
            },
            None => {
                cancelled.await;
                Done::Cancelled
            }
        }
    }
}
