//! Cancellation utilities
//!
//! One cooperative cancel handle threads end-to-end through a call. A
//! `CallScope` layers an optional deadline on top of the caller's handle so
//! timeouts travel the same interruption path as cancellation.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::OrchestratorErrorCode;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. Every future observing this handle or one of
    /// its children stops as soon as possible.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// A handle cancelled together with this one, but which can also be
    /// cancelled on its own without affecting the parent.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }
}

/// Create a standalone cancel handle that can be shared across tasks.
pub fn new_cancel_handle() -> CancelHandle {
    CancelHandle::new()
}

/// Why a call stopped before it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The caller cancelled
    Cancelled,
    /// The aggregate deadline elapsed
    TimedOut,
}

impl Interrupt {
    pub const fn code(self) -> OrchestratorErrorCode {
        match self {
            Self::Cancelled => OrchestratorErrorCode::Cancelled,
            Self::TimedOut => OrchestratorErrorCode::GlobalTimeout,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::Cancelled => "request was cancelled",
            Self::TimedOut => "request exceeded its deadline",
        }
    }
}

impl std::fmt::Display for Interrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Cancellation scope for one logical call.
///
/// Provider clients receive `handle()`, a child of the caller's handle that
/// is additionally cancelled when the deadline fires.
#[derive(Debug, Clone)]
pub struct CallScope {
    caller: CancelHandle,
    scoped: CancelHandle,
    deadline: Option<Instant>,
}

impl CallScope {
    pub fn new(caller: &CancelHandle, timeout: Option<Duration>) -> Self {
        Self {
            caller: caller.clone(),
            scoped: caller.child(),
            deadline: timeout.and_then(|t| Instant::now().checked_add(t)),
        }
    }

    /// Handle passed down to provider clients.
    pub fn handle(&self) -> CancelHandle {
        self.scoped.clone()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check, used between attempts.
    pub fn interrupted(&self) -> Option<Interrupt> {
        if self.caller.is_cancelled() {
            return Some(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.scoped.cancel();
                Some(Interrupt::TimedOut)
            }
            _ => None,
        }
    }

    /// Drive `fut` until it completes, the caller cancels, or the deadline fires.
    ///
    /// Cancellation wins over a future that is ready in the same poll.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupt> {
        if let Some(interrupt) = self.interrupted() {
            return Err(interrupt);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.caller.cancelled() => Err(Interrupt::Cancelled),
            _ = deadline => {
                self.scoped.cancel();
                Err(Interrupt::TimedOut)
            }
            out = fut => Ok(out),
        }
    }
}
