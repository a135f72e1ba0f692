//! Cancellation utilities
//!
//! Provides a first-class cancellation handle for in-flight dispatch
//! calls. A dispatch call suspends at every network round-trip and
//! every poll-interval wait; cancelling the handle makes the call stop
//! at its next suspension point without issuing further requests.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, UnmarkError};

/// A handle that can be used to request cancellation of a dispatch call.
///
/// Clones share the same underlying token, so the caller keeps one
/// clone and hands another to the dispatcher.
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

    /// Request cancellation. The dispatch call observing this handle
    /// stops at its next suspension point. Any provider-side job that
    /// was already submitted is left to expire on its own; providers
    /// expose no cancel endpoint.
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

    /// Run a future to completion unless this handle fires first, in
    /// which case the future is dropped (closing any underlying HTTP
    /// connection) and [`UnmarkError::Cancelled`] is returned.
    pub async fn guard<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            _ = self.token.cancelled() => Err(UnmarkError::Cancelled),
            out = future => out,
        }
    }
}
