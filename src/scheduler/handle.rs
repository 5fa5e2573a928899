// src/scheduler/handle.rs

use tokio_util::sync::CancellationToken;

/// Cancellable handle for a scheduled task.
///
/// Handles form a tree: a handle created with [`TaskHandle::child`] is
/// cancelled whenever its parent is, while cancelling the child leaves the
/// parent untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
    token: CancellationToken,
}

impl TaskHandle {
    /// Create a new root handle.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Create a handle that is cancelled together with `self`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the handle (or any ancestor) is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
