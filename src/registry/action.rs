// src/registry/action.rs

//! The unit of work behind a leaf task.
//!
//! The runner only ever sees an [`Action`]: something that can be started
//! and yields a completion signal. Built-in file actions live in
//! [`crate::transform`]; tests and embedders can wrap async closures with
//! [`action_fn`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;

/// Boxed future returned by [`Action::call`].
pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Trait abstracting a leaf task's work.
///
/// Implementations must not block the executor thread: blocking filesystem
/// work belongs in `tokio::task::spawn_blocking`.
pub trait Action: Send + Sync {
    /// Start the work. The returned future resolves once it is done.
    fn call(&self) -> ActionFuture<'_>;

    /// Short human-readable summary for `--dry-run` and `--list`.
    fn describe(&self) -> String {
        "custom action".to_string()
    }
}

/// Wrap an async closure as an [`Action`].
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn Action>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnAction { f })
}

struct FnAction<F> {
    f: F,
}

impl<F> fmt::Debug for FnAction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction").finish_non_exhaustive()
    }
}

impl<F, Fut> Action for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self) -> ActionFuture<'_> {
        Box::pin((self.f)())
    }
}
