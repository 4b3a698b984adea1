//! Task spawning for endpoint activities.

use std::future::Future;

use tokio::task::JoinHandle;

/// Provider for spawning the activities of an endpoint.
///
/// The upstream traits are `?Send`, so endpoint tasks run on the current
/// thread inside a [`LocalSet`](tokio::task::LocalSet).
pub trait TaskProvider: Clone {
    /// Spawn a named task on the current thread.
    fn spawn_task<F>(&self, name: &str, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static;
}

/// Tokio-based task provider using `spawn_local`.
#[derive(Clone, Debug, Default)]
pub struct TokioTaskProvider;

impl TaskProvider for TokioTaskProvider {
    fn spawn_task<F>(&self, name: &str, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let task_name = name.to_string();
        tokio::task::spawn_local(async move {
            tracing::trace!("Task {} starting", task_name);
            let output = future.await;
            tracing::trace!("Task {} completed", task_name);
            output
        })
    }
}
