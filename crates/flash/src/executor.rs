use futures::{
    FutureExt,
    executor::{LocalPool, LocalSpawner},
    future::RemoteHandle,
    task::LocalSpawnExt,
};
use std::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

/// Runs futures on the thread that owns the [`crate::App`]. Futures only make progress
/// when the frame loop calls [`ForegroundExecutor::run_until_stalled`].
pub struct ForegroundExecutor {
    pool: LocalPool,
    spawner: LocalSpawner,
}

impl ForegroundExecutor {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self { pool, spawner }
    }

    /// Schedules `future`. Dropping the returned task cancels it.
    pub fn spawn<R: 'static>(&self, future: impl Future<Output = R> + 'static) -> Task<R> {
        match self.spawner.spawn_local_with_handle(future) {
            Ok(handle) => Task(TaskState::Spawned(handle)),
            Err(error) => {
                log::error!("failed to spawn foreground task: {error}");
                Task(TaskState::Cancelled)
            }
        }
    }

    /// Polls every runnable task until none can make progress.
    pub fn run_until_stalled(&mut self) {
        self.pool.run_until_stalled();
    }
}

impl Default for ForegroundExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ForegroundExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForegroundExecutor").finish_non_exhaustive()
    }
}

/// A handle to a spawned future.
///
/// Dropping a task cancels the future at its next suspension point. Call
/// [`Task::detach`] to let it run to completion in the background.
#[must_use]
pub struct Task<T>(TaskState<T>);

enum TaskState<T> {
    Ready(Option<T>),
    Spawned(RemoteHandle<T>),
    Cancelled,
}

// The ready value is moved out, never pinned.
impl<T> Unpin for Task<T> {}

impl<T: 'static> Task<T> {
    /// A task that is already complete.
    pub fn ready(value: T) -> Self {
        Task(TaskState::Ready(Some(value)))
    }

    /// Lets the future keep running after this handle is dropped.
    pub fn detach(self) {
        if let TaskState::Spawned(handle) = self.0 {
            handle.forget();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.0, TaskState::Cancelled)
    }
}

impl<T: 'static> Future for Task<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        match &mut self.get_mut().0 {
            TaskState::Ready(value) => match value.take() {
                Some(value) => Poll::Ready(value),
                None => Poll::Pending,
            },
            TaskState::Spawned(handle) => handle.poll_unpin(cx),
            TaskState::Cancelled => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.0 {
            TaskState::Ready(_) => "ready",
            TaskState::Spawned(_) => "spawned",
            TaskState::Cancelled => "cancelled",
        };
        f.debug_tuple("Task").field(&state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use std::{cell::Cell, rc::Rc};

    #[test]
    fn test_dropped_task_is_cancelled() {
        let mut executor = ForegroundExecutor::new();
        let (tx, rx) = oneshot::channel::<()>();
        let finished = Rc::new(Cell::new(false));

        let task = executor.spawn({
            let finished = finished.clone();
            async move {
                rx.await.ok();
                finished.set(true);
            }
        });
        executor.run_until_stalled();
        drop(task);
        tx.send(()).ok();
        executor.run_until_stalled();
        assert!(!finished.get());
    }

    #[test]
    fn test_detached_task_runs_to_completion() {
        let mut executor = ForegroundExecutor::new();
        let (tx, rx) = oneshot::channel::<u32>();
        let result = Rc::new(Cell::new(0));

        executor
            .spawn({
                let result = result.clone();
                async move {
                    result.set(rx.await.unwrap_or_default());
                }
            })
            .detach();
        executor.run_until_stalled();
        assert_eq!(result.get(), 0);

        tx.send(9).ok();
        executor.run_until_stalled();
        assert_eq!(result.get(), 9);
    }
}
