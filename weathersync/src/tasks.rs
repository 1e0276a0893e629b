//! Keyed one-shot async tasks
//!
//! Each task resolves to a single action which is sent back to the runtime.
//! Spawning under a key that is already running aborts the previous task
//! first, so at most one connect attempt and one geolocation request are
//! ever in flight.
//!
//! ```ignore
//! tasks.spawn(TaskKey::GEOLOCATE, async move {
//!     match geolocator.locate().await {
//!         Ok(location) => SyncAction::LocationDidResolve(location),
//!         Err(e) => SyncAction::LocationDidFail(e),
//!     }
//! });
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::action::Action;

/// Identifies a task for cancellation and replacement.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TaskKey(Cow<'static, str>);

impl TaskKey {
    /// The in-flight WebSocket handshake
    pub const CONNECT: TaskKey = TaskKey(Cow::Borrowed("connect"));
    /// The in-flight device geolocation request
    pub const GEOLOCATE: TaskKey = TaskKey(Cow::Borrowed("geolocate"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// A key usable in `const` items.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for TaskKey {
    fn from(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }
}

impl From<String> for TaskKey {
    fn from(s: String) -> Self {
        Self(Cow::Owned(s))
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Manages async task lifecycle with automatic cancellation.
///
/// Dropping the manager aborts everything still running.
pub struct TaskManager<A> {
    tasks: HashMap<TaskKey, AbortHandle>,
    action_tx: mpsc::UnboundedSender<A>,
}

impl<A> TaskManager<A>
where
    A: Action,
{
    /// `action_tx` receives the action each task resolves to.
    pub fn new(action_tx: mpsc::UnboundedSender<A>) -> Self {
        Self {
            tasks: HashMap::new(),
            action_tx,
        }
    }

    /// Spawn a task, cancelling any existing task with the same key.
    ///
    /// If the task is cancelled before completion, no action is sent.
    pub fn spawn<F>(&mut self, key: impl Into<TaskKey>, future: F) -> &mut Self
    where
        F: Future<Output = A> + Send + 'static,
    {
        let key = key.into();
        self.cancel(&key);

        let tx = self.action_tx.clone();
        let handle = tokio::spawn(async move {
            let action = future.await;
            let _ = tx.send(action);
        });

        tracing::trace!(task = %key, "Task spawned");
        self.tasks.insert(key, handle.abort_handle());
        self
    }

    /// Spawn a task that starts after `delay`.
    ///
    /// Spawning again under the same key before the delay expires replaces
    /// the pending task and restarts the timer.
    pub fn spawn_after<F>(&mut self, key: impl Into<TaskKey>, delay: Duration, future: F) -> &mut Self
    where
        F: Future<Output = A> + Send + 'static,
    {
        self.spawn(key, async move {
            tokio::time::sleep(delay).await;
            future.await
        })
    }

    /// Cancel a task by key. No-op if nothing runs under it.
    pub fn cancel(&mut self, key: &TaskKey) -> bool {
        match self.tasks.remove(key) {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                if was_running {
                    tracing::debug!(task = %key, "Task cancelled");
                }
                was_running
            }
            None => false,
        }
    }

    /// Cancel all running tasks.
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }

    /// Whether a task under `key` has been spawned and not yet finished.
    pub fn is_running(&self, key: &TaskKey) -> bool {
        self.tasks.get(key).is_some_and(|h| !h.is_finished())
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A> Drop for TaskManager<A> {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Debug)]
    enum TestAction {
        Done(usize),
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            "Done"
        }
    }

    #[test]
    fn test_task_key() {
        let k1 = TaskKey::new("connect");
        let k2 = TaskKey::from("connect");
        let k3: TaskKey = String::from("connect").into();

        assert_eq!(k1, k2);
        assert_eq!(k2, k3);
        assert_eq!(k1, TaskKey::CONNECT);
        assert_eq!(TaskKey::GEOLOCATE.name(), "geolocate");

        const RETRY: TaskKey = TaskKey::from_static("retry");
        assert_eq!(RETRY, TaskKey::new("retry"));
    }

    #[tokio::test]
    async fn test_spawn_sends_action() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks.spawn("test", async { TestAction::Done(42) });

        let action = tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");

        assert!(matches!(action, TestAction::Done(42)));
    }

    #[tokio::test]
    async fn test_spawn_cancels_previous() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        let counter = Arc::new(AtomicUsize::new(0));

        let c1 = counter.clone();
        tasks.spawn(TaskKey::CONNECT, async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            c1.fetch_add(1, Ordering::SeqCst);
            TestAction::Done(1)
        });

        let c2 = counter.clone();
        tasks.spawn(TaskKey::CONNECT, async move {
            c2.fetch_add(10, Ordering::SeqCst);
            TestAction::Done(2)
        });

        let action = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");

        assert!(matches!(action, TestAction::Done(2)));

        // The first task must never run to completion
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_after_waits() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks.spawn_after("retry", Duration::from_secs(2), async { TestAction::Done(1) });

        let early = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(early.is_err());

        let action = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert!(matches!(action, TestAction::Done(1)));
    }

    #[tokio::test]
    async fn test_cancel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks.spawn(TaskKey::GEOLOCATE, async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            TestAction::Done(1)
        });

        assert!(tasks.is_running(&TaskKey::GEOLOCATE));
        assert!(tasks.cancel(&TaskKey::GEOLOCATE));
        assert!(!tasks.is_running(&TaskKey::GEOLOCATE));
        assert!(!tasks.cancel(&TaskKey::GEOLOCATE));

        let result = tokio::time::timeout(Duration::from_millis(150), rx.recv()).await;
        assert!(result.is_err() || result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks.spawn("a", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            TestAction::Done(1)
        });
        tasks.spawn("b", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            TestAction::Done(2)
        });

        assert_eq!(tasks.len(), 2);
        tasks.cancel_all();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_finished_task_is_not_running() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks.spawn("quick", async { TestAction::Done(0) });
        rx.recv().await.expect("channel closed");
        tokio::task::yield_now().await;

        assert!(!tasks.is_running(&TaskKey::new("quick")));
    }
}
