//! Long-lived action sources
//!
//! Unlike tasks, a subscription keeps emitting until cancelled. The sync
//! runtime uses one to re-send the current location periodically.

use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::action::Action;

/// Identifies a subscription for cancellation.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubKey(Cow<'static, str>);

impl SubKey {
    /// Periodic weather refresh
    pub const REFRESH: SubKey = SubKey(Cow::Borrowed("refresh"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for SubKey {
    fn from(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }
}

/// Manages subscriptions that continuously emit actions.
pub struct Subscriptions<A> {
    handles: HashMap<SubKey, JoinHandle<()>>,
    action_tx: mpsc::UnboundedSender<A>,
}

impl<A> Subscriptions<A>
where
    A: Action,
{
    pub fn new(action_tx: mpsc::UnboundedSender<A>) -> Self {
        Self {
            handles: HashMap::new(),
            action_tx,
        }
    }

    /// Emit `action_fn()` every `period`, starting one period from now.
    ///
    /// Replaces any subscription with the same key. Missed ticks are
    /// skipped rather than bursted.
    pub fn interval<F>(&mut self, key: impl Into<SubKey>, period: Duration, action_fn: F) -> &mut Self
    where
        F: Fn() -> A + Send + 'static,
    {
        let key = key.into();
        self.cancel(&key);

        let tx = self.action_tx.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;
                if tx.send(action_fn()).is_err() {
                    // Runtime gone
                    break;
                }
            }
        });

        self.handles.insert(key, handle);
        self
    }

    pub fn cancel(&mut self, key: &SubKey) {
        if let Some(handle) = self.handles.remove(key) {
            handle.abort();
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }

    pub fn is_active(&self, key: &SubKey) -> bool {
        self.handles.get(key).is_some_and(|h| !h.is_finished())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<A> Drop for Subscriptions<A> {
    fn drop(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Tick,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            "Tick"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_skips_first_tick() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subs = Subscriptions::new(tx);

        subs.interval(SubKey::REFRESH, Duration::from_secs(30), || TestAction::Tick);
        assert!(subs.is_active(&SubKey::REFRESH));

        let early = tokio::time::timeout(Duration::from_secs(29), rx.recv()).await;
        assert!(early.is_err());

        let action = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert_eq!(action, TestAction::Tick);

        let again = tokio::time::timeout(Duration::from_secs(31), rx.recv())
            .await
            .expect("timeout");
        assert_eq!(again, Some(TestAction::Tick));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_emitting() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subs = Subscriptions::new(tx);

        subs.interval("tick", Duration::from_secs(1), || TestAction::Tick);
        subs.cancel(&SubKey::new("tick"));
        assert!(subs.is_empty());

        let result = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(result.is_err() || result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_same_key() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut subs = Subscriptions::new(tx);

        subs.interval("tick", Duration::from_secs(1), || TestAction::Tick);
        subs.interval("tick", Duration::from_secs(2), || TestAction::Tick);
        assert_eq!(subs.len(), 1);

        subs.cancel_all();
        assert!(subs.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_intervals() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subs = Subscriptions::new(tx);
        subs.interval(SubKey::REFRESH, Duration::from_secs(1), || TestAction::Tick);
        drop(subs);

        // Once the interval task is aborted its sender clone is gone too.
        let result = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert_eq!(result, Ok(None));
    }
}
