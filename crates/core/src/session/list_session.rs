use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use super::ListLoader;
use crate::errors::Result;
use crate::notifications::{ListenerGuard, Notification, NotificationCenter, NotificationTopic};
use crate::realtime::{
    lock_shared, ApplyOutcome, ChangeEvent, ChannelFilter, ChannelStatus, FeedMessage,
    RealtimeFeed, Reconciler, SharedReconciler, Subscription,
};

/// Builds the notification published when a delete event removes a row.
pub type RemovalNotice = fn(&str) -> Notification;

/// Pulls a removed row's id out of a notification topic.
pub type RemovalMatcher = fn(&NotificationTopic) -> Option<&str>;

#[derive(Clone)]
struct Announcer {
    center: NotificationCenter,
    notice: RemovalNotice,
}

/// One page's list: fetched once, then kept current from the realtime feed.
///
/// Channel trouble is only logged; the list keeps whatever was merged last
/// until [`ListSession::refresh`] or [`ListSession::reconnect`] is called.
pub struct ListSession<T> {
    channel: ChannelFilter,
    reconciler: SharedReconciler<T>,
    loader: Arc<dyn ListLoader<T>>,
    feed: Arc<dyn RealtimeFeed>,
    status: Arc<Mutex<Option<ChannelStatus>>>,
    announcer: Option<Announcer>,
    removals: Option<ListenerGuard>,
    pump: Option<JoinHandle<()>>,
}

impl<T> ListSession<T>
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    pub fn new(
        channel: ChannelFilter,
        reconciler: Reconciler<T>,
        loader: Arc<dyn ListLoader<T>>,
        feed: Arc<dyn RealtimeFeed>,
    ) -> Self {
        Self {
            channel,
            reconciler: reconciler.into_shared(),
            loader,
            feed,
            status: Arc::new(Mutex::new(None)),
            announcer: None,
            removals: None,
            pump: None,
        }
    }

    /// Publishes `notice(id)` whenever a realtime delete removes a row.
    pub fn announce_removals(mut self, center: NotificationCenter, notice: RemovalNotice) -> Self {
        self.announcer = Some(Announcer { center, notice });
        self
    }

    /// Removes rows named by matching notifications, for deletes this page's
    /// channel does not carry.
    pub fn follow_removals(mut self, center: &NotificationCenter, matcher: RemovalMatcher) -> Self {
        let reconciler = self.reconciler.clone();
        self.removals = Some(center.add_listener(move |notification| {
            if let Some(id) = matcher(&notification.topic) {
                lock_shared(&reconciler).apply(ChangeEvent::delete(id));
            }
        }));
        self
    }

    /// Fetches the initial list, then subscribes.
    pub async fn start(&mut self) -> Result<()> {
        self.refresh().await?;
        self.subscribe().await
    }

    /// Re-fetches the list and replaces local state with it.
    ///
    /// Events the feed delivers while the fetch is in flight are re-applied
    /// on top of the fetched rows, so a live session never moves backwards.
    pub async fn refresh(&self) -> Result<()> {
        lock_shared(&self.reconciler).begin_journal();
        let rows = match self.loader.fetch().await {
            Ok(rows) => rows,
            Err(err) => {
                lock_shared(&self.reconciler).discard_journal();
                log::error!("Failed to load {}: {}", self.channel.topic(), err);
                return Err(err);
            }
        };
        let mut reconciler = lock_shared(&self.reconciler);
        reconciler.load_journaled(rows);
        log::debug!(
            "Loaded {} {} rows",
            reconciler.len(),
            reconciler.entity()
        );
        Ok(())
    }

    /// Drops the current subscription, if any, and opens a fresh one.
    pub async fn reconnect(&mut self) -> Result<()> {
        log::info!("Reconnecting {}", self.channel.topic());
        self.subscribe().await
    }

    async fn subscribe(&mut self) -> Result<()> {
        self.stop_pump();
        let subscription = self.feed.subscribe(self.channel.clone()).await?;
        self.pump = Some(tokio::spawn(pump(
            subscription,
            self.reconciler.clone(),
            self.status.clone(),
            self.announcer.clone(),
        )));
        Ok(())
    }

    /// Stops applying realtime events. The list keeps its last state.
    pub fn stop(&mut self) {
        if self.pump.is_some() {
            self.stop_pump();
            set_status(&self.status, ChannelStatus::Closed);
        }
        self.removals = None;
    }

    fn stop_pump(&mut self) {
        if let Some(handle) = self.pump.take() {
            handle.abort();
        }
    }

    pub fn is_live(&self) -> bool {
        self.pump.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn snapshot(&self) -> Vec<T> {
        lock_shared(&self.reconciler).snapshot()
    }

    /// Last status reported by the channel.
    pub fn channel_status(&self) -> Option<ChannelStatus> {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn channel(&self) -> &ChannelFilter {
        &self.channel
    }

    /// Shared handle for mutation handlers that patch the same list.
    pub fn reconciler(&self) -> SharedReconciler<T> {
        self.reconciler.clone()
    }
}

impl<T> Drop for ListSession<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pump.take() {
            handle.abort();
        }
    }
}

fn set_status(slot: &Mutex<Option<ChannelStatus>>, status: ChannelStatus) {
    *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(status);
}

async fn pump<T>(
    mut subscription: Subscription,
    reconciler: SharedReconciler<T>,
    status: Arc<Mutex<Option<ChannelStatus>>>,
    announcer: Option<Announcer>,
) where
    T: DeserializeOwned + Clone + Send + 'static,
{
    let topic = subscription.filter().topic();
    while let Some(message) = subscription.recv().await {
        match message {
            FeedMessage::Change(raw) => match raw.decode::<T>() {
                Ok(event) => {
                    let removed_id = match &event {
                        ChangeEvent::Delete { id } => Some(id.clone()),
                        _ => None,
                    };
                    // the lock is released before announcing so listeners
                    // may touch this list
                    let outcome = lock_shared(&reconciler).apply(event);
                    if let (Some(id), Some(announcer), ApplyOutcome::Removed) =
                        (removed_id, announcer.as_ref(), outcome)
                    {
                        announcer.center.publish((announcer.notice)(&id));
                    }
                }
                Err(err) => {
                    lock_shared(&reconciler).reject(&err.to_string());
                }
            },
            FeedMessage::Status(next) => {
                match &next {
                    ChannelStatus::Subscribed => log::info!("Subscribed to {}", topic),
                    ChannelStatus::TimedOut => log::warn!("Subscription to {} timed out", topic),
                    ChannelStatus::Closed => log::info!("Channel {} closed", topic),
                    ChannelStatus::ChannelError(message) => {
                        log::error!("Channel {} failed: {}", topic, message)
                    }
                }
                set_status(&status, next);
            }
        }
    }
    log::debug!("Feed for {} ended", topic);
}
