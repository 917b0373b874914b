use hnld_core::notifications::{ListenerGuard, Notification, NotificationCenter};
use serde_json::Value;
use tokio::sync::broadcast;

/// Serializable envelope that carries event names and optional payloads.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    pub name: &'static str,
    pub payload: Option<Value>,
}

impl ServerEvent {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            payload: None,
        }
    }

    pub fn with_payload(name: &'static str, payload: Value) -> Self {
        Self {
            name,
            payload: Some(payload),
        }
    }
}

impl From<&Notification> for ServerEvent {
    fn from(notification: &Notification) -> Self {
        let name = notification.topic.name();
        match serde_json::to_value(notification) {
            Ok(payload) => Self::with_payload(name, payload),
            Err(err) => {
                tracing::error!("Failed to serialize notification {}: {}", notification.id, err);
                Self::new(name)
            }
        }
    }
}

/// Lightweight broadcast bus that fans out events to any connected clients.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ServerEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }

    /// Forwards every notification published on `center` to this bus until
    /// the returned guard is dropped.
    pub fn bridge(&self, center: &NotificationCenter) -> ListenerGuard {
        let bus = self.clone();
        center.add_listener(move |notification| bus.publish(ServerEvent::from(notification)))
    }
}
