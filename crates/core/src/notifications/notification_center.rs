//! Process-wide notification bus.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};

use super::Notification;

type Listener = Arc<dyn Fn(&Notification) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl Registry {
    fn listeners(&self) -> MutexGuard<'_, Vec<(u64, Listener)>> {
        // Listeners never run under this lock, so a poisoned guard still
        // holds a consistent list.
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remove(&self, id: u64) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }
}

/// Publish/subscribe bus for toast-style alerts.
///
/// `publish` calls every listener registered at the moment of publishing,
/// synchronously and in registration order. Listeners added while a publish
/// is running are not called for it. Cloning yields another handle to the
/// same bus.
#[derive(Clone, Default)]
pub struct NotificationCenter {
    registry: Arc<Registry>,
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance.
    pub fn global() -> &'static NotificationCenter {
        static GLOBAL: OnceLock<NotificationCenter> = OnceLock::new();
        GLOBAL.get_or_init(NotificationCenter::new)
    }

    /// Registers a listener. It stays registered until the returned guard is
    /// dropped or [`ListenerGuard::unsubscribe`] is called.
    #[must_use = "dropping the guard unsubscribes the listener"]
    pub fn add_listener<F>(&self, listener: F) -> ListenerGuard
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.listeners().push((id, Arc::new(listener)));
        ListenerGuard {
            id,
            registry: Arc::downgrade(&self.registry),
            active: true,
        }
    }

    /// Delivers a notification. Returns how many listeners were called.
    pub fn publish(&self, notification: Notification) -> usize {
        let snapshot: Vec<Listener> = self
            .registry
            .listeners()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        log::debug!(
            "Publishing notification '{}' ({}) to {} listener(s)",
            notification.title,
            notification.topic.name(),
            snapshot.len()
        );

        for listener in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(&notification))).is_err() {
                log::error!(
                    "Notification listener panicked while handling '{}'",
                    notification.topic.name()
                );
            }
        }
        snapshot.len()
    }

    pub fn listener_count(&self) -> usize {
        self.registry.listeners().len()
    }
}

/// Owns one listener registration.
///
/// Whoever holds the guard owns the teardown: dropping it removes the
/// listener.
pub struct ListenerGuard {
    id: u64,
    registry: Weak<Registry>,
    active: bool,
}

impl ListenerGuard {
    /// Removes the listener now. Returns false if the bus is already gone.
    pub fn unsubscribe(mut self) -> bool {
        self.release()
    }

    /// Keeps the listener registered for the rest of the bus's life.
    pub fn detach(mut self) {
        self.active = false;
    }

    fn release(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.registry
            .upgrade()
            .map(|registry| registry.remove(self.id))
            .unwrap_or(false)
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&Notification) + Send + Sync>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let make = move |label: &str| -> Box<dyn Fn(&Notification) + Send + Sync> {
            let seen = seen_clone.clone();
            let label = label.to_string();
            Box::new(move |n: &Notification| {
                seen.lock().unwrap().push(format!("{}:{}", label, n.title));
            })
        };
        (seen, make)
    }

    #[test]
    fn test_publish_in_registration_order() {
        let center = NotificationCenter::new();
        let (seen, make) = recorder();
        let first = make("first");
        let second = make("second");
        let _a = center.add_listener(move |n| first(n));
        let _b = center.add_listener(move |n| second(n));

        let delivered = center.publish(Notification::info("hello", ""));
        assert_eq!(delivered, 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:hello".to_string(), "second:hello".to_string()]
        );
    }

    #[test]
    fn test_drop_and_unsubscribe_remove_listener() {
        let center = NotificationCenter::new();
        let a = center.add_listener(|_| {});
        let b = center.add_listener(|_| {});
        assert_eq!(center.listener_count(), 2);

        drop(a);
        assert_eq!(center.listener_count(), 1);
        assert!(b.unsubscribe());
        assert_eq!(center.listener_count(), 0);
        assert_eq!(center.publish(Notification::info("nobody", "")), 0);
    }

    #[test]
    fn test_detached_listener_survives() {
        let center = NotificationCenter::new();
        center.add_listener(|_| {}).detach();
        assert_eq!(center.listener_count(), 1);
    }

    #[test]
    fn test_listener_added_during_publish_is_not_called() {
        let center = NotificationCenter::new();
        let late_calls = Arc::new(AtomicU64::new(0));
        let guards: Arc<Mutex<Vec<ListenerGuard>>> = Arc::new(Mutex::new(Vec::new()));

        let center_clone = center.clone();
        let late_clone = late_calls.clone();
        let guards_clone = guards.clone();
        let _outer = center.add_listener(move |_| {
            let late = late_clone.clone();
            let guard = center_clone.add_listener(move |_| {
                late.fetch_add(1, Ordering::SeqCst);
            });
            guards_clone.lock().unwrap().push(guard);
        });

        center.publish(Notification::info("first", ""));
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        center.publish(Notification::info("second", ""));
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let center = NotificationCenter::new();
        let calls = Arc::new(AtomicU64::new(0));
        let calls_clone = calls.clone();
        let _bad = center.add_listener(|_| panic!("listener failure"));
        let _good = center.add_listener(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        center.publish(Notification::error("boom", ""));
        center.publish(Notification::error("boom again", ""));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(center.listener_count(), 2);
    }

    #[test]
    fn test_guard_outliving_center_is_harmless() {
        let guard = {
            let center = NotificationCenter::new();
            center.add_listener(|_| {})
        };
        assert!(!guard.unsubscribe());
    }
}
