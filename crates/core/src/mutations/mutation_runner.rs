use std::future::Future;

use crate::errors::{Error, Result, ValidationError};
use crate::notifications::{Notification, NotificationCenter, NotificationTopic};
use crate::realtime::{lock_shared, ApplyOutcome, ChangeEvent, SharedReconciler};

/// Client-side input checks, run before any backend round-trip.
pub trait Validate {
    fn validate(&self) -> std::result::Result<(), ValidationError>;
}

/// How a successful mutation is reflected locally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EchoStrategy {
    /// Apply the returned row right away; the echo is deduped by id.
    PatchLocal,
    /// Leave the list alone and let the realtime echo update it.
    AwaitEcho,
    /// Drop the returned row's id from the list (cancel flows).
    RemoveLocal,
}

/// Runs backend mutations on behalf of a page.
///
/// Failures are logged, surfaced as a toast through the notification
/// center, and returned; the local list is left as it was.
#[derive(Clone, Debug)]
pub struct MutationRunner {
    notifications: NotificationCenter,
    success_toasts: bool,
}

impl MutationRunner {
    pub fn new(notifications: NotificationCenter) -> Self {
        Self {
            notifications,
            success_toasts: false,
        }
    }

    pub fn with_success_toasts(mut self, enabled: bool) -> Self {
        self.success_toasts = enabled;
        self
    }

    /// Awaits `call` and reflects the returned row per `strategy`.
    pub async fn run<T, Fut>(
        &self,
        action: &str,
        strategy: EchoStrategy,
        list: &SharedReconciler<T>,
        call: Fut,
    ) -> Result<T>
    where
        T: Clone + 'static,
        Fut: Future<Output = Result<T>>,
    {
        match call.await {
            Ok(row) => {
                let outcome = reflect(list, strategy, &row);
                log::debug!(
                    "Mutation '{}' succeeded, local outcome: {}",
                    action,
                    outcome.map(|o| o.as_str()).unwrap_or("awaiting echo")
                );
                self.announce_success(action);
                Ok(row)
            }
            Err(err) => {
                self.report_failure(action, &err);
                Err(err)
            }
        }
    }

    /// Validates `input`, then runs the mutation built from it.
    ///
    /// Invalid input publishes a warning and never reaches the backend.
    pub async fn run_validated<I, T, F, Fut>(
        &self,
        action: &str,
        input: I,
        strategy: EchoStrategy,
        list: &SharedReconciler<T>,
        call: F,
    ) -> Result<T>
    where
        I: Validate,
        T: Clone + 'static,
        F: FnOnce(I) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Err(err) = input.validate() {
            log::info!("Rejected '{}' before calling the backend: {}", action, err);
            self.notifications.publish(
                Notification::warning("Check your input", err.to_string()).with_topic(
                    NotificationTopic::ValidationFailed {
                        action: action.to_string(),
                    },
                ),
            );
            return Err(Error::Validation(err));
        }
        self.run(action, strategy, list, call(input)).await
    }

    /// Awaits a delete call, then removes `id` locally.
    ///
    /// `announce` is published on success so other pages that may miss the
    /// realtime delete can drop the row too.
    pub async fn run_delete<T, Fut>(
        &self,
        action: &str,
        list: &SharedReconciler<T>,
        id: &str,
        announce: Option<Notification>,
        call: Fut,
    ) -> Result<()>
    where
        T: Clone + 'static,
        Fut: Future<Output = Result<()>>,
    {
        match call.await {
            Ok(()) => {
                lock_shared(list).apply(ChangeEvent::delete(id));
                if let Some(notification) = announce {
                    self.notifications.publish(notification);
                }
                self.announce_success(action);
                Ok(())
            }
            Err(err) => {
                self.report_failure(action, &err);
                Err(err)
            }
        }
    }

    fn announce_success(&self, action: &str) {
        if self.success_toasts {
            self.notifications.publish(Notification::success(
                "Done",
                format!("Request to {} completed.", action),
            ));
        }
    }

    fn report_failure(&self, action: &str, err: &Error) {
        log::error!("Failed to {}: {}", action, err);
        let notification = if err.is_not_found() {
            Notification::warning("Not available", "This item no longer exists.").with_topic(
                NotificationTopic::MutationFailed {
                    action: action.to_string(),
                },
            )
        } else {
            Notification::mutation_failed(action)
        };
        self.notifications.publish(notification);
    }
}

fn reflect<T: Clone + 'static>(
    list: &SharedReconciler<T>,
    strategy: EchoStrategy,
    row: &T,
) -> Option<ApplyOutcome> {
    let mut list = lock_shared(list);
    match strategy {
        EchoStrategy::PatchLocal => Some(list.apply(ChangeEvent::Update(row.clone()))),
        EchoStrategy::RemoveLocal => {
            let id = list.key_of(row);
            Some(list.apply(ChangeEvent::delete(id)))
        }
        EchoStrategy::AwaitEcho => None,
    }
}
