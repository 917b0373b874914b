//! Structured reporting of reconciliation outcomes.

use std::sync::{Arc, Mutex};

use super::{ApplyOutcome, ChangeOperation};

/// One reconciliation step: which entity, which row, what happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileRecord {
    pub entity: &'static str,
    pub id: String,
    pub operation: ChangeOperation,
    pub outcome: ApplyOutcome,
}

/// Receives every reconciliation step and every dropped event.
///
/// Implementations must be cheap: they run under the list lock.
pub trait ReconcileObserver: Send + Sync {
    fn on_applied(&self, record: &ReconcileRecord);

    fn on_rejected(&self, entity: &'static str, reason: &str);
}

/// Writes reconciliation steps to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl ReconcileObserver for LogObserver {
    fn on_applied(&self, record: &ReconcileRecord) {
        let level = match record.outcome {
            ApplyOutcome::Malformed => log::Level::Warn,
            _ => log::Level::Debug,
        };
        log::log!(
            target: "hnld::reconcile",
            level,
            "entity={} id={} operation={} outcome={}",
            record.entity,
            record.id,
            record.operation,
            record.outcome.as_str()
        );
    }

    fn on_rejected(&self, entity: &'static str, reason: &str) {
        log::warn!(
            target: "hnld::reconcile",
            "entity={} outcome=dropped reason={}",
            entity,
            reason
        );
    }
}

/// Collects reconciliation steps for assertions in tests.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    records: Arc<Mutex<Vec<ReconcileRecord>>>,
    rejections: Arc<Mutex<Vec<String>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ReconcileRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn outcomes(&self) -> Vec<ApplyOutcome> {
        self.records().into_iter().map(|r| r.outcome).collect()
    }

    pub fn rejections(&self) -> Vec<String> {
        self.rejections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ReconcileObserver for RecordingObserver {
    fn on_applied(&self, record: &ReconcileRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
    }

    fn on_rejected(&self, _entity: &'static str, reason: &str) {
        self.rejections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reason.to_string());
    }
}
