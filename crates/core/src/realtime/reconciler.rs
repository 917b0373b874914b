//! In-memory list kept consistent with a change feed.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ChangeEvent, Identified, ListFilter, LogObserver, ReconcileObserver, ReconcileRecord};

/// What applying one event did to the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApplyOutcome {
    /// New row added.
    Inserted,
    /// Existing row replaced in place.
    Replaced,
    /// Row left the list (delete, or update out of the filter).
    Removed,
    /// Insert for an id already present.
    Duplicate,
    /// Row does not match the filter and was not present.
    Filtered,
    /// Delete for an id not present.
    Missing,
    /// Event without a usable id.
    Malformed,
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Inserted => "inserted",
            ApplyOutcome::Replaced => "replaced",
            ApplyOutcome::Removed => "removed",
            ApplyOutcome::Duplicate => "duplicate",
            ApplyOutcome::Filtered => "filtered",
            ApplyOutcome::Missing => "missing",
            ApplyOutcome::Malformed => "malformed",
        }
    }

    /// Whether the visible list changed.
    pub fn changed(&self) -> bool {
        matches!(
            self,
            ApplyOutcome::Inserted | ApplyOutcome::Replaced | ApplyOutcome::Removed
        )
    }
}

/// Where newly arriving rows land.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InsertPosition {
    /// Most recent first.
    #[default]
    Front,
    /// Append, for chronological views such as chat.
    Back,
}

type IdExtractor<T> = Arc<dyn for<'a> Fn(&'a T) -> &'a str + Send + Sync>;

/// Reconciler shared between a feed task and mutation handlers.
pub type SharedReconciler<T> = Arc<Mutex<Reconciler<T>>>;

/// Keeps one list of rows consistent with a live change feed.
///
/// At most one row per id is ever held. Rows keep the position they had
/// when they arrived; nothing is re-sorted.
pub struct Reconciler<T> {
    entity: &'static str,
    rows: Vec<T>,
    filter: ListFilter<T>,
    id_of: IdExtractor<T>,
    position: InsertPosition,
    observer: Arc<dyn ReconcileObserver>,
    journal: Option<Vec<ChangeEvent<T>>>,
}

impl<T: Clone + 'static> Reconciler<T> {
    pub fn new<F>(entity: &'static str, filter: ListFilter<T>, id_of: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> &'a str + Send + Sync + 'static,
    {
        Self {
            entity,
            rows: Vec::new(),
            filter,
            id_of: Arc::new(id_of),
            position: InsertPosition::Front,
            observer: Arc::new(LogObserver),
            journal: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReconcileObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_insert_position(mut self, position: InsertPosition) -> Self {
        self.position = position;
        self
    }

    pub fn into_shared(self) -> SharedReconciler<T> {
        Arc::new(Mutex::new(self))
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Id of `row` as this list keys it.
    pub fn key_of(&self, row: &T) -> String {
        (self.id_of)(row).to_string()
    }

    /// Replaces the list with a freshly fetched one.
    ///
    /// Rows outside the filter are dropped and duplicate ids keep their
    /// first occurrence.
    pub fn load(&mut self, rows: Vec<T>) {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            let id = (self.id_of)(&row);
            if id.is_empty() || !self.filter.matches(&row) {
                continue;
            }
            if seen.insert(id.to_string()) {
                kept.push(row);
            }
        }
        log::debug!(
            target: "hnld::reconcile",
            "entity={} loaded={}",
            self.entity,
            kept.len()
        );
        self.rows = kept;
    }

    /// Starts keeping a copy of every applied event, so a fetch that was
    /// running meanwhile can be loaded with [`Reconciler::load_journaled`].
    pub fn begin_journal(&mut self) {
        self.journal = Some(Vec::new());
    }

    /// Drops the journal without touching the list.
    pub fn discard_journal(&mut self) {
        self.journal = None;
    }

    /// Loads `rows`, then re-applies the events journaled since
    /// [`Reconciler::begin_journal`] in arrival order.
    pub fn load_journaled(&mut self, rows: Vec<T>) {
        let replay = self.journal.take().unwrap_or_default();
        self.load(rows);
        if !replay.is_empty() {
            log::debug!(
                target: "hnld::reconcile",
                "entity={} replaying={}",
                self.entity,
                replay.len()
            );
        }
        for event in replay {
            self.apply(event);
        }
    }

    /// Merges one change event into the list.
    pub fn apply(&mut self, event: ChangeEvent<T>) -> ApplyOutcome {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(event.clone());
        }
        let operation = event.operation();
        let (id, outcome) = match event {
            ChangeEvent::Insert(row) => {
                let id = (self.id_of)(&row).to_string();
                let outcome = self.apply_insert(&id, row);
                (id, outcome)
            }
            ChangeEvent::Update(row) => {
                let id = (self.id_of)(&row).to_string();
                let outcome = self.apply_update(&id, row);
                (id, outcome)
            }
            ChangeEvent::Delete { id } => {
                let outcome = self.apply_delete(&id);
                (id, outcome)
            }
        };
        self.observer.on_applied(&ReconcileRecord {
            entity: self.entity,
            id,
            operation,
            outcome,
        });
        outcome
    }

    /// Reports an event that could not be decoded.
    pub fn reject(&self, reason: &str) {
        self.observer.on_rejected(self.entity, reason);
    }

    fn apply_insert(&mut self, id: &str, row: T) -> ApplyOutcome {
        if id.is_empty() {
            return ApplyOutcome::Malformed;
        }
        if self.position_of(id).is_some() {
            return ApplyOutcome::Duplicate;
        }
        if !self.filter.matches(&row) {
            return ApplyOutcome::Filtered;
        }
        self.push(row);
        ApplyOutcome::Inserted
    }

    fn apply_update(&mut self, id: &str, row: T) -> ApplyOutcome {
        if id.is_empty() {
            return ApplyOutcome::Malformed;
        }
        let matches = self.filter.matches(&row);
        match (self.position_of(id), matches) {
            (Some(index), true) => {
                self.rows[index] = row;
                ApplyOutcome::Replaced
            }
            (Some(index), false) => {
                self.rows.remove(index);
                ApplyOutcome::Removed
            }
            (None, true) => {
                self.push(row);
                ApplyOutcome::Inserted
            }
            (None, false) => ApplyOutcome::Filtered,
        }
    }

    fn apply_delete(&mut self, id: &str) -> ApplyOutcome {
        if id.is_empty() {
            return ApplyOutcome::Malformed;
        }
        match self.position_of(id) {
            Some(index) => {
                self.rows.remove(index);
                ApplyOutcome::Removed
            }
            None => ApplyOutcome::Missing,
        }
    }

    fn push(&mut self, row: T) {
        match self.position {
            InsertPosition::Front => self.rows.insert(0, row),
            InsertPosition::Back => self.rows.push(row),
        }
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|row| (self.id_of)(row) == id)
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.rows.clone()
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.position_of(id).map(|index| &self.rows[index])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position_of(id).is_some()
    }

    pub fn ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| (self.id_of)(row).to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T: Identified + Clone + 'static> Reconciler<T> {
    /// Reconciler keyed by the row's own id.
    pub fn for_records(filter: ListFilter<T>) -> Self {
        Self::new(T::ENTITY, filter, <T as Identified>::id)
    }
}

/// Locks a shared reconciler, recovering the list if a holder panicked.
pub(crate) fn lock<T>(shared: &Mutex<Reconciler<T>>) -> MutexGuard<'_, Reconciler<T>> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::{RecordingObserver, StatusBearing};

    #[derive(Clone, Debug, PartialEq)]
    struct Market {
        id: String,
        status: &'static str,
    }

    impl Identified for Market {
        const ENTITY: &'static str = "market";
        fn id(&self) -> &str {
            &self.id
        }
    }

    impl StatusBearing for Market {
        type Status = &'static str;
        fn status(&self) -> &'static str {
            self.status
        }
    }

    fn market(id: &str, status: &'static str) -> Market {
        Market {
            id: id.to_string(),
            status,
        }
    }

    fn active_only() -> Reconciler<Market> {
        Reconciler::for_records(ListFilter::status_in(["active"]))
    }

    #[test]
    fn test_update_out_of_filter_removes_and_is_idempotent() {
        let mut list = active_only();
        list.load(vec![market("A", "active")]);

        let outcome = list.apply(ChangeEvent::Update(market("A", "cancelled")));
        assert_eq!(outcome, ApplyOutcome::Removed);
        assert!(list.is_empty());

        let outcome = list.apply(ChangeEvent::Update(market("A", "cancelled")));
        assert_eq!(outcome, ApplyOutcome::Filtered);
        assert!(list.is_empty());
    }

    #[test]
    fn test_insert_prepends_and_dedupes() {
        let mut list = active_only();
        list.load(vec![market("A", "active")]);

        assert_eq!(
            list.apply(ChangeEvent::Insert(market("B", "active"))),
            ApplyOutcome::Inserted
        );
        assert_eq!(
            list.apply(ChangeEvent::Insert(market("B", "active"))),
            ApplyOutcome::Duplicate
        );
        assert_eq!(list.ids(), vec!["B", "A"]);
    }

    #[test]
    fn test_insert_outside_filter_is_ignored() {
        let mut list = active_only();
        assert_eq!(
            list.apply(ChangeEvent::Insert(market("A", "closed"))),
            ApplyOutcome::Filtered
        );
        assert!(list.is_empty());
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut list = Reconciler::for_records(ListFilter::all());
        list.load(vec![
            market("A", "active"),
            market("B", "active"),
            market("C", "active"),
        ]);
        list.apply(ChangeEvent::Update(market("B", "closed")));
        assert_eq!(list.ids(), vec!["A", "B", "C"]);
        assert_eq!(list.get("B").map(|m| m.status), Some("closed"));
    }

    #[test]
    fn test_update_for_absent_row_reactivates() {
        let mut list = active_only();
        let outcome = list.apply(ChangeEvent::Update(market("A", "active")));
        assert_eq!(outcome, ApplyOutcome::Inserted);
        assert!(list.contains("A"));
    }

    #[test]
    fn test_stale_fetch_keeps_events_applied_meanwhile() {
        let mut list = active_only();
        list.load(vec![market("A", "active"), market("B", "active")]);

        list.begin_journal();
        list.apply(ChangeEvent::Update(market("A", "closed")));
        list.apply(ChangeEvent::Insert(market("C", "active")));
        list.apply(ChangeEvent::delete("B"));

        // Fetch started before the three events above.
        list.load_journaled(vec![market("A", "active"), market("B", "active")]);
        assert_eq!(list.ids(), vec!["C"]);

        // The journal is consumed by the load.
        list.apply(ChangeEvent::Insert(market("D", "active")));
        list.load_journaled(vec![market("E", "active")]);
        assert_eq!(list.ids(), vec!["E"]);
    }

    #[test]
    fn test_discarded_journal_is_not_replayed() {
        let mut list = active_only();
        list.begin_journal();
        list.apply(ChangeEvent::Insert(market("A", "active")));
        list.discard_journal();
        list.load_journaled(vec![market("B", "active")]);
        assert_eq!(list.ids(), vec!["B"]);
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let mut list = active_only();
        list.load(vec![market("A", "active")]);
        assert_eq!(list.apply(ChangeEvent::delete("Z")), ApplyOutcome::Missing);
        assert_eq!(list.snapshot(), vec![market("A", "active")]);
    }

    #[test]
    fn test_empty_id_is_malformed() {
        let mut list = active_only();
        assert_eq!(
            list.apply(ChangeEvent::Insert(market("", "active"))),
            ApplyOutcome::Malformed
        );
        assert_eq!(list.apply(ChangeEvent::delete("")), ApplyOutcome::Malformed);
        assert!(list.is_empty());
    }

    #[test]
    fn test_load_filters_and_dedupes() {
        let mut list = active_only();
        list.load(vec![
            market("A", "active"),
            market("B", "closed"),
            market("A", "active"),
            market("C", "active"),
        ]);
        assert_eq!(list.ids(), vec!["A", "C"]);
    }

    #[test]
    fn test_back_insert_position_appends() {
        let mut list = Reconciler::for_records(ListFilter::all())
            .with_insert_position(InsertPosition::Back);
        list.apply(ChangeEvent::Insert(market("A", "active")));
        list.apply(ChangeEvent::Insert(market("B", "active")));
        assert_eq!(list.ids(), vec!["A", "B"]);
    }

    #[test]
    fn test_observer_sees_every_step() {
        let observer = RecordingObserver::new();
        let mut list = active_only().with_observer(Arc::new(observer.clone()));
        list.apply(ChangeEvent::Insert(market("A", "active")));
        list.apply(ChangeEvent::Update(market("A", "resolved")));
        list.apply(ChangeEvent::delete("A"));

        assert_eq!(
            observer.outcomes(),
            vec![
                ApplyOutcome::Inserted,
                ApplyOutcome::Removed,
                ApplyOutcome::Missing
            ]
        );
        let records = observer.records();
        assert!(records.iter().all(|r| r.entity == "market" && r.id == "A"));
    }

    #[test]
    fn test_custom_id_extractor() {
        let mut list: Reconciler<(String, u32)> =
            Reconciler::new("pair", ListFilter::all(), |row: &(String, u32)| row.0.as_str());
        list.apply(ChangeEvent::Insert(("x".to_string(), 1)));
        list.apply(ChangeEvent::Update(("x".to_string(), 2)));
        assert_eq!(list.snapshot(), vec![("x".to_string(), 2)]);
    }
}
