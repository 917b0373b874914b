//! Property-based integration tests for list reconciliation.
//!
//! These tests replay random event sequences through a `Reconciler` and check
//! the guarantees every page relies on, using the `proptest` crate for
//! random test case generation.

use std::collections::{BTreeMap, HashSet};

use hnld_core::realtime::{
    ApplyOutcome, ChangeEvent, Identified, ListFilter, RawChangeEvent, Reconciler,
    StatusBearing,
};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    Active,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Row {
    id: String,
    status: Status,
    version: u8,
}

impl Identified for Row {
    const ENTITY: &'static str = "row";

    fn id(&self) -> &str {
        &self.id
    }
}

impl StatusBearing for Row {
    type Status = Status;

    fn status(&self) -> Status {
        self.status
    }
}

fn active_only() -> Reconciler<Row> {
    Reconciler::for_records(ListFilter::status_in([Status::Active]))
}

// =============================================================================
// Generators
// =============================================================================

/// Ids come from a small pool so sequences hit the same rows repeatedly.
fn arb_id() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(str::to_string)
}

fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![Just(Status::Active), Just(Status::Cancelled)]
}

fn arb_row() -> impl Strategy<Value = Row> {
    (arb_id(), arb_status(), any::<u8>()).prop_map(|(id, status, version)| Row {
        id,
        status,
        version,
    })
}

fn arb_event() -> impl Strategy<Value = ChangeEvent<Row>> {
    prop_oneof![
        arb_row().prop_map(ChangeEvent::Insert),
        arb_row().prop_map(ChangeEvent::Update),
        arb_id().prop_map(|id| ChangeEvent::Delete { id }),
    ]
}

fn arb_events(max: usize) -> impl Strategy<Value = Vec<ChangeEvent<Row>>> {
    proptest::collection::vec(arb_event(), 0..=max)
}

/// Reference model: last known row per id, or nothing.
fn expected_rows(events: &[ChangeEvent<Row>]) -> BTreeMap<String, Row> {
    let mut model = BTreeMap::new();
    for event in events {
        match event {
            ChangeEvent::Insert(row) => {
                if !model.contains_key(&row.id) && row.status == Status::Active {
                    model.insert(row.id.clone(), row.clone());
                }
            }
            ChangeEvent::Update(row) => {
                if row.status == Status::Active {
                    model.insert(row.id.clone(), row.clone());
                } else {
                    model.remove(&row.id);
                }
            }
            ChangeEvent::Delete { id } => {
                model.remove(id);
            }
        }
    }
    model
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any sequence of events leaves at most one entry per id.
    #[test]
    fn prop_at_most_one_entry_per_id(events in arb_events(40)) {
        let mut list = active_only();
        for event in events {
            list.apply(event);
        }
        let ids = list.ids();
        let unique: HashSet<&String> = ids.iter().collect();
        prop_assert_eq!(unique.len(), ids.len());
    }

    /// The list holds exactly the rows whose latest event leaves them visible.
    #[test]
    fn prop_matches_reference_model(events in arb_events(40)) {
        let mut list = active_only();
        for event in events.clone() {
            list.apply(event);
        }
        let actual: BTreeMap<String, Row> = list
            .snapshot()
            .into_iter()
            .map(|row| (row.id.clone(), row))
            .collect();
        prop_assert_eq!(actual, expected_rows(&events));
    }

    /// Applying the identical insert twice equals applying it once.
    #[test]
    fn prop_insert_is_idempotent(prefix in arb_events(20), row in arb_row()) {
        let mut once = active_only();
        let mut twice = active_only();
        for event in prefix {
            once.apply(event.clone());
            twice.apply(event);
        }
        once.apply(ChangeEvent::Insert(row.clone()));
        twice.apply(ChangeEvent::Insert(row.clone()));
        let second = twice.apply(ChangeEvent::Insert(row));

        prop_assert!(!second.changed());
        prop_assert_eq!(once.snapshot(), twice.snapshot());
    }

    /// An update for an absent id that matches the filter adds the row.
    #[test]
    fn prop_update_reactivates_absent_row(prefix in arb_events(20), id in arb_id(), version in any::<u8>()) {
        let mut list = active_only();
        for event in prefix {
            list.apply(event);
        }
        list.apply(ChangeEvent::delete(id.clone()));
        prop_assert!(!list.contains(&id));

        let row = Row { id: id.clone(), status: Status::Active, version };
        prop_assert_eq!(list.apply(ChangeEvent::Update(row.clone())), ApplyOutcome::Inserted);
        prop_assert_eq!(list.get(&id), Some(&row));
    }

    /// A delete for an absent id changes nothing.
    #[test]
    fn prop_delete_absent_is_noop(rows in proptest::collection::vec(arb_row(), 0..10)) {
        let mut list = active_only();
        list.load(rows);
        let before = list.snapshot();

        prop_assert_eq!(list.apply(ChangeEvent::delete("zz")), ApplyOutcome::Missing);
        prop_assert_eq!(list.snapshot(), before);
    }

    /// An update leaving the filter removes the row without any delete.
    #[test]
    fn prop_update_out_of_filter_removes(rows in proptest::collection::vec(arb_row(), 1..10)) {
        let mut list = active_only();
        list.load(rows);
        prop_assume!(!list.is_empty());

        let target = list.rows()[0].clone();
        let cancelled = Row { status: Status::Cancelled, ..target.clone() };
        prop_assert_eq!(list.apply(ChangeEvent::Update(cancelled)), ApplyOutcome::Removed);
        prop_assert!(!list.contains(&target.id));
    }

    /// Order of surviving rows is never rearranged by updates in place.
    #[test]
    fn prop_in_place_updates_keep_order(rows in proptest::collection::vec(arb_row(), 1..10), version in any::<u8>()) {
        let mut list = active_only();
        list.load(rows);
        let before = list.ids();
        for id in &before {
            list.apply(ChangeEvent::Update(Row { id: id.clone(), status: Status::Active, version }));
        }
        prop_assert_eq!(list.ids(), before);
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn cancelled_update_empties_active_list_and_stays_empty() {
    let mut list = active_only();
    list.load(vec![Row {
        id: "A".to_string(),
        status: Status::Active,
        version: 0,
    }]);

    let cancel = RawChangeEvent::update(
        "rows",
        serde_json::json!({ "id": "A", "status": "cancelled", "version": 1 }),
    );

    let first = list.apply(cancel.decode::<Row>().unwrap());
    assert_eq!(first, ApplyOutcome::Removed);
    assert!(list.snapshot().is_empty());

    let second = list.apply(cancel.decode::<Row>().unwrap());
    assert_eq!(second, ApplyOutcome::Filtered);
    assert!(list.snapshot().is_empty());
}

#[test]
fn cancelled_section_runs_as_second_list() {
    let mut active = active_only();
    let mut cancelled = Reconciler::for_records(ListFilter::status_in([Status::Cancelled]));
    let row = Row {
        id: "A".to_string(),
        status: Status::Active,
        version: 0,
    };
    active.load(vec![row.clone()]);
    cancelled.load(vec![row.clone()]);
    assert!(cancelled.is_empty());

    let update = ChangeEvent::Update(Row {
        status: Status::Cancelled,
        ..row
    });
    active.apply(update.clone());
    cancelled.apply(update);

    assert!(active.is_empty());
    assert_eq!(cancelled.ids(), vec!["A".to_string()]);
}
