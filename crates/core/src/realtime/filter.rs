//! Per-page filter predicates.

use std::fmt;
use std::sync::Arc;

/// Rows that carry a lifecycle status.
pub trait StatusBearing {
    type Status: Copy + PartialEq + Send + Sync + 'static;

    fn status(&self) -> Self::Status;
}

/// Rows that belong to a user.
pub trait Owned {
    fn owner_id(&self) -> &str;
}

/// Predicate deciding whether a row belongs in a list.
///
/// Pages disagree on what they show (some drop cancelled rows, others keep
/// them in a separate section), so every list takes its own filter.
pub struct ListFilter<T> {
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> Clone for ListFilter<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
        }
    }
}

impl<T> fmt::Debug for ListFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListFilter").finish_non_exhaustive()
    }
}

impl<T: 'static> ListFilter<T> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    pub fn all() -> Self {
        Self::new(|_| true)
    }

    pub fn matches(&self, row: &T) -> bool {
        (self.predicate)(row)
    }

    pub fn and(self, other: ListFilter<T>) -> Self {
        Self::new(move |row| self.matches(row) && other.matches(row))
    }

    pub fn not(self) -> Self {
        Self::new(move |row| !self.matches(row))
    }
}

impl<T: StatusBearing + 'static> ListFilter<T> {
    pub fn status_in(statuses: impl IntoIterator<Item = T::Status>) -> Self {
        let statuses: Vec<T::Status> = statuses.into_iter().collect();
        Self::new(move |row| statuses.contains(&row.status()))
    }
}

impl<T: Owned + 'static> ListFilter<T> {
    pub fn owned_by(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self::new(move |row| row.owner_id() == user_id)
    }

    /// "Not mine" lists: offers from other users.
    pub fn not_owned_by(user_id: impl Into<String>) -> Self {
        Self::owned_by(user_id).not()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Status {
        Open,
        Done,
    }

    struct Row {
        owner: &'static str,
        status: Status,
    }

    impl StatusBearing for Row {
        type Status = Status;
        fn status(&self) -> Status {
            self.status
        }
    }

    impl Owned for Row {
        fn owner_id(&self) -> &str {
            self.owner
        }
    }

    #[test]
    fn test_status_and_owner_filters_compose() {
        let filter = ListFilter::<Row>::status_in([Status::Open])
            .and(ListFilter::not_owned_by("me"));

        assert!(filter.matches(&Row {
            owner: "you",
            status: Status::Open
        }));
        assert!(!filter.matches(&Row {
            owner: "me",
            status: Status::Open
        }));
        assert!(!filter.matches(&Row {
            owner: "you",
            status: Status::Done
        }));
    }

    #[test]
    fn test_all_accepts_everything() {
        let filter = ListFilter::<Row>::all();
        assert!(filter.matches(&Row {
            owner: "me",
            status: Status::Done
        }));
    }
}
