//! Equality filters and their normalization into query predicates.

use crate::query::{Condition, Predicate};
use crate::types::{Record, RowValues};

/// A partial record read as "every listed column equals its value".
///
/// An empty filter matches every row.
///
/// ```rust
/// use sql_accessor::prelude::*;
///
/// let filter = Filter::new().eq("status", "active").eq("org_id", 7);
/// assert_eq!(filter.len(), 2);
/// assert!(Filter::all().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Record);

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The match-everything filter.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RowValues)> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_record(self) -> Record {
        self.0
    }
}

impl From<Record> for Filter {
    fn from(record: Record) -> Self {
        Self(record)
    }
}

/// Turns a [`Filter`] into a predicate the query builder can splice into `WHERE`.
pub trait FilterNormalizer: Send + Sync {
    fn normalize(&self, filter: &Filter) -> Predicate;
}

/// `column = value` for each entry; `Null` becomes `column IS NULL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualityNormalizer;

impl FilterNormalizer for EqualityNormalizer {
    fn normalize(&self, filter: &Filter) -> Predicate {
        let mut predicate = Predicate::new();
        for (column, value) in filter.iter() {
            predicate.and_where(Condition::eq(column.clone(), value.clone()));
        }
        predicate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Conjunction, Operator};

    #[test]
    fn empty_filter_normalizes_to_empty_predicate() {
        assert!(EqualityNormalizer.normalize(&Filter::all()).is_empty());
    }

    #[test]
    fn entries_become_and_joined_equalities() {
        let filter = Filter::new().eq("b", 2).eq("a", "x").eq("gone", RowValues::Null);
        let predicate = EqualityNormalizer.normalize(&filter);
        let clauses = predicate.clauses();
        assert_eq!(clauses.len(), 3);
        assert!(clauses.iter().all(|c| c.conjunction == Conjunction::And));
        // Record ordering is by column name.
        assert_eq!(
            clauses[0].condition,
            Condition::Compare {
                column: "a".into(),
                op: Operator::Eq,
                value: RowValues::Text("x".into()),
            }
        );
        assert_eq!(clauses[2].condition, Condition::is_null("gone"));
    }
}
