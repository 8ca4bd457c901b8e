//! Typed list-query options.
//!
//! Filters, sorts and expansions are plain values here; each backend renders
//! them into its own query language (or evaluates them directly).

use std::cmp::Ordering;

use serde_json::Value;

use super::Record;
use crate::types::Collection;

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Field equals value.
    Eq,
    /// Field differs from value.
    NotEq,
}

/// A single `field <op> value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Op,
    pub value: Value,
}

impl Condition {
    /// Evaluate the condition against a record.
    ///
    /// A missing field compares as JSON `null`.
    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.lookup(&self.field).unwrap_or(Value::Null);
        match self.op {
            Op::Eq => actual == self.value,
            Op::NotEq => actual != self.value,
        }
    }
}

/// A conjunction of conditions. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// The match-all filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op: Op::Eq,
            value: value.into(),
        });
        self
    }

    /// Add an inequality condition.
    pub fn ne(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op: Op::NotEq,
            value: value.into(),
        });
        self
    }

    /// Combine two filters into one conjunction.
    pub fn and(mut self, other: Filter) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate the filter against a record.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort order of a list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Newest records first, the usual feed order.
    pub fn newest_first() -> Self {
        Self::desc("created")
    }

    /// Oldest records first, the usual comment-thread order.
    pub fn oldest_first() -> Self {
        Self::asc("created")
    }

    /// Compare two records under this sort.
    ///
    /// Creation time sorts chronologically; other fields compare as JSON
    /// strings or numbers, with missing values first.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ordering = match self.field.as_str() {
            "created" => a.created.cmp(&b.created),
            "updated" => a.updated.cmp(&b.updated),
            field => compare_values(a.lookup(field).as_ref(), b.lookup(field).as_ref()),
        };

        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// A relation to expand inline in returned records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expand {
    /// `field` holds the id of a record in `collection`.
    Relation { field: String, collection: Collection },

    /// Records of `collection` whose `field` holds this record's id.
    BackRelation { collection: Collection, field: String },
}

impl Expand {
    pub fn relation(field: impl Into<String>, collection: Collection) -> Self {
        Expand::Relation {
            field: field.into(),
            collection,
        }
    }

    pub fn back_relation(collection: Collection, field: impl Into<String>) -> Self {
        Expand::BackRelation {
            collection,
            field: field.into(),
        }
    }

    /// The key the expansion is requested and returned under.
    pub fn key(&self) -> String {
        match self {
            Expand::Relation { field, .. } => field.clone(),
            Expand::BackRelation { collection, field } => {
                format!("{}_via_{}", collection, field)
            }
        }
    }
}

/// Options of a list query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub expand: Vec<Expand>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn expand(mut self, expand: Expand) -> Self {
        self.expand.push(expand);
        self
    }
}
