//! Filter evaluation for in-memory queries
//!
//! Numbers are compared as `f64` regardless of how they were written, so
//! `18` matches `18.0`. Values of different kinds never order against each
//! other and ordered comparisons between them are simply false.

use crate::firestore::field_value::{FieldFilter, FilterOperator, MapValue, Value};
use std::cmp::Ordering;

/// Borrowed, comparable view of a field value
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(&'a MapValue),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(b) => Comparable::Bool(*b),
            // Integers beyond f64 precision compare approximately
            Value::Number(n) => n.as_f64().map_or(Comparable::Null, Comparable::Number),
            Value::String(s) => Comparable::String(s),
            Value::Array(items) => Comparable::Array(items.iter().map(Comparable::from).collect()),
            Value::Object(fields) => Comparable::Map(fields),
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, left)| {
                        b.get(key)
                            .is_some_and(|right| Comparable::from(left) == Comparable::from(right))
                    })
            }
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Whether `fields` satisfy every filter
pub(crate) fn matches_all(fields: &MapValue, filters: &[FieldFilter]) -> bool {
    filters.iter().all(|filter| matches(fields, filter))
}

/// Whether `fields` satisfy one filter; a missing field never matches
pub(crate) fn matches(fields: &MapValue, filter: &FieldFilter) -> bool {
    let Some(field) = lookup(fields, &filter.field_path) else {
        return false;
    };
    let left = Comparable::from(field);
    let right = Comparable::from(&filter.value);

    match filter.op {
        FilterOperator::Equal => left == right,
        FilterOperator::LessThan => left.partial_cmp(&right) == Some(Ordering::Less),
        FilterOperator::LessThanOrEqual => matches!(
            left.partial_cmp(&right),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::GreaterThan => left.partial_cmp(&right) == Some(Ordering::Greater),
        FilterOperator::GreaterThanOrEqual => matches!(
            left.partial_cmp(&right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::ArrayContains => match left {
            Comparable::Array(items) => items.iter().any(|item| item == &right),
            _ => false,
        },
    }
}

/// Resolve a dotted field path inside nested maps
pub(crate) fn lookup<'a>(fields: &'a MapValue, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
