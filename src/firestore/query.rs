//! Query constraints and their translation to native filters
//!
//! Callers describe a collection query as an ordered list of
//! [`QueryConstraint`]s. [`translate`] turns them into the underlying client's
//! [`FieldFilter`]s, one per constraint, in input order. All filters of a
//! query are ANDed.
//!
//! The operator set is closed: an unknown operator string fails when the
//! constraint is deserialized, so no runtime validation happens here.

use super::collection_reference::CollectionReference;
use super::field_value::{FieldFilter, FilterOperator, Value};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Comparison operators a constraint may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryOperator {
    /// `==`
    #[serde(rename = "==")]
    Equal,
    /// `>=`
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    /// `<=`
    #[serde(rename = "<=")]
    LessThanOrEqual,
    /// `<`
    #[serde(rename = "<")]
    LessThan,
    /// `>`
    #[serde(rename = ">")]
    GreaterThan,
    /// `array-contains`
    #[serde(rename = "array-contains")]
    ArrayContains,
}

impl QueryOperator {
    /// The operator as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOperator::Equal => "==",
            QueryOperator::GreaterThanOrEqual => ">=",
            QueryOperator::LessThanOrEqual => "<=",
            QueryOperator::LessThan => "<",
            QueryOperator::GreaterThan => ">",
            QueryOperator::ArrayContains => "array-contains",
        }
    }

    fn to_native(self) -> FilterOperator {
        match self {
            QueryOperator::Equal => FilterOperator::Equal,
            QueryOperator::GreaterThanOrEqual => FilterOperator::GreaterThanOrEqual,
            QueryOperator::LessThanOrEqual => FilterOperator::LessThanOrEqual,
            QueryOperator::LessThan => FilterOperator::LessThan,
            QueryOperator::GreaterThan => FilterOperator::GreaterThan,
            QueryOperator::ArrayContains => FilterOperator::ArrayContains,
        }
    }
}

/// A single-field comparison constraint
///
/// # Example
/// ```
/// use firestore_bridge::firestore::{QueryConstraint, QueryOperator};
/// use serde_json::json;
///
/// let adults: QueryConstraint =
///     serde_json::from_value(json!({"fieldPath": "age", "opStr": ">=", "value": 18})).unwrap();
/// assert_eq!(adults, QueryConstraint::new("age", QueryOperator::GreaterThanOrEqual, json!(18)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConstraint {
    /// Dotted field path
    pub field_path: String,
    /// Comparison operator
    pub op_str: QueryOperator,
    /// Operand, opaque to the bridge
    pub value: Value,
}

impl QueryConstraint {
    /// Create a new constraint
    pub fn new(field_path: impl Into<String>, op: QueryOperator, value: impl Into<Value>) -> Self {
        Self {
            field_path: field_path.into(),
            op_str: op,
            value: value.into(),
        }
    }

    /// field == value
    pub fn where_equal_to(field_path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field_path, QueryOperator::Equal, value)
    }

    /// field < value
    pub fn where_less_than(field_path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field_path, QueryOperator::LessThan, value)
    }

    /// field <= value
    pub fn where_less_than_or_equal_to(
        field_path: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(field_path, QueryOperator::LessThanOrEqual, value)
    }

    /// field > value
    pub fn where_greater_than(field_path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field_path, QueryOperator::GreaterThan, value)
    }

    /// field >= value
    pub fn where_greater_than_or_equal_to(
        field_path: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(field_path, QueryOperator::GreaterThanOrEqual, value)
    }

    /// array field contains value
    pub fn where_array_contains(field_path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field_path, QueryOperator::ArrayContains, value)
    }
}

/// Translate constraints into native filters, preserving order
pub fn translate(constraints: &[QueryConstraint]) -> Vec<FieldFilter> {
    constraints
        .iter()
        .map(|constraint| {
            let filter = FieldFilter::new(
                constraint.field_path.clone(),
                constraint.op_str.to_native(),
                constraint.value.clone(),
            );
            trace!(
                field = %filter.field_path,
                op = filter.op.as_str(),
                value = %filter.value,
                "translated query constraint"
            );
            filter
        })
        .collect()
}

/// A collection query in the underlying client's terms
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection being queried
    pub collection: CollectionReference,
    /// Conjunction of filters, empty for an unfiltered query
    pub filters: Vec<FieldFilter>,
}

impl Query {
    /// Build a query over `collection` from caller constraints
    pub fn new(collection: CollectionReference, constraints: &[QueryConstraint]) -> Self {
        Self {
            collection,
            filters: translate(constraints),
        }
    }

    /// Whether the query has no filters
    pub fn is_unfiltered(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_translate_empty_is_unfiltered() {
        assert!(translate(&[]).is_empty());

        let query = Query::new(CollectionReference::parse("users").unwrap(), &[]);
        assert!(query.is_unfiltered());
    }

    #[test]
    fn test_translate_maps_each_operator() {
        let constraints = vec![
            QueryConstraint::where_equal_to("a", 1),
            QueryConstraint::where_greater_than_or_equal_to("b", 2),
            QueryConstraint::where_less_than_or_equal_to("c", 3),
            QueryConstraint::where_less_than("d", 4),
            QueryConstraint::where_greater_than("e", 5),
            QueryConstraint::where_array_contains("f", "x"),
        ];

        let ops: Vec<FilterOperator> = translate(&constraints).iter().map(|f| f.op).collect();

        assert_eq!(
            ops,
            vec![
                FilterOperator::Equal,
                FilterOperator::GreaterThanOrEqual,
                FilterOperator::LessThanOrEqual,
                FilterOperator::LessThan,
                FilterOperator::GreaterThan,
                FilterOperator::ArrayContains,
            ]
        );
    }

    #[test]
    fn test_translate_preserves_order_and_operands() {
        let constraints = vec![
            QueryConstraint::where_equal_to("city", "SF"),
            QueryConstraint::where_greater_than("age", 21),
        ];

        let filters = translate(&constraints);

        assert_eq!(filters[0], FieldFilter::new("city", FilterOperator::Equal, json!("SF")));
        assert_eq!(filters[1], FieldFilter::new("age", FilterOperator::GreaterThan, json!(21)));
    }

    #[test]
    fn test_operator_wire_names() {
        for op in [
            QueryOperator::Equal,
            QueryOperator::GreaterThanOrEqual,
            QueryOperator::LessThanOrEqual,
            QueryOperator::LessThan,
            QueryOperator::GreaterThan,
            QueryOperator::ArrayContains,
        ] {
            let json = serde_json::to_value(op).unwrap();
            assert_eq!(json, json!(op.as_str()));
        }
    }

    #[test]
    fn test_unknown_operator_rejected_at_boundary() {
        let result: Result<QueryConstraint, _> =
            serde_json::from_value(json!({"fieldPath": "age", "opStr": "!=", "value": 1}));
        assert!(result.is_err());

        let result: Result<QueryConstraint, _> =
            serde_json::from_value(json!({"fieldPath": "tags", "opStr": "array-contains-any", "value": []}));
        assert!(result.is_err());
    }
}
