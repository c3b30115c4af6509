//! Field values and native field filters
//!
//! Document data crosses the bridge as JSON. A document's fields are a
//! [`MapValue`]; a single field is a [`Value`].

use crate::error::BridgeError;
use serde::Serialize;

/// A single field value
pub use serde_json::Value;

/// Map of field names to values, the body of a document
pub type MapValue = serde_json::Map<String, Value>;

/// Serialize caller data into document fields
///
/// Anything that does not serialize to a JSON object is rejected, since a
/// document is always a map of fields.
pub fn to_map_value<T: Serialize + ?Sized>(data: &T) -> Result<MapValue, BridgeError> {
    match serde_json::to_value(data) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(BridgeError::InvalidData(format!(
            "expected an object, got {}",
            kind_of(&other)
        ))),
        Err(e) => Err(BridgeError::InvalidData(e.to_string())),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Native filter operators understood by the underlying client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// field == value
    Equal,

    /// field < value
    LessThan,

    /// field <= value
    LessThanOrEqual,

    /// field > value
    GreaterThan,

    /// field >= value
    GreaterThanOrEqual,

    /// field array contains value
    ArrayContains,
}

impl FilterOperator {
    /// Get the operator name as the Firestore API spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "EQUAL",
            FilterOperator::LessThan => "LESS_THAN",
            FilterOperator::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            FilterOperator::GreaterThan => "GREATER_THAN",
            FilterOperator::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            FilterOperator::ArrayContains => "ARRAY_CONTAINS",
        }
    }
}

/// A single-field filter in the underlying client's terms
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    /// Dotted field path, e.g. `"address.city"`
    pub field_path: String,
    /// Comparison operator
    pub op: FilterOperator,
    /// Operand
    pub value: Value,
}

impl FieldFilter {
    /// Create a new field filter
    pub fn new(field_path: impl Into<String>, op: FilterOperator, value: Value) -> Self {
        Self {
            field_path: field_path.into(),
            op,
            value,
        }
    }
}
