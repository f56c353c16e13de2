//! Type validation of record values
//!
//! The validator visits every declared attribute, skips nulls, and collects
//! one violation per attribute whose value is not an accepted representation
//! of its kind. It never stops at the first violation.

use keyrecord_core::{AttributeType, ValidationErrors, Value};
use rustc_hash::FxHashMap;

use crate::schema::AttributeSchema;

/// Checks values against an attribute schema
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    schema: &'a AttributeSchema,
}

impl<'a> Validator<'a> {
    /// Validator for one schema
    pub fn new(schema: &'a AttributeSchema) -> Self {
        Self { schema }
    }

    /// Every violation found in `values`
    ///
    /// Values for undeclared names are ignored; absent values count as null.
    pub fn validate(&self, values: &FxHashMap<String, Value>) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (name, kind) in self.schema.iter() {
            let Some(value) = values.get(name) else {
                continue;
            };
            if value.is_null() || kind.accepts(value) {
                continue;
            }
            errors.add(name, message(kind, value));
        }
        errors
    }
}

/// Violation message, e.g. `should be one of Int, Time but is String`
pub fn message(kind: AttributeType, value: &Value) -> String {
    match kind.accepted() {
        [single] => format!("should be {} but is {}", single, value.type_name()),
        many => format!(
            "should be one of {} but is {}",
            many.join(", "),
            value.type_name()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn schema() -> AttributeSchema {
        let mut schema = AttributeSchema::new();
        schema.declare("name", AttributeType::String).unwrap();
        schema.declare("enabled", AttributeType::Boolean).unwrap();
        schema.declare("checked_at", AttributeType::Timestamp).unwrap();
        schema.declare("tags", AttributeType::Set).unwrap();
        schema.declare("extra", AttributeType::JsonString).unwrap();
        schema
    }

    fn values(pairs: Vec<(&str, Value)>) -> FxHashMap<String, Value> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_valid_values_pass() {
        let schema = schema();
        let errors = Validator::new(&schema).validate(&values(vec![
            ("name", Value::from("svc")),
            ("enabled", Value::Bool(false)),
            ("checked_at", Value::Time(Utc::now())),
            ("extra", Value::Int(3)),
        ]));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_timestamp_accepts_numbers() {
        let schema = schema();
        let errors =
            Validator::new(&schema).validate(&values(vec![("checked_at", Value::Int(1_700_000_000))]));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_nulls_are_skipped() {
        let schema = schema();
        let errors = Validator::new(&schema).validate(&values(vec![
            ("name", Value::Null),
            ("enabled", Value::Null),
        ]));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_every_violation_is_collected() {
        let schema = schema();
        let errors = Validator::new(&schema).validate(&values(vec![
            ("name", Value::Int(1)),
            ("enabled", Value::from("true")),
            ("tags", Value::from(vec!["a"])),
        ]));

        assert_eq!(errors.len(), 3);
        assert!(errors.contains("name"));
        assert!(errors.contains("enabled"));
        assert!(errors.contains("tags"));
    }

    #[test]
    fn test_messages_name_accepted_representations() {
        assert_eq!(
            message(AttributeType::Boolean, &Value::from("true")),
            "should be Bool but is String"
        );
        assert_eq!(
            message(AttributeType::Timestamp, &Value::from("noon")),
            "should be one of Int, Time but is String"
        );
    }
}
