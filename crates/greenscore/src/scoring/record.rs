use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::rubric::{ExpectedValue, InputKind};

/// Scalar supplied by a caller for one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl InputValue {
    pub fn is_null(&self) -> bool {
        matches!(self, InputValue::Null)
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            InputValue::Null => "null",
            InputValue::Boolean(_) => "boolean",
            InputValue::Number(_) => "number",
            InputValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputValue::Null => write!(f, "null"),
            InputValue::Boolean(flag) => write!(f, "{flag}"),
            InputValue::Number(number) => write!(f, "{number}"),
            InputValue::Text(text) => write!(f, "{text:?}"),
        }
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for InputValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl InputKind {
    /// Value an unanswered input takes: 0 for numbers, false for booleans, null for enums.
    pub fn default_value(self) -> InputValue {
        match self {
            InputKind::Number => InputValue::Number(0.0),
            InputKind::Boolean => InputValue::Boolean(false),
            InputKind::Enum => InputValue::Null,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            InputKind::Number => "number",
            InputKind::Boolean => "boolean",
            InputKind::Enum => "enum",
        }
    }
}

/// Flat mapping from parameter key to value for a single evaluation request.
///
/// Absent and null entries both resolve through [`InputKind::default_value`], so an
/// unanswered input behaves exactly like an explicit zero or `false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingRecord {
    values: BTreeMap<String, InputValue>,
}

impl BuildingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<InputValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&InputValue> {
        self.values.get(key).filter(|value| !value.is_null())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &InputValue)> {
        self.values.iter()
    }

    /// Numeric view of `key`. Only an absent or null entry is defaulted; any other
    /// non-number is rejected, matching the shape check applied to named answers.
    pub fn number(&self, key: &str) -> Result<f64, EngineError> {
        match self.value_or_default(key, InputKind::Number) {
            InputValue::Number(number) => Ok(number),
            other => Err(invalid(key, InputKind::Number, &other)),
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(InputValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Equality against a rubric-declared value, defaulting a missing entry to the
    /// expected value's own kind.
    pub fn matches(&self, key: &str, expected: &ExpectedValue) -> Result<bool, EngineError> {
        let matched = match expected {
            ExpectedValue::Boolean(flag) => {
                match self.value_or_default(key, InputKind::Boolean) {
                    InputValue::Boolean(actual) => actual == *flag,
                    other => return Err(invalid(key, InputKind::Boolean, &other)),
                }
            }
            ExpectedValue::Number(number) => self.number(key)? == *number,
            ExpectedValue::Text(text) => self.text(key) == Some(text.as_str()),
        };
        Ok(matched)
    }

    fn value_or_default(&self, key: &str, kind: InputKind) -> InputValue {
        self.get(key)
            .cloned()
            .unwrap_or_else(|| kind.default_value())
    }
}

impl FromIterator<(String, InputValue)> for BuildingRecord {
    fn from_iter<T: IntoIterator<Item = (String, InputValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

pub(crate) fn invalid(key: &str, expected: InputKind, found: &InputValue) -> EngineError {
    EngineError::InvalidInputValue {
        input: key.to_string(),
        expected: expected.label(),
        found: found.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_null_read_as_zero() {
        let record = BuildingRecord::new().with("param2", InputValue::Null);

        assert_eq!(record.number("param1"), Ok(0.0));
        assert_eq!(record.number("param2"), Ok(0.0));
    }

    #[test]
    fn text_is_not_coerced_to_a_number() {
        let record = BuildingRecord::new().with("param1", "plenty");

        assert!(matches!(
            record.number("param1"),
            Err(EngineError::InvalidInputValue { expected: "number", .. })
        ));
    }

    #[test]
    fn booleans_and_numbers_are_not_interchangeable() {
        let record = BuildingRecord::new()
            .with("param13", true)
            .with("param6", 1);

        assert!(matches!(
            record.number("param13"),
            Err(EngineError::InvalidInputValue { expected: "number", .. })
        ));
        assert!(matches!(
            record.matches("param6", &ExpectedValue::Boolean(true)),
            Err(EngineError::InvalidInputValue { expected: "boolean", .. })
        ));
    }

    #[test]
    fn missing_boolean_matches_false() {
        let record = BuildingRecord::new();

        assert_eq!(record.matches("param6", &ExpectedValue::Boolean(false)), Ok(true));
        assert_eq!(record.matches("param6", &ExpectedValue::Boolean(true)), Ok(false));
    }

    #[test]
    fn record_deserializes_from_flat_json() {
        let record: BuildingRecord = serde_json::from_str(
            r#"{"building_type": "Commercial", "operational_years": 2, "param6": true, "param7": null}"#,
        )
        .expect("record parses");

        assert_eq!(record.text("building_type"), Some("Commercial"));
        assert_eq!(record.number("operational_years"), Ok(2.0));
        assert_eq!(record.get("param6"), Some(&InputValue::Boolean(true)));
        assert_eq!(record.get("param7"), None);
    }
}
