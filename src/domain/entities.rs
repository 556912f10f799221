//! Domain entities: record ids, record access and linking field names

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::domain::error::FieldError;

/// Identifier of a record, numeric or textual.
///
/// Strings holding a canonical integer (`"5"`, not `"05"` or `"+5"`) are
/// normalized to [`RecordId::Int`], so `"5"` and `5` refer to the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// True for the "no parent" values: `0` and the empty string.
    pub fn is_sentinel(&self) -> bool {
        match self {
            RecordId::Int(n) => *n == 0,
            RecordId::Str(s) => s.is_empty(),
        }
    }

    /// Interpret this id as a parent reference; sentinels mean "no parent".
    pub fn into_parent(self) -> Option<RecordId> {
        if self.is_sentinel() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<i32> for RecordId {
    fn from(n: i32) -> Self {
        RecordId::Int(n.into())
    }
}

impl From<u32> for RecordId {
    fn from(n: u32) -> Self {
        RecordId::Int(n.into())
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => RecordId::Int(n),
            _ => RecordId::Str(s.to_string()),
        }
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => RecordId::Int(n),
            _ => RecordId::Str(s),
        }
    }
}

impl FromStr for RecordId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RecordId::from(s))
    }
}

impl TryFrom<&Value> for RecordId {
    type Error = FieldError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(RecordId::Int(i));
                }
                // Beyond i64: keep the digits as a textual id
                if let Some(u) = n.as_u64() {
                    return Ok(RecordId::Str(u.to_string()));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                        Ok(RecordId::Int(f as i64))
                    }
                    _ => Err(FieldError::Unsupported {
                        kind: "non-integral number",
                    }),
                }
            }
            Value::String(s) => Ok(RecordId::from(s.as_str())),
            Value::Null => Err(FieldError::Unsupported { kind: "null" }),
            Value::Bool(_) => Err(FieldError::Unsupported { kind: "boolean" }),
            Value::Array(_) => Err(FieldError::Unsupported { kind: "array" }),
            Value::Object(_) => Err(FieldError::Unsupported { kind: "object" }),
        }
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordId::Int(n) => serializer.serialize_i64(*n),
            RecordId::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => RecordId::Int(n),
            Raw::Str(s) => RecordId::from(s),
        })
    }
}

/// Names of the two linking fields of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFields {
    /// Field holding the record's own id
    pub id: String,
    /// Field holding the parent's id
    pub parent: String,
}

impl Default for LinkFields {
    fn default() -> Self {
        Self {
            id: "id".into(),
            parent: "pid".into(),
        }
    }
}

impl LinkFields {
    pub fn new(id: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: parent.into(),
        }
    }
}

/// A flat record that exposes its linking fields by name.
///
/// Implement this for your own row types to build trees from them; the field
/// names come from [`LinkFields`], so one type may serve several shapes.
pub trait Record {
    /// Read a linking field. `Ok(None)` means the field is absent or null.
    fn link_field(&self, field: &str) -> Result<Option<RecordId>, FieldError>;

    /// Null out a linking field. Called when a parent reference is found to
    /// point at no existing record.
    fn clear_link_field(&mut self, _field: &str) {}
}

impl Record for Map<String, Value> {
    fn link_field(&self, field: &str) -> Result<Option<RecordId>, FieldError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => RecordId::try_from(value).map(Some),
        }
    }

    fn clear_link_field(&mut self, field: &str) {
        if let Some(value) = self.get_mut(field) {
            *value = Value::Null;
        }
    }
}

impl Record for Value {
    fn link_field(&self, field: &str) -> Result<Option<RecordId>, FieldError> {
        match self {
            Value::Object(map) => map.link_field(field),
            _ => Err(FieldError::NotAnObject),
        }
    }

    fn clear_link_field(&mut self, field: &str) {
        if let Value::Object(map) = self {
            map.clear_link_field(field);
        }
    }
}

/// Linking fields of one record, read once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Link {
    pub id: Option<RecordId>,
    pub parent: Option<RecordId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("5", RecordId::Int(5))]
    #[case("-3", RecordId::Int(-3))]
    #[case("05", RecordId::Str("05".into()))]
    #[case("+5", RecordId::Str("+5".into()))]
    #[case("abc", RecordId::Str("abc".into()))]
    #[case("", RecordId::Str(String::new()))]
    fn test_record_id_from_str_normalizes_canonical_integers(
        #[case] input: &str,
        #[case] expected: RecordId,
    ) {
        assert_eq!(RecordId::from(input), expected);
    }

    #[rstest]
    #[case(RecordId::Int(0), true)]
    #[case(RecordId::Str(String::new()), true)]
    #[case(RecordId::from("0"), true)]
    #[case(RecordId::Int(7), false)]
    #[case(RecordId::Str("root".into()), false)]
    fn test_is_sentinel(#[case] id: RecordId, #[case] expected: bool) {
        assert_eq!(id.is_sentinel(), expected);
        assert_eq!(id.into_parent().is_none(), expected);
    }

    #[test]
    fn test_link_field_keeps_ids_beyond_i64_as_text() {
        let big = u64::MAX;
        let record = json!({"id": big, "pid": 0});
        assert_eq!(
            record.link_field("id"),
            Ok(Some(RecordId::Str(big.to_string())))
        );
    }

    #[test]
    fn test_link_field_reads_numbers_and_strings() {
        let record = json!({"id": 4, "pid": "2", "title": "Item 4"});
        assert_eq!(record.link_field("id"), Ok(Some(RecordId::Int(4))));
        assert_eq!(record.link_field("pid"), Ok(Some(RecordId::Int(2))));
        assert_eq!(record.link_field("missing"), Ok(None));
    }

    #[test]
    fn test_link_field_accepts_integral_floats() {
        let record = json!({"id": 3.0});
        assert_eq!(record.link_field("id"), Ok(Some(RecordId::Int(3))));
    }

    #[rstest]
    #[case(json!({"id": 1.5}))]
    #[case(json!({"id": true}))]
    #[case(json!({"id": [1]}))]
    #[case(json!({"id": {"nested": 1}}))]
    fn test_link_field_rejects_unsupported_values(#[case] record: Value) {
        assert!(matches!(
            record.link_field("id"),
            Err(FieldError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_link_field_on_non_object_errors() {
        assert_eq!(json!(42).link_field("id"), Err(FieldError::NotAnObject));
    }

    #[test]
    fn test_clear_link_field_sets_null() {
        let mut record = json!({"id": 5, "pid": 99});
        record.clear_link_field("pid");
        assert_eq!(record["pid"], Value::Null);
        assert_eq!(record.link_field("pid"), Ok(None));
    }

    #[test]
    fn test_record_id_serializes_as_plain_value() {
        let ids = vec![RecordId::Int(1), RecordId::Str("a".into())];
        assert_eq!(serde_json::to_string(&ids).unwrap(), r#"[1,"a"]"#);

        let back: Vec<RecordId> = serde_json::from_str(r#"[1,"a","7"]"#).unwrap();
        assert_eq!(
            back,
            vec![RecordId::Int(1), RecordId::Str("a".into()), RecordId::Int(7)]
        );
    }
}
