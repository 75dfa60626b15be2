//! Core type system for tfplug
//!
//! Terraform values cross the plugin boundary as msgpack. `Dynamic` is the
//! in-memory form of one value; `Config` and `State` are the top-level objects
//! handed to resources.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dynamic represents Terraform values that can be of any type
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Number value (all numbers are f64 to match Terraform)
    Number(f64),
    /// String value
    String(String),
    /// List or set of values
    List(Vec<Dynamic>),
    /// Map of string keys to values (objects are represented as Maps)
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    pub fn as_string(&self) -> Option<&String> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Whole numbers only; `2.5` yields `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Dynamic::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }
}

impl From<&str> for Dynamic {
    fn from(value: &str) -> Self {
        Dynamic::String(value.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(value: String) -> Self {
        Dynamic::String(value)
    }
}

impl From<bool> for Dynamic {
    fn from(value: bool) -> Self {
        Dynamic::Bool(value)
    }
}

impl From<f64> for Dynamic {
    fn from(value: f64) -> Self {
        Dynamic::Number(value)
    }
}

impl From<i64> for Dynamic {
    fn from(value: i64) -> Self {
        Dynamic::Number(value as f64)
    }
}

impl<T: Into<Dynamic>> From<Option<T>> for Dynamic {
    fn from(value: Option<T>) -> Self {
        value.map_or(Dynamic::Null, Into::into)
    }
}

/// Terraform encodes unknown values as msgpack extension type 0.
const UNKNOWN_EXT_TYPE: i8 = 0;

struct UnknownPayload;

impl Serialize for UnknownPayload {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&[0])
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => serializer.serialize_f64(*n),
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => serializer.serialize_newtype_struct(
                rmp_serde::MSGPACK_EXT_STRUCT_NAME,
                &(UNKNOWN_EXT_TYPE, UnknownPayload),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        use std::fmt;

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a Terraform value")
            }

            fn visit_unit<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::String(value))
            }

            // msgpack extension values arrive as a newtype struct
            fn visit_newtype_struct<D>(self, deserializer: D) -> std::result::Result<Dynamic, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                de::IgnoredAny::deserialize(deserializer)?;
                Ok(Dynamic::Unknown)
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Dynamic::List(vec))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut hashmap = HashMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    hashmap.insert(key, value);
                }
                Ok(Dynamic::Map(hashmap))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// Top-level object of attribute values, keyed by attribute name.
/// A missing key and an explicit `Dynamic::Null` are both treated as unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    pub values: HashMap<String, Dynamic>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Dynamic> {
        self.values.get(key)
    }

    /// The value for `key` if it is set (neither missing, null nor unknown).
    pub fn get_set(&self, key: &str) -> Option<&Dynamic> {
        self.values
            .get(key)
            .filter(|v| !v.is_null() && !v.is_unknown())
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|v| v.as_string())
            .map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Dynamic>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<String, Dynamic>> for Values {
    fn from(values: HashMap<String, Dynamic>) -> Self {
        Self { values }
    }
}

/// Config represents configuration values
pub type Config = Values;

/// State represents resource state values
pub type State = Values;

/// Path of attribute names from the root object, e.g. `["model", "provider_type"]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    pub steps: Vec<String>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![name.to_string()],
        }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps.push(name.to_string());
        self
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.steps.join("."))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub summary: String,
    pub detail: Option<String>,
    pub attribute: Option<AttributePath>,
}

/// Errors and warnings collected while serving one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: Option<impl Into<String>>) {
        self.errors.push(Diagnostic {
            summary: summary.into(),
            detail: detail.map(Into::into),
            attribute: None,
        });
    }

    pub fn add_attribute_error(
        &mut self,
        path: AttributePath,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.errors.push(Diagnostic {
            summary: summary.into(),
            detail: Some(detail.into()),
            attribute: Some(path),
        });
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: Option<impl Into<String>>) {
        self.warnings.push(Diagnostic {
            summary: summary.into(),
            detail: detail.map(Into::into),
            attribute: None,
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: &Dynamic) -> Dynamic {
        let bytes = rmp_serde::to_vec_named(value).unwrap();
        rmp_serde::from_slice(&bytes).unwrap()
    }

    #[test]
    fn unknown_is_encoded_as_msgpack_extension() {
        let bytes = rmp_serde::to_vec_named(&Dynamic::Unknown).unwrap();
        // fixext1, type 0, one payload byte
        assert_eq!(bytes, vec![0xd4, 0x00, 0x00]);
        assert_eq!(roundtrip(&Dynamic::Unknown), Dynamic::Unknown);
    }

    #[test]
    fn object_with_unknown_and_null_decodes() {
        let mut map = HashMap::new();
        map.insert("id".to_string(), Dynamic::Unknown);
        map.insert("name".to_string(), Dynamic::from("Support Bot"));
        map.insert("first_message".to_string(), Dynamic::Null);
        let value = Dynamic::Map(map.clone());

        assert_eq!(roundtrip(&value), Dynamic::Map(map));
    }

    #[test]
    fn integers_decode_as_numbers() {
        let bytes = rmp_serde::to_vec(&42u8).unwrap();
        let value: Dynamic = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(value.as_i64(), Some(42));
        assert_eq!(Dynamic::Number(2.5).as_i64(), None);
    }

    #[test]
    fn get_set_skips_null_and_unknown() {
        let mut values = Values::new();
        values.insert("a", Dynamic::Null);
        values.insert("b", Dynamic::Unknown);
        values.insert("c", "x");

        assert!(values.get_set("a").is_none());
        assert!(values.get_set("b").is_none());
        assert!(values.get_set("missing").is_none());
        assert_eq!(values.get_string("c"), Some("x"));
    }

    #[test]
    fn diagnostics_collect_errors_and_warnings() {
        let mut diags = Diagnostics::new();
        diags.add_warning("careful", None::<String>);
        assert!(!diags.has_errors());

        diags.add_attribute_error(
            AttributePath::new("model").attribute("provider_type"),
            "Missing required attribute",
            "model.provider_type must be set",
        );
        assert!(diags.has_errors());
        assert_eq!(
            diags.errors[0].attribute.as_ref().unwrap().to_string(),
            "model.provider_type"
        );
    }
}
