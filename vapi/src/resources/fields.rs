//! Typed access to Terraform attribute values
//!
//! Extractors return the tri-state shape the API request types use: `None`
//! when the attribute is null, unknown or absent, `Some(Some(v))` when it is
//! set. They never produce `Some(None)`; explicit nulls are only sent when a
//! caller builds them by hand.

use std::collections::HashMap;
use tfplug::{Dynamic, Schema, State};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MappingError {
    #[error("Attribute '{path}' must be {expected}, got {actual}")]
    WrongType {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Attribute '{path}' must be a whole number, got {value}")]
    NotAnInteger { path: String, value: f64 },

    #[error("Attribute '{path}' is required")]
    Missing { path: String },
}

/// Read-only view over one object of attribute values
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    values: &'a HashMap<String, Dynamic>,
    prefix: Option<&'a str>,
}

impl<'a> Fields<'a> {
    pub fn new(values: &'a HashMap<String, Dynamic>) -> Self {
        Self {
            values,
            prefix: None,
        }
    }

    fn path(&self, key: &str) -> String {
        match self.prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn set_value(&self, key: &str) -> Option<&'a Dynamic> {
        self.values
            .get(key)
            .filter(|v| !v.is_null() && !v.is_unknown())
    }

    fn wrong_type(&self, key: &str, expected: &'static str, value: &Dynamic) -> MappingError {
        MappingError::WrongType {
            path: self.path(key),
            expected,
            actual: value.type_name(),
        }
    }

    /// View over a nested single object, `None` when the block is unset
    pub fn nested(&self, key: &'a str) -> Result<Option<Fields<'a>>, MappingError> {
        match self.set_value(key) {
            None => Ok(None),
            Some(Dynamic::Map(values)) => Ok(Some(Fields {
                values,
                prefix: Some(key),
            })),
            Some(other) => Err(self.wrong_type(key, "an object", other)),
        }
    }

    pub fn required_string(&self, key: &str) -> Result<String, MappingError> {
        self.optional_string(key)?
            .flatten()
            .ok_or_else(|| MappingError::Missing {
                path: self.path(key),
            })
    }

    pub fn optional_string(&self, key: &str) -> Result<Option<Option<String>>, MappingError> {
        match self.set_value(key) {
            None => Ok(None),
            Some(Dynamic::String(s)) => Ok(Some(Some(s.clone()))),
            Some(other) => Err(self.wrong_type(key, "a string", other)),
        }
    }

    pub fn optional_bool(&self, key: &str) -> Result<Option<Option<bool>>, MappingError> {
        match self.set_value(key) {
            None => Ok(None),
            Some(Dynamic::Bool(b)) => Ok(Some(Some(*b))),
            Some(other) => Err(self.wrong_type(key, "a bool", other)),
        }
    }

    pub fn optional_f64(&self, key: &str) -> Result<Option<Option<f64>>, MappingError> {
        match self.set_value(key) {
            None => Ok(None),
            Some(Dynamic::Number(n)) => Ok(Some(Some(*n))),
            Some(other) => Err(self.wrong_type(key, "a number", other)),
        }
    }

    pub fn optional_i64(&self, key: &str) -> Result<Option<Option<i64>>, MappingError> {
        match self.set_value(key) {
            None => Ok(None),
            Some(value @ Dynamic::Number(n)) => value
                .as_i64()
                .map(|i| Some(Some(i)))
                .ok_or_else(|| MappingError::NotAnInteger {
                    path: self.path(key),
                    value: *n,
                }),
            Some(other) => Err(self.wrong_type(key, "a number", other)),
        }
    }

    pub fn optional_string_list(
        &self,
        key: &str,
    ) -> Result<Option<Option<Vec<String>>>, MappingError> {
        let items = match self.set_value(key) {
            None => return Ok(None),
            Some(Dynamic::List(items)) => items,
            Some(other) => return Err(self.wrong_type(key, "a list of strings", other)),
        };

        items
            .iter()
            .map(|item| match item {
                Dynamic::String(s) => Ok(s.clone()),
                other => Err(self.wrong_type(key, "a list of strings", other)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|list| Some(Some(list)))
    }
}

/// State value for an optional list of strings
pub fn string_list(list: Option<Vec<String>>) -> Dynamic {
    match list {
        Some(items) => Dynamic::List(items.into_iter().map(Dynamic::String).collect()),
        None => Dynamic::Null,
    }
}

/// Restores the prior value of every sensitive attribute. Remote reads must
/// never overwrite secrets the API may mask or omit.
pub fn preserve_sensitive(schema: &Schema, prior: &State, new_state: &mut State) {
    for name in schema.sensitive_attributes() {
        let prior_value = prior.get(name).cloned().unwrap_or(Dynamic::Null);
        new_state.insert(name, prior_value);
    }
}
