//! Runtime payload schemas for events declared by name.
//!
//! A [`PayloadSchema`] lists the fields an event carries. [`PayloadSchema::bind`]
//! turns a JSON payload into a [`Payload`], accepting either a positional
//! array (values in field order) or an object keyed by field name. Missing
//! fields fall back to their default; anything that does not fit is a
//! [`SchemaError`].

use std::collections::HashSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SchemaError;

/// JSON value kinds a field may be declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    /// Signed 64-bit; larger values are rejected.
    Integer,
    /// Also accepts integers.
    Float,
    Boolean,
    Array,
    Object,
    Any,
}

impl FieldType {
    /// Whether `value` is acceptable for a field of this type.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Any, _) => true,
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Integer, Value::Number(n)) => n.is_i64(),
            (FieldType::Float, Value::Number(_)) => true,
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Array, Value::Array(_)) => true,
            (FieldType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Any => "any",
        };
        write!(f, "{s}")
    }
}

/// Name of the JSON kind of `value`, for error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: FieldType,

    /// Fields are required unless marked otherwise or given a default.
    #[serde(default = "default_required")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

fn default_required() -> bool {
    true
}

impl FieldSpec {
    /// A required field with no default.
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: None,
        }
    }

    /// An optional field that is simply absent when not supplied.
    pub fn optional(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            default: None,
        }
    }

    /// An optional field that takes `default` when not supplied.
    pub fn with_default(name: impl Into<String>, ty: FieldType, default: Value) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            default: Some(default),
        }
    }

    /// An explicit null for an optional field is bound as if it were absent.
    fn is_omitted(&self, value: &Value) -> bool {
        value.is_null() && !self.required
    }

    fn check(&self, value: &Value) -> Result<(), SchemaError> {
        if self.is_omitted(value) {
            return Ok(());
        }
        if self.ty.accepts(value) {
            Ok(())
        } else {
            Err(SchemaError::TypeMismatch {
                field: self.name.clone(),
                expected: self.ty,
                found: json_kind(value),
            })
        }
    }
}

/// The declared shape of an event payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadSchema {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    /// Accept object keys that no field declares (passed through untouched).
    #[serde(default)]
    pub allow_extra: bool,
}

impl PayloadSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            allow_extra: false,
        }
    }

    pub fn allow_extra(mut self, allow: bool) -> Self {
        self.allow_extra = allow;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the schema itself: unique field names, defaults of the declared type.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            if let Some(default) = &field.default {
                field.check(default)?;
            }
        }
        Ok(())
    }

    /// Bind a JSON payload against this schema.
    ///
    /// - An array binds positionally, in field order.
    /// - An object binds by field name.
    /// - `null` means "no values" and only succeeds if every field is optional.
    ///
    /// Fields left unbound take their default when one is declared; a
    /// required field left unbound is an error.
    pub fn bind(&self, payload: Value) -> Result<Payload, SchemaError> {
        match payload {
            Value::Null => self.bind_parts(Vec::new(), Map::new()),
            Value::Array(values) => self.bind_parts(values, Map::new()),
            Value::Object(map) => self.bind_parts(Vec::new(), map),
            other => Err(SchemaError::InvalidPayload {
                found: json_kind(&other),
            }),
        }
    }

    /// Bind leading positional values followed by named values.
    ///
    /// Positional values fill fields in declaration order; named values then
    /// fill the rest. Naming a field that a positional value already bound is
    /// an error. An explicit `null` for an optional field counts as not given.
    pub fn bind_parts(
        &self,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<Payload, SchemaError> {
        if positional.len() > self.fields.len() {
            return Err(SchemaError::TooManyValues {
                expected: self.fields.len(),
                found: positional.len(),
            });
        }

        let mut bound = Map::new();
        let mut given = HashSet::new();

        for (field, value) in self.fields.iter().zip(positional) {
            field.check(&value)?;
            given.insert(field.name.clone());
            if !field.is_omitted(&value) {
                bound.insert(field.name.clone(), value);
            }
        }

        for (key, value) in named {
            if given.contains(&key) {
                return Err(SchemaError::MultipleValues(key));
            }
            match self.field(&key) {
                Some(field) => {
                    field.check(&value)?;
                    if field.is_omitted(&value) {
                        continue;
                    }
                }
                None if self.allow_extra => {}
                None => return Err(SchemaError::UnexpectedField(key)),
            }
            bound.insert(key, value);
        }

        for field in &self.fields {
            if bound.contains_key(&field.name) {
                continue;
            }
            match &field.default {
                Some(default) => {
                    bound.insert(field.name.clone(), default.clone());
                }
                None if field.required => {
                    return Err(SchemaError::MissingField(field.name.clone()));
                }
                None => {}
            }
        }

        Ok(Payload(bound))
    }
}

/// A payload that has been bound against its schema.
///
/// Handlers of name-keyed events receive this instead of raw JSON, so every
/// declared required field is guaranteed present and correctly typed.
///
/// The only way to obtain one is [`PayloadSchema::bind`] (or
/// [`PayloadSchema::bind_parts`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.0.get(field).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.0.get(field).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.0.get(field).and_then(Value::as_bool)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Deserialize the bound fields into a concrete Rust type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_value())
    }
}
