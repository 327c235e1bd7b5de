//! Records, schemas and batch targets.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ConfigError;

/// Semantic type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Category,
    Integer,
    Float,
    Bool,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Category => "category",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    /// Enum-like string drawn from a closed set of values.
    Category(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Category(_) => FieldType::Category,
            FieldValue::Integer(_) => FieldType::Integer,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Bool(_) => FieldType::Bool,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Category(s) => Some(s),
            _ => None,
        }
    }
}

/// Sorted field names and types shared by every record of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Schema(Vec<(String, FieldType)>);

impl Schema {
    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.0.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, ty)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {}", ty.as_str())?;
        }
        f.write_str("}")
    }
}

/// One immutable unit of a batch: named fields with semantic types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(name, FieldValue::Text(value.into()))
    }

    pub fn with_category(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(name, FieldValue::Category(value.into()))
    }

    pub fn with_integer(self, name: impl Into<String>, value: i64) -> Self {
        self.with(name, FieldValue::Integer(value))
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Field names in schema order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn schema(&self) -> Schema {
        Schema(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.field_type()))
                .collect(),
        )
    }

    /// Builds a record from a flat JSON object.
    ///
    /// Strings become [`FieldValue::Text`]. Nulls, arrays, nested objects and
    /// integers outside the `i64` range are rejected.
    pub fn from_json(index: usize, value: &Value) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidRecord { index, reason };

        let Value::Object(map) = value else {
            return Err(invalid("expected a JSON object".to_string()));
        };

        let mut record = Record::new();
        for (name, field) in map {
            let value = match field {
                Value::String(s) => FieldValue::Text(s.clone()),
                Value::Bool(b) => FieldValue::Bool(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => FieldValue::Integer(i),
                    None if n.is_u64() => {
                        return Err(invalid(format!("field {name} overflows a 64-bit integer")));
                    }
                    None => FieldValue::Float(n.as_f64().ok_or_else(|| {
                        invalid(format!("field {name} is not a representable number"))
                    })?),
                },
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    return Err(invalid(format!("field {name} has an unsupported type")));
                }
            };
            record.fields.insert(name.clone(), value);
        }

        Ok(record)
    }
}

/// Checks that every record shares the schema of the first one.
pub fn ensure_homogeneous(records: &[Record]) -> Result<Option<Schema>, ConfigError> {
    let Some(first) = records.first() else {
        return Ok(None);
    };

    let expected = first.schema();
    if expected.is_empty() {
        return Err(ConfigError::InvalidRecord {
            index: 0,
            reason: "record has no fields".to_string(),
        });
    }

    for (index, record) in records.iter().enumerate().skip(1) {
        let found = record.schema();
        if found != expected {
            return Err(ConfigError::SchemaMismatch {
                index,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
    }

    Ok(Some(expected))
}

/// Destination of a batch: a database and a collection within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub database: String,
    pub collection: String,
}

impl Target {
    pub fn new(
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let target = Self {
            database: database.into(),
            collection: collection.into(),
        };
        target.validate()?;
        Ok(target)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_identifier(&self.database) && is_identifier(&self.collection) {
            Ok(())
        } else {
            Err(ConfigError::InvalidTarget {
                database: self.database.clone(),
                collection: self.collection.clone(),
            })
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Outcome of a successful batch insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchResult {
    /// Records the store reports as written.
    pub count: u64,
}
