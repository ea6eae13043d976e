//! Schema registry and destination bindings.
//!
//! A [`SchemaDescriptor`] is the ordered column set of one destination
//! table. Descriptors are registered once, at startup, in a
//! [`SchemaRegistry`] and never mutated afterwards, so lookups need no
//! locking. A [`DestinationBinding`] pairs a destination table with the id
//! of the schema records routed to it must satisfy.

use crate::types::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ============================================================================
// Error Types
// ============================================================================

/// Error type for schema operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// Schema id not registered
    #[error("Unknown schema: {0}")]
    UnknownSchema(String),

    /// Schema id registered more than once
    #[error("Duplicate schema id: {0}")]
    DuplicateSchema(String),

    /// Schema declares a field twice or declares an empty field name
    #[error("Invalid field '{field}' in schema '{schema}': {reason}")]
    InvalidField {
        schema: String,
        field: String,
        reason: String,
    },

    /// Staged record lacks a field the schema requires
    #[error("Field '{field}' required by schema '{schema}' is missing from the record")]
    MissingField { schema: String, field: String },

    /// Staged value cannot be classified as the field's declared type
    #[error("Field '{field}' has an invalid {field_type} value: {reason}")]
    InvalidValue {
        field: String,
        field_type: FieldType,
        reason: String,
    },
}

// ============================================================================
// Schema Types
// ============================================================================

/// A single column of a destination schema.
///
/// In YAML a bare string is shorthand for a text column:
///
/// ```yaml
/// fields:
///   - title
///   - { name: grade, type: integer }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FieldDefinitionRepr")]
pub struct FieldDefinition {
    /// Column name, also the field name looked up in the staged record
    pub name: String,

    /// Declared column type
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldDefinitionRepr {
    Name(String),
    Full {
        name: String,
        #[serde(rename = "type", default)]
        field_type: FieldType,
    },
}

impl From<FieldDefinitionRepr> for FieldDefinition {
    fn from(repr: FieldDefinitionRepr) -> Self {
        match repr {
            FieldDefinitionRepr::Name(name) => FieldDefinition::text(name),
            FieldDefinitionRepr::Full { name, field_type } => FieldDefinition { name, field_type },
        }
    }
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }
}

/// Ordered, immutable column set for one destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Schema identifier referenced by bindings
    pub id: String,

    /// Columns in insert order
    pub fields: Vec<FieldDefinition>,
}

impl SchemaDescriptor {
    pub fn new(id: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a descriptor whose fields are all text.
    pub fn text_fields<I, S>(id: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(id, names.into_iter().map(FieldDefinition::text).collect())
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(SchemaError::InvalidField {
                    schema: self.id.clone(),
                    field: field.name.clone(),
                    reason: "empty field name".to_string(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::InvalidField {
                    schema: self.id.clone(),
                    field: field.name.clone(),
                    reason: "declared more than once".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Static mapping from schema id to [`SchemaDescriptor`].
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<SchemaDescriptor>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Register every descriptor, rejecting duplicate ids and malformed
    /// field lists.
    pub fn new(schemas: Vec<SchemaDescriptor>) -> Result<Self, SchemaError> {
        let mut index = HashMap::with_capacity(schemas.len());
        for (idx, schema) in schemas.iter().enumerate() {
            schema.validate()?;
            if index.insert(schema.id.clone(), idx).is_some() {
                return Err(SchemaError::DuplicateSchema(schema.id.clone()));
            }
        }
        Ok(Self { schemas, index })
    }

    /// Look up a schema by id.
    pub fn resolve(&self, schema_id: &str) -> Result<&SchemaDescriptor, SchemaError> {
        self.index
            .get(schema_id)
            .and_then(|&idx| self.schemas.get(idx))
            .ok_or_else(|| SchemaError::UnknownSchema(schema_id.to_string()))
    }

    pub fn contains(&self, schema_id: &str) -> bool {
        self.index.contains_key(schema_id)
    }

    /// Registered schema ids in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// A destination table a staged record may be routed to.
///
/// Destination tables must tolerate re-insertion of the same record: a
/// key is only removed from the staging store once every eligible binding
/// has committed, so a failure on one binding causes the others to be
/// written again on the next pass. Give the table a unique key (for
/// example on `key_column`) and use an idempotent write mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationBinding {
    /// Destination table name; also the pattern key prefixes are matched against
    pub table: String,

    /// Id of the schema records must satisfy for this table
    pub schema: String,

    /// Optional column that receives the source key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_column: Option<String>,
}

impl DestinationBinding {
    pub fn new(table: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            schema: schema.into(),
            key_column: None,
        }
    }

    pub fn with_key_column(mut self, column: impl Into<String>) -> Self {
        self.key_column = Some(column.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new(vec![
            SchemaDescriptor::text_fields("xywy", ["title", "quest", "url"]),
            SchemaDescriptor::new(
                "haodf",
                vec![
                    FieldDefinition::text("answer_url"),
                    FieldDefinition::new("grade", FieldType::Integer),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_registered_schema() {
        let registry = registry();
        let schema = registry.resolve("xywy").unwrap();
        assert_eq!(schema.field_names(), vec!["title", "quest", "url"]);
        assert_eq!(registry.ids(), vec!["xywy", "haodf"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_resolve_unknown_schema() {
        let err = registry().resolve("sprain").unwrap_err();
        assert_eq!(err, SchemaError::UnknownSchema("sprain".to_string()));
    }

    #[test]
    fn test_duplicate_schema_rejected() {
        let err = SchemaRegistry::new(vec![
            SchemaDescriptor::text_fields("a", ["x"]),
            SchemaDescriptor::text_fields("a", ["y"]),
        ])
        .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateSchema("a".to_string()));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err =
            SchemaRegistry::new(vec![SchemaDescriptor::text_fields("a", ["x", "x"])]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { .. }));
    }

    #[test]
    fn test_field_definition_yaml_shorthand() {
        let yaml = r#"
id: haodf
fields:
  - answer_url
  - name: grade
    type: integer
  - { name: note }
"#;
        let schema: SchemaDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            schema.fields,
            vec![
                FieldDefinition::text("answer_url"),
                FieldDefinition::new("grade", FieldType::Integer),
                FieldDefinition::text("note"),
            ]
        );
    }

    #[test]
    fn test_binding_yaml() {
        let binding: DestinationBinding =
            serde_yaml::from_str("{ table: scrapy_xywy, schema: xywy, key_column: source_key }")
                .unwrap();
        assert_eq!(
            binding,
            DestinationBinding::new("scrapy_xywy", "xywy").with_key_column("source_key")
        );
    }
}
