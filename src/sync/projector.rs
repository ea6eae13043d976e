//! Narrowing a staged record to one destination schema.

use crate::sync::outcome::SkipReason;
use sync_core::{
    DestinationBinding, FieldValue, ProjectedRow, SchemaDescriptor, SchemaError, SchemaRegistry,
    StagedRecord,
};

/// Project `record` onto `schema` for the table of `binding`.
///
/// Every schema field must be present in the record; extra record fields
/// are dropped. Values are classified by their declared type. When the
/// binding has a `key_column`, the record's key is appended as text.
pub fn project(
    record: &StagedRecord,
    schema: &SchemaDescriptor,
    binding: &DestinationBinding,
) -> Result<ProjectedRow, SchemaError> {
    let mut row = ProjectedRow::new(&binding.table);

    for field in &schema.fields {
        let raw = record
            .get(&field.name)
            .ok_or_else(|| SchemaError::MissingField {
                schema: schema.id.clone(),
                field: field.name.clone(),
            })?;
        let value = field
            .field_type
            .parse_value(raw)
            .map_err(|reason| SchemaError::InvalidValue {
                field: field.name.clone(),
                field_type: field.field_type,
                reason,
            })?;
        row.push(&field.name, value);
    }

    if let Some(column) = &binding.key_column {
        row.push(column, FieldValue::Text(record.key.clone()));
    }

    Ok(row)
}

/// Resolve the binding's schema and project, reporting ineligibility as
/// the reason the binding is skipped.
pub fn project_for_binding(
    record: &StagedRecord,
    registry: &SchemaRegistry,
    binding: &DestinationBinding,
) -> Result<ProjectedRow, SkipReason> {
    let schema = registry.resolve(&binding.schema)?;
    Ok(project(record, schema, binding)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use sync_core::{FieldDefinition, FieldType};

    fn record(key: &str, pairs: &[(&str, &str)]) -> StagedRecord {
        let fields: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StagedRecord::new(key, fields)
    }

    fn xywy() -> SchemaDescriptor {
        SchemaDescriptor::text_fields("xywy", ["title", "quest", "url"])
    }

    #[test]
    fn test_projects_in_schema_order() {
        let rec = record(
            "xywy:1001",
            &[("url", "u"), ("title", "t"), ("quest", "q"), ("extra", "x")],
        );
        let row = project(&rec, &xywy(), &DestinationBinding::new("scrapy_xywy", "xywy")).unwrap();
        assert_eq!(row.table, "scrapy_xywy");
        assert_eq!(row.column_names(), vec!["title", "quest", "url"]);
        assert_eq!(row.get("title"), Some(&FieldValue::Text("t".into())));
        assert!(row.get("extra").is_none());
    }

    #[test]
    fn test_missing_field() {
        let rec = record("xywy:1001", &[("title", "t"), ("quest", "q"), ("url", "u")]);
        let schema = SchemaDescriptor::text_fields("xywy_doc", ["title", "doc_name"]);
        let err = project(&rec, &schema, &DestinationBinding::new("scrapy_xywy_doc", "xywy_doc"))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                schema: "xywy_doc".into(),
                field: "doc_name".into()
            }
        );
    }

    #[test]
    fn test_typed_fields() {
        let schema = SchemaDescriptor::new(
            "haodf",
            vec![
                FieldDefinition::text("answer_url"),
                FieldDefinition::new("grade", FieldType::Integer),
            ],
        );
        let binding = DestinationBinding::new("scrapy_haodf", "haodf");

        let ok = record("haodf:1", &[("answer_url", "a"), ("grade", " 4 ")]);
        let row = project(&ok, &schema, &binding).unwrap();
        assert_eq!(row.get("grade"), Some(&FieldValue::Integer(4)));

        let bad = record("haodf:2", &[("answer_url", "a"), ("grade", "four")]);
        assert!(matches!(
            project(&bad, &schema, &binding),
            Err(SchemaError::InvalidValue { ref field, .. }) if field == "grade"
        ));
    }

    #[test]
    fn test_key_column_appended() {
        let rec = record("xywy:1001", &[("title", "t"), ("quest", "q"), ("url", "u")]);
        let binding = DestinationBinding::new("scrapy_xywy", "xywy").with_key_column("source_key");
        let row = project(&rec, &xywy(), &binding).unwrap();
        assert_eq!(row.column_names(), vec!["title", "quest", "url", "source_key"]);
        assert_eq!(
            row.get("source_key"),
            Some(&FieldValue::Text("xywy:1001".into()))
        );
    }

    #[test]
    fn test_unknown_schema_is_a_skip() {
        let registry = SchemaRegistry::new(vec![xywy()]).unwrap();
        let rec = record("sprain:1", &[("title", "t")]);
        let binding = DestinationBinding::new("scrapy_sprain", "sprain");
        assert_eq!(
            project_for_binding(&rec, &registry, &binding),
            Err(SkipReason::UnknownSchema("sprain".into()))
        );
    }
}
