//! Column to property mapping for a single row.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::config::ColumnConfiguration;
use crate::error::{MapError, MapResult};
use crate::logs::{LogEntry, Logger};
use crate::transform::coerce::convert;
use crate::transform::path::set_value;
use crate::transform::record::RecordWithInformation;

/// Write every configured column of `record` into `out`.
///
/// Columns are visited in record order. A column without configuration is
/// skipped. Conditional properties are written when their condition holds
/// (or when they have none); a single property is written unconditionally.
pub fn map_fields(
    mapping: &HashMap<String, ColumnConfiguration>,
    record: &RecordWithInformation<'_>,
    out: &mut Map<String, Value>,
    logger: &Logger,
) -> MapResult<()> {
    for (position, raw) in record.record.iter().enumerate() {
        let Some(key) = record.column_key(position) else {
            continue;
        };
        let Some(column) = mapping.get(key.as_ref()) else {
            continue;
        };

        if column.is_multiple() {
            for property in &column.properties {
                if let Some(condition) = &property.condition {
                    if !condition.applies(&property.property, record, logger) {
                        logger.debug(
                            LogEntry::debug("condition not met, property skipped")
                                .with("column", &key)
                                .with("property", &property.property),
                        );
                        continue;
                    }
                }
                let value = convert(&property.value_type, raw).map_err(|source| MapError::Conversion {
                    column: key.to_string(),
                    source,
                })?;
                set_value(&property.property, value, out);
            }
        } else {
            let value = convert(&column.value_type, raw).map_err(|source| MapError::Conversion {
                column: key.to_string(),
                source,
            })?;
            set_value(&column.property, value, out);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Condition, Operand, Operator, PropertyConfiguration, ValueType};
    use crate::transform::record::HeaderIndex;
    use csv::StringRecord;
    use serde_json::json;

    fn run(
        mapping: &HashMap<String, ColumnConfiguration>,
        record: &RecordWithInformation<'_>,
    ) -> MapResult<Value> {
        let mut out = Map::new();
        map_fields(mapping, record, &mut out, &Logger::noop())?;
        Ok(Value::Object(out))
    }

    #[test]
    fn test_unnamed_single_properties() {
        let mut mapping = HashMap::new();
        mapping.insert("0".to_string(), ColumnConfiguration::single("person.name", ValueType::String));
        mapping.insert("1".to_string(), ColumnConfiguration::single("person.age", ValueType::Int));

        let row = StringRecord::from(vec!["John", "30", "ignored"]);
        let out = run(&mapping, &RecordWithInformation::new(&row)).unwrap();
        assert_eq!(out, json!({"person": {"name": "John", "age": 30}}));
    }

    #[test]
    fn test_named_lookup_uses_header() {
        let mut mapping = HashMap::new();
        mapping.insert("age".to_string(), ColumnConfiguration::single("age", ValueType::Int));
        // index keys are not header names
        mapping.insert("0".to_string(), ColumnConfiguration::single("unused", ValueType::String));

        let header = StringRecord::from(vec!["name", "age"]);
        let index = HeaderIndex::from_record(&header);
        let row = StringRecord::from(vec!["Jane", "25"]);
        let out = run(&mapping, &RecordWithInformation::named(&row, &header, &index)).unwrap();
        assert_eq!(out, json!({"age": 25}));
    }

    #[test]
    fn test_conditional_properties() {
        let adult = Condition::new(Operand::column("1"), Operand::value("17"), Operator::Gt, ValueType::Int);
        let mut mapping = HashMap::new();
        mapping.insert(
            "1".to_string(),
            ColumnConfiguration::multiple(vec![
                PropertyConfiguration::new("age", ValueType::Int),
                PropertyConfiguration::new("adult_age", ValueType::Int).with_condition(adult),
            ]),
        );

        let row = StringRecord::from(vec!["John", "30"]);
        let out = run(&mapping, &RecordWithInformation::new(&row)).unwrap();
        assert_eq!(out, json!({"age": 30, "adult_age": 30}));

        let row = StringRecord::from(vec!["Tim", "12"]);
        let out = run(&mapping, &RecordWithInformation::new(&row)).unwrap();
        assert_eq!(out, json!({"age": 12}));
    }

    #[test]
    fn test_conversion_error_names_column() {
        let mut mapping = HashMap::new();
        mapping.insert("1".to_string(), ColumnConfiguration::single("age", ValueType::Int));

        let row = StringRecord::from(vec!["John", "thirty"]);
        let err = run(&mapping, &RecordWithInformation::new(&row)).unwrap_err();
        match err {
            MapError::Conversion { column, source } => {
                assert_eq!(column, "1");
                assert_eq!(source.raw, "thirty");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
