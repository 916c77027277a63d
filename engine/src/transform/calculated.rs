//! Calculated field resolution.
//!
//! A calculated field produces a value that is not read directly from a
//! cell: the running record number, the current time, an environment or
//! extra variable, a lookup on another cell, or an answer from the host.

use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use csv::StringRecord;
use serde_json::{Map, Value};

use crate::config::{CalculatedField, CalculatedKind, Configuration, FieldLocation};
use crate::error::{AccessError, BoxError, MapError, MapResult, TypeConversionError};
use crate::logs::{LogEntry, Logger};
use crate::transform::coerce::convert;
use crate::transform::path::set_value;
use crate::transform::record::{RecordWithInformation, ValueSource};

/// Host callback answering `ask` fields: `(record, header, field)`.
///
/// Both record and header are `None` when the field is resolved at
/// document level.
pub type AskFn =
    dyn FnMut(Option<&StringRecord>, Option<&StringRecord>, &CalculatedField) -> Result<String, BoxError>;

/// Resolves the calculated fields of one phase into an output object
pub struct CalculatedResolver<'m> {
    configuration: &'m Configuration,
    ask: Option<&'m mut AskFn>,
    logger: &'m Logger,
}

impl<'m> CalculatedResolver<'m> {
    pub fn new(configuration: &'m Configuration, ask: Option<&'m mut AskFn>, logger: &'m Logger) -> Self {
        Self { configuration, ask, logger }
    }

    /// Apply every field located at `location`, in configuration order.
    ///
    /// `number` is the zero-based index of the record being built during the
    /// record phase and the number of emitted records during the document
    /// phase. `record` is `None` during the document phase.
    pub fn apply(
        &mut self,
        location: FieldLocation,
        number: usize,
        record: Option<&RecordWithInformation<'_>>,
        out: &mut Map<String, Value>,
    ) -> MapResult<()> {
        let configuration = self.configuration;
        for field in configuration.calculated.iter().filter(|f| f.location == location) {
            if let Some(value) = self.resolve(field, number, record)? {
                self.logger.debug(
                    LogEntry::debug("calculated field applied")
                        .with("property", &field.property)
                        .with("kind", field.kind.name()),
                );
                set_value(&field.property, value, out);
            }
        }
        Ok(())
    }

    /// Value of a single field. `None` means the field is omitted.
    fn resolve(
        &mut self,
        field: &CalculatedField,
        number: usize,
        record: Option<&RecordWithInformation<'_>>,
    ) -> MapResult<Option<Value>> {
        let converted = |raw: &str| {
            convert(&field.value_type, raw).map_err(|source| conversion_error(field, source))
        };

        match &field.kind {
            CalculatedKind::Application => match field.format.as_str() {
                "record" | "records" => Ok(Some(Value::from(number as u64))),
                other => Err(MapError::UnknownApplicationFormat(other.to_string())),
            },
            CalculatedKind::DateTime => {
                let formatted = format_now(&field.format)?;
                converted(&formatted).map(Some)
            }
            CalculatedKind::Environment => {
                let raw = std::env::var(&field.format).unwrap_or_default();
                converted(&raw).map(Some)
            }
            CalculatedKind::Extra => {
                let raw = self
                    .configuration
                    .extra_variable(&field.format)
                    .ok_or_else(|| MapError::ExtraVariableNotFound(field.format.clone()))?;
                converted(raw).map(Some)
            }
            CalculatedKind::Mapping => match record {
                Some(record) => match lookup_mapping(&field.format, record)? {
                    Some(to) => converted(&to).map(Some),
                    None => Ok(None),
                },
                None => Ok(None),
            },
            CalculatedKind::Ask => {
                let ask = self.ask.as_deref_mut().ok_or(MapError::AskCallbackMissing)?;
                let answer = ask(
                    record.map(|r| r.record),
                    record.and_then(|r| r.header),
                    field,
                )
                .map_err(|source| MapError::Ask {
                    property: field.property.clone(),
                    source,
                })?;
                converted(&answer).map(Some)
            }
            CalculatedKind::Unknown(name) => Err(MapError::UnknownCalculatedFieldKind(name.clone())),
        }
    }
}

fn conversion_error(field: &CalculatedField, source: TypeConversionError) -> MapError {
    MapError::CalculatedConversion {
        property: field.property.clone(),
        source,
    }
}

/// Current local time formatted with a strftime pattern
fn format_now(pattern: &str) -> MapResult<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(MapError::InvalidDateTimeFormat(pattern.to_string()));
    }
    Ok(Local::now().format_with_items(items.into_iter()).to_string())
}

/// Evaluate a `field:from=to,...,default=to` lookup against `record`.
///
/// The first `from` equal to the raw cell wins, then `default`. Returns
/// `None` when neither matches.
fn lookup_mapping(format: &str, record: &RecordWithInformation<'_>) -> MapResult<Option<String>> {
    let malformed = |reason: String| MapError::MalformedMappingFormat {
        format: format.to_string(),
        reason,
    };

    let parts: Vec<&str> = format.split(':').collect();
    let [field, entries] = parts.as_slice() else {
        return Err(malformed("expected field:from=to list".to_string()));
    };

    let current = record.raw_value(field).map_err(|source| mapping_field_error(field, source))?;

    let mut matched = None;
    let mut default = None;
    for entry in entries.split(',') {
        let pair: Vec<&str> = entry.split('=').collect();
        let [from, to] = pair.as_slice() else {
            return Err(malformed(format!("expected from=to, got {:?}", entry)));
        };
        if matched.is_none() && *from == &*current {
            matched = Some(*to);
        } else if default.is_none() && *from == "default" {
            default = Some(*to);
        }
    }

    Ok(matched.or(default).map(str::to_string))
}

fn mapping_field_error(field: &str, source: AccessError) -> MapError {
    MapError::MappingFieldNotFound {
        field: field.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtraVariable, ValueType};
    use crate::transform::record::HeaderIndex;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn configuration(fields: Vec<CalculatedField>) -> Configuration {
        Configuration {
            calculated: fields,
            ..Configuration::default()
        }
    }

    fn resolve_record(configuration: &Configuration, row: &StringRecord, number: usize) -> MapResult<Value> {
        let logger = Logger::noop();
        let mut resolver = CalculatedResolver::new(configuration, None, &logger);
        let record = RecordWithInformation::new(row);
        let mut out = Map::new();
        resolver.apply(FieldLocation::Record, number, Some(&record), &mut out)?;
        Ok(Value::Object(out))
    }

    #[test]
    fn test_application_record_number() {
        let config = configuration(vec![
            CalculatedField::new("meta.row", CalculatedKind::Application, "record"),
            CalculatedField::new("meta.total", CalculatedKind::Application, "records")
                .at(FieldLocation::Document),
        ]);
        let row = StringRecord::from(vec!["a"]);
        assert_eq!(resolve_record(&config, &row, 3).unwrap(), json!({"meta": {"row": 3}}));

        let logger = Logger::noop();
        let mut resolver = CalculatedResolver::new(&config, None, &logger);
        let mut out = Map::new();
        resolver.apply(FieldLocation::Document, 7, None, &mut out).unwrap();
        assert_eq!(Value::Object(out), json!({"meta": {"total": 7}}));
    }

    #[test]
    fn test_application_unknown_format() {
        let config = configuration(vec![CalculatedField::new("n", CalculatedKind::Application, "rows")]);
        let row = StringRecord::from(vec!["a"]);
        let err = resolve_record(&config, &row, 0).unwrap_err();
        assert!(matches!(err, MapError::UnknownApplicationFormat(f) if f == "rows"));
    }

    #[test]
    fn test_datetime_formats_current_time() {
        let config = configuration(vec![
            CalculatedField::new("year", CalculatedKind::DateTime, "%Y").with_type(ValueType::Int),
        ]);
        let row = StringRecord::from(vec!["a"]);
        let out = resolve_record(&config, &row, 0).unwrap();
        assert!(out["year"].as_i64().unwrap() >= 2024);
    }

    #[test]
    fn test_datetime_invalid_pattern() {
        let config = configuration(vec![CalculatedField::new("t", CalculatedKind::DateTime, "%Q")]);
        let row = StringRecord::from(vec!["a"]);
        let err = resolve_record(&config, &row, 0).unwrap_err();
        assert!(matches!(err, MapError::InvalidDateTimeFormat(_)));
    }

    #[test]
    fn test_environment_variable() {
        std::env::set_var("CSVMAP_TEST_CALCULATED_PORT", "8080");
        let config = configuration(vec![
            CalculatedField::new("port", CalculatedKind::Environment, "CSVMAP_TEST_CALCULATED_PORT")
                .with_type(ValueType::Int),
            CalculatedField::new("missing", CalculatedKind::Environment, "CSVMAP_TEST_CALCULATED_UNSET"),
        ]);
        let row = StringRecord::from(vec!["a"]);
        assert_eq!(
            resolve_record(&config, &row, 0).unwrap(),
            json!({"port": 8080, "missing": ""})
        );
    }

    #[test]
    fn test_environment_missing_with_int_type_fails() {
        let config = configuration(vec![
            CalculatedField::new("n", CalculatedKind::Environment, "CSVMAP_TEST_CALCULATED_ABSENT")
                .with_type(ValueType::Int),
        ]);
        let row = StringRecord::from(vec!["a"]);
        let err = resolve_record(&config, &row, 0).unwrap_err();
        assert!(matches!(err, MapError::CalculatedConversion { .. }));
    }

    #[test]
    fn test_extra_variables() {
        let mut config = configuration(vec![
            CalculatedField::new("source", CalculatedKind::Extra, "source"),
            CalculatedField::new("version", CalculatedKind::Extra, "version").with_type(ValueType::Float),
        ]);
        config
            .extra_variables
            .insert("source".into(), ExtraVariable::Plain("registry".into()));
        config
            .extra_variables
            .insert("version".into(), ExtraVariable::Wrapped { value: "1.5".into() });

        let row = StringRecord::from(vec!["a"]);
        assert_eq!(
            resolve_record(&config, &row, 0).unwrap(),
            json!({"source": "registry", "version": 1.5})
        );

        config.calculated.push(CalculatedField::new("x", CalculatedKind::Extra, "missing"));
        let err = resolve_record(&config, &row, 0).unwrap_err();
        assert_eq!(err.to_string(), "extra variable missing not found");
    }

    #[test]
    fn test_mapping_lookup() {
        let config = configuration(vec![CalculatedField::new(
            "gender",
            CalculatedKind::Mapping,
            "1:m=male,f=female,default=unknown",
        )]);

        let row = StringRecord::from(vec!["John", "m"]);
        assert_eq!(resolve_record(&config, &row, 0).unwrap(), json!({"gender": "male"}));

        let row = StringRecord::from(vec!["Alex", "x"]);
        assert_eq!(resolve_record(&config, &row, 0).unwrap(), json!({"gender": "unknown"}));
    }

    #[test]
    fn test_mapping_default_before_match() {
        let config = configuration(vec![CalculatedField::new(
            "gender",
            CalculatedKind::Mapping,
            "0:default=unknown,f=female",
        )]);
        let row = StringRecord::from(vec!["f"]);
        assert_eq!(resolve_record(&config, &row, 0).unwrap(), json!({"gender": "female"}));
    }

    #[test]
    fn test_mapping_without_match_omits_field() {
        let config = configuration(vec![CalculatedField::new("g", CalculatedKind::Mapping, "0:m=male")]);
        let row = StringRecord::from(vec!["x"]);
        assert_eq!(resolve_record(&config, &row, 0).unwrap(), json!({}));
    }

    #[test]
    fn test_mapping_named_reference() {
        let config = configuration(vec![CalculatedField::new(
            "flag",
            CalculatedKind::Mapping,
            "active:yes=1,no=0",
        )
        .with_type(ValueType::Bool)]);
        let header = StringRecord::from(vec!["name", "active"]);
        let index = HeaderIndex::from_record(&header);
        let row = StringRecord::from(vec!["John", "yes"]);
        let record = RecordWithInformation::named(&row, &header, &index);

        let logger = Logger::noop();
        let mut resolver = CalculatedResolver::new(&config, None, &logger);
        let mut out = Map::new();
        resolver.apply(FieldLocation::Record, 0, Some(&record), &mut out).unwrap();
        assert_eq!(Value::Object(out), json!({"flag": true}));
    }

    #[test]
    fn test_mapping_errors() {
        let row = StringRecord::from(vec!["m"]);

        let config = configuration(vec![CalculatedField::new("g", CalculatedKind::Mapping, "0-m=male")]);
        assert!(matches!(
            resolve_record(&config, &row, 0).unwrap_err(),
            MapError::MalformedMappingFormat { .. }
        ));

        let config = configuration(vec![CalculatedField::new("g", CalculatedKind::Mapping, "0:m=male,f")]);
        assert!(matches!(
            resolve_record(&config, &row, 0).unwrap_err(),
            MapError::MalformedMappingFormat { .. }
        ));

        let config = configuration(vec![CalculatedField::new("g", CalculatedKind::Mapping, "4:m=male")]);
        assert!(matches!(
            resolve_record(&config, &row, 0).unwrap_err(),
            MapError::MappingFieldNotFound { .. }
        ));
    }

    #[test]
    fn test_mapping_skipped_at_document_level() {
        let config = configuration(vec![
            CalculatedField::new("g", CalculatedKind::Mapping, "0:m=male").at(FieldLocation::Document),
        ]);
        let logger = Logger::noop();
        let mut resolver = CalculatedResolver::new(&config, None, &logger);
        let mut out = Map::new();
        resolver.apply(FieldLocation::Document, 2, None, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_ask_callback() {
        let config = configuration(vec![
            CalculatedField::new("answer", CalculatedKind::Ask, "How many?").with_type(ValueType::Int),
        ]);
        let logger = Logger::noop();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let calls = seen.clone();
        let mut ask = move |record: Option<&StringRecord>, _header: Option<&StringRecord>, field: &CalculatedField| {
            calls.borrow_mut().push((record.map(|r| r.len()), field.format.clone()));
            Ok::<_, BoxError>("42".to_string())
        };

        let mut resolver = CalculatedResolver::new(&config, Some(&mut ask), &logger);
        let row = StringRecord::from(vec!["a", "b"]);
        let record = RecordWithInformation::new(&row);
        let mut out = Map::new();
        resolver.apply(FieldLocation::Record, 0, Some(&record), &mut out).unwrap();
        assert_eq!(Value::Object(out), json!({"answer": 42}));
        assert_eq!(*seen.borrow(), vec![(Some(2), "How many?".to_string())]);
    }

    #[test]
    fn test_ask_without_callback() {
        let config = configuration(vec![CalculatedField::new("answer", CalculatedKind::Ask, "?")]);
        let row = StringRecord::from(vec!["a"]);
        assert!(matches!(
            resolve_record(&config, &row, 0).unwrap_err(),
            MapError::AskCallbackMissing
        ));
    }

    #[test]
    fn test_failing_ask_callback_aborts() {
        let config = configuration(vec![
            CalculatedField::new("answer", CalculatedKind::Ask, "?").at(FieldLocation::Document),
        ]);
        let logger = Logger::noop();
        let mut ask = |_: Option<&StringRecord>, _: Option<&StringRecord>, _: &CalculatedField| {
            Err::<String, BoxError>("no terminal".into())
        };
        let mut resolver = CalculatedResolver::new(&config, Some(&mut ask), &logger);
        let mut out = Map::new();
        let err = resolver.apply(FieldLocation::Document, 0, None, &mut out).unwrap_err();
        assert!(matches!(&err, MapError::Ask { property, .. } if property == "answer"));
        assert!(err.to_string().contains("no terminal"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_kind() {
        let config = configuration(vec![CalculatedField::new(
            "x",
            CalculatedKind::Unknown("random".into()),
            "",
        )]);
        let row = StringRecord::from(vec!["a"]);
        let err = resolve_record(&config, &row, 0).unwrap_err();
        assert_eq!(err.to_string(), "unknown kind \"random\"");
    }
}
