//! Mapping configuration
//!
//! The configuration is a JSON document describing how CSV columns become
//! properties of the output document, which rows are filtered out and which
//! values are calculated instead of read from a column.

pub mod types;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{ConfigError, ConfigResult};

pub use types::{
    CalculatedKind, Condition, Conditions, FieldLocation, Operand, OperandKind, Operator, ValueType,
};

/// Root of a mapping configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Static variables usable by `extra` calculated fields
    #[serde(default)]
    pub extra_variables: HashMap<String, ExtraVariable>,

    /// Calculated fields, applied in declaration order
    #[serde(default)]
    pub calculated: Vec<CalculatedField>,

    /// Column key (index or header name) -> column configuration
    #[serde(default)]
    pub mapping: HashMap<String, ColumnConfiguration>,

    /// Filter groups: a row matching every condition of any group is dropped
    #[serde(default)]
    pub filter: BTreeMap<String, Conditions>,
}

/// Configuration for one CSV column.
///
/// Either `property` + `type`, or a list of `properties`. Never both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfiguration {
    /// Conditional targets for the column
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyConfiguration>,

    /// Dotted target path
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub property: String,

    /// Target type
    #[serde(rename = "type", default, skip_serializing_if = "ValueType::is_empty")]
    pub value_type: ValueType,
}

/// One target of a multi-property column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyConfiguration {
    /// Dotted target path
    #[serde(default)]
    pub property: String,

    /// Target type
    #[serde(rename = "type", default)]
    pub value_type: ValueType,

    /// Only write the property when this condition holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

/// A value not read directly from a CSV cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedField {
    /// Dotted target path
    pub property: String,

    /// Resolution strategy
    pub kind: CalculatedKind,

    /// Kind-specific argument (pattern, variable name, lookup table, ...)
    #[serde(default)]
    pub format: String,

    /// Target type of the resolved value
    #[serde(rename = "type", default)]
    pub value_type: ValueType,

    /// Per record or once per document
    #[serde(default)]
    pub location: FieldLocation,
}

/// A static variable, written either as `"name": "value"` or
/// `"name": {"value": "value"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraVariable {
    Plain(String),
    Wrapped { value: String },
}

impl ExtraVariable {
    pub fn value(&self) -> &str {
        match self {
            ExtraVariable::Plain(v) => v,
            ExtraVariable::Wrapped { value } => value,
        }
    }
}

impl Configuration {
    /// Parse a configuration from JSON bytes
    pub fn from_json(bytes: &[u8]) -> ConfigResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize to a pretty JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check every column configuration, reporting the first invalid key
    /// in lexicographic order.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut keys: Vec<&String> = self.mapping.keys().collect();
        keys.sort();
        for key in keys {
            self.mapping[key].validate(key)?;
        }
        Ok(())
    }

    /// Whether any calculated field is resolved at document level
    pub fn has_document_fields(&self) -> bool {
        self.calculated
            .iter()
            .any(|f| f.location == FieldLocation::Document)
    }

    /// Look up an extra variable by name
    pub fn extra_variable(&self, name: &str) -> Option<&str> {
        self.extra_variables.get(name).map(ExtraVariable::value)
    }
}

impl ColumnConfiguration {
    /// Single-property column
    pub fn single(property: &str, value_type: ValueType) -> Self {
        Self {
            properties: Vec::new(),
            property: property.to_string(),
            value_type,
        }
    }

    /// Multi-property column
    pub fn multiple(properties: Vec<PropertyConfiguration>) -> Self {
        Self {
            properties,
            property: String::new(),
            value_type: ValueType::default(),
        }
    }

    /// Whether the column uses conditional multi-mapping
    pub fn is_multiple(&self) -> bool {
        !self.properties.is_empty()
    }

    pub fn validate(&self, key: &str) -> ConfigResult<()> {
        let invalid = |reason: &str| ConfigError::InvalidColumnConfiguration {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        if !self.property.is_empty() && !self.properties.is_empty() {
            return Err(invalid("property and properties are mutually exclusive"));
        }
        if !self.property.is_empty() && self.value_type.is_empty() {
            return Err(invalid("property is set without a type"));
        }
        for (i, property) in self.properties.iter().enumerate() {
            if property.property.is_empty() || property.value_type.is_empty() {
                return Err(invalid(&format!("properties[{}] needs both property and type", i)));
            }
        }
        Ok(())
    }
}

impl PropertyConfiguration {
    pub fn new(property: &str, value_type: ValueType) -> Self {
        Self {
            property: property.to_string(),
            value_type,
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

impl CalculatedField {
    pub fn new(property: &str, kind: CalculatedKind, format: &str) -> Self {
        Self {
            property: property.to_string(),
            kind,
            format: format.to_string(),
            value_type: ValueType::default(),
            location: FieldLocation::Record,
        }
    }

    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn at(mut self, location: FieldLocation) -> Self {
        self.location = location;
        self
    }
}

/// Generate an example configuration for documentation and the CLI
pub fn example_configuration() -> Configuration {
    let mut mapping = HashMap::new();
    mapping.insert(
        "name".to_string(),
        ColumnConfiguration::single("person.name", ValueType::String),
    );
    mapping.insert(
        "age".to_string(),
        ColumnConfiguration::multiple(vec![
            PropertyConfiguration::new("person.age", ValueType::Int),
            PropertyConfiguration::new("person.adult_age", ValueType::Int).with_condition(
                Condition::new(
                    Operand::column("age"),
                    Operand::value("17"),
                    Operator::Gt,
                    ValueType::Int,
                ),
            ),
        ]),
    );

    let mut filter = BTreeMap::new();
    filter.insert(
        "no-name".to_string(),
        Conditions(vec![Condition::new(
            Operand::column("name"),
            Operand::value(""),
            Operator::Eq,
            ValueType::String,
        )]),
    );

    let mut extra_variables = HashMap::new();
    extra_variables.insert(
        "source".to_string(),
        ExtraVariable::Wrapped { value: "registry".to_string() },
    );

    Configuration {
        extra_variables,
        calculated: vec![
            CalculatedField::new("meta.row", CalculatedKind::Application, "record"),
            CalculatedField::new("meta.source", CalculatedKind::Extra, "source")
                .with_type(ValueType::String),
            CalculatedField::new("meta.group", CalculatedKind::Mapping, "age:30=thirties,default=other")
                .with_type(ValueType::String),
            CalculatedField::new("generated", CalculatedKind::DateTime, "%Y-%m-%dT%H:%M:%S")
                .at(FieldLocation::Document),
        ],
        mapping,
        filter,
    }
}

/// Description of the calculated field kinds for the CLI
pub fn kinds_description() -> String {
    r#"Calculated field kinds:

| Kind | Format | Result |
|------|--------|--------|
| application | record / records | row index (record), number of records (document) |
| datetime | strftime pattern, e.g. %Y-%m-%d | current local time |
| environment | variable name | value of the variable, empty when unset |
| extra | extra variable name | value from extra_variables |
| mapping | field:from=to,...,default=to | lookup of the raw cell value |
| ask | free text passed to the host | answer of the host callback |

Every value is converted with the field "type" (int, float, bool, string).
Fields with "location": "document" are applied once to the wrapping object
in array mode."#
        .to_string()
}
