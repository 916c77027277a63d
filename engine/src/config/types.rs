//! Scalar configuration vocabulary: type labels, operators, operands,
//! conditions and calculated field kinds.
//!
//! Labels that the engine must tolerate at run time (unsupported types,
//! unknown operators, unknown kinds) are kept as data instead of being
//! rejected by the JSON parser.

use serde::{Deserialize, Serialize};

/// Target type label used by columns, conditions and calculated fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValueType {
    Int,
    Float,
    Bool,
    String,
    /// Any other label, including the empty one. Values pass through as strings.
    Other(std::string::String),
}

impl ValueType {
    pub fn label(&self) -> &str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::String => "string",
            ValueType::Other(label) => label,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.label().is_empty()
    }
}

impl Default for ValueType {
    fn default() -> Self {
        ValueType::Other(std::string::String::new())
    }
}

impl From<std::string::String> for ValueType {
    fn from(label: std::string::String) -> Self {
        match label.as_str() {
            "int" => ValueType::Int,
            "float" => ValueType::Float,
            "bool" => ValueType::Bool,
            "string" => ValueType::String,
            _ => ValueType::Other(label),
        }
    }
}

impl From<&str> for ValueType {
    fn from(label: &str) -> Self {
        ValueType::from(label.to_string())
    }
}

impl From<ValueType> for std::string::String {
    fn from(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

/// Comparison operator of a [`Condition`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    /// Never applies
    Other(String),
}

impl Operator {
    pub fn symbol(&self) -> &str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Other(symbol) => symbol,
        }
    }
}

impl From<String> for Operator {
    fn from(symbol: String) -> Self {
        match symbol.as_str() {
            "=" => Operator::Eq,
            "!=" => Operator::Ne,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            _ => Operator::Other(symbol),
        }
    }
}

impl From<Operator> for String {
    fn from(operator: Operator) -> Self {
        match operator {
            Operator::Other(symbol) => symbol,
            known => known.symbol().to_string(),
        }
    }
}

/// Where an operand takes its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperandKind {
    /// The operand value is a literal
    Value,
    /// The operand value is a column reference (index or header name)
    Column,
}

/// One side of a [`Condition`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    #[serde(rename = "type")]
    pub kind: OperandKind,

    #[serde(default)]
    pub value: String,
}

impl Operand {
    pub fn value(value: &str) -> Self {
        Self { kind: OperandKind::Value, value: value.to_string() }
    }

    pub fn column(reference: &str) -> Self {
        Self { kind: OperandKind::Column, value: reference.to_string() }
    }
}

/// Typed binary comparison between two operands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub operand1: Operand,
    pub operand2: Operand,
    pub operator: Operator,

    /// Comparison domain
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

impl Condition {
    pub fn new(operand1: Operand, operand2: Operand, operator: Operator, value_type: ValueType) -> Self {
        Self { operand1, operand2, operator, value_type }
    }
}

/// Conditions combined with a logical AND
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(pub Vec<Condition>);

impl From<Vec<Condition>> for Conditions {
    fn from(conditions: Vec<Condition>) -> Self {
        Self(conditions)
    }
}

/// Resolution strategy of a calculated field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CalculatedKind {
    Application,
    DateTime,
    Environment,
    Extra,
    Mapping,
    Ask,
    /// Rejected when the field is resolved
    Unknown(String),
}

impl CalculatedKind {
    pub fn name(&self) -> &str {
        match self {
            CalculatedKind::Application => "application",
            CalculatedKind::DateTime => "datetime",
            CalculatedKind::Environment => "environment",
            CalculatedKind::Extra => "extra",
            CalculatedKind::Mapping => "mapping",
            CalculatedKind::Ask => "ask",
            CalculatedKind::Unknown(name) => name,
        }
    }
}

impl From<String> for CalculatedKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "application" => CalculatedKind::Application,
            "datetime" => CalculatedKind::DateTime,
            "environment" => CalculatedKind::Environment,
            "extra" => CalculatedKind::Extra,
            "mapping" => CalculatedKind::Mapping,
            "ask" => CalculatedKind::Ask,
            _ => CalculatedKind::Unknown(name),
        }
    }
}

impl From<CalculatedKind> for String {
    fn from(kind: CalculatedKind) -> Self {
        match kind {
            CalculatedKind::Unknown(name) => name,
            known => known.name().to_string(),
        }
    }
}

/// Phase in which a calculated field is resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldLocation {
    /// Once per emitted record
    #[default]
    Record,
    /// Once on the wrapping document, after all rows
    Document,
}
