//! Typed condition evaluation.
//!
//! Evaluation never fails: an operand that cannot be resolved or converted
//! degrades to the zero value of the comparison type and an error entry is
//! logged.

use crate::config::{Condition, Conditions, Operand, OperandKind, Operator, ValueType};
use crate::error::{AccessError, TypeConversionError};
use crate::logs::{LogEntry, Logger};
use crate::transform::coerce::{parse_bool, parse_float, parse_int};
use crate::transform::record::ValueSource;

impl Condition {
    /// Evaluate the condition against `source`. `property` names the
    /// target being decided and is only used for log context.
    pub fn applies<S>(&self, property: &str, source: &S, logger: &Logger) -> bool
    where
        S: ValueSource + ?Sized,
    {
        match &self.value_type {
            ValueType::Int => {
                let (a, b) = self.operands(property, source, logger, parse_int);
                self.compare(property, a, b, logger)
            }
            ValueType::Float => {
                let (a, b) = self.operands(property, source, logger, parse_float);
                self.compare(property, a, b, logger)
            }
            ValueType::String => {
                let (a, b) = self.operands(property, source, logger, |raw| Ok(raw.to_string()));
                self.compare(property, a, b, logger)
            }
            ValueType::Bool => {
                let (a, b) = self.operands(property, source, logger, parse_bool);
                match self.operator {
                    Operator::Eq => a == b,
                    Operator::Ne => a != b,
                    Operator::Gt | Operator::Lt => {
                        logger.error(
                            LogEntry::error("operator not supported for bool conditions")
                                .with("property", property)
                                .with("operator", self.operator.symbol()),
                        );
                        false
                    }
                    Operator::Other(_) => self.unknown_operator(property, logger),
                }
            }
            ValueType::Other(label) => {
                logger.error(
                    LogEntry::error("unsupported condition type")
                        .with("property", property)
                        .with("type", label),
                );
                false
            }
        }
    }

    fn operands<S, T, F>(&self, property: &str, source: &S, logger: &Logger, parse: F) -> (T, T)
    where
        S: ValueSource + ?Sized,
        T: Default,
        F: Fn(&str) -> Result<T, TypeConversionError>,
    {
        (
            resolve(&self.operand1, property, source, logger, &parse),
            resolve(&self.operand2, property, source, logger, &parse),
        )
    }

    fn compare<T: PartialOrd>(&self, property: &str, a: T, b: T, logger: &Logger) -> bool {
        match self.operator {
            Operator::Eq => a == b,
            Operator::Ne => a != b,
            Operator::Gt => a > b,
            Operator::Lt => a < b,
            Operator::Other(_) => self.unknown_operator(property, logger),
        }
    }

    fn unknown_operator(&self, property: &str, logger: &Logger) -> bool {
        logger.error(
            LogEntry::error("unknown condition operator")
                .with("property", property)
                .with("operator", self.operator.symbol()),
        );
        false
    }
}

fn resolve<S, T, F>(operand: &Operand, property: &str, source: &S, logger: &Logger, parse: &F) -> T
where
    S: ValueSource + ?Sized,
    T: Default,
    F: Fn(&str) -> Result<T, TypeConversionError>,
{
    let resolved = match operand.kind {
        OperandKind::Value => parse(&operand.value).map_err(AccessError::from),
        OperandKind::Column => source
            .raw_value(&operand.value)
            .and_then(|raw| parse(&*raw).map_err(AccessError::from)),
    };

    resolved.unwrap_or_else(|e| {
        logger.error(
            LogEntry::error("cannot resolve condition operand")
                .with("property", property)
                .with("operand", &operand.value)
                .with("error", e),
        );
        T::default()
    })
}

impl Conditions {
    /// Logical AND of every condition. An empty list never applies.
    pub fn apply<S>(&self, property: &str, source: &S, logger: &Logger) -> bool
    where
        S: ValueSource + ?Sized,
    {
        !self.0.is_empty() && self.0.iter().all(|c| c.applies(property, source, logger))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
