//! Raw cell string to typed value conversion.

use serde_json::{Number, Value};

use crate::config::ValueType;
use crate::error::TypeConversionError;

/// Convert a raw string to the value selected by `value_type`.
///
/// Unsupported labels (including the empty one and `string`) return the raw
/// string unchanged.
pub fn convert(value_type: &ValueType, raw: &str) -> Result<Value, TypeConversionError> {
    match value_type {
        ValueType::Int => parse_int(raw).map(|n| Value::Number(n.into())),
        ValueType::Float => parse_float(raw).and_then(|f| float_value(raw, f)),
        ValueType::Bool => parse_bool(raw).map(Value::Bool),
        ValueType::String | ValueType::Other(_) => Ok(Value::String(raw.to_string())),
    }
}

/// Base-10 signed 64-bit integer with an optional leading sign
pub fn parse_int(raw: &str) -> Result<i64, TypeConversionError> {
    raw.parse::<i64>()
        .map_err(|e| TypeConversionError::new(raw, "int", e.to_string()))
}

/// 64-bit float
pub fn parse_float(raw: &str) -> Result<f64, TypeConversionError> {
    raw.parse::<f64>()
        .map_err(|e| TypeConversionError::new(raw, "float", e.to_string()))
}

/// Boolean in one of the accepted spellings
pub fn parse_bool(raw: &str) -> Result<bool, TypeConversionError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(TypeConversionError::new(raw, "bool", "invalid syntax")),
    }
}

fn float_value(raw: &str, f: f64) -> Result<Value, TypeConversionError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| TypeConversionError::new(raw, "float", "value is not finite"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_convert_int() {
        assert_eq!(convert(&ValueType::Int, "42").unwrap(), json!(42));
        assert_eq!(convert(&ValueType::Int, "-7").unwrap(), json!(-7));
        assert_eq!(convert(&ValueType::Int, "+7").unwrap(), json!(7));

        let err = convert(&ValueType::Int, "abc").unwrap_err();
        assert_eq!(err.raw, "abc");
        assert_eq!(err.target, "int");
        assert!(convert(&ValueType::Int, "").is_err());
        assert!(convert(&ValueType::Int, "1.5").is_err());
    }

    #[test]
    fn test_convert_float() {
        assert_eq!(convert(&ValueType::Float, "3.14").unwrap(), json!(3.14));
        assert_eq!(convert(&ValueType::Float, "2").unwrap(), json!(2.0));
        assert!(convert(&ValueType::Float, "x").is_err());
        assert!(convert(&ValueType::Float, "NaN").is_err());
        assert!(convert(&ValueType::Float, "inf").is_err());
    }

    #[test]
    fn test_convert_bool() {
        for raw in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(convert(&ValueType::Bool, raw).unwrap(), json!(true), "{}", raw);
        }
        for raw in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(convert(&ValueType::Bool, raw).unwrap(), json!(false), "{}", raw);
        }
        assert!(convert(&ValueType::Bool, "yes").is_err());
        assert!(convert(&ValueType::Bool, "tRUE").is_err());
    }

    #[test]
    fn test_convert_passthrough() {
        assert_eq!(convert(&ValueType::String, "hello").unwrap(), json!("hello"));
        assert_eq!(convert(&ValueType::default(), "42").unwrap(), json!("42"));
        assert_eq!(convert(&ValueType::from("date"), "2020").unwrap(), json!("2020"));
    }
}
