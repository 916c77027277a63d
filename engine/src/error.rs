//! Error types for the csvmap engine.
//!
//! The hierarchy follows the layers of a mapping run:
//!
//! - [`TypeConversionError`] - a raw cell could not be coerced to its configured type
//! - [`AccessError`] - a field reference could not be resolved against a record
//! - [`ConfigError`] - construction-time failures (separator, output type, configuration)
//! - [`MapError`] - run-time failures surfaced by [`crate::Mapper::map_io`]
//! - [`SplitError`] - failures of the JSON array splitter
//!
//! Lower layers convert into higher ones via `From`, so `?` works across
//! error boundaries.

use thiserror::Error;

/// Error type returned by host-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Type Conversion Errors
// =============================================================================

/// A raw string could not be converted to the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert '{raw}' to {target}: {message}")]
pub struct TypeConversionError {
    /// The raw cell content.
    pub raw: String,
    /// The requested type label.
    pub target: String,
    /// Parser message.
    pub message: String,
}

impl TypeConversionError {
    pub fn new(raw: impl Into<String>, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            target: target.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Record Access Errors
// =============================================================================

/// Errors while resolving a column reference against a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Named mode: no header carries this name.
    #[error("header not found: {0}")]
    HeaderNotFound(String),

    /// Unnamed mode: the reference is not a non-negative integer.
    #[error("invalid column index '{0}'")]
    InvalidIndex(String),

    /// Unnamed mode: the index is past the end of the record.
    #[error("index out of range: {index} (record has {len} fields)")]
    IndexOutOfRange { index: usize, len: usize },

    /// JSON sources: the dotted path does not resolve to a value.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The cell was found but could not be coerced.
    #[error(transparent)]
    Conversion(#[from] TypeConversionError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors raised while building a [`crate::Mapper`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The CSV separator is not exactly one byte.
    #[error("separator must be 1 character long ({0:?})")]
    InvalidSeparator(String),

    /// The output type is not json, yaml or toml.
    #[error("unknown marshaling type {0:?}")]
    UnknownOutputType(String),

    /// The input encoding label is not known.
    #[error("unknown input encoding {0:?}")]
    UnknownEncoding(String),

    /// A column configuration breaks the property/properties rules.
    #[error("invalid mapping configuration for '{key}': {reason}")]
    InvalidColumnConfiguration { key: String, reason: String },

    /// The configuration document is not valid JSON for the expected shape.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Mapping Run Errors
// =============================================================================

/// Errors raised while mapping an input stream.
#[derive(Debug, Error)]
pub enum MapError {
    /// Malformed delimited input (e.g. inconsistent field count).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input could not be decoded to UTF-8.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Named mode was requested but the input has no header row.
    #[error("input has no header row")]
    MissingHeader,

    /// A mapped cell could not be converted to its configured type.
    #[error("column '{column}': {source}")]
    Conversion {
        column: String,
        #[source]
        source: TypeConversionError,
    },

    /// A calculated value could not be converted to its configured type.
    #[error("calculated field '{property}': {source}")]
    CalculatedConversion {
        property: String,
        #[source]
        source: TypeConversionError,
    },

    /// The calculated field kind is not supported.
    #[error("unknown kind {0:?}")]
    UnknownCalculatedFieldKind(String),

    /// `application` fields accept `record` or `records`.
    #[error("unknown application format {0:?}")]
    UnknownApplicationFormat(String),

    /// The `datetime` pattern could not be parsed.
    #[error("invalid datetime format {0:?}")]
    InvalidDateTimeFormat(String),

    /// An `extra` field references an undefined variable.
    #[error("extra variable {0} not found")]
    ExtraVariableNotFound(String),

    /// A `mapping` field format does not follow `field:from=to,...`.
    #[error("malformed mapping format {format:?}: {reason}")]
    MalformedMappingFormat { format: String, reason: String },

    /// The source column of a `mapping` field cannot be resolved.
    #[error("mapping field {field} not found: {source}")]
    MappingFieldNotFound {
        field: String,
        #[source]
        source: AccessError,
    },

    /// An `ask` field is configured but no callback was registered.
    #[error("ask value function not set")]
    AskCallbackMissing,

    /// The `ask` callback returned an error.
    #[error("ask value function failed for '{property}': {source}")]
    Ask {
        property: String,
        #[source]
        source: BoxError,
    },

    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization failed.
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML serialization failed.
    #[error("TOML serialization failed: {0}")]
    Toml(#[from] toml::ser::Error),
}

// =============================================================================
// Splitter Errors
// =============================================================================

/// Errors raised by the JSON array splitter.
#[derive(Debug, Error)]
pub enum SplitError {
    /// Input or configuration is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading the input failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A segment of the array path is missing.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A value on the array path is not an object.
    #[error("no json object found at [{0}]")]
    NotAnObject(String),

    /// The located value is not an array.
    #[error("input is not an array")]
    NotAnArray,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for record access.
pub type AccessResult<T> = Result<T, AccessError>;

/// Result type for construction.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for mapping runs.
pub type MapResult<T> = Result<T, MapError>;

/// Result type for the splitter.
pub type SplitResult<T> = Result<T, SplitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // TypeConversionError -> AccessError
        let conv = TypeConversionError::new("abc", "int", "invalid digit found in string");
        let access: AccessError = conv.into();
        assert!(access.to_string().contains("'abc'"));

        // serde_json::Error -> ConfigError
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let config_err: ConfigError = json_err.into();
        assert!(config_err.to_string().starts_with("invalid configuration"));
    }

    #[test]
    fn test_conversion_error_format() {
        let err = MapError::Conversion {
            column: "age".into(),
            source: TypeConversionError::new("thirty", "int", "invalid digit found in string"),
        };
        let msg = err.to_string();
        assert!(msg.contains("column 'age'"));
        assert!(msg.contains("'thirty' to int"));
    }
}
