//! # csvmap - configuration driven CSV to JSON/YAML/TOML mapping
//!
//! csvmap turns rows of a delimited file into nested documents. A JSON
//! configuration says which column lands on which property, which rows are
//! dropped and which values are calculated instead of read.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  CSV input  │────▶│   Parser    │────▶│    Mapper    │────▶│ JSON / YAML │
//! │ (any enc.)  │     │ (decoding)  │     │ (filter/map) │     │   / TOML    │
//! └─────────────┘     └─────────────┘     └──────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use csvmap::MapperBuilder;
//!
//! let configuration = std::fs::read("mapping.json")?;
//! let mut mapper = MapperBuilder::from_json(&configuration)
//!     .separator(",")
//!     .access_by_header(true)
//!     .output_type("yaml")
//!     .build()?;
//! let document = mapper.map(&std::fs::read("input.csv")?)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Log entries and observers
//! - [`config`] - Mapping configuration
//! - [`parser`] - Separator and input encoding handling
//! - [`transform`] - Conditions, field mapping, calculated fields and the engine
//! - [`split`] - JSON array splitter

// Core modules
pub mod error;
pub mod logs;

// Configuration
pub mod config;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Splitting
pub mod split;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AccessError, BoxError, ConfigError, ConfigResult, MapError, MapResult, SplitError, SplitResult,
    TypeConversionError,
};

// =============================================================================
// Re-exports - Logging
// =============================================================================

pub use logs::{ConsoleObserver, LogEntry, LogLevel, Logger, MappingObserver, MemoryObserver, NoopObserver};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    example_configuration, kinds_description, CalculatedField, CalculatedKind, ColumnConfiguration,
    Condition, Conditions, Configuration, ExtraVariable, FieldLocation, Operand, OperandKind, Operator,
    PropertyConfiguration, ValueType,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{decode_content, detect_encoding, parse_separator, InputEncoding};

// =============================================================================
// Re-exports - Mapping engine
// =============================================================================

pub use transform::{
    convert, set_value, HeaderIndex, Mapper, MapperBuilder, OutputFormat, RecordWithInformation,
    RunSummary, ValueSource,
};

// =============================================================================
// Re-exports - Splitter
// =============================================================================

pub use split::{Groups, SplitConfiguration, Splitter};
