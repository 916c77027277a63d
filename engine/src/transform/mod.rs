//! Transformation module.
//!
//! This module turns CSV rows into nested documents:
//! - Coerce: raw cell to typed value
//! - Record: field access by index or header name
//! - Condition: typed comparisons for filters and conditional properties
//! - Path: dotted property writes
//! - Fields / Calculated: per row value production
//! - Pipeline: the mapping engine

pub mod calculated;
pub mod coerce;
pub mod condition;
pub mod fields;
pub mod path;
pub mod pipeline;
pub mod record;

pub use calculated::{AskFn, CalculatedResolver};
pub use coerce::convert;
pub use fields::map_fields;
pub use path::set_value;
pub use pipeline::*;
pub use record::{HeaderIndex, RecordWithInformation, ValueSource};
