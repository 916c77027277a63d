//! Field access for the row being mapped.
//!
//! [`ValueSource`] is the seam shared by CSV rows and JSON objects: conditions
//! and calculated fields only ever ask a source for the raw string behind a
//! field reference.

use std::borrow::Cow;
use std::collections::HashMap;

use csv::StringRecord;
use serde_json::{Map, Value};

use crate::config::ValueType;
use crate::error::{AccessError, AccessResult};
use crate::transform::coerce::convert;

/// Something a field reference can be resolved against
pub trait ValueSource {
    /// Uncoerced string behind `column`
    fn raw_value(&self, column: &str) -> AccessResult<Cow<'_, str>>;

    /// Value behind `column`, converted to `value_type`
    fn get_value(&self, value_type: &ValueType, column: &str) -> AccessResult<Value> {
        let raw = self.raw_value(column)?;
        Ok(convert(value_type, &raw)?)
    }
}

/// Header name -> column index, built once from the header row.
///
/// A repeated header name resolves to its last occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn from_record(header: &StringRecord) -> Self {
        let positions = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();
        Self { positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Borrowed view of one row with its optional header information.
///
/// With a header index the record is in named mode: references are header
/// names. Without it references are zero-based column indices.
#[derive(Debug, Clone, Copy)]
pub struct RecordWithInformation<'a> {
    pub record: &'a StringRecord,
    pub header: Option<&'a StringRecord>,
    index: Option<&'a HeaderIndex>,
}

impl<'a> RecordWithInformation<'a> {
    /// Unnamed mode view
    pub fn new(record: &'a StringRecord) -> Self {
        Self { record, header: None, index: None }
    }

    /// Named mode view
    pub fn named(record: &'a StringRecord, header: &'a StringRecord, index: &'a HeaderIndex) -> Self {
        Self { record, header: Some(header), index: Some(index) }
    }

    pub fn is_named(&self) -> bool {
        self.index.is_some()
    }

    /// Configuration key of the column at `position`: the header name in
    /// named mode, the stringified index otherwise.
    pub fn column_key(&self, position: usize) -> Option<Cow<'a, str>> {
        match self.header {
            Some(header) if self.index.is_some() => header.get(position).map(Cow::Borrowed),
            _ => Some(Cow::Owned(position.to_string())),
        }
    }

    fn position(&self, column: &str) -> AccessResult<usize> {
        match self.index {
            Some(index) => index
                .position(column)
                .ok_or_else(|| AccessError::HeaderNotFound(column.to_string())),
            None => column
                .parse::<usize>()
                .map_err(|_| AccessError::InvalidIndex(column.to_string())),
        }
    }
}

impl ValueSource for RecordWithInformation<'_> {
    fn raw_value(&self, column: &str) -> AccessResult<Cow<'_, str>> {
        let position = self.position(column)?;
        self.record
            .get(position)
            .map(Cow::Borrowed)
            .ok_or(AccessError::IndexOutOfRange {
                index: position,
                len: self.record.len(),
            })
    }
}

/// JSON objects resolve dotted paths. Non-string leaves are compared through
/// their JSON text; `null` reads as the empty string.
impl ValueSource for Map<String, Value> {
    fn raw_value(&self, column: &str) -> AccessResult<Cow<'_, str>> {
        let not_found = || AccessError::KeyNotFound(column.to_string());

        let mut segments = column.split('.');
        let first = segments.next().ok_or_else(not_found)?;
        let mut current = self.get(first).ok_or_else(not_found)?;
        for segment in segments {
            current = current
                .as_object()
                .and_then(|object| object.get(segment))
                .ok_or_else(not_found)?;
        }

        Ok(match current {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            Value::Null => Cow::Borrowed(""),
            other => Cow::Owned(other.to_string()),
        })
    }
}
