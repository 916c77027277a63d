//! JSON array splitter.
//!
//! Sorts the elements of a JSON array into named groups with the same
//! conditions used to filter CSV rows. `column` operands are dotted paths
//! inside each element.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Conditions;
use crate::error::{SplitError, SplitResult};
use crate::logs::{LogEntry, Logger, MappingObserver};

/// Group name -> elements, in group name order
pub type Groups = BTreeMap<String, Vec<Value>>;

/// Splitter configuration: `{"groups": {name: [condition, ...]}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitConfiguration {
    #[serde(default)]
    pub groups: BTreeMap<String, Conditions>,
}

impl SplitConfiguration {
    pub fn from_json(bytes: &[u8]) -> SplitResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Splits a JSON array into groups
#[derive(Debug, Clone)]
pub struct Splitter {
    configuration: SplitConfiguration,
    array_path: Option<String>,
    output_empty_groups: bool,
    logger: Logger,
}

impl Splitter {
    pub fn new(configuration: SplitConfiguration) -> Self {
        Self {
            configuration,
            array_path: None,
            output_empty_groups: false,
            logger: Logger::noop(),
        }
    }

    /// Dotted path of the array inside the input. Empty means the input
    /// itself is the array.
    pub fn array_path(mut self, path: &str) -> Self {
        self.array_path = (!path.is_empty()).then(|| path.to_string());
        self
    }

    /// Keep groups that matched no element
    pub fn output_empty_groups(mut self, output_empty_groups: bool) -> Self {
        self.output_empty_groups = output_empty_groups;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn MappingObserver>) -> Self {
        self.logger = Logger::new(observer);
        self
    }

    /// Parse `input` as JSON and split it
    pub fn split(&self, input: &[u8]) -> SplitResult<Groups> {
        let value: Value = serde_json::from_slice(input)?;
        self.split_value(&value)
    }

    /// Split an already parsed document
    pub fn split_value(&self, input: &Value) -> SplitResult<Groups> {
        let elements = self.locate_array(input)?;
        self.logger.debug(
            LogEntry::debug("splitting array")
                .with("elements", elements.len())
                .with("groups", self.configuration.groups.len()),
        );

        let mut groups = Groups::new();
        for (name, conditions) in &self.configuration.groups {
            let members: Vec<Value> = elements
                .iter()
                .filter(|element| match element.as_object() {
                    Some(object) => conditions.apply(name, object, &self.logger),
                    None => false,
                })
                .cloned()
                .collect();

            self.logger.debug(
                LogEntry::debug("group evaluated")
                    .with("group", name)
                    .with("members", members.len()),
            );
            if !members.is_empty() || self.output_empty_groups {
                groups.insert(name.clone(), members);
            }
        }
        Ok(groups)
    }

    fn locate_array<'v>(&self, input: &'v Value) -> SplitResult<&'v Vec<Value>> {
        let mut current = input;
        if let Some(path) = &self.array_path {
            let mut walked: Vec<&str> = Vec::new();
            for segment in path.split('.') {
                let object = current
                    .as_object()
                    .ok_or_else(|| SplitError::NotAnObject(walked.join(".")))?;
                current = object
                    .get(segment)
                    .ok_or_else(|| SplitError::KeyNotFound(segment.to_string()))?;
                walked.push(segment);
            }
        }
        current.as_array().ok_or(SplitError::NotAnArray)
    }
}
