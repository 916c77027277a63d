//! Mapping engine: builder, run loop and output serialization.
//!
//! # Example
//!
//! ```rust,ignore
//! use csvmap::{MapperBuilder, OutputFormat};
//!
//! let configuration = br#"{"mapping": {
//!     "0": {"property": "person.name", "type": "string"},
//!     "1": {"property": "person.age", "type": "int"}
//! }}"#;
//!
//! let mut mapper = MapperBuilder::from_json(configuration)
//!     .separator(",")
//!     .build()?;
//! let output = mapper.map(b"John,30\nJane,25")?;
//! assert_eq!(
//!     String::from_utf8(output)?,
//!     "{\"person\":{\"name\":\"John\",\"age\":30}}\n{\"person\":{\"name\":\"Jane\",\"age\":25}}"
//! );
//! ```

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{CalculatedField, Configuration, FieldLocation};
use crate::error::{BoxError, ConfigError, ConfigResult, MapError, MapResult};
use crate::logs::{LogEntry, Logger, MappingObserver};
use crate::parser::{csv_reader, decode_input, parse_separator, InputEncoding, DEFAULT_SEPARATOR};
use crate::transform::calculated::{AskFn, CalculatedResolver};
use crate::transform::fields::map_fields;
use crate::transform::record::{HeaderIndex, RecordWithInformation};

/// Wrapper property used in array mode when none is configured
pub const DEFAULT_NESTED_PROPERTY_NAME: &str = "data";

/// Host callback fired with `(record, header)`
pub type RecordFn = dyn FnMut(&StringRecord, Option<&StringRecord>);

/// Output document format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Toml,
}

impl OutputFormat {
    /// Parse an output type name. The empty name means json.
    pub fn parse(name: &str) -> ConfigResult<Self> {
        match name {
            "" | "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "toml" => Ok(OutputFormat::Toml),
            other => Err(ConfigError::UnknownOutputType(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Toml => "toml",
        }
    }

    /// MIME type of the serialized output
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Yaml => "application/yaml",
            OutputFormat::Toml => "application/toml",
        }
    }

    /// YAML and TOML documents cannot be streamed record by record
    pub fn forces_array(&self) -> bool {
        !matches!(self, OutputFormat::Json)
    }

    /// Serialize `value` as one document of this format
    pub fn to_bytes<T: Serialize>(&self, value: &T) -> MapResult<Vec<u8>> {
        Ok(match self {
            OutputFormat::Json => serde_json::to_vec(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?.into_bytes(),
            OutputFormat::Toml => toml::to_string(value)?.into_bytes(),
        })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counters of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Data rows read (header excluded)
    pub rows_read: usize,
    /// Records written to the output
    pub emitted: usize,
    /// Rows dropped by a filter group
    pub filtered: usize,
}

/// Stage of a run, reported in debug logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    ReadingHeader,
    ReadingRows,
    Finalizing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::ReadingHeader => "reading header",
            Phase::ReadingRows => "reading rows",
            Phase::Finalizing => "finalizing",
        })
    }
}

enum ConfigurationSource {
    Json(Vec<u8>),
    Parsed(Configuration),
}

/// Builder for [`Mapper`]. Nothing is validated until [`MapperBuilder::build`].
pub struct MapperBuilder {
    source: ConfigurationSource,
    separator: String,
    output_type: String,
    nested_property_name: Option<String>,
    generate_array: bool,
    named: bool,
    encoding: InputEncoding,
    observer: Option<Arc<dyn MappingObserver>>,
    on_record: Option<Box<RecordFn>>,
    on_filtered: Option<Box<RecordFn>>,
    ask: Option<Box<AskFn>>,
}

impl MapperBuilder {
    /// Start from a JSON configuration document
    pub fn from_json(configuration: &[u8]) -> Self {
        Self::with_source(ConfigurationSource::Json(configuration.to_vec()))
    }

    /// Start from an already parsed configuration
    pub fn new(configuration: Configuration) -> Self {
        Self::with_source(ConfigurationSource::Parsed(configuration))
    }

    fn with_source(source: ConfigurationSource) -> Self {
        Self {
            source,
            separator: DEFAULT_SEPARATOR.to_string(),
            output_type: String::new(),
            nested_property_name: None,
            generate_array: false,
            named: false,
            encoding: InputEncoding::default(),
            observer: None,
            on_record: None,
            on_filtered: None,
            ask: None,
        }
    }

    /// CSV separator, exactly one byte
    pub fn separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    /// `json` (default), `yaml` or `toml`
    pub fn output_type(mut self, output_type: &str) -> Self {
        self.output_type = output_type.to_string();
        self
    }

    /// Wrap the array of records under this property. Empty means unset.
    pub fn nested_property_name(mut self, name: &str) -> Self {
        self.nested_property_name = (!name.is_empty()).then(|| name.to_string());
        self
    }

    /// Emit one document holding every record instead of streaming them
    pub fn generate_array(mut self, generate_array: bool) -> Self {
        self.generate_array = generate_array;
        self
    }

    /// Read a header row and reference columns by name
    pub fn access_by_header(mut self, named: bool) -> Self {
        self.named = named;
        self
    }

    pub fn encoding(mut self, encoding: InputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn MappingObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Called for every row that passes the filters, before it is mapped
    pub fn on_record<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&StringRecord, Option<&StringRecord>) + 'static,
    {
        self.on_record = Some(Box::new(callback));
        self
    }

    /// Called for every row dropped by a filter group
    pub fn on_filtered<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&StringRecord, Option<&StringRecord>) + 'static,
    {
        self.on_filtered = Some(Box::new(callback));
        self
    }

    /// Answers `ask` calculated fields
    pub fn ask<F>(mut self, callback: F) -> Self
    where
        F: FnMut(Option<&StringRecord>, Option<&StringRecord>, &CalculatedField) -> Result<String, BoxError>
            + 'static,
    {
        self.ask = Some(Box::new(callback));
        self
    }

    /// Validate everything and build the mapper
    pub fn build(self) -> ConfigResult<Mapper> {
        let logger = self.observer.map(Logger::new).unwrap_or_default();

        let separator = parse_separator(&self.separator)?;
        let format = OutputFormat::parse(&self.output_type)?;
        let configuration = match self.source {
            ConfigurationSource::Json(bytes) => Configuration::from_json(&bytes)?,
            ConfigurationSource::Parsed(configuration) => configuration,
        };
        configuration.validate()?;

        let array = self.generate_array || format.forces_array();
        logger.debug(
            LogEntry::debug("mapper configured")
                .with("format", format)
                .with("array", array)
                .with("named", self.named)
                .with("columns", configuration.mapping.len())
                .with("calculated", configuration.calculated.len())
                .with("filters", configuration.filter.len()),
        );

        Ok(Mapper {
            configuration,
            separator,
            format,
            nested_property_name: self.nested_property_name,
            array,
            named: self.named,
            encoding: self.encoding,
            logger,
            on_record: self.on_record,
            on_filtered: self.on_filtered,
            ask: self.ask,
        })
    }
}

/// Configured mapping engine. Runs take `&mut self` because host callbacks
/// are `FnMut`.
pub struct Mapper {
    configuration: Configuration,
    separator: u8,
    format: OutputFormat,
    nested_property_name: Option<String>,
    array: bool,
    named: bool,
    encoding: InputEncoding,
    logger: Logger,
    on_record: Option<Box<RecordFn>>,
    on_filtered: Option<Box<RecordFn>>,
    ask: Option<Box<AskFn>>,
}

impl Mapper {
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    /// MIME type of the produced output
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// Whether records are collected into one document
    pub fn is_array(&self) -> bool {
        self.array
    }

    /// Map an in-memory input and return the serialized output
    pub fn map(&mut self, input: &[u8]) -> MapResult<Vec<u8>> {
        let mut output = Vec::new();
        self.map_io(input, &mut output)?;
        Ok(output)
    }

    /// Map `reader` into `writer` in a single pass
    pub fn map_io<R: Read, W: Write>(&mut self, reader: R, writer: W) -> MapResult<RunSummary> {
        if self.encoding.needs_decoding() {
            let decoded = decode_input(reader, &self.encoding)?;
            self.run(decoded.as_slice(), writer)
        } else {
            self.run(reader, writer)
        }
    }

    fn run<R: Read, W: Write>(&mut self, reader: R, mut writer: W) -> MapResult<RunSummary> {
        let Self {
            configuration,
            separator,
            format,
            nested_property_name,
            array,
            named,
            logger,
            on_record,
            on_filtered,
            ask,
            ..
        } = self;

        logger.info(
            LogEntry::info("mapping started")
                .with("format", *format)
                .with("array", *array)
                .with("named", *named),
        );

        let mut csv = csv_reader(reader, *separator);
        let mut header = StringRecord::new();
        let mut index = HeaderIndex::default();

        if *named {
            logger.debug(LogEntry::debug("phase").with("phase", Phase::ReadingHeader));
            if !csv.read_record(&mut header)? {
                return Err(MapError::MissingHeader);
            }
            index = HeaderIndex::from_record(&header);
            logger.debug(LogEntry::debug("header read").with("columns", header.len()));
        }
        let header_ref = named.then_some(&header);

        logger.debug(LogEntry::debug("phase").with("phase", Phase::ReadingRows));
        let mut resolver = CalculatedResolver::new(configuration, ask.as_deref_mut(), logger);
        let mut summary = RunSummary::default();
        let mut records: Vec<Value> = Vec::new();
        let mut row = StringRecord::new();

        while csv.read_record(&mut row)? {
            summary.rows_read += 1;
            let record = match header_ref {
                Some(header) => RecordWithInformation::named(&row, header, &index),
                None => RecordWithInformation::new(&row),
            };

            let mut filtered = false;
            for (group, conditions) in &configuration.filter {
                logger.debug(
                    LogEntry::debug("checking filter")
                        .with("group", group)
                        .with("conditions", conditions.len()),
                );
                if conditions.apply(group, &record, logger) {
                    filtered = true;
                    logger.debug(
                        LogEntry::debug("row filtered")
                            .with("group", group)
                            .with("row", summary.rows_read),
                    );
                    if let Some(callback) = on_filtered.as_deref_mut() {
                        callback(&row, header_ref);
                    }
                    break;
                }
            }
            if filtered {
                summary.filtered += 1;
                continue;
            }

            if let Some(callback) = on_record.as_deref_mut() {
                callback(&row, header_ref);
            }

            let mut out = Map::new();
            map_fields(&configuration.mapping, &record, &mut out, logger)?;
            resolver.apply(FieldLocation::Record, summary.emitted, Some(&record), &mut out)?;

            if *array {
                records.push(Value::Object(out));
            } else {
                let bytes = format.to_bytes(&out)?;
                if summary.emitted > 0 {
                    writer.write_all(b"\n")?;
                }
                writer.write_all(&bytes)?;
            }
            summary.emitted += 1;
        }

        if *array {
            logger.debug(LogEntry::debug("phase").with("phase", Phase::Finalizing));
            let wrap = *format == OutputFormat::Toml
                || nested_property_name.is_some()
                || configuration.has_document_fields();

            let bytes = if wrap {
                let name = nested_property_name
                    .as_deref()
                    .unwrap_or(DEFAULT_NESTED_PROPERTY_NAME);
                let mut document = Map::new();
                document.insert(name.to_string(), Value::Array(records));
                resolver.apply(FieldLocation::Document, summary.emitted, None, &mut document)?;
                format.to_bytes(&document)?
            } else {
                format.to_bytes(&records)?
            };
            writer.write_all(&bytes)?;
        }
        writer.flush()?;

        logger.log(
            LogEntry::success("mapping finished")
                .with("rows", summary.rows_read)
                .with("emitted", summary.emitted)
                .with("filtered", summary.filtered),
        );
        Ok(summary)
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("format", &self.format)
            .field("separator", &(self.separator as char))
            .field("array", &self.array)
            .field("named", &self.named)
            .field("nested_property_name", &self.nested_property_name)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}
