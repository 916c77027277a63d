//! Input preparation: separator validation, character encoding detection
//! and decoding, and CSV reader construction.

use std::borrow::Cow;
use std::io::Read;

use encoding_rs::Encoding;

use crate::error::{ConfigError, ConfigResult, MapError, MapResult};

/// Default CSV separator
pub const DEFAULT_SEPARATOR: &str = ";";

/// Character encoding of the raw input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InputEncoding {
    /// Strict UTF-8, streamed
    #[default]
    Utf8,
    /// Detect with chardet, then decode
    Auto,
    /// Decode with the named encoding (WHATWG label)
    Label(String),
}

impl InputEncoding {
    /// Parse a CLI style value: `utf-8`, `auto` or any encoding label
    pub fn parse(value: &str) -> ConfigResult<Self> {
        match value.to_lowercase().as_str() {
            "" | "utf-8" | "utf8" => Ok(InputEncoding::Utf8),
            "auto" => Ok(InputEncoding::Auto),
            label => {
                if Encoding::for_label(label.as_bytes()).is_none() {
                    return Err(ConfigError::UnknownEncoding(value.to_string()));
                }
                Ok(InputEncoding::Label(label.to_string()))
            }
        }
    }

    /// Whether the input must be buffered and decoded before parsing
    pub fn needs_decoding(&self) -> bool {
        !matches!(self, InputEncoding::Utf8)
    }
}

/// Check that the separator is exactly one byte and return it
pub fn parse_separator(separator: &str) -> ConfigResult<u8> {
    match separator.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(ConfigError::InvalidSeparator(separator.to_string())),
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    // chardet names differ from WHATWG labels for the common cases
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-15".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => chardet::charset2encoding(&other.to_string()).to_string(),
    }
}

/// Decode bytes with the named encoding.
///
/// UTF-8 is decoded strictly. Other encodings go through encoding_rs.
pub fn decode_content<'a>(bytes: &'a [u8], encoding: &str) -> MapResult<Cow<'a, str>> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| MapError::Encoding(e.to_string())),
        label => {
            let decoder = Encoding::for_label(label.as_bytes())
                .ok_or_else(|| MapError::Encoding(format!("unknown encoding {:?}", encoding)))?;
            let (decoded, _, had_errors) = decoder.decode(bytes);
            if had_errors {
                return Err(MapError::Encoding(format!("input is not valid {}", decoder.name())));
            }
            Ok(decoded)
        }
    }
}

/// Read the whole input and turn it into UTF-8 bytes according to `encoding`
pub fn decode_input<R: Read>(mut reader: R, encoding: &InputEncoding) -> MapResult<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let label = match encoding {
        InputEncoding::Utf8 => "utf-8".to_string(),
        InputEncoding::Auto => detect_encoding(&bytes),
        InputEncoding::Label(label) => label.clone(),
    };
    let decoded = decode_content(&bytes, &label)?;
    Ok(decoded.into_owned().into_bytes())
}

/// CSV reader over `reader` with the given separator.
///
/// Headers are handled by the caller so every row, header included, comes
/// back as a plain record.
pub fn csv_reader<R: Read>(reader: R, separator: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(false)
        .from_reader(reader)
}
