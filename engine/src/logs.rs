//! Log entries and observers for mapping runs.
//!
//! The engine never prints on its own. Every diagnostic is turned into a
//! [`LogEntry`] and handed to the [`MappingObserver`] injected through the
//! builder. The default observer discards everything.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Log level of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry with optional key/value context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Context attached to the message, in insertion order
    #[serde(default)]
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), fields: Vec::new() }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Attach a key/value pair
    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    /// Look up the value of an attached field
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Receives log entries emitted during construction and mapping runs.
pub trait MappingObserver: Send + Sync {
    /// Called for every entry. Default: ignore it.
    fn log(&self, _entry: &LogEntry) {}
}

/// Observer that discards every entry
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl MappingObserver for NoopObserver {}

/// Prints entries to stderr
#[derive(Debug, Clone, Copy)]
pub struct ConsoleObserver {
    min_level: LogLevel,
}

impl ConsoleObserver {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl MappingObserver for ConsoleObserver {
    fn log(&self, entry: &LogEntry) {
        if entry.level < self.min_level {
            return;
        }
        let prefix = match entry.level {
            LogLevel::Debug => "   ·",
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        eprintln!("{} {}", prefix, entry);
    }
}

/// Keeps every entry in memory
#[derive(Debug, Default)]
pub struct MemoryObserver {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded entries
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Recorded entries at exactly `level`
    pub fn at_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }
}

impl MappingObserver for MemoryObserver {
    fn log(&self, entry: &LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
    }
}

/// Cheap handle the engine components log through.
#[derive(Clone)]
pub struct Logger {
    observer: Arc<dyn MappingObserver>,
}

impl Logger {
    pub fn new(observer: Arc<dyn MappingObserver>) -> Self {
        Self { observer }
    }

    /// A logger backed by [`NoopObserver`]
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopObserver))
    }

    pub fn log(&self, entry: LogEntry) {
        self.observer.log(&entry);
    }

    pub fn debug(&self, entry: LogEntry) {
        self.log(LogEntry { level: LogLevel::Debug, ..entry });
    }

    pub fn info(&self, entry: LogEntry) {
        self.log(LogEntry { level: LogLevel::Info, ..entry });
    }

    pub fn warning(&self, entry: LogEntry) {
        self.log(LogEntry { level: LogLevel::Warning, ..entry });
    }

    pub fn error(&self, entry: LogEntry) {
        self.log(LogEntry { level: LogLevel::Error, ..entry });
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_display_includes_fields() {
        let entry = LogEntry::error("index out of range")
            .with("index", 4)
            .with("length", 2);
        assert_eq!(entry.to_string(), "index out of range index=4 length=2");
        assert_eq!(entry.field("length"), Some("2"));
        assert_eq!(entry.field("missing"), None);
    }

    #[test]
    fn test_logger_forces_level() {
        let observer = Arc::new(MemoryObserver::new());
        let logger = Logger::new(observer.clone());

        logger.warning(LogEntry::info("header not found").with("name", "age"));
        logger.debug(LogEntry::error("checking filter"));

        let entries = observer.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Warning);
        assert_eq!(entries[1].level, LogLevel::Debug);
        assert_eq!(observer.at_level(LogLevel::Warning).len(), 1);
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warning < LogLevel::Error);
    }
}
