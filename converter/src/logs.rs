//! Pass-scoped conversion logs.
//!
//! Every pass records what it did as a list of [`LogEntry`] values that are
//! returned with the conversion output. Each entry is also forwarded to the
//! `log` facade, so binaries decide where it ends up (the CLI uses
//! `env_logger`).

use serde::{Deserialize, Serialize};

/// Log level for a pass entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Optional indentation level (for nested logs)
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), indent: 0 }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into(), indent: 0 }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), indent: 0 }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Collects the entries of one conversion pass
#[derive(Debug, Clone, Default)]
pub struct PassLog {
    entries: Vec<LogEntry>,
}

impl PassLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry and forward it to the `log` facade
    pub fn log(&mut self, entry: LogEntry) {
        let indent = "  ".repeat(entry.indent as usize);
        match entry.level {
            LogLevel::Info => log::info!("{}{}", indent, entry.message),
            LogLevel::Success => log::info!("{}✓ {}", indent, entry.message),
            LogLevel::Warning => log::warn!("{}{}", indent, entry.message),
            LogLevel::Error => log::error!("{}{}", indent, entry.message),
        }
        self.entries.push(entry);
    }

    pub fn info(&mut self, msg: impl Into<String>) {
        self.log(LogEntry::info(msg));
    }

    pub fn success(&mut self, msg: impl Into<String>) {
        self.log(LogEntry::success(msg));
    }

    pub fn warning(&mut self, msg: impl Into<String>) {
        self.log(LogEntry::warning(msg));
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.log(LogEntry::error(msg));
    }

    pub fn info_indent(&mut self, msg: impl Into<String>, indent: u8) {
        self.log(LogEntry::info(msg).with_indent(indent));
    }

    pub fn success_indent(&mut self, msg: impl Into<String>, indent: u8) {
        self.log(LogEntry::success(msg).with_indent(indent));
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }

    /// Number of entries at the given level
    pub fn count(&self, level: LogLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_kept_in_order() {
        let mut log = PassLog::new();
        log.info("indexing");
        log.success_indent("indexed 3 records", 1);
        log.warning("nothing to drain");

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "indexing");
        assert_eq!(entries[1].indent, 1);
        assert_eq!(entries[2].level, LogLevel::Warning);
        assert_eq!(log.count(LogLevel::Success), 1);
    }

    #[test]
    fn test_entry_serialization() {
        let entry = LogEntry::error("boom").with_indent(2);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "error");
        assert_eq!(json["indent"], 2);
    }
}
