//! Severity-leveled diagnostics accumulated across a refactoring
//!
//! A [`RefactoringStatus`] collects entries in insertion order. Its severity is
//! the maximum over all entries added so far and only ever grows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Severity of a status entry, totally ordered from `Ok` to `Fatal`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Nothing to report
    #[default]
    Ok,
    /// Informational finding
    Info,
    /// The refactoring may produce surprising results
    Warning,
    /// The refactoring will likely break something; the user must confirm
    Error,
    /// The refactoring cannot proceed
    Fatal,
}

impl Severity {
    /// Lowercase name of the severity
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "ok",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source location an entry refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusContext {
    /// Workspace-relative resource path or element handle
    pub resource: String,
    /// Character range inside the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range<usize>>,
}

impl StatusContext {
    /// Context for a whole resource
    pub fn resource(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            range: None,
        }
    }

    /// Context for a range inside a resource
    pub fn range(resource: impl Into<String>, range: Range<usize>) -> Self {
        Self {
            resource: resource.into(),
            range: Some(range),
        }
    }
}

/// A single diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Severity of this entry
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Where the problem is located
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<StatusContext>,
    /// Problem code, `0` when unspecified
    #[serde(default)]
    pub code: i32,
}

impl StatusEntry {
    /// Create a new entry without context
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            context: None,
            code: 0,
        }
    }

    /// Attach a source location
    pub fn with_context(mut self, context: StatusContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Attach a problem code
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    /// Whether this entry is fatal
    pub fn is_fatal_error(&self) -> bool {
        self.severity == Severity::Fatal
    }

    /// Whether this entry is an error (not fatal)
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Whether this entry is a warning
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Whether this entry is informational
    pub fn is_info(&self) -> bool {
        self.severity == Severity::Info
    }
}

impl fmt::Display for StatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(context) = &self.context {
            write!(f, " ({}", context.resource)?;
            if let Some(range) = &context.range {
                write!(f, " {}..{}", range.start, range.end)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Accumulator of diagnostics produced by condition checking
///
/// The stored severity is ignored on deserialization and recomputed from
/// the entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredStatus")]
pub struct RefactoringStatus {
    entries: Vec<StatusEntry>,
    severity: Severity,
}

#[derive(Deserialize)]
struct StoredStatus {
    #[serde(default)]
    entries: Vec<StatusEntry>,
}

impl From<StoredStatus> for RefactoringStatus {
    fn from(stored: StoredStatus) -> Self {
        let mut status = Self::new();
        status.extend(stored.entries);
        status
    }
}

impl RefactoringStatus {
    /// Create an empty status with severity `Ok`
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a status holding one entry of the given severity
    pub fn create(severity: Severity, message: impl Into<String>) -> Self {
        let mut status = Self::new();
        status.add_entry(StatusEntry::new(severity, message));
        status
    }

    /// Create a status holding one info entry
    pub fn create_info(message: impl Into<String>) -> Self {
        Self::create(Severity::Info, message)
    }

    /// Create a status holding one warning entry
    pub fn create_warning(message: impl Into<String>) -> Self {
        Self::create(Severity::Warning, message)
    }

    /// Create a status holding one error entry
    pub fn create_error(message: impl Into<String>) -> Self {
        Self::create(Severity::Error, message)
    }

    /// Create a status holding one fatal entry
    pub fn create_fatal_error(message: impl Into<String>) -> Self {
        Self::create(Severity::Fatal, message)
    }

    /// Add an entry, raising the current severity if needed
    pub fn add_entry(&mut self, entry: StatusEntry) {
        self.severity = self.severity.max(entry.severity);
        self.entries.push(entry);
    }

    /// Add an entry of the given severity with an optional location
    pub fn add(
        &mut self,
        severity: Severity,
        message: impl Into<String>,
        context: Option<StatusContext>,
    ) {
        let mut entry = StatusEntry::new(severity, message);
        entry.context = context;
        self.add_entry(entry);
    }

    /// Add an info entry
    pub fn add_info(&mut self, message: impl Into<String>) {
        self.add(Severity::Info, message, None);
    }

    /// Add a warning entry
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.add(Severity::Warning, message, None);
    }

    /// Add an error entry
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.add(Severity::Error, message, None);
    }

    /// Add a fatal entry
    pub fn add_fatal_error(&mut self, message: impl Into<String>) {
        self.add(Severity::Fatal, message, None);
    }

    /// Append all entries of `other`; the severity becomes the maximum of both
    pub fn merge(&mut self, other: RefactoringStatus) {
        self.severity = self.severity.max(other.severity);
        self.entries.extend(other.entries);
    }

    /// Consuming form of [`merge`](Self::merge)
    pub fn merged(mut self, other: RefactoringStatus) -> Self {
        self.merge(other);
        self
    }

    /// Maximum severity over all entries
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Whether nothing worse than `Ok` has been recorded
    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Ok
    }

    /// Whether a fatal entry has been recorded
    pub fn has_fatal_error(&self) -> bool {
        self.severity == Severity::Fatal
    }

    /// Whether an error or fatal entry has been recorded
    pub fn has_error(&self) -> bool {
        self.severity >= Severity::Error
    }

    /// Whether a warning or worse has been recorded
    pub fn has_warning(&self) -> bool {
        self.severity >= Severity::Warning
    }

    /// Whether an info entry or worse has been recorded
    pub fn has_info(&self) -> bool {
        self.severity >= Severity::Info
    }

    /// Whether the status holds any entries
    pub fn has_entries(&self) -> bool {
        !self.entries.is_empty()
    }

    /// All entries in insertion order
    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    /// The first entry carrying the current severity
    pub fn entry_with_highest_severity(&self) -> Option<&StatusEntry> {
        self.entries.iter().find(|e| e.severity == self.severity)
    }

    /// Entries whose severity is at least `severity`
    pub fn entries_at_least(&self, severity: Severity) -> impl Iterator<Item = &StatusEntry> {
        self.entries.iter().filter(move |e| e.severity >= severity)
    }

    /// The first entry with the given code
    pub fn entry_matching_code(&self, code: i32) -> Option<&StatusEntry> {
        self.entries.iter().find(|e| e.code == code)
    }

    /// Message of the first entry whose severity is at least `severity`
    pub fn message_matching_severity(&self, severity: Severity) -> Option<&str> {
        self.entries_at_least(severity)
            .next()
            .map(|e| e.message.as_str())
    }

    /// Messages of all entries at least as severe as `severity`
    pub fn messages(&self, severity: Severity) -> Vec<&str> {
        self.entries_at_least(severity)
            .map(|e| e.message.as_str())
            .collect()
    }
}

impl fmt::Display for RefactoringStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.severity)?;
        for entry in &self.entries {
            write!(f, "\n  {}", entry)?;
        }
        Ok(())
    }
}

impl Extend<StatusEntry> for RefactoringStatus {
    fn extend<T: IntoIterator<Item = StatusEntry>>(&mut self, iter: T) {
        for entry in iter {
            self.add_entry(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_status_is_ok() {
        let status = RefactoringStatus::new();
        assert!(status.is_ok());
        assert!(!status.has_entries());
        assert_eq!(status.severity(), Severity::Ok);
    }

    #[test]
    fn test_severity_tracks_maximum() {
        let mut status = RefactoringStatus::new();
        status.add_warning("w");
        assert_eq!(status.severity(), Severity::Warning);
        status.add_info("i");
        assert_eq!(status.severity(), Severity::Warning);
        status.add_error("e");
        assert_eq!(status.severity(), Severity::Error);
        assert!(status.has_error());
        assert!(!status.has_fatal_error());
    }

    #[test]
    fn test_merge_keeps_insertion_order() {
        let mut a = RefactoringStatus::create_info("first");
        let b = RefactoringStatus::create_fatal_error("second");
        a.merge(b);
        let messages: Vec<_> = a.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert!(a.has_fatal_error());
    }

    #[test]
    fn test_merge_with_empty_status_keeps_severity() {
        let a = RefactoringStatus::create_warning("w").merged(RefactoringStatus::new());
        assert_eq!(a.severity(), Severity::Warning);
        assert_eq!(a.entries().len(), 1);
    }

    #[test]
    fn test_entry_with_highest_severity() {
        let mut status = RefactoringStatus::new();
        status.add_warning("w1");
        status.add_error("e1");
        status.add_error("e2");
        let entry = status.entry_with_highest_severity().unwrap();
        assert_eq!(entry.message, "e1");
        assert_eq!(status.message_matching_severity(Severity::Warning), Some("w1"));
        assert_eq!(status.messages(Severity::Error), vec!["e1", "e2"]);
    }

    #[test]
    fn test_context_and_code() {
        let mut status = RefactoringStatus::new();
        status.add_entry(
            StatusEntry::new(Severity::Error, "name clash")
                .with_context(StatusContext::range("src/a.rs", 4..9))
                .with_code(17),
        );
        let entry = status.entry_matching_code(17).unwrap();
        assert_eq!(entry.context.as_ref().unwrap().range, Some(4..9));
        assert!(status.to_string().contains("src/a.rs 4..9"));
    }

    #[test]
    fn test_serialization() {
        let status = RefactoringStatus::create_error("broken");
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"error\""));
        let back: RefactoringStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn test_deserialized_severity_follows_entries() {
        let json = r#"{"entries":[{"severity":"fatal","message":"gone"}],"severity":"ok"}"#;
        let status: RefactoringStatus = serde_json::from_str(json).unwrap();
        assert!(status.has_fatal_error());
        assert_eq!(status.severity(), Severity::Fatal);

        let status: RefactoringStatus =
            serde_json::from_str(r#"{"entries":[],"severity":"error"}"#).unwrap();
        assert!(status.is_ok());
    }
}
