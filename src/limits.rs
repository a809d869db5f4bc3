//! Purpose: Decode limits, size-string normalization, and violation records.
//! Exports: `DecodeLimits`, `ByteLimit`, `Violation`, `ViolationKind`, `parse_size`, check helpers.
//! Role: Pure policy layer classifying observed sizes/counts/types against thresholds.
//! Invariants: Checks only emit records; enforcement (truncating streams) lives in the decoder.
//! Invariants: Thresholds are normalized once per operation; absent or unparseable means unbounded.

use serde::Serialize;

use crate::accept;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    FieldSizeExceeded,
    FileSizeExceeded,
    FileCountExceeded,
    FileTypeRejected,
    JsonSizeExceeded,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub(crate) fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A threshold given either as raw bytes or as a human-readable size string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ByteLimit {
    Bytes(u64),
    Human(String),
}

impl ByteLimit {
    fn resolve(&self) -> Option<u64> {
        match self {
            ByteLimit::Bytes(bytes) => Some(*bytes),
            ByteLimit::Human(text) => parse_size(text),
        }
    }
}

impl From<u64> for ByteLimit {
    fn from(bytes: u64) -> Self {
        ByteLimit::Bytes(bytes)
    }
}

impl From<&str> for ByteLimit {
    fn from(text: &str) -> Self {
        ByteLimit::Human(text.to_string())
    }
}

#[derive(Clone, Debug, Default)]
pub struct DecodeLimits {
    pub max_file_count: Option<u64>,
    pub max_file_size: Option<ByteLimit>,
    pub max_field_size: Option<ByteLimit>,
    pub max_json_size: Option<ByteLimit>,
    pub accepted_mime: Option<String>,
}

impl DecodeLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_file_count(mut self, count: u64) -> Self {
        self.max_file_count = Some(count);
        self
    }

    pub fn with_max_file_size(mut self, limit: impl Into<ByteLimit>) -> Self {
        self.max_file_size = Some(limit.into());
        self
    }

    pub fn with_max_field_size(mut self, limit: impl Into<ByteLimit>) -> Self {
        self.max_field_size = Some(limit.into());
        self
    }

    pub fn with_max_json_size(mut self, limit: impl Into<ByteLimit>) -> Self {
        self.max_json_size = Some(limit.into());
        self
    }

    pub fn with_accepted_mime(mut self, pattern: impl Into<String>) -> Self {
        self.accepted_mime = Some(pattern.into());
        self
    }

    pub(crate) fn resolve(&self) -> ResolvedLimits {
        ResolvedLimits {
            max_file_count: self.max_file_count,
            max_file_size: self.max_file_size.as_ref().and_then(ByteLimit::resolve),
            max_field_size: self.max_field_size.as_ref().and_then(ByteLimit::resolve),
            max_json_size: self.max_json_size.as_ref().and_then(ByteLimit::resolve),
            accepted_mime: self.accepted_mime.clone(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ResolvedLimits {
    pub max_file_count: Option<u64>,
    pub max_file_size: Option<u64>,
    pub max_field_size: Option<u64>,
    pub max_json_size: Option<u64>,
    pub accepted_mime: Option<String>,
}

/// Parse a human-readable size string such as "10mb" into bytes.
///
/// Suffixes are case-insensitive powers of 1024 (`b`, `kb`, `mb`, `gb`, `tb`);
/// a bare number means bytes. Invalid input yields `None` (unbounded).
pub fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim().to_ascii_lowercase();
    if text.is_empty() {
        return None;
    }
    let split = text
        .find(|ch: char| ch.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let value: f64 = text[..split].trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let factor: u64 = match &text[split..] {
        "" | "b" => 1,
        "kb" => 1 << 10,
        "mb" => 1 << 20,
        "gb" => 1 << 30,
        "tb" => 1 << 40,
        _ => return None,
    };
    Some((value * factor as f64) as u64)
}

/// Violation when a string field's byte length exceeds the field-size limit.
pub fn check_field_size(field: &str, byte_len: usize, limit: Option<u64>) -> Option<Violation> {
    let limit = limit?;
    if byte_len as u64 > limit {
        return Some(Violation::new(
            ViolationKind::FieldSizeExceeded,
            format!("field {field} is {byte_len} bytes, over the {limit}-byte field size limit"),
        ));
    }
    None
}

/// Violation when the form decoder reports a field name or value was truncated.
pub fn check_field_truncation(field: &str, truncated: bool, limit: Option<u64>) -> Option<Violation> {
    if !truncated {
        return None;
    }
    let message = match limit {
        Some(limit) => format!("field {field} exceeds the {limit}-byte field size limit"),
        None => format!("field {field} exceeds the field size limit"),
    };
    Some(Violation::new(ViolationKind::FieldSizeExceeded, message))
}

/// Violation when the form decoder reports a file's byte stream was truncated.
pub fn check_file_size(file_name: &str, truncated: bool, limit: Option<u64>) -> Option<Violation> {
    if !truncated {
        return None;
    }
    let message = match limit {
        Some(limit) => format!("file {file_name} exceeds the {limit}-byte file size limit"),
        None => format!("file {file_name} exceeds the file size limit"),
    };
    Some(Violation::new(ViolationKind::FileSizeExceeded, message))
}

/// Violation when the form decoder reports the file-count ceiling was hit.
pub fn check_file_count(limit_hit: bool, limit: Option<u64>) -> Option<Violation> {
    if !limit_hit {
        return None;
    }
    let message = match limit {
        Some(limit) => format!("request exceeds the limit of {limit} files"),
        None => "request exceeds the file count limit".to_string(),
    };
    Some(Violation::new(ViolationKind::FileCountExceeded, message))
}

/// Violation when a file's declared mime type fails the accepted pattern.
///
/// A rejected file's byte stream must still be drained by the caller so the
/// underlying connection is not stalled.
pub fn check_mime_type(file_name: &str, mime_type: &str, pattern: Option<&str>) -> Option<Violation> {
    let pattern = pattern?;
    if accept::matches(mime_type, pattern) {
        return None;
    }
    Some(Violation::new(
        ViolationKind::FileTypeRejected,
        format!("file {file_name} has type {mime_type}, which is not accepted by {pattern}"),
    ))
}

/// Violation when a buffered JSON body exceeds the total-size limit.
pub fn check_json_size(byte_len: usize, limit: Option<u64>) -> Option<Violation> {
    let limit = limit?;
    if byte_len as u64 > limit {
        return Some(Violation::new(
            ViolationKind::JsonSizeExceeded,
            format!("json body is {byte_len} bytes, over the {limit}-byte limit"),
        ));
    }
    None
}
