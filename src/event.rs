//! Purpose: Event model for the external form-decoder boundary.
//! Exports: `FormDecoder`, `FormEvent`, `FieldEvent`, `FilePart`, `FileChunk`, `FileDescriptor`.
//! Role: Narrow interface between byte-level tokenizers and the aggregation coordinator.
//! Invariants: One event stream per decode operation; end-of-stream means no more events.
//! Invariants: Truncation is reported in-band (`FileChunk::Truncated`) before a body ends.

use std::path::PathBuf;
use std::pin::Pin;

use bytes::Bytes;
use serde::Serialize;
use tokio_stream::Stream;

use crate::dispatch::Route;
use crate::error::Error;

/// The raw request body as the transport hands it over.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// One uploaded file's byte stream, chunk by chunk.
pub type FileBody = Pin<Box<dyn Stream<Item = FileChunk> + Send>>;

/// The ordered event sequence a form decoder emits for one request.
pub type FormEvents = Pin<Box<dyn Stream<Item = Result<FormEvent, Error>> + Send>>;

/// A piece of an uploaded file's body.
///
/// `Truncated` marks that the decoder stopped forwarding bytes because the
/// per-file size limit was hit; the body ends shortly after.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FileChunk {
    Data(Bytes),
    Truncated,
}

pub enum FormEvent {
    Field(FieldEvent),
    File(FilePart),
    FilesLimitReached,
}

/// A decoded non-file field, with the decoder's truncation flags.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldEvent {
    pub name: String,
    pub value: String,
    pub name_truncated: bool,
    pub value_truncated: bool,
}

impl FieldEvent {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            name_truncated: false,
            value_truncated: false,
        }
    }

    pub fn with_name_truncated(mut self) -> Self {
        self.name_truncated = true;
        self
    }

    pub fn with_value_truncated(mut self) -> Self {
        self.value_truncated = true;
        self
    }
}

/// The start of one uploaded file: its metadata plus the byte stream.
pub struct FilePart {
    pub field_name: String,
    pub file_name: String,
    pub mime_type: String,
    pub body: FileBody,
}

/// Limits handed down to the form decoder, already normalized to bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormLimits {
    pub max_files: Option<u64>,
    pub max_file_bytes: Option<u64>,
    pub max_field_bytes: Option<u64>,
}

/// The external byte-level tokenizer for url-encoded and multipart bodies.
///
/// `content_type` is the full declared header value; multipart decoders
/// read their boundary parameter from it. Enforcement of the handed-down
/// limits (truncating streams, capping file counts) happens inside the
/// decoder and is reported back through event flags.
pub trait FormDecoder {
    fn events(
        self,
        route: Route,
        content_type: &str,
        body: BodyStream,
        limits: &FormLimits,
    ) -> Result<FormEvents, Error>;
}

/// One uploaded file as it lands in the result tree.
///
/// `size` is updated while the body streams and mirrors the most recent
/// chunk's length; it is final once the body ends. `storage_path` is set
/// only when the default storage writer handled the file.
#[derive(Clone, Debug, Serialize)]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
}

impl FileDescriptor {
    pub(crate) fn new(name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            mime_type: mime_type.into(),
            storage_path: None,
        }
    }
}
