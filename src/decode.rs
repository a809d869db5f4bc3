//! Purpose: Streaming aggregation coordinator and the decode entry point.
//! Exports: `Decoder`, `DecodeOutcome`, `FileHandler`, `HandlerFuture`.
//! Role: Owns one decode operation end to end and settles it exactly once.
//! Invariants: Violations accumulate; every body stream is consumed to its end.
//! Invariants: Per-file side-work is joined before settlement.
//! Invariants: A truncated file never reaches the result tree.
//! Notes: A file descriptor's size mirrors the most recent chunk, not a running total.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::dispatch::{self, Route};
use crate::error::{Error, ErrorKind};
use crate::event::{
    BodyStream, FieldEvent, FileBody, FileChunk, FileDescriptor, FilePart, FormDecoder, FormEvent,
    FormEvents, FormLimits,
};
use crate::json;
use crate::limits::{
    DecodeLimits, ResolvedLimits, Violation, check_field_truncation, check_file_count,
    check_file_size, check_mime_type,
};
use crate::path;
use crate::store;

/// The single terminal outcome of one decode operation.
///
/// `Skip` is first-class: the content type named no pipeline this crate
/// handles, and the caller gets no body value and no error. Infrastructure
/// faults (I/O, malformed bodies, decoder transport errors) are not
/// outcomes; they surface as `Err` from [`Decoder::decode`].
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeOutcome {
    Success(Value),
    Failure(Vec<Violation>),
    Skip,
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send>>;

/// Caller-supplied per-file side-work, replacing the default storage writer.
///
/// The descriptor is a snapshot taken at part-begin; its size is still zero.
/// The body carries the same chunks the coordinator observes, including a
/// trailing `Truncated` marker when the decoder cut the file short.
pub trait FileHandler: Send + Sync {
    fn handle(&self, file: &FileDescriptor, body: FileBody) -> HandlerFuture;
}

impl<F> FileHandler for F
where
    F: Fn(&FileDescriptor, FileBody) -> HandlerFuture + Send + Sync,
{
    fn handle(&self, file: &FileDescriptor, body: FileBody) -> HandlerFuture {
        self(file, body)
    }
}

pub struct Decoder {
    limits: DecodeLimits,
    upload_dir: PathBuf,
    handler: Option<Arc<dyn FileHandler>>,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            limits: DecodeLimits::new(),
            upload_dir: store::default_upload_dir(),
            handler: None,
        }
    }

    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_file_handler(mut self, handler: impl FileHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Decode one request body into a single settled outcome.
    ///
    /// The declared content type picks the pipeline: json bodies are
    /// buffered and parsed, form bodies are tokenized by the supplied
    /// decoder and aggregated event by event. Unrecognized types settle as
    /// [`DecodeOutcome::Skip`].
    pub async fn decode<D: FormDecoder>(
        &self,
        content_type: Option<&str>,
        body: BodyStream,
        decoder: D,
    ) -> Result<DecodeOutcome, Error> {
        let Some(route) = dispatch::route(content_type) else {
            return Ok(DecodeOutcome::Skip);
        };
        tracing::debug!(?route, "decoding request body");
        let limits = self.limits.resolve();
        match route {
            Route::Json => {
                let buffered = collect_body(body).await?;
                json::decode_json(&buffered, &limits)
            }
            Route::UrlEncoded | Route::Multipart => {
                let form_limits = FormLimits {
                    max_files: limits.max_file_count,
                    max_file_bytes: limits.max_file_size,
                    max_field_bytes: limits.max_field_size,
                };
                let events =
                    decoder.events(route, content_type.unwrap_or_default(), body, &form_limits)?;
                self.aggregate(events, &limits).await
            }
        }
    }

    /// Consume the form decoder's event stream and settle the operation.
    ///
    /// Conceptually the operation moves Open -> Draining -> Settled: the
    /// event loop is Open, joining pending side-work is Draining, and the
    /// single return value is the settlement.
    async fn aggregate(
        &self,
        mut events: FormEvents,
        limits: &ResolvedLimits,
    ) -> Result<DecodeOutcome, Error> {
        let mut tree = Value::Object(Map::new());
        let mut violations = Vec::new();
        let mut side_work: Vec<JoinHandle<Result<(), Error>>> = Vec::new();

        while let Some(event) = events.next().await {
            match event? {
                FormEvent::Field(field) => {
                    on_field(&mut tree, &mut violations, limits, field);
                }
                FormEvent::File(part) => {
                    self.on_file(&mut tree, &mut violations, &mut side_work, limits, part)
                        .await?;
                }
                FormEvent::FilesLimitReached => {
                    if let Some(violation) = check_file_count(true, limits.max_file_count) {
                        violations.push(violation);
                    }
                }
            }
        }

        // Draining: join the side-work scheduled while the stream was open.
        for handle in side_work {
            handle.await.map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("file side-work task failed")
                    .with_source(err)
            })??;
        }

        if violations.is_empty() {
            Ok(DecodeOutcome::Success(tree))
        } else {
            tracing::debug!(count = violations.len(), "request body failed limit checks");
            Ok(DecodeOutcome::Failure(violations))
        }
    }

    async fn on_file(
        &self,
        tree: &mut Value,
        violations: &mut Vec<Violation>,
        side_work: &mut Vec<JoinHandle<Result<(), Error>>>,
        limits: &ResolvedLimits,
        part: FilePart,
    ) -> Result<(), Error> {
        let FilePart {
            field_name,
            file_name,
            mime_type,
            mut body,
        } = part;

        // An empty filename is an empty field: not a file, no side-work.
        if file_name.is_empty() {
            drain(&mut body).await;
            return Ok(());
        }

        let mut file = FileDescriptor::new(&file_name, &mime_type);

        if let Some(violation) =
            check_mime_type(&file_name, &mime_type, limits.accepted_mime.as_deref())
        {
            violations.push(violation);
            tracing::debug!(file = %file_name, mime = %mime_type, "rejected file type, draining body");
            drain(&mut body).await;
            return Ok(());
        }

        let (chunk_tx, chunk_rx) = mpsc::channel::<FileChunk>(16);
        if let Some(handler) = &self.handler {
            side_work.push(tokio::spawn(
                handler.handle(&file, Box::pin(ReceiverStream::new(chunk_rx))),
            ));
        } else {
            let destination = store::unique_destination(&self.upload_dir, &file_name)?;
            file.storage_path = Some(destination.clone());
            side_work.push(tokio::spawn(async move {
                let written = store::write_chunks(&destination, chunk_rx).await?;
                tracing::debug!(bytes = written, path = %destination.display(), "upload stored");
                Ok(())
            }));
        }

        let mut truncated = false;
        while let Some(chunk) = body.next().await {
            if let FileChunk::Data(bytes) = &chunk {
                // Size mirrors the most recent chunk, not a running total.
                file.size = bytes.len() as u64;
            } else {
                truncated = true;
            }
            // A dropped receiver is fine; the source must still be drained.
            let _ = chunk_tx.send(chunk).await;
        }
        drop(chunk_tx);

        if let Some(violation) = check_file_size(&file_name, truncated, limits.max_file_size) {
            violations.push(violation);
            return Ok(());
        }

        let descriptor = serde_json::to_value(&file).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode file descriptor")
                .with_field(&field_name)
                .with_source(err)
        })?;
        path::assign(tree, &field_name, descriptor);
        Ok(())
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn on_field(
    tree: &mut Value,
    violations: &mut Vec<Violation>,
    limits: &ResolvedLimits,
    field: FieldEvent,
) {
    let truncated = field.name_truncated || field.value_truncated;
    if let Some(violation) = check_field_truncation(&field.name, truncated, limits.max_field_size) {
        violations.push(violation);
        return;
    }
    path::assign(tree, &field.name, Value::String(field.value));
}

async fn drain(body: &mut FileBody) {
    while body.next().await.is_some() {}
}

async fn collect_body(mut body: BodyStream) -> Result<Vec<u8>, Error> {
    let mut buffered = Vec::new();
    while let Some(chunk) = body.next().await {
        buffered.extend_from_slice(&chunk?);
    }
    Ok(buffered)
}
