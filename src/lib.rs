//! Purpose: Decode HTTP request bodies into nested JSON trees under bounded limits.
//! Exports: `Decoder`, `DecodeOutcome`, limits and violations, the form-decoder event model.
//! Role: Library crate; transports and byte-level tokenizers stay external collaborators.
//! Invariants: One decode call settles exactly once; violations never abort a stream.
//! Invariants: Every limit breach is recorded, and the whole operation fails on any of them.

pub mod accept;
pub mod dispatch;
pub mod event;
pub mod limits;
pub mod path;
pub mod store;

mod decode;
mod error;
mod json;

pub use decode::{DecodeOutcome, Decoder, FileHandler, HandlerFuture};
pub use dispatch::Route;
pub use error::{Error, ErrorKind};
pub use event::{
    BodyStream, FieldEvent, FileBody, FileChunk, FileDescriptor, FilePart, FormDecoder, FormEvent,
    FormEvents, FormLimits,
};
pub use limits::{ByteLimit, DecodeLimits, Violation, ViolationKind};
