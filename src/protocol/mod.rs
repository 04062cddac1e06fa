//! Line-oriented wire protocol between the orchestrator and its worker.
//!
//! Every record is one `\n`-terminated UTF-8 line. Submodules:
//! - `codec`: [`LineCodec`](codec::LineCodec) framing used by the transport.
//! - `entry`: `tag:path` and bare-path reply encoding.
//! - `handshake`: the fixed eight-pair preamble written before any request.
//! - `request`: decoding of worker requests and log pushes.

pub mod codec;
pub mod entry;
pub mod handshake;
pub mod request;

pub use handshake::Handshake;
pub use request::{LogLevel, Request, Scope};
