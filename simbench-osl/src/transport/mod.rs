//! Length-prefixed JSON framing over a byte stream.
//!
//! §6 of the wire protocol leaves exact byte layout implementation-defined
//! as long as framing preserves message boundaries. This module picks one
//! concrete encoding: a 4-byte big-endian length prefix followed by a
//! `serde_json`-encoded payload, read/written over anything implementing
//! tokio's `AsyncRead`/`AsyncWrite` (a `TcpStream` in production, an
//! in-memory duplex pipe in tests).

mod frame;

pub use frame::{read_frame, write_frame, FrameError};
