//! Wire Protocol
//!
//! Implements the subset of the Redis serialization protocol (RESP) this
//! cluster speaks, for both client-facing and inter-node traffic.
//!
//! ## Framing
//! - Requests arrive as an array of bulk strings (`*N\r\n` followed by N
//!   `$len\r\n<bytes>\r\n` entries) or as a single inline line of
//!   whitespace-separated words.
//! - Replies are simple strings (`+`), errors (`-`), bulk strings (`$`,
//!   including the `$-1` nil form) or arrays of those (`*`).
//!
//! Requests are framed on `\r\n` boundaries through a buffered reader, so
//! pipelined requests and requests larger than a single TCP segment are
//! handled correctly.

pub mod frame;
