//! Relay Protocol Implementation
//!
//! This module implements the wire format spoken between the front-end and
//! the relay.
//!
//! ## Overview
//!
//! Requests and responses are UTF-8 text frames terminated by a NUL byte.
//! A request is one SQL statement; a response is a status line, optionally
//! followed by `|`-separated rows.
//!
//! ## Modules
//!
//! - `frame`: NUL-delimited frame parsing and encoding
//! - `types`: Defines the `Response` enum and its rendering
//!
//! ## Example
//!
//! ```
//! use sqlrelay::protocol::{encode_frame, parse_frame, Response};
//! use bytes::BytesMut;
//!
//! // Parsing incoming data
//! let mut buf = BytesMut::from(&b"SELECT username FROM users\0"[..]);
//! let command = parse_frame(&mut buf).unwrap();
//! assert_eq!(command, "SELECT username FROM users");
//!
//! // Creating responses
//! let response = Response::rows(vec!["('alice',)".to_string()]);
//! let bytes = encode_frame(&response.to_string());
//! assert_eq!(&bytes[..], b"SUCCESS|('alice',)\0");
//! ```

pub mod frame;
pub mod types;

// Re-export commonly used types for convenience
pub use frame::{encode_frame, parse_frame, DELIMITER};
pub use types::{ErrorCategory, Response, DEFAULT_WRITE_ACK};
