//! Wire protocol for ring maintenance and chunk transfer.
//!
//! This crate provides:
//! - Request/response message types and their status codes
//! - The transport-agnostic `Transport` and `Handler` traits
//! - A length-prefixed bincode codec over tokio TCP

pub mod error;
pub mod message;
pub mod transport;

pub use error::TransportError;
pub use message::{ChunkDescriptor, RedirectRecord, Request, Response, Status};
pub use transport::{serve, Handler, TcpTransport, Transport};
