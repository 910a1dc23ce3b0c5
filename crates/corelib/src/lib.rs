//! Core library for the Chord ring implementation.
//!
//! This crate provides the fundamental abstractions for ring membership:
//! - Ring identifiers and circular interval arithmetic
//! - Node addresses
//! - The per-node ring view (predecessor, finger table, successor list)
//!
//! Everything here is synchronous and transport-agnostic; remote calls and
//! the stabilization loop live in the `routing` crate.

pub mod addr;
pub mod error;
pub mod id;
pub mod view;

pub use addr::NodeAddress;
pub use error::{Error, Result};
pub use id::{RingId, RingSpace};
pub use view::{NotifyOutcome, RingView};
