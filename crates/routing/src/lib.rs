//! Ring routing: lookup, join, stabilization, and ownership transfer.
//!
//! A [`ChordNode`] owns the ring view plus a transport and a chunk store, and
//! implements both sides of the protocol: outbound lookups and the inbound
//! request handlers. [`Maintenance`] runs the periodic self-repair loop
//! (stabilize, fix-fingers, check-predecessor) that keeps the view converging
//! after membership changes.

pub mod error;
pub mod maintenance;
pub mod node;
pub mod store;

pub use error::{Error, Result};
pub use maintenance::Maintenance;
pub use node::ChordNode;
pub use store::{ChunkStore, NullStore};
