//! Routing errors.
//!
//! Join is the only fatal failure in this subsystem: a node cannot safely
//! participate without an initial successor. Everything else (lookup retries,
//! stabilization failover, a dead predecessor) is absorbed by the protocol's
//! self-repair and never surfaces as an error.

use protocol::TransportError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not join ring via {contact}: {reason}")]
    JoinFailed { contact: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}
