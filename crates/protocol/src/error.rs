//! Transport-level errors.
//!
//! Every remote call resolves to either a response or one of these; a failed
//! call is never left "pending". Callers treat all variants uniformly as
//! "candidate unreachable" and move on to an alternative peer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("request timed out")]
    Timeout,

    #[error("frame of {0} bytes exceeds the size limit")]
    FrameTooLarge(usize),

    #[error("peer {0} is not reachable")]
    Unreachable(String),
}
