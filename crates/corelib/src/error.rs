//! Error types for the core library.

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Ring width outside the supported range.
    #[error("invalid ring width: {0} (must be 1..=63 bits)")]
    InvalidRingWidth(u32),
    /// Invalid node address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
