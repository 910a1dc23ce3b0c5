//! Storage collaborator seam.
//!
//! The ring core decides *when* chunks must move (a node learned its first
//! predecessor, so a slice of the ring changed hands) but never *what* moves.
//! Implementations own chunk storage, replication bookkeeping, and the actual
//! byte transfer; they run on their own tasks so slow storage I/O cannot
//! stall topology convergence.

use async_trait::async_trait;
use corelib::{NodeAddress, RingId};
use protocol::{ChunkDescriptor, RedirectRecord};

#[async_trait]
pub trait ChunkStore: Send + Sync + 'static {
    /// Answer a peer's transfer request: descriptors for the locally held
    /// chunks whose keys fall in `(boundary, new_owner]`, plus redirect
    /// records for replicas held elsewhere.
    async fn owned_chunks(
        &self,
        new_owner: RingId,
        boundary: RingId,
    ) -> (Vec<ChunkDescriptor>, Vec<RedirectRecord>);

    /// Take responsibility for chunks fetched from `from` after an ownership
    /// change.
    async fn ingest(
        &self,
        chunks: Vec<ChunkDescriptor>,
        redirects: Vec<RedirectRecord>,
        from: &NodeAddress,
    );
}

/// Store that holds nothing and wants nothing. Used by ring-only nodes and
/// in tests that exercise topology without storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait]
impl ChunkStore for NullStore {
    async fn owned_chunks(
        &self,
        _new_owner: RingId,
        _boundary: RingId,
    ) -> (Vec<ChunkDescriptor>, Vec<RedirectRecord>) {
        (Vec::new(), Vec::new())
    }

    async fn ingest(
        &self,
        _chunks: Vec<ChunkDescriptor>,
        _redirects: Vec<RedirectRecord>,
        _from: &NodeAddress,
    ) {
    }
}
