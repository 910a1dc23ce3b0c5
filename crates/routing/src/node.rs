//! The node: lookup engine, join procedure, and inbound request handlers.

use async_trait::async_trait;
use corelib::{NodeAddress, RingId, RingSpace, RingView};
use protocol::{Handler, Request, Response, Status, Transport};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::store::ChunkStore;

/// A participant in the ring.
///
/// Cheap to clone (all fields are shared handles); the inbound handlers, the
/// maintenance tasks, and the application-facing lookup API all operate on
/// the same instance.
#[derive(Clone)]
pub struct ChordNode {
    view: Arc<RingView>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn ChunkStore>,
}

impl ChordNode {
    /// Create the sole member of a brand-new ring.
    pub fn create(
        self_addr: NodeAddress,
        space: RingSpace,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ChunkStore>,
    ) -> Self {
        info!(node = %self_addr, bits = space.bits(), "creating new ring");
        Self {
            view: Arc::new(RingView::new(self_addr, space)),
            transport,
            store,
        }
    }

    /// Join an existing ring through `contact`, an already-participating
    /// node. The contact resolves who this node's successor should be; a
    /// node cannot safely join without one, so any failure here is fatal.
    pub async fn join(
        self_addr: NodeAddress,
        space: RingSpace,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ChunkStore>,
        contact: NodeAddress,
    ) -> Result<Self> {
        let node = Self::create(self_addr.clone(), space, transport, store);
        info!(node = %self_addr, contact = %contact, "joining ring");

        let request = Request::ClosestPreceding(self_addr);
        let response = node
            .transport
            .call(&contact, request)
            .await
            .map_err(|err| Error::JoinFailed {
                contact: contact.endpoint(),
                reason: err.to_string(),
            })?;

        match response {
            Response::Address {
                status,
                addr: Some(successor),
            } if status.is_ok() => {
                node.view.set_successor(successor);
                Ok(node)
            }
            other => Err(Error::JoinFailed {
                contact: contact.endpoint(),
                reason: format!("contact answered with status {:?}", other.status()),
            }),
        }
    }

    pub fn view(&self) -> &Arc<RingView> {
        &self.view
    }

    pub fn self_addr(&self) -> &NodeAddress {
        self.view.self_addr()
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Resolve the node owning ring position `key`.
    ///
    /// When the key falls in `(self, successor]` the successor is the owner
    /// and no network traffic is needed; otherwise the iterative resolution
    /// walks toward the key through other peers.
    pub async fn find_successor(&self, key: RingId) -> NodeAddress {
        let successor = self.view.successor();
        let space = self.view.space();
        if space.between(self.self_addr().id, successor.id, key, false, true) {
            return successor;
        }
        self.query_peers_for_successor(key).await
    }

    /// Iterative remote resolution with retry-on-failure.
    ///
    /// Each failed candidate is scrubbed from the finger table before the
    /// next attempt, so the loop terminates once every stale entry has
    /// collapsed to self. An answer of `self` here means "no global answer
    /// available right now", not a statement about ring topology.
    async fn query_peers_for_successor(&self, key: RingId) -> NodeAddress {
        loop {
            let candidate = self.view.closest_preceding_node(key);
            if candidate == *self.self_addr() {
                break;
            }

            match self
                .transport
                .call(&candidate, Request::FindSuccessor(key))
                .await
            {
                Ok(Response::Address {
                    status,
                    addr: Some(addr),
                }) if status.is_ok() => return addr,
                _ => {
                    self.view.scrub(&candidate);
                    debug!(node = %self.self_addr(), key = %key, failed = %candidate,
                        "find successor failed, trying again");
                }
            }
        }

        warn!(node = %self.self_addr(), key = %key, "find successor failed, could not recover");
        self.self_addr().clone()
    }

    /// Resolve the owner of a replica of a content chunk.
    pub async fn lookup(&self, content_id: &str, replica_index: u32) -> NodeAddress {
        let key = self.view.space().key_for(content_id, replica_index);
        self.find_successor(key).await
    }

    /// Pull the chunks this node now owns from `peer`. `boundary` is the new
    /// predecessor's identifier, the lower bound of the range that changed
    /// hands. Failures are logged and dropped: the ring stays correct either
    /// way, and replication repair will catch anything missed.
    pub async fn retrieve_owned_chunks(&self, peer: &NodeAddress, boundary: RingId) {
        let request = Request::TransferOwnedChunks {
            new_owner: self.self_addr().id,
            boundary,
        };
        match self.transport.call(peer, request).await {
            Ok(Response::Chunks {
                status,
                chunks,
                redirects,
            }) if status.is_ok() => {
                if !chunks.is_empty() || !redirects.is_empty() {
                    info!(node = %self.self_addr(), peer = %peer,
                        chunks = chunks.len(), redirects = redirects.len(),
                        "retrieving owned chunks");
                }
                self.store.ingest(chunks, redirects, peer).await;
            }
            Ok(other) => {
                warn!(node = %self.self_addr(), peer = %peer, status = ?other.status(),
                    "chunk transfer refused");
            }
            Err(err) => {
                warn!(node = %self.self_addr(), peer = %peer, error = %err,
                    "chunk transfer failed");
            }
        }
    }

    /// Inbound notify. On the very first accepted predecessor the ownership
    /// transfer fires once, against the successor-list head and the new
    /// predecessor, on a detached task so storage I/O never blocks the ring.
    fn handle_notify(&self, candidate: NodeAddress) -> Response {
        let outcome = self.view.note_predecessor(candidate.clone());
        if outcome.first {
            let successor_head = self.view.successors()[0].clone();
            let node = self.clone();
            tokio::spawn(async move {
                let boundary = candidate.id;
                node.retrieve_owned_chunks(&successor_head, boundary).await;
                node.retrieve_owned_chunks(&candidate, boundary).await;
            });
        }
        Response::Ack {
            status: Status::Success,
        }
    }
}

#[async_trait]
impl Handler for ChordNode {
    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::FindSuccessor(key) => Response::Address {
                status: Status::Success,
                addr: Some(self.find_successor(key).await),
            },
            // The joiner asks "who should be my successor": resolve its own
            // identifier as a key.
            Request::ClosestPreceding(joiner) => Response::Address {
                status: Status::Success,
                addr: Some(self.find_successor(joiner.id).await),
            },
            Request::Notify(candidate) => self.handle_notify(candidate),
            Request::GetPredecessor => Response::Predecessor {
                status: Status::Success,
                addr: self.view.predecessor(),
            },
            Request::ReconcileSuccessorList => Response::Successors {
                status: Status::Success,
                list: self.view.successors(),
            },
            Request::Ping => Response::Ack {
                status: Status::Success,
            },
            Request::TransferOwnedChunks {
                new_owner,
                boundary,
            } => {
                let (chunks, redirects) = self.store.owned_chunks(new_owner, boundary).await;
                Response::Chunks {
                    status: Status::Success,
                    chunks,
                    redirects,
                }
            }
            Request::Batch(requests) => {
                let mut responses = Vec::with_capacity(requests.len());
                for inner in requests {
                    responses.push(self.handle(inner).await);
                }
                Response::Batch {
                    status: Status::Success,
                    responses,
                }
            }
        }
    }
}
