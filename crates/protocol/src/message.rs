//! Request and response message types.
//!
//! Every response carries a [`Status`]; callers must check it before trusting
//! the payload. An explicit error status from a reachable peer is handled the
//! same way as a transport failure: the peer is treated as unable to help and
//! routing falls back to an alternative.

use corelib::{NodeAddress, RingId};
use serde::{Deserialize, Serialize};

/// Outcome code carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Error,
    NotFound,
    ConnectionError,
}

impl Status {
    pub fn is_ok(self) -> bool {
        matches!(self, Status::Success)
    }
}

/// Descriptor of a stored chunk offered during ownership transfer. The ring
/// core never looks inside; it hands these to the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    pub content_id: String,
    pub replica_index: u32,
    pub size: u64,
}

/// Record telling the new owner where an already-replicated chunk lives, so
/// replication bookkeeping follows the chunk without moving bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRecord {
    pub content_id: String,
    pub replica_index: u32,
    pub holder: NodeAddress,
}

/// Requests exchanged between nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Resolve the owner of a ring position.
    FindSuccessor(RingId),
    /// Join-time query: "who should be this new node's successor".
    ClosestPreceding(NodeAddress),
    /// "I might be your predecessor."
    Notify(NodeAddress),
    /// Ask a peer for its perceived predecessor.
    GetPredecessor,
    /// Ask a peer for its successor list.
    ReconcileSuccessorList,
    /// Liveness probe.
    Ping,
    /// Fetch the chunks that now fall under the caller's ownership range
    /// `(boundary, new_owner]`.
    TransferOwnedChunks { new_owner: RingId, boundary: RingId },
    /// Several requests answered in one round trip (stabilization pairs
    /// GetPredecessor with ReconcileSuccessorList this way).
    Batch(Vec<Request>),
}

/// Responses, one shape per request family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Answer to FindSuccessor / ClosestPreceding.
    Address {
        status: Status,
        addr: Option<NodeAddress>,
    },
    /// Answer to Notify / Ping.
    Ack { status: Status },
    /// Answer to GetPredecessor. `addr` is `None` when the peer knows no
    /// predecessor, which is a normal state and not an error.
    Predecessor {
        status: Status,
        addr: Option<NodeAddress>,
    },
    /// Answer to ReconcileSuccessorList, head first.
    Successors {
        status: Status,
        list: Vec<NodeAddress>,
    },
    /// Answer to TransferOwnedChunks.
    Chunks {
        status: Status,
        chunks: Vec<ChunkDescriptor>,
        redirects: Vec<RedirectRecord>,
    },
    /// Answer to Batch, responses in request order.
    Batch {
        status: Status,
        responses: Vec<Response>,
    },
}

impl Response {
    pub fn status(&self) -> Status {
        match self {
            Response::Address { status, .. }
            | Response::Ack { status }
            | Response::Predecessor { status, .. }
            | Response::Successors { status, .. }
            | Response::Chunks { status, .. }
            | Response::Batch { status, .. } => *status,
        }
    }

    /// Error response matching the shape expected for `request`.
    pub fn error_for(request: &Request) -> Response {
        match request {
            Request::FindSuccessor(_) | Request::ClosestPreceding(_) => Response::Address {
                status: Status::Error,
                addr: None,
            },
            Request::Notify(_) | Request::Ping => Response::Ack {
                status: Status::Error,
            },
            Request::GetPredecessor => Response::Predecessor {
                status: Status::Error,
                addr: None,
            },
            Request::ReconcileSuccessorList => Response::Successors {
                status: Status::Error,
                list: Vec::new(),
            },
            Request::TransferOwnedChunks { .. } => Response::Chunks {
                status: Status::Error,
                chunks: Vec::new(),
                redirects: Vec::new(),
            },
            Request::Batch(_) => Response::Batch {
                status: Status::Error,
                responses: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accessor_covers_every_shape() {
        let addr = NodeAddress::with_id("h", 1, RingId(1));
        let responses = [
            Response::Address {
                status: Status::Success,
                addr: Some(addr.clone()),
            },
            Response::Ack {
                status: Status::Error,
            },
            Response::Predecessor {
                status: Status::Success,
                addr: None,
            },
            Response::Successors {
                status: Status::NotFound,
                list: vec![addr],
            },
            Response::Chunks {
                status: Status::ConnectionError,
                chunks: Vec::new(),
                redirects: Vec::new(),
            },
            Response::Batch {
                status: Status::Success,
                responses: Vec::new(),
            },
        ];
        let expected = [
            Status::Success,
            Status::Error,
            Status::Success,
            Status::NotFound,
            Status::ConnectionError,
            Status::Success,
        ];
        for (response, status) in responses.iter().zip(expected) {
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn error_for_matches_request_shape() {
        let err = Response::error_for(&Request::GetPredecessor);
        assert!(matches!(
            err,
            Response::Predecessor {
                status: Status::Error,
                addr: None
            }
        ));
    }
}
