//! Transport seams and the TCP implementation.
//!
//! Frames are a 4-byte big-endian length followed by a bincode-encoded
//! message. Outbound calls open a fresh connection per request (requests are
//! small and infrequent; ring maintenance does not justify pooling) and run
//! under a timeout so a dead peer resolves to a failure instead of hanging a
//! maintenance task.

use async_trait::async_trait;
use bytes::BytesMut;
use corelib::NodeAddress;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::message::{Request, Response};

/// Upper bound on a single frame. Transfer responses carry descriptors, not
/// chunk bytes, so anything beyond this is a protocol violation.
const MAX_FRAME_LEN: usize = 1 << 20;

/// Outbound request/response channel to other nodes.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send `request` to `peer` and wait for its response. Resolves to an
    /// error on connect failure, timeout, or codec trouble; never retries.
    async fn call(&self, peer: &NodeAddress, request: Request)
        -> Result<Response, TransportError>;
}

/// Inbound request dispatch, implemented by the node.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> Response;
}

/// TCP transport with a per-call timeout.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn call(
        &self,
        peer: &NodeAddress,
        request: Request,
    ) -> Result<Response, TransportError> {
        let endpoint = peer.endpoint();
        let exchange = async {
            let mut stream = TcpStream::connect(&endpoint).await?;
            write_frame(&mut stream, &request).await?;
            read_frame::<Response>(&mut stream).await
        };
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                debug!(peer = %peer, "request timed out");
                Err(TransportError::Timeout)
            }
        }
    }
}

/// Accept loop. Each connection gets its own task and is served until the
/// peer closes it. Runs until the listener is dropped (i.e. the future is
/// aborted at shutdown).
pub async fn serve(listener: TcpListener, handler: Arc<dyn Handler>) {
    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            if let Err(err) = serve_connection(stream, handler).await {
                debug!(peer = %remote, error = %err, "connection closed with error");
            }
        });
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    handler: Arc<dyn Handler>,
) -> Result<(), TransportError> {
    loop {
        let request = match read_frame::<Request>(&mut stream).await {
            Ok(request) => request,
            // Clean EOF between frames is the normal end of a connection.
            Err(TransportError::Io(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                return Ok(())
            }
            Err(err) => return Err(err),
        };
        let response = handler.handle(request).await;
        write_frame(&mut stream, &response).await?;
    }
}

async fn write_frame<T: Serialize>(
    stream: &mut TcpStream,
    message: &T,
) -> Result<(), TransportError> {
    let payload = bincode::serialize(message)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(payload.len()));
    }
    stream.write_u32(payload.len() as u32).await?;
    stream.write_all(&payload).await?;
    stream.flush().await?;
    Ok(())
}

async fn read_frame<T: DeserializeOwned>(stream: &mut TcpStream) -> Result<T, TransportError> {
    let len = stream.read_u32().await? as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(len));
    }
    let mut buf = BytesMut::zeroed(len);
    stream.read_exact(&mut buf).await?;
    Ok(bincode::deserialize(&buf)?)
}
