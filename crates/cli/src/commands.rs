//! Node lifecycle commands.

use anyhow::Context;
use clap::Subcommand;
use corelib::{NodeAddress, RingSpace};
use protocol::TcpTransport;
use routing::{ChordNode, Maintenance, NullStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the first node of a brand-new ring.
    Create {
        /// Address to listen on, as host:port.
        #[arg(long)]
        bind: String,
        /// Ring width in bits (2^bits identifier positions).
        #[arg(long, default_value_t = 8)]
        ring_bits: u32,
    },
    /// Join an existing ring through one of its members.
    Join {
        /// Address to listen on, as host:port.
        #[arg(long)]
        bind: String,
        /// host:port of an already-running node.
        #[arg(long)]
        contact: String,
        /// Ring width in bits; must match the rest of the ring.
        #[arg(long, default_value_t = 8)]
        ring_bits: u32,
    },
}

impl Command {
    pub async fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Create { bind, ring_bits } => {
                let (addr, space) = endpoint_to_address(&bind, ring_bits)?;
                let node = ChordNode::create(
                    addr,
                    space,
                    Arc::new(TcpTransport::default()),
                    Arc::new(NullStore),
                );
                run_node(node, &bind).await
            }
            Command::Join {
                bind,
                contact,
                ring_bits,
            } => {
                let (addr, space) = endpoint_to_address(&bind, ring_bits)?;
                let (contact_addr, _) = endpoint_to_address(&contact, ring_bits)?;
                let node = ChordNode::join(
                    addr,
                    space,
                    Arc::new(TcpTransport::default()),
                    Arc::new(NullStore),
                    contact_addr,
                )
                .await
                .context("join failed")?;
                run_node(node, &bind).await
            }
        }
    }
}

async fn run_node(node: ChordNode, bind: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("could not bind {}", bind))?;
    info!(node = %node.self_addr(), "listening");

    let server = tokio::spawn(protocol::serve(listener, Arc::new(node.clone())));
    let maintenance = Maintenance::spawn(node.clone());

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    info!("{}", node.view().state());

    maintenance.shutdown();
    server.abort();
    Ok(())
}

fn endpoint_to_address(endpoint: &str, ring_bits: u32) -> anyhow::Result<(NodeAddress, RingSpace)> {
    let space = RingSpace::new(ring_bits)?;
    let addr = NodeAddress::parse(endpoint, space)?;
    Ok((addr, space))
}
