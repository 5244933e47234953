//! The connect seam.

use std::fmt::Debug;
use std::io;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

/// Opens the byte stream a dial runs over.
///
/// The orchestrator layers TLS on top; implementations only connect.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    /// Connect to `addr` (`host:port`)
    async fn connect(&self, addr: &str) -> io::Result<TcpStream>;
}

/// Plain TCP via the tokio resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport {
    nodelay: bool,
}

impl TcpTransport {
    /// Create a transport
    #[must_use]
    pub const fn new(nodelay: bool) -> Self {
        Self { nodelay }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, addr: &str) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(addr).await?;
        if self.nodelay {
            stream.set_nodelay(true)?;
        }
        debug!(addr = %addr, local = ?stream.local_addr().ok(), "tcp connected");
        Ok(stream)
    }
}

/// The host part of `host:port`, with IPv6 brackets stripped.
///
/// An unbracketed address with more than one colon is a bare IPv6 literal
/// and is returned whole.
pub(crate) fn host_of(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split_once(']').map_or(addr, |(host, _)| host);
    }
    match addr.rsplit_once(':') {
        Some((host, port))
            if !host.contains(':')
                && !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            host
        }
        _ => addr,
    }
}
