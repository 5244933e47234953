//! Established connections.
//!
//! [`Conn`] is what a dial yields: a raw TCP stream for plain-text dials or
//! a rustls client stream whose peer passed verification. Reads and writes
//! delegate to the active variant.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;
use rustls::pki_types::CertificateDer;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

pin_project! {
    /// A dialed connection
    #[project = ConnProj]
    #[derive(Debug)]
    pub enum Conn {
        /// Plain TCP
        Plain { #[pin] inner: TcpStream },
        /// TLS over TCP
        Tls { #[pin] inner: TlsStream<TcpStream> },
    }
}

impl Conn {
    /// Wrap a plain TCP stream
    #[must_use]
    pub const fn plain(inner: TcpStream) -> Self {
        Self::Plain { inner }
    }

    /// Wrap an established TLS stream
    #[must_use]
    pub const fn tls(inner: TlsStream<TcpStream>) -> Self {
        Self::Tls { inner }
    }

    /// Returns true for TLS connections
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls { .. })
    }

    /// The chain the peer presented, leaf first (TLS only)
    #[must_use]
    pub fn peer_certificates(&self) -> Option<&[CertificateDer<'static>]> {
        match self {
            Self::Plain { .. } => None,
            Self::Tls { inner } => inner.get_ref().1.peer_certificates(),
        }
    }

    /// The underlying TCP stream
    #[must_use]
    pub fn tcp(&self) -> &TcpStream {
        match self {
            Self::Plain { inner } => inner,
            Self::Tls { inner } => inner.get_ref().0,
        }
    }

    /// The remote address
    pub fn peer_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.tcp().peer_addr()
    }
}

impl AsyncRead for Conn {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.project() {
            ConnProj::Plain { inner } => inner.poll_read(cx, buf),
            ConnProj::Tls { inner } => inner.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Conn {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.project() {
            ConnProj::Plain { inner } => inner.poll_write(cx, buf),
            ConnProj::Tls { inner } => inner.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            ConnProj::Plain { inner } => inner.poll_flush(cx),
            ConnProj::Tls { inner } => inner.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            ConnProj::Plain { inner } => inner.poll_shutdown(cx),
            ConnProj::Tls { inner } => inner.poll_shutdown(cx),
        }
    }
}
