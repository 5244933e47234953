//! Servers and certificates for dial tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use rcgen::{
    date_time_ymd, BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair,
    KeyUsagePurpose,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::ServerConfig;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

/// Frames larger than this are treated as a non-framed client.
const MAX_FRAME: usize = 64 * 1024;

pub struct Issued {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl Issued {
    pub fn der(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }

    pub fn key_der(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key.serialize_der()))
    }
}

#[derive(Clone, Copy)]
pub enum Validity {
    Current,
    Expired,
}

fn leaf_params(validity: Validity) -> CertificateParams {
    let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    params.distinguished_name.push(DnType::CommonName, "localhost");
    if let Validity::Expired = validity {
        params.not_before = date_time_ymd(2000, 1, 1);
        params.not_after = date_time_ymd(2001, 1, 1);
    }
    params
}

pub fn root_ca() -> Issued {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, "certpin dial test root");
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let cert = params.self_signed(&key).unwrap();
    Issued { cert, key }
}

pub fn leaf_signed_by(ca: &Issued, validity: Validity) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = leaf_params(validity)
        .signed_by(&key, &ca.cert, &ca.key)
        .unwrap();
    Issued { cert, key }
}

pub fn self_signed(validity: Validity) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = leaf_params(validity).self_signed(&key).unwrap();
    Issued { cert, key }
}

/// Echo length-prefixed frames until the peer goes away.
///
/// A prefix over [`MAX_FRAME`] means the peer is not speaking frames (a TLS
/// ClientHello, say); the connection is held open without a reply.
async fn echo_frames<S>(mut stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let Ok(len) = stream.read_u32().await else {
            return;
        };
        let len = len as usize;
        if len > MAX_FRAME {
            let mut sink = Vec::new();
            let _ = stream.read_to_end(&mut sink).await;
            return;
        }
        let mut payload = vec![0u8; len];
        if stream.read_exact(&mut payload).await.is_err() {
            return;
        }
        if stream.write_u32(len as u32).await.is_err()
            || stream.write_all(&payload).await.is_err()
            || stream.flush().await.is_err()
        {
            return;
        }
    }
}

pub async fn spawn_plain_echo_server() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        while let Ok((sock, _peer)) = listener.accept().await {
            tokio::spawn(echo_frames(sock));
        }
    });
    (addr, handle)
}

/// Serve framed echo over TLS, presenting `chain` (leaf first).
fn tls_acceptor(chain: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> TlsAcceptor {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .unwrap();
    TlsAcceptor::from(Arc::new(config))
}

pub async fn spawn_tls_echo_server(
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> (SocketAddr, JoinHandle<()>) {
    let acceptor = tls_acceptor(chain, key);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        while let Ok((sock, _peer)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                if let Ok(tls) = acceptor.accept(sock).await {
                    echo_frames(tls).await;
                }
            });
        }
    });
    (addr, handle)
}

/// Accepts one TLS connection and reports once the client has closed its
/// socket, whether or not the handshake succeeded.
pub async fn spawn_tls_close_watcher(
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> (SocketAddr, oneshot::Receiver<()>) {
    let acceptor = tls_acceptor(chain, key);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel();
    tokio::spawn(async move {
        let Ok((mut sock, _peer)) = listener.accept().await else {
            return;
        };
        if let Ok(mut tls) = acceptor.accept(&mut sock).await {
            let mut buf = [0u8; 1024];
            while matches!(tls.read(&mut buf).await, Ok(n) if n > 0) {}
        }
        let mut buf = [0u8; 1024];
        while matches!(sock.read(&mut buf).await, Ok(n) if n > 0) {}
        let _ = closed_tx.send(());
    });
    (addr, closed_rx)
}

/// Send one frame and read the echo.
pub async fn round_trip<S>(stream: &mut S, payload: &[u8]) -> Vec<u8>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_u32(payload.len() as u32).await.unwrap();
    stream.write_all(payload).await.unwrap();
    stream.flush().await.unwrap();

    let len = stream.read_u32().await.unwrap() as usize;
    let mut reply = vec![0u8; len];
    stream.read_exact(&mut reply).await.unwrap();
    reply
}
