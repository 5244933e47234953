//! The dial race.
//!
//! A dial spawns the connect (and TLS handshake) as its own task and then
//! waits on whichever comes first:
//!
//! - a verification `Error` event, or the verification scope closing with
//!   an error verdict
//! - the dial task finishing, successfully or not
//! - the deadline
//! - the caller's cancellation
//!
//! Whatever wins, the dial scope is cancelled on return so a still-running
//! connect is abandoned.

use std::future::pending;
use std::io;
use std::sync::Arc;

use certpin_core::{
    event_channel, CancellationToken, DialError, DialResult, EventReceiver, SingleResultSignal,
    VerificationEvent, VerifyError,
};
use certpin_verify::{
    client_config, preload_native_roots, verify_error_from_io, PeerCertificateVerifier,
    VerificationOptions,
};
use rustls::pki_types::ServerName;
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::transport::host_of;
use crate::{Conn, DialOptions, TcpTransport, Transport};

/// Dials one address under a set of [`DialOptions`].
#[derive(Debug, Clone)]
pub struct DialOrchestrator {
    options: DialOptions,
    transport: Arc<dyn Transport>,
}

/// Verification state the race watches for a TLS dial.
struct Verification {
    signal: SingleResultSignal<VerifyError>,
    scope: CancellationToken,
    events: EventReceiver,
}

impl DialOrchestrator {
    /// Create an orchestrator using [`TcpTransport`]
    #[must_use]
    pub fn new(options: DialOptions) -> Self {
        let transport = Arc::new(TcpTransport::new(options.transport.nodelay));
        Self { options, transport }
    }

    /// Connect through a different transport
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// The options this orchestrator dials with
    #[must_use]
    pub const fn options(&self) -> &DialOptions {
        &self.options
    }

    /// Dial `addr` (`host:port`), producing exactly one outcome.
    ///
    /// # Errors
    ///
    /// - [`DialError::Transport`] if the trial connect or the dial fails
    /// - [`DialError::Verify`] if the peer certificate is rejected
    /// - [`DialError::NoResponse`] if nothing decides before the deadline
    /// - [`DialError::Cancelled`] if `cancel` fires first
    /// - [`DialError::InvalidAddress`] if `addr` has no host
    pub async fn dial(&self, addr: &str, cancel: &CancellationToken) -> DialResult<Conn> {
        if host_of(addr).is_empty() {
            return Err(DialError::InvalidAddress(addr.to_string()));
        }

        if let Some(timeout) = self.options.trial_connect_timeout {
            tokio::select! {
                () = cancel.cancelled() => return Err(DialError::Cancelled),
                probe = self.probe(addr, timeout) => probe?,
            }
        }

        let scope = cancel.child_token();
        let _guard = scope.clone().drop_guard();

        let (tls, verification) = if self.options.plain_text {
            (None, None)
        } else {
            let options = self.options.verification_options();
            if options.native_roots && !options.skip_chain_verify {
                preload_native_roots().await;
            }
            let (connector, name, verification) = self.prepare_tls(addr, options, &scope)?;
            (Some((connector, name)), Some(verification))
        };

        let handle = self.spawn_dial(addr, tls, scope);
        self.race(handle, verification, cancel).await
    }

    async fn probe(&self, addr: &str, timeout: std::time::Duration) -> DialResult<()> {
        debug!(addr = %addr, ?timeout, "trial connect");
        match tokio::time::timeout(timeout, self.transport.connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(addr = %addr, error = %e, "trial connect failed");
                Err(DialError::Transport(e))
            }
            Err(_) => {
                warn!(addr = %addr, ?timeout, "trial connect timed out");
                Err(DialError::Transport(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("trial connect to {addr} timed out after {timeout:?}"),
                )))
            }
        }
    }

    fn prepare_tls(
        &self,
        addr: &str,
        options: VerificationOptions,
        scope: &CancellationToken,
    ) -> DialResult<(TlsConnector, ServerName<'static>, Verification)> {
        let name = self
            .options
            .transport
            .server_name
            .clone()
            .unwrap_or_else(|| host_of(addr).to_string());
        let server_name =
            ServerName::try_from(name.clone()).map_err(|_| DialError::InvalidServerName(name))?;

        let (events_tx, events_rx) = event_channel();
        let (verifier, verify_scope) = PeerCertificateVerifier::with_cancellation(options, scope);
        let verifier = verifier.with_events(events_tx);
        let signal = verifier.signal();

        let config = client_config(Arc::new(verifier)).map_err(|e| DialError::Tls(e.to_string()))?;
        let verification = Verification {
            signal,
            scope: verify_scope,
            events: events_rx,
        };
        Ok((TlsConnector::from(Arc::new(config)), server_name, verification))
    }

    fn spawn_dial(
        &self,
        addr: &str,
        tls: Option<(TlsConnector, ServerName<'static>)>,
        scope: CancellationToken,
    ) -> JoinHandle<DialResult<Conn>> {
        let transport = Arc::clone(&self.transport);
        let addr = addr.to_string();
        tokio::spawn(async move {
            tokio::select! {
                () = scope.cancelled() => Err(DialError::Cancelled),
                conn = establish(transport.as_ref(), &addr, tls) => conn,
            }
        })
    }

    async fn race(
        &self,
        mut handle: JoinHandle<DialResult<Conn>>,
        verification: Option<Verification>,
        cancel: &CancellationToken,
    ) -> DialResult<Conn> {
        let (signal, mut verify_scope, mut events) = match verification {
            Some(v) => (Some(v.signal), Some(v.scope), Some(v.events)),
            None => (None, None, None),
        };

        let timeout = self.options.deadline();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                event = next_event(&mut events) => match event {
                    Some(VerificationEvent::Begin) => debug!("peer verification started"),
                    Some(VerificationEvent::Done) => debug!("peer verification passed"),
                    Some(VerificationEvent::Error(err)) => {
                        warn!(error = %err, "dial aborted by peer verification");
                        return Err(DialError::Verify(err));
                    }
                    None => events = None,
                },

                // Events can be dropped; the scope closing never is.
                () = settled(verify_scope.as_ref()) => {
                    if let Some(err) = failure(signal.as_ref()) {
                        warn!(error = %err, "dial aborted by peer verification");
                        return Err(DialError::Verify(err));
                    }
                    verify_scope = None;
                }

                joined = &mut handle => return finish(joined, signal.as_ref()),

                () = &mut deadline => {
                    warn!(?timeout, "no response before deadline");
                    return Err(DialError::NoResponse { timeout });
                }

                () = cancel.cancelled() => {
                    debug!("dial cancelled by caller");
                    return Err(DialError::Cancelled);
                }
            }
        }
    }
}

async fn next_event(events: &mut Option<EventReceiver>) -> Option<VerificationEvent> {
    match events {
        Some(events) => events.recv().await,
        None => pending().await,
    }
}

async fn settled(scope: Option<&CancellationToken>) {
    match scope {
        Some(scope) => scope.cancelled().await,
        None => pending().await,
    }
}

fn failure(signal: Option<&SingleResultSignal<VerifyError>>) -> Option<VerifyError> {
    signal.and_then(SingleResultSignal::peek).and_then(Result::err)
}

async fn establish(
    transport: &dyn Transport,
    addr: &str,
    tls: Option<(TlsConnector, ServerName<'static>)>,
) -> DialResult<Conn> {
    let tcp = transport.connect(addr).await?;
    let Some((connector, name)) = tls else {
        return Ok(Conn::plain(tcp));
    };
    let stream = connector.connect(name, tcp).await?;
    Ok(Conn::tls(stream))
}

/// A failed dial reports the verdict when one exists, whichever path carried it.
fn finish(
    joined: Result<DialResult<Conn>, tokio::task::JoinError>,
    signal: Option<&SingleResultSignal<VerifyError>>,
) -> DialResult<Conn> {
    let outcome = joined.map_err(|e| DialError::Transport(io::Error::other(e)))?;
    match outcome {
        Ok(conn) => {
            debug!(tls = conn.is_tls(), "dial established");
            Ok(conn)
        }
        Err(err) => {
            if let Some(verdict) = failure(signal) {
                return Err(DialError::Verify(verdict));
            }
            if let DialError::Transport(io_err) = &err {
                if let Some(verdict) = verify_error_from_io(io_err) {
                    return Err(DialError::Verify(verdict));
                }
            }
            warn!(error = %err, "dial failed");
            Err(err)
        }
    }
}

/// Dial `addr` with [`TcpTransport`].
///
/// # Errors
///
/// See [`DialOrchestrator::dial`].
pub async fn dial(
    addr: &str,
    options: DialOptions,
    cancel: &CancellationToken,
) -> DialResult<Conn> {
    DialOrchestrator::new(options).dial(addr, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};

    /// Never completes a connect.
    #[derive(Debug)]
    struct Stalled;

    #[async_trait::async_trait]
    impl Transport for Stalled {
        async fn connect(&self, _addr: &str) -> io::Result<TcpStream> {
            pending().await
        }
    }

    /// Fails every connect.
    #[derive(Debug)]
    struct Refusing;

    #[async_trait::async_trait]
    impl Transport for Refusing {
        async fn connect(&self, _addr: &str) -> io::Result<TcpStream> {
            Err(io::Error::from(io::ErrorKind::ConnectionRefused))
        }
    }

    /// Stalls like [`Stalled`] and records when the pending connect is dropped.
    #[derive(Debug, Default)]
    struct Tracked {
        released: Arc<AtomicBool>,
    }

    struct Release(Arc<AtomicBool>);

    impl Drop for Release {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl Transport for Tracked {
        async fn connect(&self, _addr: &str) -> io::Result<TcpStream> {
            let _release = Release(Arc::clone(&self.released));
            pending().await
        }
    }

    async fn wait_released(released: &AtomicBool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !released.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("pending connect was never dropped");
    }

    #[tokio::test]
    async fn stalled_dial_times_out() {
        let orchestrator = DialOrchestrator::new(
            DialOptions::new()
                .plain_text(true)
                .handshake_timeout(Duration::from_millis(50)),
        )
        .transport(Stalled);

        let err = orchestrator
            .dial("localhost:1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(
            err,
            DialError::NoResponse { timeout } if timeout == Duration::from_millis(50)
        ));
    }

    #[tokio::test]
    async fn transport_error_passes_through() {
        let orchestrator = DialOrchestrator::new(DialOptions::new().skip_tls_verify(true))
            .transport(Refusing);
        let err = orchestrator
            .dial("localhost:1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, DialError::Transport(ref e) if e.kind() == io::ErrorKind::ConnectionRefused)
        );
    }

    #[tokio::test]
    async fn trial_connect_failure_skips_dial() {
        let orchestrator = DialOrchestrator::new(
            DialOptions::new()
                .plain_text(true)
                .trial_connect_timeout(Duration::from_millis(50)),
        )
        .transport(Refusing);
        let err = orchestrator
            .dial("localhost:1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::Transport(_)));
    }

    #[tokio::test]
    async fn trial_connect_timeout_is_transport_error() {
        let orchestrator = DialOrchestrator::new(
            DialOptions::new().trial_connect_timeout(Duration::from_millis(20)),
        )
        .transport(Stalled);
        let err = orchestrator
            .dial("localhost:1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, DialError::Transport(ref e) if e.kind() == io::ErrorKind::TimedOut)
        );
    }

    #[tokio::test]
    async fn caller_cancellation() {
        let cancel = CancellationToken::new();
        let orchestrator = DialOrchestrator::new(
            DialOptions::new()
                .plain_text(true)
                .handshake_timeout(Duration::from_secs(30)),
        )
        .transport(Stalled);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = orchestrator.dial("localhost:1", &cancel).await.unwrap_err();
        assert!(matches!(err, DialError::Cancelled));
    }

    #[tokio::test]
    async fn timed_out_dial_drops_pending_connect() {
        let transport = Tracked::default();
        let released = Arc::clone(&transport.released);
        let orchestrator = DialOrchestrator::new(
            DialOptions::new()
                .plain_text(true)
                .handshake_timeout(Duration::from_millis(30)),
        )
        .transport(transport);

        let err = orchestrator
            .dial("localhost:1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        wait_released(&released).await;
    }

    #[tokio::test]
    async fn timed_out_tls_dial_drops_pending_connect() {
        let transport = Tracked::default();
        let released = Arc::clone(&transport.released);
        let orchestrator = DialOrchestrator::new(
            DialOptions::new()
                .skip_tls_verify(true)
                .handshake_timeout(Duration::from_millis(30)),
        )
        .transport(transport);

        let err = orchestrator
            .dial("localhost:1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        wait_released(&released).await;
    }

    #[tokio::test]
    async fn cancelled_dial_drops_pending_connect() {
        let transport = Tracked::default();
        let released = Arc::clone(&transport.released);
        let orchestrator = DialOrchestrator::new(
            DialOptions::new()
                .plain_text(true)
                .handshake_timeout(Duration::from_secs(30)),
        )
        .transport(transport);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = orchestrator.dial("localhost:1", &cancel).await.unwrap_err();
        assert!(matches!(err, DialError::Cancelled));
        wait_released(&released).await;
    }

    #[tokio::test]
    async fn invalid_server_name() {
        let orchestrator = DialOrchestrator::new(DialOptions::new().server_name("bad name!"))
            .transport(Stalled);
        let err = orchestrator
            .dial("localhost:1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::InvalidServerName(name) if name == "bad name!"));
    }

    #[tokio::test]
    async fn address_without_host() {
        let err = DialOrchestrator::new(DialOptions::new().plain_text(true))
            .transport(Stalled)
            .dial(":443", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::InvalidAddress(addr) if addr == ":443"));
    }

    #[tokio::test]
    async fn bare_ipv6_address_is_a_valid_server_name() {
        let err = DialOrchestrator::new(
            DialOptions::new()
                .skip_tls_verify(true)
                .handshake_timeout(Duration::from_millis(20)),
        )
        .transport(Stalled)
        .dial("::1", &CancellationToken::new())
        .await
        .unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
    }

    #[tokio::test]
    async fn plain_text_dial_connects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });

        let conn = dial(&addr, DialOptions::new().plain_text(true), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!conn.is_tls());
        accept.await.unwrap().unwrap();
    }

    #[test]
    fn join_failure_maps_to_transport() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let joined = rt.block_on(async {
            let handle: JoinHandle<DialResult<Conn>> = tokio::spawn(pending());
            handle.abort();
            handle.await
        });
        assert!(matches!(finish(joined, None), Err(DialError::Transport(_))));
    }
}
