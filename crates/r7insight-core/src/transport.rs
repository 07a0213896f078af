// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Byte-level transport to the ingestion endpoint.
//!
//! [`TcpTransport`] owns at most one TCP connection, optionally wrapped in
//! TLS. Sockets are tuned for a long-lived, mostly idle connection: Nagle is
//! disabled so lines leave immediately, and keep-alive packets start after 10s
//! of idleness so load balancers do not silently drop the connection.
//!
//! Like the rest of the pipeline, the transport only reports what it does
//! through diagnostics when the configuration that built it has `debug` set.

use crate::config::{DeliveryConfig, Endpoint};
use crate::constants::{KEEPALIVE_IDLE, KEEPALIVE_INTERVAL};
use crate::diagnostics::diag;
use async_trait::async_trait;
use rustls::pki_types::ServerName;
use socket2::{SockRef, TcpKeepalive};
use std::io;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

/// Connection used by the delivery worker.
///
/// Implementations are driven from a single task and never concurrently.
#[async_trait]
pub trait Transport: Send {
    /// Opens a connection, replacing any existing one.
    async fn connect(&mut self) -> io::Result<()>;

    /// Writes all of `bytes` and flushes them.
    async fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Closes the connection. Idempotent, never fails.
    async fn close(&mut self);

    /// Human-readable target, for diagnostics.
    fn endpoint(&self) -> String;
}

/// Builds the transport a worker uses for a given configuration.
pub type TransportFactory = Arc<dyn Fn(&DeliveryConfig) -> Box<dyn Transport> + Send + Sync>;

/// Factory producing a [`TcpTransport`] for the configuration's endpoint.
#[must_use]
pub fn tcp_transport_factory() -> TransportFactory {
    Arc::new(|config: &DeliveryConfig| {
        Box::new(TcpTransport::from_config(config)) as Box<dyn Transport>
    })
}

enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

/// TCP transport with optional TLS.
pub struct TcpTransport {
    endpoint: Endpoint,
    tls: Option<TlsConnector>,
    stream: Option<Stream>,
    debug: bool,
}

impl TcpTransport {
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            tls: None,
            stream: None,
            debug: false,
        }
    }

    #[must_use]
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(config.endpoint()).with_debug(config.debug)
    }

    /// Enables diagnostics for socket tuning and certificate loading.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    // Built on first TLS connect and reused for reconnects.
    fn tls_connector(&mut self) -> io::Result<TlsConnector> {
        if let Some(connector) = &self.tls {
            return Ok(connector.clone());
        }
        let connector = build_tls_connector(self.debug)?;
        self.tls = Some(connector.clone());
        Ok(connector)
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.stream.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> io::Result<()> {
        self.stream = None;

        let tcp = TcpStream::connect((self.endpoint.host.as_str(), self.endpoint.port)).await?;
        tune_socket(&tcp, self.debug)?;

        let stream = if self.endpoint.use_tls {
            let connector = self.tls_connector()?;
            let server_name = ServerName::try_from(self.endpoint.host.as_str())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
                .to_owned();
            let tls = connector.connect(server_name, tcp).await?;
            Stream::Tls(Box::new(tls))
        } else {
            Stream::Plain(tcp)
        };

        self.stream = Some(stream);
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(Stream::Plain(stream)) => {
                stream.write_all(bytes).await?;
                stream.flush().await
            }
            Some(Stream::Tls(stream)) => {
                stream.write_all(bytes).await?;
                stream.flush().await
            }
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("not connected to {}", self.endpoint),
            )),
        }
    }

    async fn close(&mut self) {
        // Dropping the stream closes the socket; errors from a broken socket
        // have nowhere useful to go.
        self.stream = None;
    }

    fn endpoint(&self) -> String {
        self.endpoint.to_string()
    }
}

fn tune_socket(stream: &TcpStream, debug: bool) -> io::Result<()> {
    stream.set_nodelay(true)?;

    let socket = SockRef::from(stream);
    let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_IDLE);
    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "windows",
    ))]
    let keepalive = keepalive.with_interval(KEEPALIVE_INTERVAL);

    if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
        diag!(debug, "Keep-alive tuning unsupported, using platform defaults: {e}");
        socket.set_keepalive(true)?;
    }
    Ok(())
}

fn build_tls_connector(debug: bool) -> io::Result<TlsConnector> {
    let mut root_cert_store = rustls::RootCertStore::empty();
    let native_certs = rustls_native_certs::load_native_certs();
    for err in &native_certs.errors {
        diag!(debug, "Failed to load a native certificate: {err}");
    }
    let mut valid_count = 0;
    for cert in native_certs.certs {
        match root_cert_store.add(cert) {
            Ok(()) => valid_count += 1,
            Err(err) => diag!(debug, "Failed to parse certificate: {err:?}"),
        }
    }
    if valid_count == 0 {
        return Err(io::Error::other(
            "No valid certificates found in native root store",
        ));
    }

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}
