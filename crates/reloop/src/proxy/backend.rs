//! Connections to the supervised child on its internal port.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::error::{EngineError, Result};

/// Byte stream to the backend, plaintext or TLS.
pub trait AsyncIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncIo for T {}

pub type BoxedIo = Box<dyn AsyncIo>;

/// Internal address of the child plus the transport it speaks.
#[derive(Clone)]
pub struct Backend {
    addr: SocketAddr,
    tls: Option<TlsConnector>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("addr", &self.addr)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

impl Backend {
    /// Plaintext backend on loopback.
    pub fn new(port: u16) -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
            tls: None,
        }
    }

    /// Speak TLS to the backend, matching a TLS front end.
    pub fn with_tls(mut self, connector: TlsConnector) -> Self {
        self.tls = Some(connector);
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Open a fresh connection.
    pub async fn dial(&self) -> io::Result<BoxedIo> {
        let tcp = TcpStream::connect(self.addr).await?;
        tcp.set_nodelay(true)?;
        match &self.tls {
            None => Ok(Box::new(tcp)),
            Some(connector) => {
                let name = ServerName::try_from("localhost")
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
                let stream = connector.connect(name, tcp).await?;
                Ok(Box::new(stream))
            }
        }
    }

    /// Whether the port accepts TCP connections right now.
    pub async fn probe(&self) -> bool {
        TcpStream::connect(self.addr).await.is_ok()
    }

    /// Poll the port every `interval` until it accepts or `limit` elapses.
    pub async fn wait_until_accepting(&self, interval: Duration, limit: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            if self.probe().await {
                debug!(addr = %self.addr, waited_ms = started.elapsed().as_millis() as u64, "backend accepting");
                return Ok(());
            }
            if started.elapsed() >= limit {
                return Err(EngineError::BackendUnavailable {
                    addr: self.addr,
                    waited_ms: limit.as_millis() as u64,
                });
            }
            tokio::time::sleep(interval).await;
        }
    }
}
