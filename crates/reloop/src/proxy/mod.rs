//! Public listener in front of the supervised child.
//!
//! Every request first passes through [`Reloader::ensure_fresh`], so a
//! pending source change is rebuilt exactly when someone asks for a page.
//! The request is then either reverse-proxied or, for CONNECT and WebSocket
//! upgrades, turned into a raw byte tunnel.

mod backend;
mod forward;
mod route;
mod tls;
mod tunnel;

pub use backend::{AsyncIo, Backend, BoxedIo};
pub use forward::strip_hop_headers;
pub use route::{classify, Route};
pub use tls::{acceptor, backend_connector, TlsFiles};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Router};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::reload::Reloader;

/// Peer address of the accepted connection, attached to every request.
#[derive(Debug, Clone, Copy)]
pub struct ClientAddr(pub SocketAddr);

#[derive(Clone)]
struct ProxyState {
    reloader: Arc<Reloader>,
    scheme: &'static str,
}

/// Router with a single catch-all handler.
pub fn router(reloader: Arc<Reloader>, scheme: &'static str) -> Router {
    Router::new()
        .fallback(handle)
        .layer(TraceLayer::new_for_http())
        .with_state(ProxyState { reloader, scheme })
}

async fn handle(State(state): State<ProxyState>, req: Request) -> Response {
    if let Err(err) = state.reloader.ensure_fresh().await {
        return err.into_response();
    }

    let client = req.extensions().get::<ClientAddr>().map(|addr| addr.0);
    let backend = state.reloader.backend();
    let result = match classify(&req) {
        Route::Tunnel => tunnel::tunnel(req, backend).await,
        Route::Proxy => forward::forward(req, backend, client, state.scheme).await,
    };

    result.unwrap_or_else(IntoResponse::into_response)
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match self {
            EngineError::TunnelUnsupported => StatusCode::NOT_IMPLEMENTED,
            EngineError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };
        warn!(error = %self, status = status.as_u16(), "request failed");
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{self}\n"),
        )
            .into_response()
    }
}

/// Bound public listener, plaintext or TLS.
pub struct FrontEnd {
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    local_addr: SocketAddr,
}

impl FrontEnd {
    pub async fn bind(addr: SocketAddr, tls: Option<TlsAcceptor>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| EngineError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            tls,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls.is_some() { "https" } else { "http" }
    }

    /// Accept connections until `shutdown` resolves. Connections already
    /// accepted (including open tunnels) are left to finish on their own.
    pub async fn serve<F>(self, router: Router, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        loop {
            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        // Usually fd exhaustion; back off instead of spinning
                        warn!(%err, "failed to accept connection");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        continue;
                    }
                },
            };

            if let Err(err) = stream.set_nodelay(true) {
                debug!(%err, "could not set TCP_NODELAY");
            }
            let router = router.clone().layer(Extension(ClientAddr(peer)));
            let tls = self.tls.clone();
            tokio::spawn(async move {
                match tls {
                    None => serve_connection(Box::new(stream), router).await,
                    Some(acceptor) => match acceptor.accept(stream).await {
                        Ok(stream) => serve_connection(Box::new(stream), router).await,
                        Err(err) => debug!(%err, %peer, "TLS handshake failed"),
                    },
                }
            });
        }
        debug!(addr = %self.local_addr, "listener closed");
    }
}

async fn serve_connection(io: BoxedIo, router: Router) {
    let service = TowerToHyperService::new(router);
    if let Err(err) = auto::Builder::new(TokioExecutor::new())
        .serve_connection_with_upgrades(TokioIo::new(io), service)
        .await
    {
        debug!(%err, "connection ended with error");
    }
}
