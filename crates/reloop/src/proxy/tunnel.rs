//! Raw duplex relay for CONNECT and WebSocket upgrades.
//!
//! The request head goes to the backend untouched. Once the backend agrees
//! to switch protocols both connections are taken over from hyper and bytes
//! are copied in each direction until either side closes.

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode, Version};
use hyper::client::conn::http1;
use hyper::upgrade::{OnUpgrade, Upgraded};
use hyper_util::rt::TokioIo;
use tracing::debug;

use super::backend::Backend;
use crate::error::{EngineError, Result};

pub async fn tunnel(mut req: Request<Body>, backend: &Backend) -> Result<Response<Body>> {
    let Some(client_upgrade) = req.extensions_mut().remove::<OnUpgrade>() else {
        return Err(EngineError::TunnelUnsupported);
    };
    let is_connect = req.method() == Method::CONNECT;
    *req.version_mut() = Version::HTTP_11;

    let io = backend.dial().await?;
    let (mut sender, conn) = http1::handshake::<_, Body>(TokioIo::new(io)).await?;
    tokio::spawn(async move {
        if let Err(err) = conn.with_upgrades().await {
            debug!(%err, "backend tunnel connection ended with error");
        }
    });

    let mut resp = sender.send_request(req).await?;
    let switched = if is_connect {
        resp.status().is_success()
    } else {
        resp.status() == StatusCode::SWITCHING_PROTOCOLS
    };

    if !switched {
        // Backend refused the upgrade; relay its answer as a normal response
        let (parts, body) = resp.into_parts();
        return Ok(Response::from_parts(parts, Body::new(body)));
    }

    let backend_upgrade = hyper::upgrade::on(&mut resp);
    tokio::spawn(async move {
        match tokio::try_join!(client_upgrade, backend_upgrade) {
            Ok((client, backend)) => splice(client, backend).await,
            Err(err) => debug!(%err, "tunnel upgrade failed"),
        }
    });

    let (parts, _) = resp.into_parts();
    Ok(Response::from_parts(parts, Body::empty()))
}

/// Copy both directions until one of them finishes, then drop both ends.
async fn splice(client: Upgraded, backend: Upgraded) {
    let (mut client_rd, mut client_wr) = tokio::io::split(TokioIo::new(client));
    let (mut backend_rd, mut backend_wr) = tokio::io::split(TokioIo::new(backend));

    tokio::select! {
        res = tokio::io::copy(&mut client_rd, &mut backend_wr) => match res {
            Ok(bytes) => debug!(bytes, "client closed tunnel"),
            Err(err) => debug!(%err, "client side of tunnel failed"),
        },
        res = tokio::io::copy(&mut backend_rd, &mut client_wr) => match res {
            Ok(bytes) => debug!(bytes, "backend closed tunnel"),
            Err(err) => debug!(%err, "backend side of tunnel failed"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn test_upgrade_without_connection_takeover_is_501() {
        let req = Request::builder()
            .uri("/ws")
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .body(Body::empty())
            .unwrap();

        // Nothing listens on port 1; the request must be rejected before dialing
        let err = tunnel(req, &Backend::new(1)).await.unwrap_err();
        assert!(matches!(err, EngineError::TunnelUnsupported));

        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"tunneling is not supported on this connection\n");
    }

    #[tokio::test]
    async fn test_shutting_down_is_503() {
        let resp = EngineError::ShuttingDown.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
