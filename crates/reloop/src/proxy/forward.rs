//! Reverse-proxy path for ordinary HTTP requests.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Request, Response, Uri, Version};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tracing::debug;

use super::backend::Backend;
use crate::error::Result;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_headers(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }

    for name in [
        header::CONNECTION,
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ] {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

/// Append the client to `X-Forwarded-For` and record the original host and
/// scheme unless an upstream proxy already did.
fn add_forwarded(
    headers: &mut HeaderMap,
    client: Option<SocketAddr>,
    host: Option<HeaderValue>,
    scheme: &str,
) {
    if let Some(client) = client {
        let ip = client.ip().to_string();
        let chain = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) if !prior.is_empty() => format!("{prior}, {ip}"),
            _ => ip,
        };
        if let Ok(value) = HeaderValue::from_str(&chain) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }
    if let Some(host) = host {
        if !headers.contains_key(X_FORWARDED_HOST) {
            headers.insert(X_FORWARDED_HOST, host);
        }
    }
    if !headers.contains_key(X_FORWARDED_PROTO) {
        let proto = if scheme == "https" { "https" } else { "http" };
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static(proto));
    }
}

fn origin_form(uri: &Uri) -> Uri {
    uri.path_and_query()
        .cloned()
        .map(Uri::from)
        .unwrap_or_else(|| Uri::from_static("/"))
}

/// Rewrite the request for the backend: hop headers out, forwarding
/// headers in, origin-form target over HTTP/1.1.
pub fn prepare(req: Request<Body>, client: Option<SocketAddr>, scheme: &str) -> Request<Body> {
    let (mut parts, body) = req.into_parts();

    let host = parts.headers.get(header::HOST).cloned().or_else(|| {
        parts
            .uri
            .authority()
            .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
    });

    strip_hop_headers(&mut parts.headers);
    add_forwarded(&mut parts.headers, client, host.clone(), scheme);
    if let Some(host) = host {
        parts.headers.entry(header::HOST).or_insert(host);
    }
    parts.uri = origin_form(&parts.uri);
    parts.version = Version::HTTP_11;

    Request::from_parts(parts, body)
}

/// Send one request to the backend and relay its response.
pub async fn forward(
    req: Request<Body>,
    backend: &Backend,
    client: Option<SocketAddr>,
    scheme: &str,
) -> Result<Response<Body>> {
    let req = prepare(req, client, scheme);

    let io = backend.dial().await?;
    let (mut sender, conn) = http1::handshake::<_, Body>(TokioIo::new(io)).await?;
    tokio::spawn(async move {
        if let Err(err) = conn.await {
            debug!(%err, "backend connection ended with error");
        }
    });

    let resp = sender.send_request(req).await?;
    let (mut parts, body) = resp.into_parts();
    strip_hop_headers(&mut parts.headers);

    Ok(Response::from_parts(parts, Body::new(body)))
}
