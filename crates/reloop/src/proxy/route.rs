//! Request classification: header-aware proxying or raw tunneling.

use axum::http::{header, HeaderMap, Method, Request};

/// How a request is handed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Reverse-proxied request/response
    Proxy,
    /// Raw duplex byte relay (CONNECT, WebSocket)
    Tunnel,
}

/// Decide the route from the method and the upgrade headers.
pub fn classify<B>(req: &Request<B>) -> Route {
    if req.method() == Method::CONNECT || is_websocket_upgrade(req.headers()) {
        Route::Tunnel
    } else {
        Route::Proxy
    }
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let upgrade = headers
        .get_all(header::UPGRADE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("websocket"));
    if !upgrade {
        return false;
    }

    // Browsers always pair the Upgrade header with `Connection: upgrade`;
    // without it the request is a plain request with a stray header.
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().method(method).uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_plain_get_is_proxied() {
        assert_eq!(classify(&request(Method::GET, &[])), Route::Proxy);
        assert_eq!(
            classify(&request(Method::POST, &[("content-type", "application/json")])),
            Route::Proxy
        );
    }

    #[test]
    fn test_connect_is_tunneled() {
        let req = Request::builder()
            .method(Method::CONNECT)
            .uri("example.com:443")
            .body(())
            .unwrap();
        assert_eq!(classify(&req), Route::Tunnel);
    }

    #[test]
    fn test_websocket_upgrade_is_tunneled() {
        let req = request(
            Method::GET,
            &[("connection", "keep-alive, Upgrade"), ("upgrade", "WebSocket")],
        );
        assert_eq!(classify(&req), Route::Tunnel);
    }

    #[test]
    fn test_upgrade_without_connection_header_is_proxied() {
        let req = request(Method::GET, &[("upgrade", "websocket")]);
        assert_eq!(classify(&req), Route::Proxy);
    }

    #[test]
    fn test_non_websocket_upgrade_is_proxied() {
        let req = request(Method::GET, &[("connection", "upgrade"), ("upgrade", "h2c")]);
        assert_eq!(classify(&req), Route::Proxy);
    }
}
