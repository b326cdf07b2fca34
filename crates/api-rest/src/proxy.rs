//! Forwarding endpoint.
//!
//! Browser code cannot hold the bearer token, so it calls `/api/proxy/<path>` on this server
//! instead of the backend. Each request is relayed as-is to `{SERVER_URL}/<path>` with the
//! caller's session token attached, and the backend's response is returned unchanged.
//!
//! The relay is schema-agnostic: it never looks inside response bodies.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING},
        HeaderMap, Method,
    },
    response::{IntoResponse, Response},
};
use url::Url;

use api_shared::auth::authorization_header;
use reader_core::PROXY_MOUNT;

use crate::error::ProxyError;
use crate::AppState;

/// Handler for every method mounted under [`PROXY_MOUNT`].
pub async fn forward(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    match relay(&state, method, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Relay one request upstream and build the response for the caller.
///
/// # Errors
///
/// Returns [`ProxyError`] if the session cannot be resolved, the body cannot be read or is
/// declared JSON but does not parse, or the upstream call fails.
pub async fn relay(
    state: &AppState,
    method: Method,
    request: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let token = state.sessions.resolve(&parts.headers).await?;

    let path = parts.uri.path();
    let rest = path.strip_prefix(PROXY_MOUNT).unwrap_or(path);
    let url = upstream_url(state.cfg.server_url(), rest, parts.uri.query())?;

    let mut headers = forwarded_headers(&parts.headers);
    if let Some(token) = &token {
        headers.insert(AUTHORIZATION, authorization_header(token)?);
    }

    tracing::debug!(%method, %url, authenticated = token.is_some(), "forwarding request");

    let mut upstream = state
        .http
        .request(method.clone(), url)
        .headers(headers);
    if carries_body(&method) {
        let bytes = axum::body::to_bytes(body, state.cfg.max_body_bytes()).await?;
        upstream = upstream.body(forwarded_body(&parts.headers, bytes)?);
    }

    relay_response(upstream.send().await?).await
}

/// Join the backend origin with the path below the mount point, keeping the raw query string.
///
/// Neither the path nor the query is decoded or re-ordered. `.` and `..` segments, in any
/// percent-encoded spelling, are refused so the result always stays under the origin's path.
///
/// # Errors
///
/// Returns [`ProxyError::DotSegment`] for a dot segment and [`ProxyError::Url`] if the
/// combined URL is invalid.
pub fn upstream_url(origin: &Url, rest: &str, query: Option<&str>) -> Result<Url, ProxyError> {
    if rest.split('/').any(is_dot_segment) {
        return Err(ProxyError::DotSegment(rest.to_owned()));
    }

    let mut target = format!(
        "{}/{}",
        origin.as_str().trim_end_matches('/'),
        rest.trim_start_matches('/')
    );
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }
    Ok(Url::parse(&target)?)
}

fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Incoming headers minus `Host`, the framing headers the client recomputes, and any
/// caller-supplied `Authorization`.
fn forwarded_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut headers = incoming.clone();
    for name in [HOST, CONTENT_LENGTH, TRANSFER_ENCODING, AUTHORIZATION] {
        headers.remove(name);
    }
    headers
}

/// JSON bodies are parsed and re-serialized so malformed input never reaches the backend;
/// anything else is forwarded byte-for-byte.
fn forwarded_body(headers: &HeaderMap, bytes: Bytes) -> Result<Bytes, ProxyError> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    if !is_json {
        return Ok(bytes);
    }

    let value: serde_json::Value = serde_json::from_slice(&bytes)?;
    Ok(Bytes::from(serde_json::to_vec(&value)?))
}

/// Copy an upstream response verbatim: status, headers (minus hop-by-hop framing) and body.
///
/// # Errors
///
/// Returns [`ProxyError::Upstream`] if the upstream body cannot be read.
pub async fn relay_response(upstream: reqwest::Response) -> Result<Response, ProxyError> {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    for name in [TRANSFER_ENCODING, CONNECTION] {
        headers.remove(name);
    }
    let body = upstream.bytes().await?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{failing_state, spawn_backend, test_state, test_state_with_limit};
    use axum::http::{header, HeaderValue, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const FLAVOURS: &str = r#"{"flavours":[{"id":1,"nickname":"Rust"}]}"#;

    async fn body_bytes(response: Response) -> Bytes {
        response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes()
    }

    #[test]
    fn test_upstream_url_joins_path_and_query() {
        let origin = Url::parse("http://127.0.0.1:8000").unwrap();
        let url = upstream_url(&origin, "/feed", Some("b=2&a=1&b=3")).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/feed?b=2&a=1&b=3");
    }

    #[test]
    fn test_upstream_url_keeps_origin_path_prefix() {
        let origin = Url::parse("https://api.example.com/v1/").unwrap();
        let url = upstream_url(&origin, "/flavours/3", None).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/flavours/3");
    }

    #[test]
    fn test_upstream_url_refuses_dot_segments() {
        let origin = Url::parse("https://api.example.com/v1/").unwrap();
        for rest in ["/../admin", "/flavours/./3", "/%2e%2E/admin", "/.%2e/admin", "/a/%2E"] {
            assert!(
                matches!(upstream_url(&origin, rest, None), Err(ProxyError::DotSegment(_))),
                "{rest} should be refused"
            );
        }
        let url = upstream_url(&origin, "/notes/..hidden/v1.2", None).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/notes/..hidden/v1.2");
    }

    #[test]
    fn test_forwarded_headers_drop_host_framing_and_auth() {
        let mut incoming = HeaderMap::new();
        incoming.insert(HOST, HeaderValue::from_static("frontend.example"));
        incoming.insert(CONTENT_LENGTH, HeaderValue::from_static("12"));
        incoming.insert(AUTHORIZATION, HeaderValue::from_static("Bearer forged"));
        incoming.insert("x-request-id", HeaderValue::from_static("abc"));

        let headers = forwarded_headers(&incoming);

        assert!(headers.get(HOST).is_none());
        assert!(headers.get(CONTENT_LENGTH).is_none());
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers["x-request-id"], "abc");
    }

    #[test]
    fn test_forwarded_body_reserializes_json() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        let body = forwarded_body(&headers, Bytes::from_static(b"{ \"b\": 1,\n \"a\": 2 }"))
            .expect("forwarded_body should succeed");
        assert_eq!(&body[..], br#"{"b":1,"a":2}"#);
    }

    #[test]
    fn test_forwarded_body_passes_other_types_through() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let body = forwarded_body(&headers, Bytes::from_static(b"  not { json"))
            .expect("forwarded_body should succeed");
        assert_eq!(&body[..], b"  not { json");
    }

    #[tokio::test]
    async fn test_get_with_session_is_relayed_unchanged() {
        let (backend, seen) = spawn_backend(StatusCode::OK, FLAVOURS).await;
        let app = crate::router(test_state(&backend));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/proxy/flavours")
                    .header(header::COOKIE, "__session=tok-abc")
                    .header(header::HOST, "frontend.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-upstream"], "relay-me");
        assert_eq!(&body_bytes(response).await[..], FLAVOURS.as_bytes());

        let req = seen.only();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.uri, "/flavours");
        assert_eq!(req.headers[AUTHORIZATION], "Bearer tok-abc");
        assert_eq!(
            req.headers[HOST].to_str().unwrap(),
            backend.host_str().map(|h| format!("{h}:{}", backend.port().unwrap())).unwrap()
        );
    }

    #[tokio::test]
    async fn test_anonymous_request_carries_no_authorization() {
        let (backend, seen) = spawn_backend(StatusCode::OK, FLAVOURS).await;
        let app = crate::router(test_state(&backend));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/proxy/flavours")
                    .header(AUTHORIZATION, "Bearer forged-by-browser")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(seen.only().headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_non_ascii_neighbour_cookie_keeps_session() {
        let (backend, seen) = spawn_backend(StatusCode::OK, FLAVOURS).await;
        let app = crate::router(test_state(&backend));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/proxy/flavours")
                    .header(
                        header::COOKIE,
                        HeaderValue::from_bytes("theme=café; __session=tok".as_bytes()).unwrap(),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(seen.only().headers[AUTHORIZATION], "Bearer tok");
    }

    #[tokio::test]
    async fn test_dot_segment_path_is_not_forwarded() {
        let (backend, seen) = spawn_backend(StatusCode::OK, "{}").await;
        let app = crate::router(test_state(&backend));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/proxy/%2e%2e/admin")
                    .header(header::COOKIE, "__session=tok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            &body_bytes(response).await[..],
            br#"{"error":"Internal Server Error"}"#
        );
        assert!(seen.all().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_body_is_not_forwarded() {
        let (backend, seen) = spawn_backend(StatusCode::OK, "{}").await;
        let app = crate::router(test_state_with_limit(&backend, 16));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/proxy/notes")
                    .header(CONTENT_TYPE, "text/plain")
                    .body(Body::from(vec![b'a'; 64]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            &body_bytes(response).await[..],
            br#"{"error":"Internal Server Error"}"#
        );
        assert!(seen.all().is_empty());
    }

    #[tokio::test]
    async fn test_body_at_limit_is_forwarded() {
        let (backend, seen) = spawn_backend(StatusCode::OK, "{}").await;
        let app = crate::router(test_state_with_limit(&backend, 16));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/proxy/notes")
                    .header(CONTENT_TYPE, "text/plain")
                    .body(Body::from(vec![b'a'; 16]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(seen.only().body.len(), 16);
    }

    #[tokio::test]
    async fn test_query_parameters_keep_their_order() {
        let (backend, seen) = spawn_backend(StatusCode::OK, "{}").await;
        let app = crate::router(test_state(&backend));

        app.oneshot(
            Request::builder()
                .uri("/api/proxy/feed?z=1&a=2&z=3&recommendation_ids=4%2C5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(
            seen.only().uri,
            "/feed?z=1&a=2&z=3&recommendation_ids=4%2C5"
        );
    }

    #[tokio::test]
    async fn test_json_post_is_reserialized() {
        let (backend, seen) = spawn_backend(StatusCode::OK, r#"{"status":"ok"}"#).await;
        let app = crate::router(test_state(&backend));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/proxy/feedback")
                    .header(header::COOKIE, "__session=tok")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from("{ \"content_id\": 42, \"rating\": 1 }"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let req = seen.only();
        assert_eq!(req.method, Method::POST);
        assert_eq!(&req.body[..], br#"{"content_id":42,"rating":1}"#);
        assert_eq!(req.headers[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_non_json_body_is_forwarded_raw() {
        let (backend, seen) = spawn_backend(StatusCode::OK, "{}").await;
        let app = crate::router(test_state(&backend));

        app.oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri("/api/proxy/notes/1")
                .header(CONTENT_TYPE, "text/plain")
                .body(Body::from("raw  text"))
                .unwrap(),
        )
        .await
        .unwrap();

        let req = seen.only();
        assert_eq!(req.method, Method::PUT);
        assert_eq!(&req.body[..], b"raw  text");
    }

    #[tokio::test]
    async fn test_delete_and_patch_are_relayed() {
        let (backend, seen) = spawn_backend(StatusCode::NO_CONTENT, "").await;
        let app = crate::router(test_state(&backend));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/api/proxy/flavours/7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        app.oneshot(
            Request::builder()
                .method(Method::PATCH)
                .uri("/api/proxy/flavours/7")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"nickname":"Systems"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

        let seen = seen.all();
        assert_eq!(seen[0].method, Method::DELETE);
        assert_eq!(seen[1].method, Method::PATCH);
        assert_eq!(&seen[1].body[..], br#"{"nickname":"Systems"}"#);
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_relayed() {
        let (backend, _) = spawn_backend(StatusCode::CONFLICT, r#"{"detail":"onboard first"}"#).await;
        let app = crate::router(test_state(&backend));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/proxy/feed")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            &body_bytes(response).await[..],
            br#"{"detail":"onboard first"}"#
        );
    }

    #[tokio::test]
    async fn test_auth_failure_returns_fixed_error() {
        let (backend, seen) = spawn_backend(StatusCode::OK, FLAVOURS).await;
        let app = crate::router(failing_state(&backend));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/proxy/flavours")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            &body_bytes(response).await[..],
            br#"{"error":"Internal Server Error"}"#
        );
        assert!(seen.all().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_returns_fixed_error() {
        let (backend, seen) = spawn_backend(StatusCode::OK, "{}").await;
        let app = crate::router(test_state(&backend));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/proxy/feedback")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"content_id\": 42,"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(seen.all().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_returns_fixed_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let backend = Url::parse(&format!("http://{addr}")).unwrap();
        let app = crate::router(test_state(&backend));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/proxy/flavours")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            &body_bytes(response).await[..],
            br#"{"error":"Internal Server Error"}"#
        );
    }

    #[tokio::test]
    async fn test_unsupported_method_is_rejected() {
        let (backend, seen) = spawn_backend(StatusCode::OK, "{}").await;
        let app = crate::router(test_state(&backend));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::TRACE)
                    .uri("/api/proxy/flavours")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(seen.all().is_empty());
    }
}
