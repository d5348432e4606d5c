use crate::endpoint::Verb;
use crate::error::ApiError;
use crate::route_table::Dispatch;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;

/// Fallback handler - answer any non-admin request from the route table.
///
/// The request path is percent-decoded before matching, so `/café` answers
/// `GET /caf%C3%A9`. A pattern stored in encoded form still matches the raw
/// path. The stored body is returned verbatim as JSON-compatible text.
/// Requests with no matching definition get a 404.
pub async fn dispatch_handler(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let table = state.reload.table();
    let verb = Verb::from_method(&method);
    let raw = uri.path();
    let path = percent_decode_str(raw).decode_utf8_lossy();

    let outcome = match table.dispatch(verb, &path) {
        Dispatch::NoMatch if path != raw => table.dispatch(verb, raw),
        matched => matched,
    };

    match outcome {
        Dispatch::Matched(spec) => {
            let status = match StatusCode::from_u16(spec.status) {
                Ok(status) => status,
                Err(_) => {
                    tracing::error!("Stored status {} for {} {} is not a valid HTTP status", spec.status, method, path);
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            tracing::debug!("Dispatched {} {} -> {}", method, path, status);
            (status, [(header::CONTENT_TYPE, "application/json")], spec.body).into_response()
        }
        Dispatch::NoMatch => {
            tracing::debug!("No mock endpoint for {} {}", method, path);
            ApiError::NoRoute {
                method: method.to_string(),
                path: path.to_string(),
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ReloadStrategy;
    use crate::endpoint::EndpointInput;
    use crate::handlers::test_support::{send, send_json, temp_sentinel, test_app, test_app_with};
    use crate::memory::MemoryStore;
    use axum::http::StatusCode;
    use serde_json::json;

    fn input(verb: &str, pattern: &str, response: &str, status: Option<u16>) -> EndpointInput {
        EndpointInput {
            verb: Some(verb.to_string()),
            pattern: Some(pattern.to_string()),
            response: Some(response.to_string()),
            status: status.map(|s| json!(s)),
            ..Default::default()
        }
    }

    /// Router booted over a store that already holds the given definitions
    async fn booted_with(definitions: &[EndpointInput]) -> crate::handlers::test_support::TestApp {
        let memory = MemoryStore::default();
        for definition in definitions {
            memory.create(definition).unwrap();
        }
        test_app_with(memory, ReloadStrategy::Restart, false, temp_sentinel()).await
    }

    #[tokio::test]
    async fn test_ping_returns_stored_response() {
        let app = booted_with(&[input("GET", "/ping", "pong", Some(200))]).await;

        let (status, body, content_type) = send(&app, "GET", "/ping", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "pong");
        assert_eq!(content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_stored_status_and_body_verbatim() {
        let body = r#"{ "id": 7,   "name": "w" }"#;
        let app = booted_with(&[input("POST", "/widgets", body, Some(201))]).await;

        let (status, text, _) = send(&app, "POST", "/widgets", Some(json!({"ignored": true}))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(text, body);
    }

    #[tokio::test]
    async fn test_verb_mismatch_is_404() {
        let app = booted_with(&[input("POST", "/widgets", "{}", Some(201))]).await;

        let (status, body) = send_json(&app, "GET", "/widgets", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No mock endpoint for GET /widgets");
    }

    #[tokio::test]
    async fn test_unsupported_method_is_404() {
        let app = booted_with(&[input("GET", "/ping", "pong", None)]).await;

        let (status, _, _) = send(&app, "OPTIONS", "/ping", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_query_string_is_ignored_for_matching() {
        let app = booted_with(&[input("GET", "/search", "[]", None)]).await;

        let (status, body, _) = send(&app, "GET", "/search?q=rust&page=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_non_ascii_pattern_matches_encoded_request() {
        let app = test_app(ReloadStrategy::Swap).await;

        let (status, _) = send_json(
            &app,
            "POST",
            "/admin/endpoints",
            Some(json!({"verb": "GET", "pattern": "/café", "response": "\"crème\""})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body, _) = send(&app, "GET", "/caf%C3%A9", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "\"crème\"");
    }

    #[tokio::test]
    async fn test_encoded_pattern_matches_raw_request() {
        let app = booted_with(&[input("GET", "/files/a%20b", "{}", None)]).await;

        let (status, body, _) = send(&app, "GET", "/files/a%20b", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "{}");
    }

    #[tokio::test]
    async fn test_pattern_with_query_is_rejected() {
        let app = test_app(ReloadStrategy::Swap).await;

        let (status, body) = send_json(
            &app,
            "POST",
            "/admin/endpoints",
            Some(json!({"verb": "GET", "pattern": "/a?x=1", "response": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["details"][0]["field"], "pattern");
        assert!(app.state.store.list().await.unwrap().is_empty());

        let (status, _, _) = send(&app, "GET", "/a?x=1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_restart_strategy_serves_boot_snapshot() {
        let app = test_app(ReloadStrategy::Restart).await;

        let (status, created) = send_json(
            &app,
            "POST",
            "/admin/endpoints",
            Some(json!({"verb": "GET", "pattern": "/ping", "response": "pong"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["reload"], "restart_requested");

        // Not live until the host relaunches the process
        let (status, _, _) = send(&app, "GET", "/ping", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_swap_strategy_serves_new_definition_immediately() {
        let app = test_app(ReloadStrategy::Swap).await;

        send_json(
            &app,
            "POST",
            "/admin/endpoints",
            Some(json!({"verb": "GET", "pattern": "/ping", "response": "pong"})),
        )
        .await;

        let (status, body, _) = send(&app, "GET", "/ping", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "pong");
    }

    #[tokio::test]
    async fn test_duplicate_create_keeps_first_response() {
        let app = test_app(ReloadStrategy::Swap).await;

        let (first, _) = send_json(
            &app,
            "POST",
            "/admin/endpoints",
            Some(json!({"verb": "GET", "pattern": "/a", "response": "x", "status": 200})),
        )
        .await;
        let (second, _) = send_json(
            &app,
            "POST",
            "/admin/endpoints",
            Some(json!({"verb": "GET", "pattern": "/a", "response": "y", "status": 200})),
        )
        .await;
        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body, _) = send(&app, "GET", "/a", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "x");
    }

    #[tokio::test]
    async fn test_malformed_pattern_leaves_routes_unchanged() {
        let app = test_app(ReloadStrategy::Swap).await;

        let (status, _) = send_json(
            &app,
            "POST",
            "/admin/endpoints",
            Some(json!({"verb": "GET", "pattern": "nope", "response": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(app.state.store.list().await.unwrap().is_empty());
        assert!(app.state.reload.table().is_empty());
    }

    #[tokio::test]
    async fn test_admin_routes_take_precedence() {
        let app = booted_with(&[input("GET", "/admin/endpoints", "shadowed", None)]).await;

        let (status, body) = send_json(&app, "GET", "/admin/endpoints", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 1);
    }
}
