//! HTTP service exposing the analyzer and the narrative generator.

mod error;
mod handlers;

use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::analysis::PathSignals;
use crate::config::{Config, ConfigError};
use crate::github::{GitHubClient, RepositorySource};
use crate::narrative::{AnthropicClient, TextGenerator};

/// Immutable per-process state shared by all requests.
pub struct AppState {
    /// None when no GitHub token is configured; /analyze then answers with
    /// a configuration error.
    pub source: Option<Arc<dyn RepositorySource>>,
    pub generator: Arc<dyn TextGenerator>,
    pub signals: PathSignals,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let source = match GitHubClient::from_config(config) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn RepositorySource>),
            Err(err) => {
                warn!(error = %err, "/analyze will fail until a GitHub token is configured");
                None
            }
        };

        Ok(Self {
            source,
            generator: Arc::new(AnthropicClient::from_config(config)),
            signals: PathSignals::new(&config.patterns)?,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/analyze", post(handlers::analyze))
        .route("/ai", post(handlers::narrative))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "tech-health listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::{path_signals, widget_source, MockSource};
    use crate::narrative::tests::MockGenerator;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn state(source: Option<MockSource>, generator: MockGenerator) -> Arc<AppState> {
        Arc::new(AppState {
            source: source.map(|s| Arc::new(s) as Arc<dyn RepositorySource>),
            generator: Arc::new(generator),
            signals: path_signals(),
        })
    }

    async fn post_json(state: Arc<AppState>, uri: &str, body: String) -> (StatusCode, Value) {
        post(state, uri, Some("application/json"), body).await
    }

    async fn post(
        state: Arc<AppState>,
        uri: &str,
        content_type: Option<&str>,
        body: String,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            request = request.header("content-type", content_type);
        }
        let request = request.body(Body::from(body)).unwrap();
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router(state(None, MockGenerator::default()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let state = state(Some(widget_source()), MockGenerator::default());
        let body = json!({"repoUrl": "https://github.com/acme/widget"}).to_string();
        let (status, value) = post_json(state, "/analyze", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["repo"]["name"], "widget");
        assert_eq!(value["repo"]["stars"], 1200);
        assert_eq!(value["analysis"]["technical"]["hasCI"], true);
        assert_eq!(value["analysis"]["technical"]["hasTests"], false);
        assert_eq!(value["analysis"]["effectiveness"]["issueResolutionRateRecent"], 1.0);
        assert_eq!(value["scores"]["technicalHealth"]["breakdown"]["issueScore"], 2.0);
        assert_eq!(value["scores"]["technicalHealth"]["value"], 7.0);
    }

    #[tokio::test]
    async fn test_analyze_invalid_url() {
        for url in ["https://gitlab.com/acme/widget", "acme/widget", ""] {
            let state = state(Some(widget_source()), MockGenerator::default());
            let body = json!({ "repoUrl": url }).to_string();
            let (status, value) = post_json(state, "/analyze", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", url);
            assert_eq!(value, json!({"error": "Invalid GitHub repo URL."}));
        }
    }

    #[tokio::test]
    async fn test_analyze_checks_url_before_token() {
        let state = state(None, MockGenerator::default());
        let body = json!({"repoUrl": "not a url"}).to_string();
        let (status, _) = post_json(state, "/analyze", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_without_token() {
        let state = state(None, MockGenerator::default());
        let body = json!({"repoUrl": "https://github.com/acme/widget"}).to_string();
        let (status, value) = post_json(state, "/analyze", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value, json!({"error": "GitHub token not configured."}));
    }

    #[tokio::test]
    async fn test_analyze_upstream_failure() {
        let state = state(Some(MockSource::default()), MockGenerator::default());
        let body = json!({"repoUrl": "https://github.com/acme/missing"}).to_string();
        let (status, value) = post_json(state, "/analyze", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value, json!({"error": "Internal Server Error"}));
    }

    #[tokio::test]
    async fn test_analyze_malformed_body() {
        let state = state(Some(widget_source()), MockGenerator::default());
        let (status, value) = post_json(state, "/analyze", "{\"url\": 1}".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value, json!({"error": "Invalid request body."}));
    }

    #[tokio::test]
    async fn test_narrative_success() {
        let state = state(None, MockGenerator::replying("A well-run project."));
        let body = json!({"data": {"repo": {"name": "widget"}}}).to_string();
        let (status, value) = post_json(state, "/ai", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({"message": "A well-run project."}));
    }

    #[tokio::test]
    async fn test_narrative_provider_failure() {
        let state = state(None, MockGenerator::default());
        let body = json!({"data": {}}).to_string();
        let (status, value) = post_json(state, "/ai", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value, json!({"error": "Internal Server Error"}));
    }

    #[tokio::test]
    async fn test_narrative_without_data_still_generates() {
        let generator = Arc::new(MockGenerator::replying("Nothing to report."));
        let state = Arc::new(AppState {
            source: None,
            generator: generator.clone(),
            signals: path_signals(),
        });
        let (status, value) = post_json(state, "/ai", "{}".to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({"message": "Nothing to report."}));

        let (_, prompt) = generator.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt, "Analyze this data: null");
    }

    #[tokio::test]
    async fn test_narrative_unreadable_body_is_internal_error() {
        let cases = [
            (Some("application/json"), "not json"),
            (Some("text/plain"), r#"{"data": {}}"#),
            (None, r#"{"data": {}}"#),
        ];
        for (content_type, body) in cases {
            let state = state(None, MockGenerator::replying("unused"));
            let (status, value) = post(state, "/ai", content_type, body.to_string()).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{:?} {}", content_type, body);
            assert_eq!(value, json!({"error": "Internal Server Error"}));
        }
    }

    #[tokio::test]
    async fn test_analyze_output_feeds_narrative() {
        let state = state(Some(widget_source()), MockGenerator::replying("Appendix."));
        let body = json!({"repoUrl": "https://github.com/acme/widget"}).to_string();
        let (_, report) = post_json(state.clone(), "/analyze", body).await;

        let body = json!({ "data": report }).to_string();
        let (status, value) = post_json(state, "/ai", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["message"], "Appendix.");
    }

    #[test]
    fn test_state_from_default_config() {
        let mut config = Config::default();
        config.github.token = Some("ghp_test".to_string());
        let state = AppState::from_config(&config).unwrap();
        assert!(state.source.is_some());
    }

    #[test]
    fn test_state_rejects_bad_patterns() {
        let mut config = Config::default();
        config.patterns.todos = vec!["[".to_string()];
        assert!(matches!(
            AppState::from_config(&config),
            Err(ConfigError::Pattern { flag: "todos", .. })
        ));
    }
}
