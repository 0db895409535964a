use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::config::Config;
use crate::metrics::GaugeRegistry;
use crate::webhook::{verify_signature, JobCompletionHandler, Outcome};
use crate::Error;

pub const WEBHOOK_ROUTE: &str = "/api/github/hook";
pub const METRICS_ROUTE: &str = "/metrics";

#[derive(Clone)]
pub struct AppState {
    handler: Arc<JobCompletionHandler<GaugeRegistry>>,
    webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(handler: JobCompletionHandler<GaugeRegistry>, webhook_secret: Option<String>) -> Self {
        Self {
            handler: Arc::new(handler),
            webhook_secret: webhook_secret.map(Arc::from),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let registry = GaugeRegistry::new(&config.metrics.namespace, &config.metrics.subsystem);
        Self::new(
            JobCompletionHandler::new(Arc::new(registry)),
            config.github.webhook_secret.clone(),
        )
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(WEBHOOK_ROUTE, post(webhook))
        .route(METRICS_ROUTE, get(metrics))
        .with_state(state)
}

async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(event) = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
    else {
        log::warn!("X-GitHub-Event header missing");
        return (StatusCode::BAD_REQUEST, "X-GitHub-Event header missing").into_response();
    };

    if let Some(secret) = &state.webhook_secret {
        let signature = headers
            .get("X-Hub-Signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if let Err(error) = verify_signature(secret, signature, &body) {
            log::warn!("Rejected {event} delivery: {error}");
            return (StatusCode::UNAUTHORIZED, error.to_string()).into_response();
        }
    }

    if !state.handler.handles().contains(&event) {
        log::debug!("No handler for event {event}");
        return (StatusCode::ACCEPTED, "Event ignored").into_response();
    }

    match state.handler.handle(event, &body) {
        Ok(Outcome::Recorded(_)) => (StatusCode::OK, "Event processed").into_response(),
        Ok(Outcome::Ignored) => (StatusCode::OK, "Event ignored").into_response(),
        Err(error @ Error::MalformedPayload(_)) => {
            log::warn!("{error}");
            (StatusCode::BAD_REQUEST, error.to_string()).into_response()
        }
        Err(error) => {
            log::error!("Failed to handle {event} event: {error}");
            (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
        }
    }
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.handler.metrics().render(),
    )
}

pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Cannot listen on {address}"))?;
    log::info!("Starting server on {address}...");

    axum::serve(listener, router(AppState::from_config(config)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
        })
        .await
        .context("Server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use tower::ServiceExt;

    const PAYLOAD: &str = r#"{
        "action": "completed",
        "workflow_job": {
            "id": 42,
            "workflow_name": "CI",
            "name": "build",
            "conclusion": "success",
            "started_at": "2024-01-01T10:00:00Z",
            "completed_at": "2024-01-01T10:05:30Z"
        }
    }"#;

    fn state(secret: Option<&str>) -> AppState {
        AppState::from_config(&Config {
            github: crate::config::GitHubConfig {
                webhook_secret: secret.map(str::to_string),
            },
            ..Default::default()
        })
    }

    fn delivery(event: &str, body: &str, signature: Option<String>) -> Request<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri(WEBHOOK_ROUTE)
            .header("X-GitHub-Event", event);
        if let Some(signature) = signature {
            request = request.header("X-Hub-Signature-256", signature);
        }
        request.body(Body::from(body.to_string())).unwrap()
    }

    async fn scrape(app: Router) -> String {
        let response = app
            .oneshot(Request::get(METRICS_ROUTE).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn delivery_shows_up_in_metrics() {
        let app = router(state(None));
        let response = app
            .clone()
            .oneshot(delivery("workflow_job", PAYLOAD, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let text = scrape(app).await;
        assert!(text.contains(
            r#"hf_github_actions_job_duration{job_id="42",workflow_name="CI",job_name="build",conclusion="success"} 330"#
        ));
    }

    #[tokio::test]
    async fn malformed_delivery_is_bad_request() {
        let app = router(state(None));
        let response = app
            .clone()
            .oneshot(delivery("workflow_job", "{oops", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!scrape(app).await.contains("job_id="));
    }

    #[tokio::test]
    async fn missing_event_header() {
        let request = Request::post(WEBHOOK_ROUTE)
            .body(Body::from(PAYLOAD))
            .unwrap();
        let response = router(state(None)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unhandled_event_type_is_accepted() {
        let response = router(state(None))
            .oneshot(delivery("push", "{}", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn signature_is_enforced_when_configured() {
        let app = router(state(Some("s3cret")));
        let response = app
            .clone()
            .oneshot(delivery("workflow_job", PAYLOAD, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut mac = Hmac::<Sha256>::new_from_slice(b"s3cret").unwrap();
        mac.update(PAYLOAD.as_bytes());
        let signature = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));
        let response = app
            .oneshot(delivery("workflow_job", PAYLOAD, Some(signature)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
