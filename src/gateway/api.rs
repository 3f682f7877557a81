//! Health and status endpoints
//!
//! | Path      | Description                       |
//! |-----------|-----------------------------------|
//! | `/health` | Liveness check                    |
//! | `/status` | Gateway state and counters (JSON) |

use super::server::{Gateway, GatewayState};
use crate::error::{Error, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the HTTP application
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

/// Serve the health API until the task is dropped
pub async fn serve(gateway: Arc<Gateway>, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Gateway(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Health API listening on http://{}", addr);

    axum::serve(listener, router(gateway))
        .await
        .map_err(|e| Error::Gateway(format!("Health API failed: {}", e)))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// 200 while the gateway runs, 503 otherwise
async fn health_check(State(gateway): State<Arc<Gateway>>) -> impl IntoResponse {
    let running = gateway.state().await == GatewayState::Running;
    let (code, status) = if running {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

async fn status(State(gateway): State<Arc<Gateway>>) -> impl IntoResponse {
    Json(gateway.status().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, StorageBackend};
    use crate::gateway::GatewayBuilder;
    use crate::store::MemoryStore;

    async fn gateway() -> Arc<Gateway> {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;
        Arc::new(
            GatewayBuilder::new(config)
                .store(Arc::new(MemoryStore::new()))
                .build()
                .await
                .unwrap(),
        )
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_unavailable_when_stopped() {
        let resp = health_check(State(gateway().await)).await.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = body_json(resp).await;
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_status_json() {
        let resp = status(State(gateway().await)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["state"], "Stopped");
        assert_eq!(json["channel"], "telegram");
        assert_eq!(json["events_processed"], 0);
        assert_eq!(json["active_quizzes"], 0);
    }

    #[tokio::test]
    async fn test_router_builds() {
        let _app = router(gateway().await);
    }
}
