//! API server lifecycle: starts/stops the axum HTTP server.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::router::api_router;
use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

/// Session metadata for a running API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiServerSession {
    pub session_id: String,
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

/// Handle to a running API server.
pub struct ApiServer {
    pub session: ApiServerSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Base URL for clients on this machine, e.g. `http://127.0.0.1:8787`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.session.server_addr)
    }

    /// Signal a graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Shut down and wait for in-flight requests to finish.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("API server task failed: {e}");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Start the API server on `addr`. Port 0 picks an ephemeral port.
pub async fn start_api_server_on(
    core: Arc<CoreState>,
    addr: SocketAddr,
) -> Result<ApiServer, String> {
    // 1. Bind
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server on {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    // 2. Build the router
    let app = api_router(core);

    // 3. Create session metadata
    let session = ApiServerSession {
        session_id: Uuid::new_v4().to_string(),
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    // 4. Set up shutdown signal
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    // 5. Spawn server in background task
    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        session,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use super::*;
    use crate::ai_trigger::NoopTrigger;
    use crate::db::repository::fixtures::*;
    use crate::models::enums::RecommendationStatus;
    use crate::polling::{HttpStatusSource, PollerConfig, StatusSource};

    fn test_core() -> (Arc<CoreState>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let core = CoreState::with_trigger(
            tmp.path().join("goals.db"),
            Arc::new(NoopTrigger),
            PollerConfig::default(),
        )
        .unwrap();
        (Arc::new(core), tmp)
    }

    fn localhost() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let (core, _tmp) = test_core();
        let server = start_api_server_on(core, localhost())
            .await
            .expect("server should start");

        assert!(!server.session.session_id.is_empty());
        assert!(server.session.port > 0);

        let resp = reqwest::get(format!("{}/api/health", server.base_url()))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        drop(resp);

        server.stop().await;
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (core, _tmp) = test_core();
        let mut server = start_api_server_on(core, localhost()).await.unwrap();

        let resp = reqwest::get(format!("{}/nonexistent", server.base_url()))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        server.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (core, _tmp) = test_core();
        let mut server = start_api_server_on(core, localhost()).await.unwrap();

        server.shutdown();
        server.shutdown(); // Second call should be safe
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let (core, _tmp) = test_core();
        let first = start_api_server_on(core.clone(), localhost()).await.unwrap();
        let taken: SocketAddr = first.session.server_addr.parse().unwrap();

        let result = start_api_server_on(core, taken).await;
        assert!(result.is_err());

        first.stop().await;
    }

    #[tokio::test]
    async fn http_status_source_reads_polling_query() {
        let (core, _tmp) = test_core();
        let conn = core.open_db().unwrap();
        let patient_id = make_patient(&conn);
        let assessment_id = make_assessment(&conn, patient_id);
        drop(conn);

        let server = start_api_server_on(core.clone(), localhost()).await.unwrap();
        let source = HttpStatusSource::new(&server.base_url(), Duration::from_secs(5)).unwrap();

        // Nothing written yet → 404 → no snapshot.
        assert_eq!(source.fetch_status(&assessment_id).await.unwrap(), None);

        let conn = core.open_db().unwrap();
        let rec_id = make_recommendation(&conn, assessment_id, RecommendationStatus::Completed);
        drop(conn);

        let snapshot = source.fetch_status(&assessment_id).await.unwrap().unwrap();
        assert_eq!(snapshot.id, rec_id);
        assert_eq!(snapshot.status, RecommendationStatus::Completed);

        drop(source);
        server.stop().await;
    }
}
