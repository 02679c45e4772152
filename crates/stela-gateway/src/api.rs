//! Gateway implementation
//!
//! One write path (candidate submission through the admission pipeline) and
//! the read paths of the ledger, exposed as an HTTP/JSON router. Field names
//! on the wire are the ledger's canonical camelCase set; pagination is
//! 1-based `page`/`perPage` with a documented upper bound enforced here at
//! the boundary; the store itself trusts its caller.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use stela_core::{
    AdmissionPipeline, Commit, CommitCandidate, CommitStore, RetentionSweeper, Timestamp,
};

use crate::config::GatewayConfig;
use crate::{GatewayError, Result};

/// Gateway state shared across handlers
#[derive(Clone)]
pub struct GatewayState {
    /// Active configuration
    pub config: GatewayConfig,
    /// The commit store backing every read and write
    pub store: Arc<CommitStore>,
    /// Admission gates for submitted candidates
    pub admission: AdmissionPipeline,
    /// Broadcast used to stop background tasks
    pub shutdown_tx: broadcast::Sender<()>,
}

impl GatewayState {
    /// Open the store and assemble the shared state.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let (shutdown_tx, _) = broadcast::channel(1);
        let store = Arc::new(CommitStore::open(&config.database_path)?);
        let admission = AdmissionPipeline::new(config.ledger.difficulty);

        Ok(Self {
            config,
            store,
            admission,
            shutdown_tx,
        })
    }

    fn check_page(&self, query: &PageQuery) -> Result<()> {
        if query.page < 1 || query.per_page < 1 {
            return Err(GatewayError::InvalidQuery(
                "page and perPage must be positive".to_string(),
            ));
        }
        if query.per_page > self.config.max_per_page {
            return Err(GatewayError::InvalidQuery(format!(
                "perPage must not exceed {}",
                self.config.max_per_page
            )));
        }
        Ok(())
    }
}

/// 1-based pagination parameters
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// Page number, starting at 1
    pub page: u32,
    /// Records per page
    pub per_page: u32,
}

/// Ledger statistics served at `/info`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Proof-of-work difficulty currently enforced
    pub difficulty: u32,
    /// Server wall-clock time
    pub current_time: Timestamp,
    /// Total stored commits
    pub total_entries: u64,
    /// Total distinct submitting identities
    pub total_users: u64,
    /// Admission time of the oldest stored commit; null when empty
    pub oldest_entry_date: Option<Timestamp>,
}

/// Main gateway
pub struct Gateway {
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Create a new gateway with configuration
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let state = Arc::new(GatewayState::new(config)?);
        Ok(Self { state })
    }

    /// Get gateway state
    pub fn state(&self) -> Arc<GatewayState> {
        self.state.clone()
    }

    /// Build the Axum router
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .route("/info", get(Self::handle_info))
            .route(
                "/commits",
                post(Self::handle_create_commit).get(Self::handle_list_commits),
            )
            .route("/commits/random", get(Self::handle_random_commit))
            .route("/commits/:signature", get(Self::handle_get_commit))
            .route("/commits/:signature/replies", get(Self::handle_list_replies))
            .route("/identities", get(Self::handle_list_identities))
            .route(
                "/identities/:identity/commits",
                get(Self::handle_list_by_identity),
            )
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the gateway server and the retention sweeper.
    pub async fn start(&self) -> Result<()> {
        let addr = self.state.config.socket_addr();
        let router = self.build_router();

        RetentionSweeper::new(
            self.state.store.clone(),
            self.state.config.ledger.retention.clone(),
            self.state.shutdown_tx.subscribe(),
        )
        .spawn();

        tracing::info!(
            difficulty = self.state.admission.difficulty(),
            "stela gateway starting on {}",
            addr
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(GatewayError::Io)?;

        axum::serve(listener, router)
            .await
            .map_err(GatewayError::Io)?;

        Ok(())
    }

    /// Stop background tasks
    pub fn shutdown(&self) {
        let _ = self.state.shutdown_tx.send(());
        tracing::info!("gateway shutdown initiated");
    }

    // HTTP handlers

    async fn handle_health() -> impl IntoResponse {
        Json(serde_json::json!({
            "status": "healthy",
            "version": crate::VERSION
        }))
    }

    async fn handle_info(State(state): State<Arc<GatewayState>>) -> Result<Json<ServerInfo>> {
        let stats = state.store.stats()?;
        Ok(Json(ServerInfo {
            difficulty: state.admission.difficulty(),
            current_time: chrono::Utc::now(),
            total_entries: stats.total_entries,
            total_users: stats.total_identities,
            oldest_entry_date: stats.oldest_created_at,
        }))
    }

    async fn handle_create_commit(
        State(state): State<Arc<GatewayState>>,
        Json(candidate): Json<CommitCandidate>,
    ) -> Result<(StatusCode, Json<Commit>)> {
        let commit = state.admission.admit(candidate).map_err(|e| {
            tracing::debug!("admission rejected: {e}");
            e
        })?;
        state.store.insert(&commit)?;

        tracing::info!(signature = %commit.signature, kind = %commit.kind, "commit admitted");
        Ok((StatusCode::CREATED, Json(commit)))
    }

    async fn handle_list_commits(
        State(state): State<Arc<GatewayState>>,
        Query(query): Query<PageQuery>,
    ) -> Result<Json<Vec<Commit>>> {
        state.check_page(&query)?;
        let commits = state.store.list_recent(query.page, query.per_page)?;
        Ok(Json(commits))
    }

    async fn handle_get_commit(
        State(state): State<Arc<GatewayState>>,
        Path(signature): Path<String>,
    ) -> Result<Json<Commit>> {
        let commit = state
            .store
            .get_by_signature(&signature)?
            .ok_or(GatewayError::NotFound)?;
        Ok(Json(commit))
    }

    async fn handle_random_commit(
        State(state): State<Arc<GatewayState>>,
    ) -> Result<Json<Commit>> {
        let commit = state.store.random()?.ok_or(GatewayError::NotFound)?;
        Ok(Json(commit))
    }

    async fn handle_list_replies(
        State(state): State<Arc<GatewayState>>,
        Path(signature): Path<String>,
    ) -> Result<Json<Vec<Commit>>> {
        let commits = state.store.list_by_parent(&signature)?;
        Ok(Json(commits))
    }

    async fn handle_list_identities(
        State(state): State<Arc<GatewayState>>,
    ) -> Result<Json<Vec<String>>> {
        let identities = state.store.distinct_identities()?;
        Ok(Json(identities))
    }

    async fn handle_list_by_identity(
        State(state): State<Arc<GatewayState>>,
        Path(identity): Path<String>,
        Query(query): Query<PageQuery>,
    ) -> Result<Json<Vec<Commit>>> {
        state.check_page(&query)?;
        let commits = state.store.list_by_identity(
            &identity,
            query.page,
            query.per_page,
            state.config.ledger.identity_scheme,
        )?;
        Ok(Json(commits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stela_core::ClientIdentity;

    fn test_state(difficulty: u32) -> Arc<GatewayState> {
        let config = GatewayConfig::default()
            .with_database_path(":memory:")
            .with_ledger(stela_core::LedgerConfig::default().with_difficulty(difficulty));
        Arc::new(GatewayState::new(config).expect("in-memory state"))
    }

    #[test]
    fn test_gateway_creation() {
        let config = GatewayConfig::default().with_database_path(":memory:");
        let gateway = Gateway::new(config).unwrap();
        assert!(gateway.state().config.port > 0);
        let _router = gateway.build_router();
    }

    #[test]
    fn page_bounds_are_enforced() {
        let state = test_state(1);
        assert!(state.check_page(&PageQuery { page: 1, per_page: 10 }).is_ok());
        assert!(state.check_page(&PageQuery { page: 0, per_page: 10 }).is_err());
        assert!(state.check_page(&PageQuery { page: 1, per_page: 0 }).is_err());
        assert!(state
            .check_page(&PageQuery { page: 1, per_page: state.config.max_per_page + 1 })
            .is_err());
    }

    #[tokio::test]
    async fn submit_then_read_back() {
        let state = test_state(1);
        let author = ClientIdentity::generate();
        let candidate = author
            .create_commit(Some(json!({"message": "hi"})), "post", None, 1)
            .unwrap();
        let signature = candidate.signature.clone();

        let (status, Json(commit)) =
            Gateway::handle_create_commit(State(state.clone()), Json(candidate.clone()))
                .await
                .expect("submission should be admitted");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(commit.signature, signature);

        let Json(fetched) = Gateway::handle_get_commit(State(state.clone()), Path(signature))
            .await
            .unwrap();
        assert_eq!(fetched.public_key, author.public_key_hex);

        // resubmission of the same record is a duplicate
        let err = Gateway::handle_create_commit(State(state.clone()), Json(candidate))
            .await
            .expect_err("duplicate must be rejected");
        assert!(matches!(
            err,
            GatewayError::Store(stela_core::StoreError::DuplicateKey(_))
        ));

        let Json(info) = Gateway::handle_info(State(state)).await.unwrap();
        assert_eq!(info.total_entries, 1);
        assert_eq!(info.total_users, 1);
        assert!(info.oldest_entry_date.is_some());
    }

    #[tokio::test]
    async fn underworked_candidate_reports_the_active_difficulty() {
        let state = test_state(64);
        let author = ClientIdentity::generate();
        let candidate = author
            .create_commit(Some(json!({"message": "weak"})), "post", None, 0)
            .unwrap();

        let err = Gateway::handle_create_commit(State(state), Json(candidate))
            .await
            .expect_err("difficulty 64 is unreachable");
        assert!(matches!(
            err,
            GatewayError::Admission(stela_core::AdmissionError::DifficultyNotMet { difficulty: 64 })
        ));
    }

    #[test]
    fn server_info_uses_the_wire_field_names() {
        let info = ServerInfo {
            difficulty: 3,
            current_time: chrono::Utc::now(),
            total_entries: 0,
            total_users: 0,
            oldest_entry_date: None,
        };
        let v = serde_json::to_value(&info).unwrap();
        assert!(v.get("currentTime").is_some());
        assert!(v.get("totalEntries").is_some());
        assert!(v.get("totalUsers").is_some());
        assert!(v.get("oldestEntryDate").is_some());
    }
}
