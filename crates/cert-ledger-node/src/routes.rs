//! HTTP surface over a single shared ledger.
//!
//! Issue and revoke hold the write lock for the whole lookup, seal and save,
//! and run that work on the blocking pool; every other route only reads.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cert_ledger_core::{
    chain::ChainStore,
    constants::DEFAULT_RECENT_BLOCKS,
    ledger::{BlockSummary, HistoryEntry},
    Certificate, ChainStatus, Ledger, LedgerError, Receipt, Verification,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::constants::MAX_BLOCKS_PER_REQUEST;

pub(crate) type SharedLedger = Arc<RwLock<Ledger<Box<dyn ChainStore>>>>;

#[derive(Clone)]
pub(crate) struct AppState {
    ledger: SharedLedger,
}

impl AppState {
    pub(crate) fn new(ledger: Ledger<Box<dyn ChainStore>>) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Health {
    status: String,
}

#[derive(Deserialize)]
pub(crate) struct IssueIn {
    cert_id: String,
    student_name: String,
    program: String,
    issued_on: String,
    issuer: String,
}

#[derive(Deserialize)]
pub(crate) struct RevokeIn {
    issuer: String,
    #[serde(default)]
    remarks: String,
}

#[derive(Deserialize)]
pub(crate) struct RecentQuery {
    n: Option<usize>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub(crate) enum ApiError {
    BadRequest(String),
    Ledger(LedgerError),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!(%msg, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            ApiError::Ledger(err) => {
                let status = match err {
                    LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                    LedgerError::DuplicateIssue(_) | LedgerError::AlreadyRevoked(_) => {
                        StatusCode::CONFLICT
                    }
                    LedgerError::PersistenceFailure(_)
                    | LedgerError::CorruptChainData(_)
                    | LedgerError::InvalidConfig(_) => {
                        tracing::error!(%err, "ledger failure");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.to_string())
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

fn required(field: &str, value: String) -> Result<String, ApiError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(value)
}

/// Run a mutation with the write lock held, off the async workers: sealing and
/// the store's blocking save happen inside `f`.
async fn mutate<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut Ledger<Box<dyn ChainStore>>) -> Result<T, LedgerError> + Send + 'static,
{
    let mut guard = state.ledger.clone().write_owned().await;
    tokio::task::spawn_blocking(move || f(&mut guard))
        .await
        .map_err(|e| ApiError::Internal(format!("ledger task failed: {e}")))?
        .map_err(ApiError::from)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".into(),
    })
}

async fn issue(
    State(state): State<AppState>,
    Json(body): Json<IssueIn>,
) -> Result<(StatusCode, Json<Receipt>), ApiError> {
    let cert = Certificate::issued(
        required("cert_id", body.cert_id)?,
        body.student_name.trim(),
        body.program.trim(),
        body.issued_on.trim(),
        required("issuer", body.issuer)?,
    );
    let receipt = mutate(&state, move |ledger| ledger.issue_certificate(cert)).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn revoke(
    State(state): State<AppState>,
    Path(cert_id): Path<String>,
    Json(body): Json<RevokeIn>,
) -> Result<Json<Receipt>, ApiError> {
    let cert_id = required("cert_id", cert_id)?;
    let issuer = required("issuer", body.issuer)?;
    let remarks = body.remarks.trim().to_string();
    let receipt = mutate(&state, move |ledger| {
        ledger.revoke_certificate(&cert_id, &issuer, &remarks)
    })
    .await?;
    Ok(Json(receipt))
}

async fn verify(
    State(state): State<AppState>,
    Path(cert_id): Path<String>,
) -> Result<Json<Verification>, ApiError> {
    let cert_id = required("cert_id", cert_id)?;
    Ok(Json(state.ledger.read().await.verify_certificate(&cert_id)?))
}

async fn history(
    State(state): State<AppState>,
    Path(cert_id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let cert_id = required("cert_id", cert_id)?;
    Ok(Json(state.ledger.read().await.certificate_history(&cert_id)?))
}

async fn chain_status(State(state): State<AppState>) -> Json<ChainStatus> {
    Json(state.ledger.read().await.status())
}

async fn recent_blocks(
    State(state): State<AppState>,
    Query(q): Query<RecentQuery>,
) -> Json<Vec<BlockSummary>> {
    let n = q
        .n
        .unwrap_or(DEFAULT_RECENT_BLOCKS)
        .min(MAX_BLOCKS_PER_REQUEST);
    Json(state.ledger.read().await.recent(n))
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/certificates", post(issue))
        .route("/certificates/{id}", get(verify))
        .route("/certificates/{id}/revoke", post(revoke))
        .route("/certificates/{id}/history", get(history))
        .route("/chain/status", get(chain_status))
        .route("/chain/blocks", get(recent_blocks))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
