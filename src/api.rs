use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

use crate::query::{QueryError, QueryService};

pub type SharedState = Arc<QueryService>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Query(QueryError::InvalidRiskBand(value)) => {
                debug!(risk_band = %value, "rejected risk band filter");
                StatusCode::BAD_REQUEST
            }
            ApiError::Query(QueryError::AccountNotFound(id)) => {
                debug!(customer_id = %id, "account lookup missed");
                StatusCode::NOT_FOUND
            }
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AccountFilter {
    pub risk_band: Option<String>,
}

pub fn build_router(service: QueryService, cors_origin: HeaderValue) -> Router {
    let shared: SharedState = Arc::new(service);

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([cors_origin]))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health))
        .route("/api/portfolio/summary", get(portfolio_summary))
        .route("/api/portfolio/load-status", get(load_status))
        .route("/api/accounts", get(list_accounts))
        .route("/api/accounts/{customer_id}", get(account_detail))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.health())
}

async fn portfolio_summary(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.summary())
}

async fn load_status(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.load_report().clone())
}

async fn list_accounts(
    State(state): State<SharedState>,
    Query(filter): Query<AccountFilter>,
) -> Result<Response, ApiError> {
    let accounts = state.list(filter.risk_band.as_deref())?;
    Ok(Json(accounts).into_response())
}

async fn account_detail(
    State(state): State<SharedState>,
    Path(customer_id): Path<String>,
) -> Result<Response, ApiError> {
    let account = state.detail(&customer_id)?;
    Ok(Json(account).into_response())
}
