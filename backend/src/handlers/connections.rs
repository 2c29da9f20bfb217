use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::services::{ConnectError, ConnectionCoordinator, StoreError};
use crate::utils::Config;

pub type AppState = (ConnectionCoordinator, Config);

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub from_user_id: String,
    pub to_user_id: String,
    #[serde(default)]
    pub is_super_connect: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub is_match: bool,
}

#[derive(Debug, Deserialize)]
pub struct PairRequest {
    pub from_user_id: String,
    pub to_user_id: String,
}

#[derive(Debug, Serialize)]
pub struct InterestResponse {
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

pub async fn connect(
    State((coordinator, _config)): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<ConnectResponse>, (StatusCode, Json<ApiError>)> {
    let outcome = coordinator
        .connect(&req.from_user_id, &req.to_user_id, req.is_super_connect)
        .await
        .map_err(error_response)?;

    Ok(Json(ConnectResponse {
        is_match: outcome.is_match,
    }))
}

pub async fn pass(
    State((coordinator, _config)): State<AppState>,
    Json(req): Json<PairRequest>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    coordinator
        .pass(&req.from_user_id, &req.to_user_id)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_connection_request(
    State((coordinator, _config)): State<AppState>,
    Json(req): Json<PairRequest>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    coordinator
        .remove_connection_request(&req.from_user_id, &req.to_user_id)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn has_interest_from(
    State((coordinator, _config)): State<AppState>,
    Query(req): Query<PairRequest>,
) -> Result<Json<InterestResponse>, (StatusCode, Json<ApiError>)> {
    let exists = coordinator
        .has_interest_from(&req.from_user_id, &req.to_user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(InterestResponse { exists }))
}

fn error_response(err: ConnectError) -> (StatusCode, Json<ApiError>) {
    let (status, retry_after_secs) = match &err {
        ConnectError::InvalidInput(_) => (StatusCode::BAD_REQUEST, None),
        ConnectError::InvalidOperation(_) => (StatusCode::CONFLICT, None),
        ConnectError::RateLimitExceeded { retry_after } => (
            StatusCode::TOO_MANY_REQUESTS,
            retry_after.map(|d| d.as_secs()),
        ),
        ConnectError::Store(StoreError::Unavailable(_)) | ConnectError::Store(StoreError::Timeout) => {
            (StatusCode::SERVICE_UNAVAILABLE, None)
        }
        ConnectError::Store(StoreError::Permanent(_)) => (StatusCode::INTERNAL_SERVER_ERROR, None),
    };

    (
        status,
        Json(ApiError {
            error: err.to_string(),
            retry_after_secs,
        }),
    )
}
