//! HTTP handlers for the admin API

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, instrument, warn};

use crate::config::{HookConfigUpdate, HookMode};
use crate::error::Error;
use crate::manager::HookManager;

use super::dto::{
    CredentialSummary, ErrorResponse, HealthResponse, HookConfigResponse, ReRegisterResponse,
    ValidateRequest, ValidationResponse,
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn error_response(e: Error) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        Error::ConfigError(_) => StatusCode::BAD_REQUEST,
        Error::PolicyError(_) => StatusCode::CONFLICT,
        Error::HookUrlRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::RuntimeUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::HookRegistrationError { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request refused: {}", e);
    }
    (status, Json(ErrorResponse::new(e.kind(), &e.to_string())))
}

/// Health check endpoint
#[instrument]
pub async fn health() -> Json<HealthResponse> {
    let instance = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance,
    })
}

/// Current hook configuration
#[instrument(skip(manager))]
pub async fn get_config(State(manager): State<Arc<HookManager>>) -> Json<HookConfigResponse> {
    let config = manager.store().snapshot().await;
    let hook_url = manager
        .effective_hook_url()
        .await
        .map(|url| url.to_string())
        .ok();

    Json(HookConfigResponse {
        mode: HookMode::from_manage_hook(config.manage_hook),
        manage_hook: config.manage_hook,
        hook_url,
        has_override: config.hook_url.is_some(),
        allow_hook_url_override: manager.allows_hook_url_override(),
        instance_identity: manager.identity().fingerprint(),
        credentials: config.credentials.iter().map(CredentialSummary::from).collect(),
    })
}

/// Replace the hook configuration
#[instrument(skip(manager, update))]
pub async fn put_config(
    State(manager): State<Arc<HookManager>>,
    Json(update): Json<HookConfigUpdate>,
) -> ApiResult<ValidationResponse> {
    manager
        .configure(update)
        .await
        .map(|result| Json(ValidationResponse::from(&result)))
        .map_err(error_response)
}

/// Probe a candidate hook URL without saving it
#[instrument(skip(manager, request), fields(hook_url = %request.hook_url))]
pub async fn validate_hook_url(
    State(manager): State<Arc<HookManager>>,
    Json(request): Json<ValidateRequest>,
) -> Json<ValidationResponse> {
    let result = manager.validate_hook_url(&request.hook_url).await;
    Json(ValidationResponse::from(&result))
}

/// Re-register hooks for every job
#[instrument(skip(manager))]
pub async fn reregister(State(manager): State<Arc<HookManager>>) -> ApiResult<ReRegisterResponse> {
    manager
        .re_register_all()
        .await
        .map(|report| Json(ReRegisterResponse::from(report)))
        .map_err(error_response)
}
