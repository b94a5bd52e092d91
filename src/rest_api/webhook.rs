//! Webhook endpoint
//!
//! GitHub deliveries land here. A request carrying the validation probe
//! header is answered with this instance's identity instead.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use crate::manager::HookManager;
use crate::validator::{INSTANCE_IDENTITY_HEADER, VALIDATION_PROBE_HEADER};

const GITHUB_EVENT_HEADER: &str = "X-GitHub-Event";
const GITHUB_DELIVERY_HEADER: &str = "X-GitHub-Delivery";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn receive(State(manager): State<Arc<HookManager>>, headers: HeaderMap) -> Response {
    let is_probe = header(&headers, VALIDATION_PROBE_HEADER)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if is_probe {
        debug!("Answering hook URL validation probe");
        return (
            StatusCode::OK,
            [(INSTANCE_IDENTITY_HEADER, manager.identity().fingerprint())],
        )
            .into_response();
    }

    info!(
        "Received GitHub event {} (delivery {})",
        header(&headers, GITHUB_EVENT_HEADER).unwrap_or("unknown"),
        header(&headers, GITHUB_DELIVERY_HEADER).unwrap_or("unknown"),
    );
    StatusCode::OK.into_response()
}

pub async fn usage() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "This URL requires POST")
}
