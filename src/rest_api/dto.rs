//! Request and response bodies for the REST API

use serde::{Deserialize, Serialize};

use crate::config::{Credential, HookMode};
use crate::reregister::{JobFailure, ReRegisterReport};
use crate::validator::ValidationResult;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub instance: String,
}

/// Hook configuration as shown to administrators; tokens are never returned
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookConfigResponse {
    pub mode: HookMode,
    pub manage_hook: bool,
    /// Effective hook URL, absent when no root URL is configured
    pub hook_url: Option<String>,
    pub has_override: bool,
    pub allow_hook_url_override: bool,
    pub instance_identity: String,
    pub credentials: Vec<CredentialSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSummary {
    pub username: String,
    pub api_url: String,
}

impl From<&Credential> for CredentialSummary {
    fn from(credential: &Credential) -> Self {
        Self {
            username: credential.username.clone(),
            api_url: credential.api_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub hook_url: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&ValidationResult> for ValidationResponse {
    fn from(result: &ValidationResult) -> Self {
        Self {
            status: result.kind().to_string(),
            message: result.message().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReRegisterResponse {
    pub status: String,
    pub message: String,
    pub jobs_triggered: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<JobFailure>,
}

impl From<ReRegisterReport> for ReRegisterResponse {
    fn from(report: ReRegisterReport) -> Self {
        Self {
            status: "ok".to_string(),
            message: report.summary(),
            jobs_triggered: report.triggered,
            failures: report.failures,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}
