//! Hook URL validation
//!
//! Webhook delivery only ever flows from GitHub to this server, so a hook URL
//! that silently points somewhere else (stale DNS, wrong load balancer pool, a
//! second installation) goes unnoticed until builds stop triggering. Before a
//! URL is accepted it is probed: the endpoint must answer 200 and present this
//! installation's identity fingerprint in [`INSTANCE_IDENTITY_HEADER`].
//!
//! | Probe result                         | [`ValidationResult`] |
//! |--------------------------------------|----------------------|
//! | connection failure / timeout         | `Error`              |
//! | status other than 200                | `Error`              |
//! | 200 without identity header          | `Warning`            |
//! | 200 with a different identity        | `Error`              |
//! | 200 with this instance's identity    | `Ok`                 |

mod error;
mod result;

pub use error::ProbeError;
pub use result::{ProbeOutcome, ValidationResult};

use std::sync::Arc;
use std::time::Duration;

use reqwest::{redirect, Client, StatusCode, Url};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::identity::InstanceIdentity;

/// Request header marking a validation probe
pub const VALIDATION_PROBE_HEADER: &str = "X-Validation-Probe";

/// Response header carrying the responder's base64 DER public key
pub const INSTANCE_IDENTITY_HEADER: &str = "X-Instance-Identity";

/// Default bound on a single probe round trip
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Validates candidate hook URLs against this instance's identity
pub struct HookUrlValidator {
    http_client: Client,
    identity: Arc<dyn InstanceIdentity>,
}

impl HookUrlValidator {
    /// Create a validator whose probes give up after `timeout`
    pub fn new(identity: Arc<dyn InstanceIdentity>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            http_client,
            identity,
        })
    }

    /// Validate a candidate hook URL
    ///
    /// Never fails: every problem is folded into the returned result so the
    /// caller can render it with the right severity. Not retried.
    pub async fn validate(&self, candidate: &str) -> ValidationResult {
        let result = match self.probe(candidate).await {
            Ok(ProbeOutcome::Recognized) => {
                info!("Hook URL {} is served by this instance", candidate);
                ValidationResult::Ok
            }
            Ok(ProbeOutcome::Unrecognized) => {
                info!("Hook URL {} answered without an instance identity", candidate);
                ValidationResult::Warning(format!(
                    "It doesn't look like {candidate} is talking to this server. Are you running your own app?"
                ))
            }
            Err(e) => {
                warn!("Hook URL {} failed validation: {}", candidate, e);
                #[cfg(feature = "metrics")]
                crate::metrics::inc_hook_url_validation(e.kind());
                return ValidationResult::Error(e.to_string());
            }
        };

        #[cfg(feature = "metrics")]
        crate::metrics::inc_hook_url_validation(result.kind());

        result
    }

    /// Send one probe to `candidate` and classify the answer
    pub async fn probe(&self, candidate: &str) -> std::result::Result<ProbeOutcome, ProbeError> {
        let url = parse_candidate(candidate)?;
        debug!("Probing hook URL {}", url);

        let response = self
            .http_client
            .post(url)
            .header(VALIDATION_PROBE_HEADER, "true")
            .send()
            .await
            .map_err(|source| ProbeError::network(candidate, source))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ProbeError::UnexpectedStatus {
                url: candidate.to_string(),
                status: status.as_u16(),
            });
        }

        let presented = match response.headers().get(INSTANCE_IDENTITY_HEADER) {
            Some(value) => value,
            None => return Ok(ProbeOutcome::Unrecognized),
        };

        let expected = self.identity.fingerprint();
        match presented.to_str() {
            Ok(v) if v.trim() == expected => Ok(ProbeOutcome::Recognized),
            _ => Err(ProbeError::IdentityMismatch {
                url: candidate.to_string(),
            }),
        }
    }
}

fn parse_candidate(candidate: &str) -> std::result::Result<Url, ProbeError> {
    let invalid = |reason: String| ProbeError::InvalidUrl {
        url: candidate.to_string(),
        reason,
    };
    let url = Url::parse(candidate.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}
