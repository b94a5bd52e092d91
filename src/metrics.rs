//! Prometheus metrics for the hook manager
//!
//! # Exported metrics
//! The `/metrics` endpoint (when built with `--features metrics`) exports the following metrics:
//! - `hook_url_validations_total` (counter): hook URL probes labeled by result (`ok`, `warning`,
//!   or the probe failure kind).
//! - `hook_reregistration_passes_total` (counter): re-registration passes labeled by outcome.
//! - `hook_registrations_total` (counter): per-job `register_hooks()` calls labeled by outcome.

use std::sync::atomic::AtomicU64;

use once_cell::sync::Lazy;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

/// Labels for hook URL validation results
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ValidationLabels {
    pub result: String,
}

/// Labels for outcomes of re-registration passes and per-job registrations
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub outcome: String,
}

pub static HOOK_URL_VALIDATIONS_TOTAL: Lazy<Family<ValidationLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

pub static REREGISTRATION_PASSES_TOTAL: Lazy<Family<OutcomeLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

pub static HOOK_REGISTRATIONS_TOTAL: Lazy<Family<OutcomeLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::default();

    registry.register(
        "hook_url_validations",
        "Hook URL validation probes by result",
        HOOK_URL_VALIDATIONS_TOTAL.clone(),
    );
    registry.register(
        "hook_reregistration_passes",
        "Hook re-registration passes by outcome",
        REREGISTRATION_PASSES_TOTAL.clone(),
    );
    registry.register(
        "hook_registrations",
        "Per-job hook registration calls by outcome",
        HOOK_REGISTRATIONS_TOTAL.clone(),
    );

    registry
});

/// Count one hook URL validation.
pub fn inc_hook_url_validation(result: &str) {
    let labels = ValidationLabels {
        result: result.to_string(),
    };
    HOOK_URL_VALIDATIONS_TOTAL.get_or_create(&labels).inc();
}

/// Count one re-registration pass.
pub fn inc_reregistration_pass(outcome: &str) {
    let labels = OutcomeLabels {
        outcome: outcome.to_string(),
    };
    REREGISTRATION_PASSES_TOTAL.get_or_create(&labels).inc();
}

/// Count one per-job registration call.
pub fn inc_hook_registration(success: bool) {
    let labels = OutcomeLabels {
        outcome: if success { "success" } else { "failure" }.to_string(),
    };
    HOOK_REGISTRATIONS_TOTAL.get_or_create(&labels).inc();
}

/// Render the registry in the Prometheus text format
pub fn render() -> Result<String, std::fmt::Error> {
    let mut buffer = String::new();
    prometheus_client::encoding::text::encode(&mut buffer, &REGISTRY)?;
    Ok(buffer)
}
