//! Re-registration coordinator
//!
//! Pushes hook registration out to every buildable job that has a push
//! trigger. Passes are handed to a single worker task through a bounded queue,
//! so two passes never interleave their calls against the hosting service and
//! repeated requests wait their turn instead of being rejected.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::report::{FailurePolicy, JobFailure, ReRegisterReport};
use crate::config::HookConfigStore;
use crate::error::{Error, Result};
use crate::runtime::ServerRuntime;

/// Passes that may wait behind the running one before callers block
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

struct PassRequest {
    reply: oneshot::Sender<Result<ReRegisterReport>>,
}

/// Handle to the re-registration worker
#[derive(Clone)]
pub struct ReRegistrationCoordinator {
    queue: mpsc::Sender<PassRequest>,
    store: Arc<HookConfigStore>,
}

impl ReRegistrationCoordinator {
    /// Start the worker. Must be called within a Tokio runtime.
    pub fn spawn(
        runtime: Arc<dyn ServerRuntime>,
        store: Arc<HookConfigStore>,
        policy: FailurePolicy,
    ) -> Self {
        Self::with_queue_depth(runtime, store, policy, DEFAULT_QUEUE_DEPTH)
    }

    pub fn with_queue_depth(
        runtime: Arc<dyn ServerRuntime>,
        store: Arc<HookConfigStore>,
        policy: FailurePolicy,
        queue_depth: usize,
    ) -> Self {
        let (queue, requests) = mpsc::channel(queue_depth.max(1));
        tokio::spawn(run_worker(requests, runtime, Arc::clone(&store), policy));
        info!(
            "Re-registration worker started (policy={}, queue_depth={})",
            policy,
            queue_depth.max(1)
        );
        Self { queue, store }
    }

    /// Re-register hooks for every buildable job with a push trigger
    ///
    /// Waits for any pass already queued or running. Fails with
    /// `PolicyError` without touching any job when hooks are managed manually.
    pub async fn re_register_all(&self) -> Result<ReRegisterReport> {
        ensure_managed(&self.store).await?;

        let (reply, response) = oneshot::channel();
        self.queue
            .send(PassRequest { reply })
            .await
            .map_err(|_| worker_stopped())?;
        response.await.map_err(|_| worker_stopped())?
    }
}

fn worker_stopped() -> Error {
    Error::RuntimeUnavailable("re-registration worker is not running".to_string())
}

async fn ensure_managed(store: &HookConfigStore) -> Result<()> {
    if store.manage_hook().await {
        Ok(())
    } else {
        Err(Error::PolicyError(
            "Works only when hooks are managed automatically".to_string(),
        ))
    }
}

async fn run_worker(
    mut requests: mpsc::Receiver<PassRequest>,
    runtime: Arc<dyn ServerRuntime>,
    store: Arc<HookConfigStore>,
    policy: FailurePolicy,
) {
    while let Some(request) = requests.recv().await {
        // a panicking trigger must not take the worker down with it
        let pass = tokio::spawn(run_pass(Arc::clone(&runtime), Arc::clone(&store), policy));
        let result = match pass.await {
            Ok(result) => result,
            Err(e) => Err(Error::RuntimeUnavailable(format!(
                "re-registration pass aborted: {e}"
            ))),
        };

        #[cfg(feature = "metrics")]
        crate::metrics::inc_reregistration_pass(match &result {
            Ok(report) if report.failures.is_empty() => "completed",
            Ok(_) => "completed_with_failures",
            Err(e) => e.kind(),
        });

        // the caller may have stopped waiting; the pass still ran to completion
        let _ = request.reply.send(result);
    }
    debug!("Re-registration worker stopped");
}

async fn run_pass(
    runtime: Arc<dyn ServerRuntime>,
    store: Arc<HookConfigStore>,
    policy: FailurePolicy,
) -> Result<ReRegisterReport> {
    // the mode may have changed while this pass was queued
    ensure_managed(&store).await?;

    let started_at = Utc::now();
    let mut triggered = 0;
    let mut failures = Vec::new();

    for job in runtime.all_jobs()? {
        if !job.is_buildable() {
            continue;
        }
        let Some(trigger) = job.push_trigger() else {
            continue;
        };

        debug!("Calling register_hooks() for {}", job.full_name());
        triggered += 1;

        let outcome = trigger.register_hooks().await;

        #[cfg(feature = "metrics")]
        crate::metrics::inc_hook_registration(outcome.is_ok());

        if let Err(e) = outcome {
            warn!("register_hooks() failed for {}: {}", job.full_name(), e);
            match policy {
                FailurePolicy::Abort => return Err(attribute_to_job(job.full_name(), e)),
                FailurePolicy::ContinueOnError => failures.push(JobFailure {
                    job: job.full_name().to_string(),
                    message: e.to_string(),
                }),
            }
        }
    }

    info!("Called register_hooks() for {} jobs", triggered);
    Ok(ReRegisterReport {
        triggered,
        failures,
        started_at,
        finished_at: Utc::now(),
    })
}

fn attribute_to_job(job: &str, error: Error) -> Error {
    match error {
        e @ Error::HookRegistrationError { .. } => e,
        other => Error::HookRegistrationError {
            job: job.to_string(),
            message: other.to_string(),
        },
    }
}
