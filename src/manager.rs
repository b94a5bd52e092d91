//! Administrative entry point
//!
//! [`HookManager`] is what the admin API talks to. It owns the configuration
//! store, the URL validator and the re-registration coordinator, and enforces
//! that a hook URL override is only saved after it passed validation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::config::{HookConfigStore, HookConfigUpdate};
use crate::error::{Error, Result};
use crate::identity::InstanceIdentity;
use crate::reregister::{
    FailurePolicy, ReRegisterReport, ReRegistrationCoordinator, DEFAULT_QUEUE_DEPTH,
};
use crate::runtime::ServerRuntime;
use crate::validator::{HookUrlValidator, ValidationResult, DEFAULT_PROBE_TIMEOUT};

/// Tunables for [`HookManager`]
#[derive(Clone, Debug)]
pub struct ManagerSettings {
    pub probe_timeout: Duration,
    pub failure_policy: FailurePolicy,
    pub queue_depth: usize,
    /// Whether administrators may set a hook URL different from the derived one
    pub allow_hook_url_override: bool,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            failure_policy: FailurePolicy::default(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
            allow_hook_url_override: true,
        }
    }
}

pub struct HookManager {
    store: Arc<HookConfigStore>,
    identity: Arc<dyn InstanceIdentity>,
    runtime: Arc<dyn ServerRuntime>,
    validator: HookUrlValidator,
    coordinator: ReRegistrationCoordinator,
    allow_hook_url_override: bool,
    configure_lock: Mutex<()>,
}

impl HookManager {
    /// Build the manager and start the re-registration worker.
    /// Must be called within a Tokio runtime.
    pub fn new(
        store: Arc<HookConfigStore>,
        identity: Arc<dyn InstanceIdentity>,
        runtime: Arc<dyn ServerRuntime>,
        settings: ManagerSettings,
    ) -> Result<Self> {
        let validator = HookUrlValidator::new(Arc::clone(&identity), settings.probe_timeout)?;
        let coordinator = ReRegistrationCoordinator::with_queue_depth(
            Arc::clone(&runtime),
            Arc::clone(&store),
            settings.failure_policy,
            settings.queue_depth,
        );
        Ok(Self {
            store,
            identity,
            runtime,
            validator,
            coordinator,
            allow_hook_url_override: settings.allow_hook_url_override,
            configure_lock: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &Arc<HookConfigStore> {
        &self.store
    }

    pub fn identity(&self) -> &Arc<dyn InstanceIdentity> {
        &self.identity
    }

    pub fn allows_hook_url_override(&self) -> bool {
        self.allow_hook_url_override
    }

    /// URL GitHub should post to, resolved against the server root URL
    pub async fn effective_hook_url(&self) -> Result<Url> {
        let root_url = self.runtime.root_url()?;
        self.store.effective_hook_url(root_url.as_ref()).await
    }

    /// Probe a candidate hook URL without saving anything
    pub async fn validate_hook_url(&self, candidate: &str) -> ValidationResult {
        self.validator.validate(candidate).await
    }

    /// Apply an administrator's configuration update
    ///
    /// An override is probed first. `Error` rejects the whole update and
    /// leaves the configuration untouched; `Warning` is saved and returned.
    #[instrument(skip(self, update), fields(mode = ?update.mode))]
    pub async fn configure(&self, update: HookConfigUpdate) -> Result<ValidationResult> {
        let _guard = self.configure_lock.lock().await;

        let hook_url = update
            .hook_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        let validation = match hook_url.as_deref() {
            Some(_) if !self.allow_hook_url_override => {
                return Err(Error::ConfigError(
                    "Hook URL override is not allowed on this server".to_string(),
                ));
            }
            Some(url) => match self.validator.validate(url).await {
                ValidationResult::Error(message) => return Err(Error::HookUrlRejected(message)),
                other => other,
            },
            None => ValidationResult::Ok,
        };

        self.store
            .update(update.mode.manages_hook(), hook_url, update.credentials)
            .await?;
        info!("Hook configuration saved ({})", validation);
        Ok(validation)
    }

    /// Re-register hooks for every job; queued behind any running pass
    pub async fn re_register_all(&self) -> Result<ReRegisterReport> {
        self.coordinator.re_register_all().await
    }
}
