//! Server runtime collaborators
//!
//! The hook manager never knows how jobs are modelled or how a job registers
//! its own webhook. It sees jobs through [`Job`], push triggers through
//! [`PushTrigger`], and the server itself through [`ServerRuntime`].

mod instance;

pub use instance::{ConfiguredJob, JobDefinition, JobsFile, ServerInstance};

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;

use crate::error::Result;

/// Webhook-driven build trigger attached to a job
#[async_trait]
pub trait PushTrigger: Send + Sync {
    /// Register (or refresh) this job's webhooks with the hosting service
    async fn register_hooks(&self) -> Result<()>;
}

/// A job known to the server
pub trait Job: Send + Sync {
    fn full_name(&self) -> &str;

    /// False for disabled jobs
    fn is_buildable(&self) -> bool;

    /// The job's push trigger, if it has one
    fn push_trigger(&self) -> Option<Arc<dyn PushTrigger>>;
}

/// The running server, as seen by the hook manager
///
/// Both calls fail with `RuntimeUnavailable` while the server is not running.
pub trait ServerRuntime: Send + Sync {
    fn root_url(&self) -> Result<Option<Url>>;

    fn all_jobs(&self) -> Result<Vec<Arc<dyn Job>>>;
}
