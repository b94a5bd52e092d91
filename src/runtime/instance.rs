//! In-process server runtime backed by a jobs file

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use reqwest::Url;
use serde::Deserialize;
use tracing::info;

use super::{Job, PushTrigger, ServerRuntime};
use crate::error::{Error, Result};

/// Root URL, lifecycle flag and job registry of this server
pub struct ServerInstance {
    root_url: Option<Url>,
    running: AtomicBool,
    jobs: RwLock<Vec<Arc<dyn Job>>>,
}

impl ServerInstance {
    pub fn new(root_url: Option<Url>) -> Self {
        Self {
            root_url,
            running: AtomicBool::new(false),
            jobs: RwLock::new(Vec::new()),
        }
    }

    pub fn register_job(&self, job: Arc<dyn Job>) {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job);
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!(
            "Server instance started with {} jobs",
            self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
        );
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("Server instance shut down");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(Error::RuntimeUnavailable(
                "server has not been started, or was already shut down".to_string(),
            ))
        }
    }
}

impl ServerRuntime for ServerInstance {
    fn root_url(&self) -> Result<Option<Url>> {
        self.ensure_running()?;
        Ok(self.root_url.clone())
    }

    fn all_jobs(&self) -> Result<Vec<Arc<dyn Job>>> {
        self.ensure_running()?;
        Ok(self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// A job declared in the jobs file
pub struct ConfiguredJob {
    name: String,
    disabled: bool,
    trigger: Option<Arc<dyn PushTrigger>>,
}

impl ConfiguredJob {
    pub fn new(
        name: impl Into<String>,
        disabled: bool,
        trigger: Option<Arc<dyn PushTrigger>>,
    ) -> Self {
        Self {
            name: name.into(),
            disabled,
            trigger,
        }
    }
}

impl Job for ConfiguredJob {
    fn full_name(&self) -> &str {
        &self.name
    }

    fn is_buildable(&self) -> bool {
        !self.disabled
    }

    fn push_trigger(&self) -> Option<Arc<dyn PushTrigger>> {
        self.trigger.clone()
    }
}

/// `jobs.toml` layout
///
/// ```toml
/// [[job]]
/// name = "api/main"
/// repositories = ["acme/api"]
///
/// [[job]]
/// name = "legacy"
/// disabled = true
/// push_trigger = false
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct JobsFile {
    #[serde(default, rename = "job")]
    pub jobs: Vec<JobDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobDefinition {
    pub name: String,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default = "default_true")]
    pub push_trigger: bool,

    /// `owner/name` or a full repository URL
    #[serde(default)]
    pub repositories: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl JobsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let file: JobsFile = toml::from_str(&raw)?;
        info!("Loaded {} job definitions from {}", file.jobs.len(), path.display());
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str, disabled: bool) -> Arc<dyn Job> {
        Arc::new(ConfiguredJob::new(name, disabled, None))
    }

    #[test]
    fn test_runtime_unavailable_before_start_and_after_shutdown() {
        let instance = ServerInstance::new(Some(Url::parse("https://ci.example.com/").unwrap()));
        assert!(matches!(
            instance.root_url(),
            Err(Error::RuntimeUnavailable(_))
        ));
        assert!(matches!(
            instance.all_jobs(),
            Err(Error::RuntimeUnavailable(_))
        ));

        instance.start();
        assert_eq!(
            instance.root_url().unwrap().unwrap().as_str(),
            "https://ci.example.com/"
        );

        instance.shutdown();
        assert!(instance.all_jobs().is_err());
    }

    #[test]
    fn test_jobs_are_listed_in_registration_order() {
        let instance = ServerInstance::new(None);
        instance.register_job(job("a", false));
        instance.register_job(job("b", true));
        instance.start();

        let jobs = instance.all_jobs().unwrap();
        let names: Vec<_> = jobs.iter().map(|j| j.full_name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(jobs[0].is_buildable());
        assert!(!jobs[1].is_buildable());
        assert!(jobs[0].push_trigger().is_none());
        assert!(instance.root_url().unwrap().is_none());
    }

    #[test]
    fn test_jobs_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.toml");
        fs::write(
            &path,
            r#"
[[job]]
name = "api/main"
repositories = ["acme/api", "https://github.com/acme/api-docs"]

[[job]]
name = "legacy"
disabled = true
push_trigger = false
"#,
        )
        .unwrap();

        let file = JobsFile::load(&path).unwrap();
        assert_eq!(file.jobs.len(), 2);
        assert!(file.jobs[0].push_trigger);
        assert!(!file.jobs[0].disabled);
        assert_eq!(file.jobs[0].repositories.len(), 2);
        assert!(file.jobs[1].disabled);
        assert!(!file.jobs[1].push_trigger);
        assert!(file.jobs[1].repositories.is_empty());
    }

    #[test]
    fn test_empty_jobs_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.toml");
        fs::write(&path, "").unwrap();
        assert!(JobsFile::load(&path).unwrap().jobs.is_empty());
    }
}
