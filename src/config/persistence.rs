//! Load/save backends for the hook configuration

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::types::HookConfiguration;
use crate::error::{Error, Result};

/// Storage for the hook configuration
///
/// `load` runs once at startup; `save` runs on request tasks and must not
/// block the runtime.
#[async_trait]
pub trait ConfigPersistence: Send + Sync {
    /// Load the stored configuration, `None` on first start
    fn load(&self) -> Result<Option<HookConfiguration>>;

    /// Replace the stored configuration
    async fn save(&self, config: &HookConfiguration) -> Result<()>;
}

/// TOML file on local disk
#[derive(Debug, Clone)]
pub struct TomlFilePersistence {
    path: PathBuf,
}

impl TomlFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigPersistence for TomlFilePersistence {
    fn load(&self) -> Result<Option<HookConfiguration>> {
        if !self.path.exists() {
            debug!("No hook configuration at {}", self.path.display());
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(Some(toml::from_str(&raw)?))
    }

    async fn save(&self, config: &HookConfiguration) -> Result<()> {
        let rendered = toml::to_string_pretty(config)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // write-then-rename so a crash never leaves a truncated file
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| {
                Error::ConfigError(format!("Invalid config path {}", self.path.display()))
            })?
            .to_string_lossy();
        let tmp = self.path.with_file_name(format!(".{file_name}.tmp"));
        tokio::fs::write(&tmp, rendered).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("Saved hook configuration to {}", self.path.display());
        Ok(())
    }
}

/// Process-local storage for deployments without a config file
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    stored: Mutex<Option<HookConfiguration>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HookConfiguration) -> Self {
        Self {
            stored: Mutex::new(Some(config)),
        }
    }
}

#[async_trait]
impl ConfigPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<HookConfiguration>> {
        let stored = self
            .stored
            .lock()
            .map_err(|_| Error::ConfigError("Configuration lock poisoned".to_string()))?;
        Ok(stored.clone())
    }

    async fn save(&self, config: &HookConfiguration) -> Result<()> {
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| Error::ConfigError("Configuration lock poisoned".to_string()))?;
        *stored = Some(config.clone());
        Ok(())
    }
}
