//! Hook configuration store
//!
//! Single owner of the [`HookConfiguration`]. Loaded once at startup, replaced
//! as a whole by [`HookConfigStore::update`], and persisted on every change.

use reqwest::Url;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use super::persistence::ConfigPersistence;
use super::types::{Credential, HookConfiguration};
use crate::error::{Error, Result};

/// Path segment of the webhook endpoint below the server root URL
pub const WEBHOOK_PATH: &str = "github-webhook";

pub struct HookConfigStore {
    state: RwLock<HookConfiguration>,
    persistence: Box<dyn ConfigPersistence>,
    /// Held across save + swap so writers apply in order; readers only wait on `state`
    write_lock: Mutex<()>,
}

impl HookConfigStore {
    /// Load the persisted configuration, falling back to defaults on first start
    pub fn load(persistence: Box<dyn ConfigPersistence>) -> Result<Self> {
        let config = persistence.load()?.unwrap_or_default();
        if let Some(url) = config.hook_url.as_deref() {
            parse_hook_url(url)?;
        }
        info!(
            "Loaded hook configuration: manage_hook={}, override={}, credentials={}",
            config.manage_hook,
            config.hook_url.is_some(),
            config.credentials.len()
        );
        Ok(Self {
            state: RwLock::new(config),
            persistence,
            write_lock: Mutex::new(()),
        })
    }

    /// Consistent copy of the whole configuration
    pub async fn snapshot(&self) -> HookConfiguration {
        self.state.read().await.clone()
    }

    pub async fn manage_hook(&self) -> bool {
        self.state.read().await.manage_hook
    }

    pub async fn has_override(&self) -> bool {
        self.state.read().await.hook_url.is_some()
    }

    pub async fn credentials(&self) -> Vec<Credential> {
        self.state.read().await.credentials.clone()
    }

    /// First stored credential for an API endpoint
    pub async fn credential_for(&self, api_url: &str) -> Option<Credential> {
        self.state
            .read()
            .await
            .credentials
            .iter()
            .find(|c| c.matches_api_url(api_url))
            .cloned()
    }

    /// URL GitHub should post to
    ///
    /// The override wins when set; otherwise the URL is derived from the
    /// server root URL plus [`WEBHOOK_PATH`].
    pub async fn effective_hook_url(&self, root_url: Option<&Url>) -> Result<Url> {
        let state = self.state.read().await;
        match state.hook_url.as_deref() {
            Some(url) => parse_hook_url(url),
            None => {
                let root = root_url.ok_or_else(|| {
                    Error::ConfigError(
                        "Server root URL is not configured and no hook URL override is set"
                            .to_string(),
                    )
                })?;
                default_hook_url(root)
            }
        }
    }

    /// Replace mode, override and credentials in one step, then persist
    ///
    /// A blank override clears it. Nothing changes if the override does not
    /// parse or the configuration cannot be saved.
    pub async fn update(
        &self,
        manage_hook: bool,
        hook_url: Option<String>,
        credentials: Vec<Credential>,
    ) -> Result<()> {
        let hook_url = match normalize_override(hook_url) {
            Some(url) => {
                parse_hook_url(&url)?;
                Some(url)
            }
            None => None,
        };

        let next = HookConfiguration {
            manage_hook,
            hook_url,
            credentials,
        };

        let _writer = self.write_lock.lock().await;
        self.persistence.save(&next).await?;
        info!(
            "Hook configuration updated: manage_hook={}, override={}, credentials={}",
            next.manage_hook,
            next.hook_url.as_deref().unwrap_or("<none>"),
            next.credentials.len()
        );
        *self.state.write().await = next;
        Ok(())
    }

    /// Switch between automatic and manual hook management
    pub async fn set_manage_hook(&self, manage_hook: bool) -> Result<()> {
        let _writer = self.write_lock.lock().await;
        let next = HookConfiguration {
            manage_hook,
            ..self.snapshot().await
        };
        self.persistence.save(&next).await?;
        *self.state.write().await = next;
        Ok(())
    }
}

fn normalize_override(hook_url: Option<String>) -> Option<String> {
    hook_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
}

/// Parse an absolute http(s) hook URL
pub fn parse_hook_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| Error::ConfigError(format!("Malformed hook URL {url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::ConfigError(format!(
            "Hook URL {url} must use http or https, not {other}"
        ))),
    }
}

/// `<root>github-webhook/`, treating the root as a directory
pub fn default_hook_url(root_url: &Url) -> Result<Url> {
    let mut root = root_url.clone();
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    root.join(&format!("{WEBHOOK_PATH}/"))
        .map_err(|e| Error::ConfigError(format!("Cannot derive hook URL from {root_url}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::persistence::MemoryPersistence;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn store() -> HookConfigStore {
        HookConfigStore::load(Box::new(MemoryPersistence::new())).unwrap()
    }

    fn root() -> Url {
        Url::parse("https://ci.example.com/").unwrap()
    }

    #[tokio::test]
    async fn test_defaults_on_first_start() {
        let store = store();
        assert!(!store.manage_hook().await);
        assert!(!store.has_override().await);
        assert!(store.credentials().await.is_empty());
    }

    #[tokio::test]
    async fn test_effective_url_derived_from_root() {
        let store = store();
        let url = store.effective_hook_url(Some(&root())).await.unwrap();
        assert_eq!(url.as_str(), "https://ci.example.com/github-webhook/");
    }

    #[tokio::test]
    async fn test_effective_url_root_without_trailing_slash() {
        let store = store();
        let root = Url::parse("https://example.com/ci").unwrap();
        let url = store.effective_hook_url(Some(&root)).await.unwrap();
        assert_eq!(url.as_str(), "https://example.com/ci/github-webhook/");
    }

    #[tokio::test]
    async fn test_effective_url_without_root_or_override_fails() {
        let store = store();
        let err = store.effective_hook_url(None).await.unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_override_wins_and_clearing_restores_default() {
        let store = store();
        store
            .update(
                true,
                Some("https://hooks.example.net/gh/".to_string()),
                vec![],
            )
            .await
            .unwrap();
        assert!(store.has_override().await);
        assert_eq!(
            store.effective_hook_url(Some(&root())).await.unwrap().as_str(),
            "https://hooks.example.net/gh/"
        );
        // override needs no root URL
        assert!(store.effective_hook_url(None).await.is_ok());

        store.update(true, None, vec![]).await.unwrap();
        assert!(!store.has_override().await);
        assert_eq!(
            store.effective_hook_url(Some(&root())).await.unwrap().as_str(),
            "https://ci.example.com/github-webhook/"
        );
    }

    #[tokio::test]
    async fn test_blank_override_is_cleared() {
        let store = store();
        store
            .update(false, Some("   ".to_string()), vec![])
            .await
            .unwrap();
        assert!(!store.has_override().await);
    }

    #[tokio::test]
    async fn test_malformed_override_rejected_without_change() {
        let store = store();
        store
            .update(true, None, vec![Credential::new("a", "https://api.github.com", "t")])
            .await
            .unwrap();

        let err = store
            .update(false, Some("ftp://hooks.example.com/".to_string()), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));

        let err = store
            .update(false, Some("not a url".to_string()), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));

        let config = store.snapshot().await;
        assert!(config.manage_hook);
        assert_eq!(config.credentials.len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_duplicate_credentials_in_order() {
        let store = store();
        let credentials = vec![
            Credential::new("b", "https://api.github.com", "1"),
            Credential::new("a", "https://api.github.com", "2"),
            Credential::new("b", "https://api.github.com", "1"),
        ];
        store.update(true, None, credentials.clone()).await.unwrap();
        assert_eq!(store.credentials().await, credentials);

        let first = store.credential_for("https://api.github.com/").await.unwrap();
        assert_eq!(first.username, "b");
        assert!(store.credential_for("https://ghe.example.com/api/v3").await.is_none());
    }

    #[tokio::test]
    async fn test_reload_from_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks.toml");
        let make = || {
            HookConfigStore::load(Box::new(
                crate::config::persistence::TomlFilePersistence::new(&path),
            ))
            .unwrap()
        };

        let store = make();
        store
            .update(
                true,
                Some("https://hooks.example.com/github-webhook/".to_string()),
                vec![Credential::new("a", "https://api.github.com", "t")],
            )
            .await
            .unwrap();
        drop(store);

        let reloaded = make();
        let config = reloaded.snapshot().await;
        assert!(config.manage_hook);
        assert_eq!(
            config.hook_url.as_deref(),
            Some("https://hooks.example.com/github-webhook/")
        );
        assert_eq!(config.credentials.len(), 1);
    }

    #[tokio::test]
    async fn test_set_manage_hook_keeps_other_fields() {
        let store = store();
        store
            .update(
                true,
                Some("https://hooks.example.com/".to_string()),
                vec![Credential::new("a", "https://api.github.com", "t")],
            )
            .await
            .unwrap();
        store.set_manage_hook(false).await.unwrap();

        let config = store.snapshot().await;
        assert!(!config.manage_hook);
        assert!(config.hook_url.is_some());
        assert_eq!(config.credentials.len(), 1);
    }

    struct FailingPersistence {
        fail: AtomicBool,
    }

    #[async_trait::async_trait]
    impl ConfigPersistence for FailingPersistence {
        fn load(&self) -> Result<Option<HookConfiguration>> {
            Ok(None)
        }

        async fn save(&self, _config: &HookConfiguration) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                Err(Error::IoError(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only filesystem",
                )))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_configuration() {
        let store = HookConfigStore::load(Box::new(FailingPersistence {
            fail: AtomicBool::new(true),
        }))
        .unwrap();

        let err = store
            .update(true, Some("https://hooks.example.com/".to_string()), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
        assert!(!store.manage_hook().await);
        assert!(!store.has_override().await);
    }

    #[tokio::test]
    async fn test_concurrent_readers_never_see_partial_update() {
        let store = Arc::new(store());
        let a = (
            true,
            Some("https://a.example.com/".to_string()),
            vec![Credential::new("a", "https://api.github.com", "1")],
        );
        let b = (
            false,
            None,
            vec![
                Credential::new("b", "https://api.github.com", "2"),
                Credential::new("b", "https://api.github.com", "3"),
            ],
        );

        let writer = {
            let store = Arc::clone(&store);
            let (a, b) = (a.clone(), b.clone());
            tokio::spawn(async move {
                for i in 0..200 {
                    let (m, u, c) = if i % 2 == 0 { a.clone() } else { b.clone() };
                    store.update(m, u, c).await.unwrap();
                }
            })
        };

        for _ in 0..200 {
            let config = store.snapshot().await;
            let consistent = (config.manage_hook
                && config.hook_url.is_some()
                && config.credentials.len() == 1)
                || (!config.manage_hook
                    && config.hook_url.is_none()
                    && config.credentials.len() != 1);
            assert!(consistent, "observed partial update: {config:?}");
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
    }

    /// Save blocks until the test releases it
    struct GatedPersistence {
        release: Arc<tokio::sync::Notify>,
    }

    #[async_trait::async_trait]
    impl ConfigPersistence for GatedPersistence {
        fn load(&self) -> Result<Option<HookConfiguration>> {
            Ok(None)
        }

        async fn save(&self, _config: &HookConfiguration) -> Result<()> {
            self.release.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_readers_are_not_blocked_by_a_slow_save() {
        let release = Arc::new(tokio::sync::Notify::new());
        let store = Arc::new(
            HookConfigStore::load(Box::new(GatedPersistence {
                release: Arc::clone(&release),
            }))
            .unwrap(),
        );

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.update(true, None, vec![]).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // save still pending: reads complete and see the old configuration
        let config = tokio::time::timeout(Duration::from_secs(1), store.snapshot())
            .await
            .expect("reader blocked behind save");
        assert!(!config.manage_hook);

        release.notify_one();
        writer.await.unwrap().unwrap();
        assert!(store.manage_hook().await);
    }

    #[tokio::test]
    async fn test_load_uses_preloaded_configuration() {
        let preloaded = HookConfiguration {
            manage_hook: true,
            hook_url: Some("https://hooks.example.com/github-webhook/".to_string()),
            credentials: vec![Credential::new("a", "https://api.github.com", "t")],
        };
        let store =
            HookConfigStore::load(Box::new(MemoryPersistence::with_config(preloaded))).unwrap();

        assert!(store.manage_hook().await);
        assert!(store.has_override().await);
        assert_eq!(
            store.effective_hook_url(None).await.unwrap().as_str(),
            "https://hooks.example.com/github-webhook/"
        );
    }

    #[test]
    fn test_load_rejects_malformed_stored_override() {
        let preloaded = HookConfiguration {
            hook_url: Some("not a url".to_string()),
            ..Default::default()
        };
        let result = HookConfigStore::load(Box::new(MemoryPersistence::with_config(preloaded)));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
