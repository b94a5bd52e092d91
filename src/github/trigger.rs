//! Hook registration against the GitHub REST API

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, LINK};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::repository::GitHubRepository;
use crate::config::HookConfigStore;
use crate::error::{Error, Result};
use crate::runtime::PushTrigger;

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const API_TIMEOUT: Duration = Duration::from_secs(30);
/// Largest page size the hooks listing accepts
const HOOKS_PER_PAGE: u32 = 100;

/// Existing hook as listed by `GET /repos/{owner}/{repo}/hooks`
#[derive(Debug, Deserialize)]
struct ExistingHook {
    id: u64,
    #[serde(default)]
    config: ExistingHookConfig,
}

#[derive(Debug, Default, Deserialize)]
struct ExistingHookConfig {
    url: Option<String>,
}

/// Push trigger for a job building one or more GitHub repositories
pub struct GitHubPushTrigger {
    job_name: String,
    repositories: Vec<GitHubRepository>,
    store: Arc<HookConfigStore>,
    root_url: Option<Url>,
    http_client: Client,
}

impl GitHubPushTrigger {
    pub fn new(
        job_name: impl Into<String>,
        repositories: Vec<GitHubRepository>,
        store: Arc<HookConfigStore>,
        root_url: Option<Url>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("github-hook-manager/", env!("CARGO_PKG_VERSION")))
            .timeout(API_TIMEOUT)
            .build()?;
        Ok(Self {
            job_name: job_name.into(),
            repositories,
            store,
            root_url,
            http_client,
        })
    }

    fn failure(&self, message: String) -> Error {
        Error::HookRegistrationError {
            job: self.job_name.clone(),
            message,
        }
    }

    /// Ensure `repo` has a push hook pointing at `hook_url`
    ///
    /// Returns false when the hook already existed.
    async fn register_repository(&self, repo: &GitHubRepository, hook_url: &Url) -> Result<bool> {
        let api_url = repo.api_url();
        let credential = self
            .store
            .credential_for(&api_url)
            .await
            .ok_or_else(|| self.failure(format!("No credential stored for {api_url}")))?;

        let hooks_url = repo.hooks_url();
        let existing = self
            .list_hooks(repo, &hooks_url, &credential.oauth_access_token)
            .await?;
        if let Some(hook) = existing
            .iter()
            .find(|h| h.config.url.as_deref() == Some(hook_url.as_str()))
        {
            debug!("{} already has hook {} for {}", repo, hook.id, hook_url);
            return Ok(false);
        }

        let response = self
            .http_client
            .post(&hooks_url)
            .bearer_auth(&credential.oauth_access_token)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .json(&json!({
                "name": "web",
                "active": true,
                "events": ["push"],
                "config": {
                    "url": hook_url.as_str(),
                    "content_type": "json",
                },
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.failure(format!(
                "GitHub returned {} creating hook on {}",
                response.status(),
                repo
            )));
        }

        info!("Created push hook on {} for {}", repo, hook_url);
        Ok(true)
    }

    /// All hooks of `repo`, following `Link: rel="next"` across pages
    async fn list_hooks(
        &self,
        repo: &GitHubRepository,
        hooks_url: &str,
        token: &str,
    ) -> Result<Vec<ExistingHook>> {
        let mut hooks = Vec::new();
        let mut next = Some(format!("{hooks_url}?per_page={HOOKS_PER_PAGE}"));

        while let Some(page_url) = next.take() {
            let response = self
                .http_client
                .get(&page_url)
                .bearer_auth(token)
                .header(ACCEPT, GITHUB_MEDIA_TYPE)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(self.failure(format!(
                    "GitHub returned {} listing hooks of {}",
                    response.status(),
                    repo
                )));
            }

            next = next_page_url(response.headers()).filter(|n| *n != page_url);
            let page: Vec<ExistingHook> = response.json().await?;
            debug!("Listed {} hooks of {} from {}", page.len(), repo, page_url);
            hooks.extend(page);
        }
        Ok(hooks)
    }
}

/// Target of the `rel="next"` entry in a `Link` header, if any
fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| matches!(p.trim(), "rel=\"next\"" | "rel=next"));
        if !is_next {
            return None;
        }
        target
            .trim()
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

#[async_trait]
impl PushTrigger for GitHubPushTrigger {
    async fn register_hooks(&self) -> Result<()> {
        let hook_url = self
            .store
            .effective_hook_url(self.root_url.as_ref())
            .await?;

        for repo in &self.repositories {
            self.register_repository(repo, &hook_url).await?;
        }
        Ok(())
    }
}
