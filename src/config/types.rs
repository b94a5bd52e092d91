//! Hook configuration data types

use serde::{Deserialize, Serialize};

/// Default API endpoint for github.com credentials
pub const GITHUB_API_URL: &str = "https://api.github.com";

fn default_api_url() -> String {
    GITHUB_API_URL.to_string()
}

/// Hook configuration as persisted and held by the store
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookConfiguration {
    /// True when this server registers hooks itself
    #[serde(default)]
    pub manage_hook: bool,

    /// URL GitHub should post to, when it differs from the derived default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_url: Option<String>,

    /// Stored API credentials, in insertion order
    #[serde(default)]
    pub credentials: Vec<Credential>,
}

/// GitHub API credential
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub username: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    pub oauth_access_token: String,
}

impl Credential {
    pub fn new(
        username: impl Into<String>,
        api_url: impl Into<String>,
        oauth_access_token: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            api_url: api_url.into(),
            oauth_access_token: oauth_access_token.into(),
        }
    }

    /// Whether this credential is for the given API endpoint
    pub fn matches_api_url(&self, api_url: &str) -> bool {
        self.api_url.trim_end_matches('/') == api_url.trim_end_matches('/')
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("api_url", &self.api_url)
            .field("oauth_access_token", &"<redacted>")
            .finish()
    }
}

/// Hook management mode as submitted by an administrator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookMode {
    Auto,
    Manual,
}

impl HookMode {
    pub fn from_manage_hook(manage_hook: bool) -> Self {
        if manage_hook {
            HookMode::Auto
        } else {
            HookMode::Manual
        }
    }

    pub fn manages_hook(self) -> bool {
        matches!(self, HookMode::Auto)
    }
}

/// A full configuration update as submitted through the admin surface
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookConfigUpdate {
    pub mode: HookMode,

    #[serde(default)]
    pub hook_url: Option<String>,

    #[serde(default)]
    pub credentials: Vec<Credential>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_redacts_token() {
        let credential = Credential::new("octocat", GITHUB_API_URL, "ghp_secret");
        let rendered = format!("{credential:?}");
        assert!(rendered.contains("octocat"));
        assert!(!rendered.contains("ghp_secret"));
    }

    #[test]
    fn test_credential_api_url_defaults_to_github() {
        let credential: Credential =
            serde_json::from_str(r#"{"username": "octocat", "oauthAccessToken": "t"}"#).unwrap();
        assert_eq!(credential.api_url, GITHUB_API_URL);
    }

    #[test]
    fn test_matches_api_url_ignores_trailing_slash() {
        let credential = Credential::new("u", "https://ghe.example.com/api/v3/", "t");
        assert!(credential.matches_api_url("https://ghe.example.com/api/v3"));
        assert!(!credential.matches_api_url(GITHUB_API_URL));
    }

    #[test]
    fn test_update_parses_form_payload() {
        let update: HookConfigUpdate = serde_json::from_value(serde_json::json!({
            "mode": "auto",
            "hookUrl": "https://hooks.example.com/github-webhook/",
            "credentials": [
                {"username": "a", "oauthAccessToken": "1"},
                {"username": "a", "oauthAccessToken": "1"}
            ]
        }))
        .unwrap();

        assert_eq!(update.mode, HookMode::Auto);
        assert!(update.mode.manages_hook());
        assert_eq!(
            update.hook_url.as_deref(),
            Some("https://hooks.example.com/github-webhook/")
        );
        // duplicates are kept
        assert_eq!(update.credentials.len(), 2);
    }

    #[test]
    fn test_update_without_hook_url() {
        let update: HookConfigUpdate =
            serde_json::from_str(r#"{"mode": "manual"}"#).unwrap();
        assert_eq!(update.mode, HookMode::Manual);
        assert!(update.hook_url.is_none());
        assert!(update.credentials.is_empty());
    }
}
