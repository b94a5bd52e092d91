//! Repository coordinates and API endpoint resolution

use std::fmt;
use std::str::FromStr;

use reqwest::Url;

use crate::config::GITHUB_API_URL;
use crate::error::Error;

const GITHUB_HOST: &str = "github.com";

/// A repository on github.com or a GitHub Enterprise host
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GitHubRepository {
    scheme: String,
    /// Host, including a non-default port
    host: String,
    pub owner: String,
    pub name: String,
}

impl GitHubRepository {
    /// REST API base for the repository's host
    pub fn api_url(&self) -> String {
        if self.host == GITHUB_HOST {
            GITHUB_API_URL.to_string()
        } else {
            format!("{}://{}/api/v3", self.scheme, self.host)
        }
    }

    /// `<api>/repos/<owner>/<name>/hooks`
    pub fn hooks_url(&self) -> String {
        format!("{}/repos/{}/{}/hooks", self.api_url(), self.owner, self.name)
    }
}

impl FromStr for GitHubRepository {
    type Err = Error;

    /// Accepts `owner/name` (github.com) or `https://host/owner/name[.git]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || Error::ConfigError(format!("Invalid GitHub repository: {s}"));

        let (scheme, host, path) = if s.contains("://") {
            let url = Url::parse(s).map_err(|_| invalid())?;
            let host = url.host_str().ok_or_else(invalid)?;
            let host = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            (url.scheme().to_string(), host, url.path().to_string())
        } else {
            ("https".to_string(), GITHUB_HOST.to_string(), s.to_string())
        };

        let mut segments = path
            .trim_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty());
        let owner = segments.next().ok_or_else(invalid)?;
        let name = segments.next().ok_or_else(invalid)?;
        if segments.next().is_some() {
            return Err(invalid());
        }
        let name = name.strip_suffix(".git").unwrap_or(name);

        Ok(Self {
            scheme,
            host,
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for GitHubRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_form_is_github_com() {
        let repo: GitHubRepository = "acme/api".parse().unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "api");
        assert_eq!(repo.api_url(), "https://api.github.com");
        assert_eq!(
            repo.hooks_url(),
            "https://api.github.com/repos/acme/api/hooks"
        );
        assert_eq!(repo.to_string(), "github.com/acme/api");
    }

    #[test]
    fn test_github_url_with_git_suffix() {
        let repo: GitHubRepository = "https://github.com/acme/api.git".parse().unwrap();
        assert_eq!(repo.name, "api");
        assert_eq!(repo.api_url(), "https://api.github.com");
    }

    #[test]
    fn test_enterprise_host_keeps_scheme_and_port() {
        let repo: GitHubRepository = "http://ghe.internal:8080/acme/api/".parse().unwrap();
        assert_eq!(repo.api_url(), "http://ghe.internal:8080/api/v3");
    }

    #[test]
    fn test_rejects_incomplete_coordinates() {
        assert!("acme".parse::<GitHubRepository>().is_err());
        assert!("acme/api/extra".parse::<GitHubRepository>().is_err());
        assert!("https://github.com/".parse::<GitHubRepository>().is_err());
    }
}
