//! Error types for hook URL probes

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    /// Candidate is not an absolute http(s) URL
    #[error("Malformed URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection refused, DNS failure, TLS failure or timeout
    #[error("Failed to test a connection to {url}: {cause}")]
    Network {
        url: String,
        /// Innermost error in the chain, e.g. the OS error for a refused connection
        cause: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with something other than 200
    #[error("Got {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    /// The endpoint identified itself as a different installation
    #[error("{url} is connecting to a different server instance")]
    IdentityMismatch { url: String },
}

impl ProbeError {
    pub(crate) fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        ProbeError::Network {
            url: url.into(),
            cause: root_cause(&source),
            source,
        }
    }

    /// Metrics label for the failure
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::InvalidUrl { .. } => "invalid_url",
            ProbeError::Network { .. } => "network",
            ProbeError::UnexpectedStatus { .. } => "unexpected_status",
            ProbeError::IdentityMismatch { .. } => "identity_mismatch",
        }
    }
}

/// Message of the last error in the `source()` chain
fn root_cause(error: &(dyn std::error::Error + 'static)) -> String {
    let mut current = error;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}
