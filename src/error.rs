//! Error types for the hook manager

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Operation not allowed in the current hook management mode
    #[error("{0}")]
    PolicyError(String),

    /// A candidate hook URL failed validation and was not saved
    #[error("Hook URL rejected: {0}")]
    HookUrlRejected(String),

    /// The server runtime is not started, or was already shut down
    #[error("Server runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// A job's push trigger failed to register its hooks
    #[error("Hook registration failed for {job}: {message}")]
    HookRegistrationError { job: String, message: String },

    /// Instance identity key could not be loaded or stored
    #[error("Instance identity error: {0}")]
    IdentityError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Failed to write TOML: {0}")]
    TomlWriteError(#[from] toml::ser::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl Error {
    /// Short category name, used as a metrics label and in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ConfigError(_) => "config",
            Error::PolicyError(_) => "policy",
            Error::HookUrlRejected(_) => "hook_url_rejected",
            Error::RuntimeUnavailable(_) => "runtime_unavailable",
            Error::HookRegistrationError { .. } => "registration",
            Error::IdentityError(_) => "identity",
            Error::HttpError(_) => "http",
            Error::IoError(_) => "io",
            Error::TomlParseError(_) | Error::TomlWriteError(_) => "toml",
            Error::SerializationError(_) => "serialization",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
