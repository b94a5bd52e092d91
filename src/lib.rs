//! GitHub hook manager
//!
//! Keeps the webhook configuration of a build server: whether the server
//! registers GitHub hooks itself, which URL GitHub should post to, and the API
//! credentials used to do so. Candidate hook URLs are probed to confirm they
//! reach this very installation, and hooks can be re-registered for every job
//! in one serialized pass.

pub mod config;
pub mod error;
pub mod github;
pub mod identity;
pub mod manager;
pub mod reregister;
pub mod runtime;
pub mod validator;

#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(feature = "rest-api")]
pub mod rest_api;

pub use crate::error::{Error, Result};
pub use crate::manager::{HookManager, ManagerSettings};
