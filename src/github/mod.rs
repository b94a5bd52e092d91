//! GitHub push trigger
//!
//! Concrete [`crate::runtime::PushTrigger`] that registers a `push` webhook on
//! each of a job's repositories through the GitHub REST API, using the
//! credentials held by the hook configuration store.

mod repository;
mod trigger;

pub use repository::GitHubRepository;
pub use trigger::GitHubPushTrigger;
