//! Hook configuration: data model, store and persistence backends

pub mod persistence;
pub mod store;
pub mod types;

pub use persistence::{ConfigPersistence, MemoryPersistence, TomlFilePersistence};
pub use store::{default_hook_url, parse_hook_url, HookConfigStore, WEBHOOK_PATH};
pub use types::{Credential, HookConfigUpdate, HookConfiguration, HookMode, GITHUB_API_URL};
