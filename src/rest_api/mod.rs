//! REST API module
//!
//! Serves the webhook endpoint GitHub posts to (which also answers hook URL
//! probes with this instance's identity) and the admin API for hook
//! configuration, URL validation and bulk re-registration.

mod dto;
mod handlers;
mod server;
mod webhook;

pub use server::{build_router, run_server, serve};
