//! Read-only HTTP access to collection rows for external sites.

pub mod config;
pub mod error;
pub mod server;

pub use config::{ProxyConfig, init_tracing};
pub use error::ProxyError;
pub use server::{AppState, read_collection, resolve_collection, router};
