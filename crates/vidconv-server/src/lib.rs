//! vidconv-server
//!
//! HTTP front end of the video converter, wired to the lifecycle core.

pub mod api;
pub mod config;

pub use config::ServerConfig;

/// `RUST_LOG` fallback.
pub const DEFAULT_LOG_FILTER: &str = "vidconv_server=info,vidconv_core=info,tower_http=info";
