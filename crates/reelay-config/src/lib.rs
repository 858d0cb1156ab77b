#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Environment-driven configuration for the Reelay service.
//!
//! Layout: `model.rs` (typed configuration sections), `loader.rs` (environment
//! lookup and cookie discovery), `validate.rs` (value parsing helpers),
//! `defaults.rs` (fallback values), `error.rs`.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{COOKIE_CANDIDATES, discover_cookies_file};
pub use model::{JobSettings, LoggingSettings, ReelayConfig, ServerSettings, ToolSettings};
