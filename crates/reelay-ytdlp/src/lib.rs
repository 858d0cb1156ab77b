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

//! Extraction tool adapter.
//!
//! Layout: `command.rs` (argv and environment for the child process),
//! `supervisor.rs` (per-job subprocess lifecycle), `metadata.rs`
//! (`--dump-json` round trip), `error.rs` (process-level failures).

pub mod command;
pub mod error;
pub mod metadata;
pub mod supervisor;

pub use command::{ToolCommand, ToolOutput};
pub use error::{ToolError, ToolResult};
pub use metadata::MetadataFetcher;
pub use supervisor::{Supervisor, SupervisorSettings};
