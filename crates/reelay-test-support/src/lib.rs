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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (env probes, sample payloads), fake_tool.rs (scripted extraction tool).

pub mod fake_tool;
pub mod fixtures;

pub use fake_tool::{FakeTool, FakeToolMode};
pub use fixtures::{SAMPLE_INFO_JSON, shell_available};
