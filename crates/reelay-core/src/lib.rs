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

//! Tool-agnostic job orchestration primitives.
//!
//! This crate owns the job record model and its state machine, the progress
//! line parser, the concurrent job registry, the format-selection policy and
//! metadata normalisation. Adapters that actually spawn the extraction tool
//! live in `reelay-ytdlp`; the HTTP surface lives in `reelay-api`.

pub mod error;
pub mod format;
pub mod metadata;
pub mod model;
pub mod parser;
pub mod registry;
pub mod service;

pub use error::{JobError, JobResult};
pub use format::{AUDIO_FORMAT, FormatPlan, MERGED_FORMAT_ID, host_requires_combined};
pub use metadata::{FormatDescriptor, FormatKind, MetadataSummary, parse_metadata};
pub use model::{
    DownloadRequest, JobCounts, JobId, JobRecord, JobStatus, ProgressUpdate, STDERR_TAIL_LIMIT,
    require_url,
};
pub use parser::parse_line;
pub use registry::JobRegistry;
pub use service::{JobWorkflow, MetadataSource};
