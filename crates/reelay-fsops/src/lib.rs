//! Download directory management and the serve-once artifact lifecycle.
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

pub mod artifact;
pub mod error;
pub mod store;

pub use artifact::{Artifact, ArtifactManager, ArtifactStream};
pub use error::{FsOpsError, FsOpsResult};
pub use store::ArtifactStore;
