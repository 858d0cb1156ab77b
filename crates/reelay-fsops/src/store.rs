//! Download directory layout and post-exit artifact discovery.

use std::fs;
use std::path::{Path, PathBuf};

use reelay_core::JobId;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

const FILE_PREFIX: &str = "file_";
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

/// Writable directory that holds in-flight and completed artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create the directory if needed and return a store rooted there.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn prepare(root: impl Into<PathBuf>) -> FsOpsResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| FsOpsError::Io {
            operation: "store.prepare",
            path: root.clone(),
            source,
        })?;
        debug!(path = %root.display(), "download directory ready");
        Ok(Self { root })
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output template embedding the job identifier; the tool fills in `%(ext)s`.
    #[must_use]
    pub fn output_template(&self, id: JobId) -> PathBuf {
        self.root.join(format!("{FILE_PREFIX}{id}.%(ext)s"))
    }

    /// Find the completed file whose name contains `id`.
    ///
    /// Partial downloads are ignored. When several candidates remain, `hint`
    /// wins if it is among them, otherwise the shortest name (the merged
    /// output rather than a per-stream intermediate).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn locate(&self, id: JobId, hint: Option<&Path>) -> FsOpsResult<Option<PathBuf>> {
        let needle = id.to_string();
        let mut candidates = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|source| FsOpsError::Walkdir {
                operation: "store.locate",
                path: self.root.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !name.contains(&needle) || is_partial(name) {
                continue;
            }
            candidates.push(entry.into_path());
        }

        if let Some(hint) = hint
            && let Some(found) = candidates.iter().find(|path| path.as_path() == hint)
        {
            return Ok(Some(found.clone()));
        }

        candidates.sort_by(|a, b| {
            let a_len = a.as_os_str().len();
            let b_len = b.as_os_str().len();
            a_len.cmp(&b_len).then_with(|| a.cmp(b))
        });
        if candidates.is_empty() {
            warn!(job_id = %id, path = %self.root.display(), "no artifact matched job id");
        }
        Ok(candidates.into_iter().next())
    }
}

fn is_partial(name: &str) -> bool {
    PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) || name.contains(".part-Frag")
}
