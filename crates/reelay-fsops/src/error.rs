//! # Design
//!
//! - Constant-message errors for download directory operations.
//! - Operation and path context travel as fields, never inside the message.

use std::io;
use std::path::PathBuf;

use reelay_core::JobError;
use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced while managing the download directory.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory traversal failures.
    #[error("fsops walkdir failure")]
    Walkdir {
        /// Operation that triggered the traversal failure.
        operation: &'static str,
        /// Path involved in the traversal failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
}

impl From<FsOpsError> for JobError {
    fn from(err: FsOpsError) -> Self {
        match err {
            FsOpsError::Io {
                operation,
                path,
                source,
            } => Self::Io {
                operation,
                path,
                source,
            },
            FsOpsError::Walkdir {
                operation,
                path,
                source,
            } => Self::Io {
                operation,
                path,
                source: source.into_io_error().unwrap_or_else(|| {
                    io::Error::other("directory traversal failed")
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert_into_job_errors() {
        let err = FsOpsError::Io {
            operation: "store.prepare",
            path: PathBuf::from("/nope"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "fsops io failure");
        match JobError::from(err) {
            JobError::Io {
                operation, path, ..
            } => {
                assert_eq!(operation, "store.prepare");
                assert_eq!(path, PathBuf::from("/nope"));
            }
            other => panic!("unexpected conversion: {other:?}"),
        }
    }
}
