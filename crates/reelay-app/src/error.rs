//! # Design
//!
//! - Centralize application-level errors for bootstrap and shutdown.
//! - Keep error messages constant while carrying context fields for debugging.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// The `.env` file existed but could not be loaded.
    #[error("failed to load .env file")]
    DotEnv {
        /// Source loader error.
        source: dotenvy::Error,
    },
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: reelay_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: reelay_telemetry::TelemetryError,
    },
    /// Artifact directory operations failed.
    #[error("artifact store operation failed")]
    FsOps {
        /// Operation identifier.
        operation: &'static str,
        /// Source fsops error.
        source: reelay_fsops::FsOpsError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: reelay_api::ApiServerError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: reelay_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: reelay_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn fsops(operation: &'static str, source: reelay_fsops::FsOpsError) -> Self {
        Self::FsOps { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: reelay_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }
}
