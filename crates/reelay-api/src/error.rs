//! Errors raised while hosting the HTTP server.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Failures while binding or running the API server.
#[derive(Debug, Error)]
pub enum ApiServerError {
    /// The listener could not be bound.
    #[error("failed to bind API listener")]
    Bind {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server loop terminated with an error.
    #[error("API server terminated unexpectedly")]
    Serve {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
