//! Unix socket transport between oched and its clients
//!
//! One JSON document per line in each direction: requests from clients,
//! responses and subscribed events from the service. Roles come from the
//! peer UID of the connecting socket.

mod client;
mod server;

pub use client::*;
pub use server::*;

use oche_api::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Server not started")]
    NotStarted,

    /// The service answered with an error response
    #[error("{code:?}: {message}")]
    Rejected { code: ErrorCode, message: String },
}

pub type IpcResult<T> = Result<T, IpcError>;
