//! Error types for the Ethereum JSON-RPC client.

use thiserror::Error;

/// Result type for the Ethereum JSON-RPC client.
pub type JsonRpcResult<T> = std::result::Result<T, JsonRpcError>;

/// Error type for the Ethereum JSON-RPC client.
#[derive(Error, Debug)]
pub enum JsonRpcError {
    /// HTTP error.
    #[cfg(feature = "reqwest")]
    #[error("HTTP error {code}: {text}")]
    Http {
        /// HTTP status code.
        code: reqwest::StatusCode,
        /// HTTP response text.
        text: String,
    },
    /// Error while parsing the JSON response.
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
    /// Reqwest error.
    #[cfg(feature = "reqwest")]
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// The node failed to process the request.
    #[error("RPC error: {0}")]
    Rpc(jsonrpc_core::Error),
    /// A single request was sent, but a batch response was received.
    #[error("unexpected batch response: expected single but got batch")]
    UnexpectedBatch,
}
