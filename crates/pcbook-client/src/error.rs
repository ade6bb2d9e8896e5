//! Client error type.

use tonic::Code;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to read {path}: {reason}")]
    TlsFile { path: String, reason: String },

    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("RPC call failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("Response is missing {0}")]
    EmptyResponse(&'static str),
}

impl ClientError {
    /// gRPC status code, if the failure came from the server.
    pub fn code(&self) -> Option<Code> {
        match self {
            ClientError::Rpc(status) => Some(status.code()),
            _ => None,
        }
    }
}
