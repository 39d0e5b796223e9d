use thiserror::Error;

/// Errors returned by a [`Storage`](crate::Storage) implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// All errors stemming from the reqwest client.
    ///
    /// These are network errors encountered when sending a request or reading its response.
    #[error("reqwest error: {context}")]
    Reqwest {
        /// The operation that failed.
        context: String,
        /// The underlying client error.
        #[source]
        cause: reqwest::Error,
    },

    /// The storage API answered with an unexpected HTTP status.
    #[error("{context}: unexpected status {status}: {body}")]
    Status {
        /// The operation that failed.
        context: String,
        /// The status code returned by the API.
        status: reqwest::StatusCode,
        /// The response body, usually an error description.
        body: String,
    },

    /// The storage API answered successfully, but the response could not be interpreted.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Errors encountered when attempting to authenticate with GCP.
    #[error("GCP authentication error: {0}")]
    GcpAuth(#[from] gcp_auth::Error),

    /// Any other error, which might be specific to a storage implementation.
    #[error("storage error: {context}")]
    Generic {
        /// The operation that failed.
        context: String,
        /// The underlying error.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StorageError {
    /// Returns the HTTP status code if the API rejected the request.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Reqwest { cause, .. } => cause.status(),
            _ => None,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
