use thiserror::Error;

/// Failure of a single call against one of the backend endpoints.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    Transport(String),
    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: &'static str,
        status: u16,
        /// Server-provided `error` field, when the body carried a non-empty one.
        error: Option<String>,
    },
    #[error("invalid response body from {endpoint}: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
}

impl EndpointError {
    pub fn server_error(&self) -> Option<&str> {
        match self {
            Self::Status { error, .. } => error.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unsupported locale '{0}'")]
    UnsupportedLocale(String),
    #[error("malformed message catalog: {0}")]
    Malformed(#[from] toml::de::Error),
}
