use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Network failure (`status: None`) or an error answer from the server
    #[error("Layer fetch failed: {reason}")]
    Fetch { status: Option<u16>, reason: String },

    #[error("Invalid layer document: {0}")]
    Decode(String),

    #[error("Zoom controller has stopped")]
    Closed,
}

impl ClientError {
    pub fn fetch(status: Option<u16>, reason: impl Into<String>) -> Self {
        ClientError::Fetch { status, reason: reason.into() }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::fetch(err.status().map(|s| s.as_u16()), err.to_string())
    }
}
