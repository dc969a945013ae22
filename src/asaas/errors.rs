//! Error types for the Asaas API client.

#[derive(Debug, thiserror::Error)]
pub enum AsaasApiError {
    #[error("Asaas request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    #[error("Asaas returned status {status}")]
    Status { status: u16, body: String },
    #[error("Failed to parse Asaas response")]
    ParseFailed {
        status: u16,
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Invalid customer id '{0}'")]
    InvalidCustomerId(String),
    #[error("Invalid Asaas base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

impl AsaasApiError {
    /// HTTP status reported by Asaas, when the request got that far.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::ParseFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AsaasApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(reqwest_middleware::Error::Reqwest(err))
    }
}
