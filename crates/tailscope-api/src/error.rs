use thiserror::Error;

/// Error taxonomy for the dashboard API and the components built on it
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network failure or non-2xx response from the backend
    #[error("transport error{}: {message}", status_suffix(.status))]
    Transport {
        /// HTTP status, if a response was received at all
        status: Option<u16>,
        message: String,
    },

    /// 401 / expired credential; propagated unmodified, never retried here
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Precondition failure raised before any network call (e.g. no AI
    /// provider configured)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Input rejected synchronously, never reaches the network
    #[error("validation error: {0}")]
    Validation(String),

    /// Bearer credential missing at client construction
    #[error("no bearer credential supplied")]
    MissingCredential,
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}

impl ApiError {
    /// Map an HTTP status and response body to the right error variant
    pub fn from_status(status: u16, body: String) -> Self {
        let message = if body.trim().is_empty() {
            format!("request failed with status {status}")
        } else {
            body
        };
        if status == 401 {
            ApiError::Auth(message)
        } else {
            ApiError::Transport {
                status: Some(status),
                message,
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
