//! Error kinds surfaced by the login and query flows.

use thiserror::Error;

pub const LOGIN_FAILED: &str = "Login failed.";
pub const REQUEST_FAILED: &str = "Request failed";
pub const NETWORK_ERROR: &str = "Network error. Please try again.";
pub const NOT_STRUCTURED: &str = "The server returned a response that was not structured data.";

/// Every kind ends the request/response cycle it belongs to and is shown to
/// the user; none of them leaves the controller in a half-updated state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Missing or invalid input, caught before any request is sent.
    #[error("{0}")]
    Validation(String),

    /// The worker rejected the credentials.
    #[error("{0}")]
    Auth(String),

    /// The query endpoint answered with a failure status or an error field.
    #[error("{0}")]
    Api(String),

    #[error("Unstructured response: {0}")]
    Parse(String),

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Text shown in the login view or the transcript.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Validation(msg) | Self::Auth(msg) | Self::Api(msg) => msg,
            Self::Parse(_) => NOT_STRUCTURED,
            Self::Transport(_) => NETWORK_ERROR,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
