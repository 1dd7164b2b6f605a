use std::num::ParseIntError;

/// Errors surfaced by the portal client.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// The login page did not contain a `<form>`.
    #[error("could not find login form on {url}")]
    NoFormFound { url: String },

    /// The login POST did not satisfy any success signal.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Any transport fault (timeout, refused connection, unreadable body).
    #[error("error communicating with portal: {0}")]
    Communication(#[source] anyhow::Error),
}

/// Outcome of the one-shot credential validation handshake.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("invalid credentials")]
    InvalidAuth,

    #[error("unexpected error during setup: {0}")]
    Unknown(#[source] PortalError),
}

impl SetupError {
    /// Key of the form error a setup UI should show.
    pub fn form_error_key(&self) -> &'static str {
        match self {
            SetupError::InvalidAuth => "invalid_auth",
            SetupError::Unknown(_) => "unknown",
        }
    }
}

/// A counter row of the absence table held something other than an integer.
#[derive(Debug, thiserror::Error)]
#[error("{label:?} is not a whole number: {value:?}")]
pub struct AbsenceParseError {
    pub label: &'static str,
    pub value: String,
    #[source]
    pub source: ParseIntError,
}
