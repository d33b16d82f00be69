use std::fmt;

/// Error codes the account service uses to say the session cookie is no longer usable.
const SESSION_EXPIRED: &str = "SESSION_EXPIRED";
const INVALID_SESSION: &str = "INVALID_SESSION";
const NOT_AUTHENTICATED: &str = "NOT_AUTHENTICATED";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The server explicitly rejected the current session.
    #[error("Session is no longer valid: {reason}")]
    SessionInvalid { reason: InvalidReason },

    /// The server answered, but not with success.
    #[error("{operation} rejected (HTTP {status}): {message}")]
    Rejected {
        operation: &'static str,
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A 2xx response whose body was not the expected JSON envelope.
    #[error("{operation} returned a malformed response: {detail}")]
    Malformed {
        operation: &'static str,
        detail: String,
    },

    #[error("Network error during {operation}")]
    Network {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Server-supplied error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => code.as_deref(),
            Self::SessionInvalid { reason } => reason.code(),
            _ => None,
        }
    }

    /// Whether this failure means the session has ended, as opposed to a failed request.
    #[must_use]
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, Self::SessionInvalid { .. })
    }

    /// Promotes a rejection carrying a session-invalid signal into [`Error::SessionInvalid`].
    pub(crate) fn into_session_signal(self) -> Self {
        match self {
            Self::Rejected { status, ref code, .. } => {
                match InvalidReason::classify(status, code.as_deref()) {
                    Some(reason) => Self::SessionInvalid { reason },
                    None => self,
                }
            }
            other => other,
        }
    }
}

/// Why the server considers the session invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidReason {
    /// HTTP 401 without one of the recognized codes.
    Unauthorized,
    SessionExpired,
    InvalidSession,
    NotAuthenticated,
}

impl InvalidReason {
    /// Recognized error codes take precedence over the bare status.
    #[must_use]
    pub fn classify(status: u16, code: Option<&str>) -> Option<Self> {
        match code {
            Some(SESSION_EXPIRED) => Some(Self::SessionExpired),
            Some(INVALID_SESSION) => Some(Self::InvalidSession),
            Some(NOT_AUTHENTICATED) => Some(Self::NotAuthenticated),
            _ if status == 401 => Some(Self::Unauthorized),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> Option<&'static str> {
        match self {
            Self::Unauthorized => None,
            Self::SessionExpired => Some(SESSION_EXPIRED),
            Self::InvalidSession => Some(INVALID_SESSION),
            Self::NotAuthenticated => Some(NOT_AUTHENTICATED),
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => f.write_str("unauthorized"),
            Self::SessionExpired => f.write_str("session expired"),
            Self::InvalidSession => f.write_str("invalid session"),
            Self::NotAuthenticated => f.write_str("not authenticated"),
        }
    }
}
