/// User-facing message for a failed refresh.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Fallback message when the transport fails without any status.
pub const NETWORK_FAILURE_MESSAGE: &str = "Network request failed. Please check your connection.";

/// Errors returned by [`AuthenticatedRequestExecutor`](crate::AuthenticatedRequestExecutor).
///
/// `Display` yields the message meant for the end user: server body text when
/// the server sent any, otherwise a status-derived fallback.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No HTTP response was obtained.
    #[error("{}", transport_message(*.status))]
    Transport {
        /// Underlying transport detail, for logs.
        message: String,
        /// Status reported by the transport, if it got that far.
        status: Option<u16>,
    },

    /// Non-success HTTP status.
    #[error("{}", body_or_status(.body, *.status))]
    Server { status: u16, body: String },

    /// Success status, but the body did not match the expected shape.
    #[error("{}", body_or_status(.body, *.status))]
    Decode { status: u16, body: String },

    /// Refresh after a 401 failed; the user has to sign in again.
    #[error("Session expired. Please log in again.")]
    SessionExpired,

    /// Missing or invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse error category derived from structured fields only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    Network,
    SessionExpired,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    Client,
    Server,
    InvalidResponse,
    Config,
}

impl Error {
    /// HTTP status associated with this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Server { status, .. } | Self::Decode { status, .. } => Some(*status),
            Self::SessionExpired | Self::Config(_) => None,
        }
    }

    /// Whether the caller should prompt for re-authentication.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Network,
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::Decode { .. } => ErrorKind::InvalidResponse,
            Self::Config(_) => ErrorKind::Config,
            Self::Server { status, .. } => match *status {
                401 => ErrorKind::Unauthorized,
                403 => ErrorKind::Forbidden,
                404 => ErrorKind::NotFound,
                429 => ErrorKind::RateLimited,
                500.. => ErrorKind::Server,
                _ => ErrorKind::Client,
            },
        }
    }
}

/// Body text if the server sent any, else `"Status code: <code>"`.
fn body_or_status(body: &str, status: u16) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("Status code: {status}")
    } else {
        trimmed.to_owned()
    }
}

fn transport_message(status: Option<u16>) -> String {
    match status {
        Some(status) => format!("Status code: {status}"),
        None => NETWORK_FAILURE_MESSAGE.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_prefers_body_text() {
        let err = Error::Server {
            status: 422,
            body: "  Prompt is too long \n".into(),
        };
        assert_eq!(err.to_string(), "Prompt is too long");
    }

    #[test]
    fn server_error_falls_back_to_status() {
        let err = Error::Server {
            status: 503,
            body: "   ".into(),
        };
        assert_eq!(err.to_string(), "Status code: 503");
    }

    #[test]
    fn decode_error_uses_same_policy() {
        let err = Error::Decode {
            status: 200,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "Status code: 200");
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[test]
    fn transport_error_without_status_is_generic() {
        let err = Error::Transport {
            message: "connection refused".into(),
            status: None,
        };
        assert_eq!(err.to_string(), NETWORK_FAILURE_MESSAGE);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn transport_error_with_status_reports_it() {
        let err = Error::Transport {
            message: "body read interrupted".into(),
            status: Some(502),
        };
        assert_eq!(err.to_string(), "Status code: 502");
    }

    #[test]
    fn session_expired_message_is_fixed() {
        assert_eq!(Error::SessionExpired.to_string(), SESSION_EXPIRED_MESSAGE);
        assert!(Error::SessionExpired.is_session_expired());
    }

    #[test]
    fn kind_comes_from_status_not_text() {
        let err = Error::Server {
            status: 400,
            body: "invalid credentials, network timeout".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Client);

        let err = Error::Server {
            status: 401,
            body: String::new(),
        };
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = Error::Server {
            status: 500,
            body: String::new(),
        };
        assert_eq!(err.kind(), ErrorKind::Server);
    }
}
