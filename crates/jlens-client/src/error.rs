//! Normalized error type for panel service operations.
//!
//! Transport-agnostic errors that hide HTTP client details and provide
//! actionable categories for callers. Nothing here is fatal: every error
//! ends up as a rendered status message, never a panic or process exit.

/// Normalized error for panel service operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    /// The backend rejected the session (HTTP 401). Callers must redirect
    /// the user to the external login flow.
    #[error("session expired or not authenticated")]
    Unauthorized,

    /// The backend is unreachable or the connection failed.
    #[error("transport: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("unexpected reply ({status}): {body}")]
    BadReply { status: u16, body: String },

    /// Request validation failed before any network call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl PanelError {
    /// Whether this error must send the user back to the login flow.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::PanelError;

    #[test]
    fn display_is_terse() {
        let err = PanelError::BadReply {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "unexpected reply (503): maintenance");
        assert!(!err.is_auth());
        assert!(PanelError::Unauthorized.is_auth());
    }
}
