//! Error types shared across signet crates.

use miette::Diagnostic;

/// Main error type for signet operations
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum SignetError {
    /// Transport-level HTTP failure (connect, timeout, body decode)
    #[error(transparent)]
    #[diagnostic(code(signet::http))]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("api error {status}: {message}")]
    #[diagnostic(code(signet::api))]
    Api { status: u16, message: String },

    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    #[diagnostic(code(signet::config), help("check the SIGNET_* environment variables"))]
    Config(String),

    /// Serialization/deserialization error
    #[error(transparent)]
    #[diagnostic(code(signet::serde))]
    Serde(#[from] serde_json::Error),

    /// IO error
    #[error(transparent)]
    #[diagnostic(code(signet::io))]
    Io(#[from] std::io::Error),
}

impl SignetError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// HTTP status of an API rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T, E = SignetError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = SignetError::Api {
            status: 422,
            message: "name is required".into(),
        };
        assert_eq!(err.to_string(), "api error 422: name is required");
        assert_eq!(err.status(), Some(422));
    }

    #[test]
    fn test_serde_conversion() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("nope");
        let err: SignetError = parse.unwrap_err().into();
        assert!(matches!(err, SignetError::Serde(_)));
        assert_eq!(err.status(), None);
    }
}
