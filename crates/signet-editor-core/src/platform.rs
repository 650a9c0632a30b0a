//! Platform abstraction traits for host interaction.
//!
//! The editing core never talks to a UI directly. Prompts, notifications
//! and navigation go through these traits, which the embedding application
//! implements for its framework (and tests implement with recorders).

/// Error type for platform operations.
#[derive(Debug, Clone)]
pub struct PlatformError(pub String);

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PlatformError {}

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// User-facing notifications.
///
/// `warn`, `success` and `error` are transient toasts; `alert` blocks until
/// the user acknowledges it.
pub trait Notifier {
    fn warn(&self, message: &str);
    fn alert(&self, message: &str);
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Asks the user for a link target.
pub trait LinkPrompt {
    /// Returns `None` when the user cancels.
    fn ask_url(&self, message: &str) -> Option<String>;
}

/// Moves the host away from the editing screen.
pub trait Navigator {
    fn leave(&self, destination: &str) -> Result<(), PlatformError>;
}
