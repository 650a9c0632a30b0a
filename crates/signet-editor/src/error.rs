//! Error types for the editing session.

use miette::Diagnostic;
use signet_common::SignetError;
use signet_editor_core::PlatformError;

/// The session is not in a state that accepts the request.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SessionError {
    /// Mutations before hydration are not trusted.
    #[error("editor is still loading")]
    #[diagnostic(code(signet::session::not_hydrated))]
    NotHydrated,

    #[error("a save is already in progress")]
    #[diagnostic(code(signet::session::saving))]
    Saving,

    /// The signature was saved and the session has handed off to navigation.
    #[error("session is closed")]
    #[diagnostic(code(signet::session::closed))]
    Closed,
}

/// Failure while turning a picked file into an embedded image.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum EmbedError {
    #[error("image is {size} bytes, the limit is {limit} bytes")]
    #[diagnostic(
        code(signet::image::too_large),
        help("pick an image under 500 KB")
    )]
    TooLarge { size: u64, limit: u64 },

    #[error("could not read image file: {0}")]
    #[diagnostic(code(signet::image::read))]
    Read(#[source] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),
}

/// Failure of an explicit save.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum SaveError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),

    #[error("failed to save signature: {0}")]
    #[diagnostic(code(signet::save::store))]
    Store(#[from] SignetError),

    /// The record was stored but leaving the editor failed.
    #[error("saved, but navigation failed: {0}")]
    #[diagnostic(code(signet::save::navigation))]
    Navigation(PlatformError),
}
