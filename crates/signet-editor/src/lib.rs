//! signet-editor: an editing session for HTML email signatures.
//!
//! Wraps a [`signet_editor_core::Surface`] with:
//! - a hydration guard that seeds it once from the stored record
//! - a capture pipe that mirrors it into the form field and the preview
//! - inline image embedding under a size limit
//! - a save coordinator that reads the live surface at commit time

pub mod capture;
pub mod error;
pub mod hydration;
pub mod image;
pub mod preview;
pub mod save;
pub mod session;

pub use capture::{CapturePipe, FieldMirror, TaskQueue};
pub use error::{EmbedError, SaveError, SessionError};
pub use hydration::{HydrationGuard, LOADING_PLACEHOLDER};
pub use image::{EmbeddedImage, ImageEmbedder, ImageFile, LocalImageFile, MAX_IMAGE_BYTES};
pub use preview::PreviewStore;
pub use save::{LiveFields, SaveCoordinator, SaveTarget, SignatureStore};
pub use session::{EditingSession, Host, SIGNATURE_LIST_ROUTE, SessionState};

pub use signet_editor_core as editor_core;
