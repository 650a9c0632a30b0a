//! One-shot seeding of the surface from the initial record.

use signet_editor_core::Surface;

/// Shown in place of the surface until it has been seeded.
pub const LOADING_PLACEHOLDER: &str = "Loading editor…";

/// Tracks whether the surface has been seeded for this mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HydrationGuard {
    hydrated: bool,
}

impl HydrationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Seed `surface` with `content` if this guard has not fired yet.
    ///
    /// Missing content seeds an empty surface. Returns true only on the call
    /// that actually seeded.
    pub fn hydrate(&mut self, surface: &mut Surface, content: Option<&str>) -> bool {
        if self.hydrated {
            tracing::trace!("already hydrated, ignoring initial value");
            return false;
        }
        let content = content.unwrap_or_default();
        surface.seed(content);
        self.hydrated = true;
        tracing::debug!(bytes = content.len(), "surface hydrated");
        true
    }
}
