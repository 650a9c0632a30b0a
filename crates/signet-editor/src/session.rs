//! The editing session: one mounted signature editor.
//!
//! Owns the surface and wires the hydration guard, capture pipe, image
//! embedder and save coordinator around it. Every mutation goes through a
//! session method, which captures afterwards.

use signet_common::{Config, SignaturePayload, SignetError};
use signet_editor_core::{
    CommandKind, CommandRequest, EditorAction, InputType, KeyBindings, KeyCombo, KeydownResult,
    LinkPrompt, LiveContent, Navigator, Notifier, Selection, Surface, execute_action,
    execute_command, query_command_state,
};

use crate::capture::{CapturePipe, FieldMirror, TaskQueue};
use crate::error::{EmbedError, SaveError, SessionError};
use crate::hydration::{HydrationGuard, LOADING_PLACEHOLDER};
use crate::image::{EmbeddedImage, ImageEmbedder, ImageFile};
use crate::preview::PreviewStore;
use crate::save::{LiveFields, SaveCoordinator, SaveTarget, SignatureStore};

/// Where the host goes after a successful save.
pub const SIGNATURE_LIST_ROUTE: &str = "/signatures";

const LINK_PROMPT: &str = "Enter the link URL:";

/// Host-side collaborators of a session.
pub struct Host {
    pub notifier: Box<dyn Notifier>,
    pub link_prompt: Box<dyn LinkPrompt>,
    pub navigator: Box<dyn Navigator>,
    pub fields: Box<dyn LiveFields>,
}

/// Lifecycle of a session.
///
/// `Editing` means a capture has not reached the field mirror yet; the
/// session returns to `Ready` once the task queue delivers it. A failed save
/// goes back to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Hydrating,
    Ready,
    Editing,
    Saving,
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Saving,
    Saved,
}

pub struct EditingSession<S> {
    surface: Surface,
    guard: HydrationGuard,
    pipe: CapturePipe,
    embedder: ImageEmbedder,
    saver: SaveCoordinator,
    bindings: KeyBindings,
    store: S,
    host: Host,
    phase: Phase,
    embedded_bytes: usize,
    last_save_error: Option<String>,
}

impl<S: SignatureStore> EditingSession<S> {
    pub fn new(store: S, host: Host, target: SaveTarget) -> Self {
        Self {
            surface: Surface::new(),
            guard: HydrationGuard::new(),
            pipe: CapturePipe::new(TaskQueue::new(), FieldMirror::new(), PreviewStore::new()),
            embedder: ImageEmbedder::default(),
            saver: SaveCoordinator::new(target),
            bindings: KeyBindings::defaults(false),
            store,
            host,
            phase: Phase::Open,
            embedded_bytes: 0,
            last_save_error: None,
        }
    }

    /// Use the image limits from `config`.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.embedder = ImageEmbedder::from_config(config);
        self
    }

    /// Deliver field updates through `queue` instead of a private one.
    pub fn with_queue(mut self, queue: TaskQueue) -> Self {
        self.pipe = CapturePipe::new(
            queue,
            self.pipe.mirror().clone(),
            self.pipe.preview().clone(),
        );
        self
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Saved => SessionState::Saved,
            Phase::Saving => SessionState::Saving,
            Phase::Open if !self.guard.is_hydrated() => SessionState::Hydrating,
            Phase::Open if self.pipe.is_behind() => SessionState::Editing,
            Phase::Open => SessionState::Ready,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn mirror(&self) -> &FieldMirror {
        self.pipe.mirror()
    }

    pub fn preview(&self) -> &PreviewStore {
        self.pipe.preview()
    }

    pub fn queue(&self) -> &TaskQueue {
        self.pipe.queue()
    }

    pub fn embedder(&self) -> ImageEmbedder {
        self.embedder
    }

    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }

    /// What the host should render: a placeholder until hydrated, then the
    /// surface markup.
    pub fn display_markup(&self) -> &str {
        if self.guard.is_hydrated() {
            self.surface.markup()
        } else {
            LOADING_PLACEHOLDER
        }
    }

    // === Hydration ===

    /// React to the host's initial value. Only the first call seeds.
    pub fn hydrate(&mut self, initial: Option<&str>) -> bool {
        if !self.guard.hydrate(&mut self.surface, initial) {
            return false;
        }
        self.pipe.prime(self.surface.markup());
        true
    }

    /// Hydrate from the store: the saved record when updating, empty when
    /// creating. Only the first hydration seeds.
    pub async fn load(&mut self) -> Result<bool, SignetError> {
        let content = match self.saver.target().clone() {
            SaveTarget::Update(id) => {
                let record = self.store.fetch(&id).await?;
                tracing::debug!(
                    id = %record.id,
                    has_content = record.content.is_some(),
                    "signature fetched"
                );
                record.content
            }
            SaveTarget::Create => None,
        };
        Ok(self.hydrate(content.as_deref()))
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Saving => Err(SessionError::Saving),
            Phase::Saved => Err(SessionError::Closed),
            Phase::Open if !self.guard.is_hydrated() => Err(SessionError::NotHydrated),
            Phase::Open => Ok(()),
        }
    }

    fn capture(&mut self) -> u64 {
        self.pipe.capture(&self.surface)
    }

    // === Selection ===

    pub fn set_selection(&mut self, selection: Option<Selection>) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.surface.set_selection(selection);
        Ok(())
    }

    // === Commands ===

    /// Run a toolbar command, then capture.
    ///
    /// A link without a URL asks the host for one; cancelling does nothing.
    pub fn dispatch(&mut self, request: CommandRequest) -> Result<bool, SessionError> {
        self.ensure_editable()?;

        let request = if request.kind == CommandKind::CreateLink && request.trimmed_value().is_none()
        {
            match self.host.link_prompt.ask_url(LINK_PROMPT) {
                Some(url) if !url.trim().is_empty() => CommandRequest::create_link(url.trim()),
                _ => {
                    tracing::debug!("link prompt cancelled");
                    return Ok(false);
                }
            }
        } else {
            request
        };

        let changed = execute_command(&mut self.surface, &request);
        self.capture();
        Ok(changed)
    }

    /// Toolbar active state for an inline toggle.
    pub fn query_state(&self, kind: CommandKind) -> bool {
        query_command_state(&self.surface, kind)
    }

    pub fn current_font_level(&self) -> Option<u8> {
        self.surface.current_font_level()
    }

    // === Typing ===

    pub fn handle_action(&mut self, action: &EditorAction) -> Result<bool, SessionError> {
        if let EditorAction::Command(kind) = action {
            return self.dispatch(CommandRequest::new(*kind));
        }
        self.ensure_editable()?;
        let changed = execute_action(&mut self.surface, action);
        if changed {
            self.capture();
        }
        Ok(changed)
    }

    pub fn handle_key(&mut self, combo: &KeyCombo) -> Result<KeydownResult, SessionError> {
        self.ensure_editable()?;
        if combo.key.is_navigation() {
            return Ok(KeydownResult::PassThrough);
        }
        let Some(action) = self.bindings.lookup(combo).cloned() else {
            return Ok(KeydownResult::NotHandled);
        };
        self.handle_action(&action)?;
        Ok(KeydownResult::Handled)
    }

    /// Handle a `beforeinput`-style event.
    pub fn handle_input(
        &mut self,
        input_type: &InputType,
        data: Option<&str>,
    ) -> Result<bool, SessionError> {
        if let (InputType::InsertFromPaste, Some(text)) = (input_type, data) {
            return self.paste_text(text);
        }
        match input_type.to_action(data) {
            Some(action) => self.handle_action(&action),
            None => {
                self.ensure_editable()?;
                Ok(false)
            }
        }
    }

    /// Paste as plain text. Line breaks in the clipboard become `<br>`.
    pub fn paste_text(&mut self, text: &str) -> Result<bool, SessionError> {
        self.ensure_editable()?;
        let text = text.replace("\r\n", "\n");
        let mut changed = false;
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                changed |= self.surface.insert_line_break();
            }
            changed |= self.surface.insert_text(line);
        }
        if changed {
            self.capture();
        }
        Ok(changed)
    }

    // === Images ===

    /// Load `file` and insert it at the selection.
    ///
    /// Oversized files raise a warning and read failures a blocking alert;
    /// in both cases the surface is untouched.
    pub async fn embed_image(&mut self, file: &impl ImageFile) -> Result<(), EmbedError> {
        self.ensure_editable()?;
        let image = match self.embedder.load(file).await {
            Ok(image) => image,
            Err(err) => {
                self.report_embed_error(&err);
                return Err(err);
            }
        };
        self.insert_image(image)?;
        Ok(())
    }

    /// Tell the user why an image was not embedded.
    pub fn report_embed_error(&self, err: &EmbedError) {
        match err {
            EmbedError::TooLarge { .. } => self
                .host
                .notifier
                .warn("Image must be smaller than 500 KB."),
            EmbedError::Read(_) => self.host.notifier.alert("Could not read the image file."),
            EmbedError::Session(_) => {}
        }
    }

    /// Insert an already loaded image at the selection, or at the end when
    /// nothing is selected.
    pub fn insert_image(&mut self, image: EmbeddedImage) -> Result<bool, SessionError> {
        self.ensure_editable()?;
        let changed = self.surface.insert_node(image.to_node());
        self.embedded_bytes += image.src.len();
        tracing::debug!(
            src_bytes = image.src.len(),
            total_embedded_bytes = self.embedded_bytes,
            "image embedded"
        );
        self.capture();
        Ok(changed)
    }

    // === Save ===

    /// Enter `Saving` and build the payload from the live surface.
    pub fn begin_save(&mut self) -> Result<SignaturePayload, SessionError> {
        self.ensure_editable()?;
        let payload = self.saver.payload(&self.surface, self.host.fields.as_ref());
        self.phase = Phase::Saving;
        self.last_save_error = None;
        Ok(payload)
    }

    /// Leave `Saving` with the outcome of the request.
    pub fn finish_save(&mut self, result: Result<(), SignetError>) -> Result<(), SaveError> {
        if self.phase != Phase::Saving {
            return Err(SessionError::Closed.into());
        }
        match result {
            Ok(()) => {
                self.phase = Phase::Saved;
                tracing::info!(save_target = ?self.saver.target(), "signature saved");
                self.host.notifier.success("Signature saved.");
                self.host
                    .navigator
                    .leave(SIGNATURE_LIST_ROUTE)
                    .map_err(SaveError::Navigation)
            }
            Err(err) => {
                self.phase = Phase::Open;
                tracing::error!(error = %err, "failed to save signature");
                self.host
                    .notifier
                    .error(&format!("Failed to save signature: {err}"));
                self.last_save_error = Some(err.to_string());
                Err(SaveError::Store(err))
            }
        }
    }

    /// Save the live content with one request.
    pub async fn save(&mut self) -> Result<(), SaveError> {
        let payload = self.begin_save()?;
        let result = self.saver.commit(&self.store, &payload).await;
        self.finish_save(result)
    }
}

impl<S> LiveContent for EditingSession<S> {
    fn live_markup(&self) -> String {
        self.surface.live_markup()
    }
}
