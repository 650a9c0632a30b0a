use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bytes::Bytes;
use signet_common::{RecordId, SignaturePayload, SignatureRecord, SignetError};
use signet_editor::editor_core::{
    CommandKind, CommandRequest, EditorAction, InputType, Key, KeyBindings, KeyCombo,
    KeydownResult, LinkPrompt, LiveContent, Modifiers, Navigator, Notifier, PlatformError,
    Selection,
};
use signet_editor::{
    EditingSession, EmbedError, Host, ImageFile, LOADING_PLACEHOLDER, LiveFields, SaveError,
    SaveTarget, SessionError, SessionState, SignatureStore,
};

type Log = Rc<RefCell<Vec<String>>>;

struct RecordingNotifier(Log);

impl Notifier for RecordingNotifier {
    fn warn(&self, message: &str) {
        self.0.borrow_mut().push(format!("warn: {message}"));
    }
    fn alert(&self, message: &str) {
        self.0.borrow_mut().push(format!("alert: {message}"));
    }
    fn success(&self, message: &str) {
        self.0.borrow_mut().push(format!("success: {message}"));
    }
    fn error(&self, message: &str) {
        self.0.borrow_mut().push(format!("error: {message}"));
    }
}

struct ScriptedPrompt(RefCell<Vec<Option<String>>>);

impl LinkPrompt for ScriptedPrompt {
    fn ask_url(&self, _message: &str) -> Option<String> {
        self.0.borrow_mut().pop().flatten()
    }
}

struct RecordingNavigator(Log);

impl Navigator for RecordingNavigator {
    fn leave(&self, destination: &str) -> Result<(), PlatformError> {
        self.0.borrow_mut().push(destination.to_owned());
        Ok(())
    }
}

#[derive(Clone)]
struct Controls {
    name: Rc<RefCell<String>>,
    is_default: Rc<Cell<bool>>,
}

impl LiveFields for Controls {
    fn name(&self) -> String {
        self.name.borrow().clone()
    }
    fn is_default(&self) -> bool {
        self.is_default.get()
    }
}

#[derive(Clone, Default)]
struct FakeStore {
    calls: Rc<RefCell<Vec<(String, SignaturePayload)>>>,
    fail_with: Rc<RefCell<Option<String>>>,
    record: Rc<RefCell<Option<SignatureRecord>>>,
    fetches: Rc<Cell<usize>>,
}

impl FakeStore {
    fn respond(&self) -> Result<(), SignetError> {
        match self.fail_with.borrow_mut().take() {
            Some(message) => Err(SignetError::Api {
                status: 500,
                message,
            }),
            None => Ok(()),
        }
    }
}

impl SignatureStore for FakeStore {
    async fn fetch(&self, id: &RecordId) -> Result<SignatureRecord, SignetError> {
        self.fetches.set(self.fetches.get() + 1);
        self.record.borrow().clone().ok_or_else(|| SignetError::Api {
            status: 404,
            message: format!("no signature {id}"),
        })
    }

    async fn update(&self, id: &RecordId, payload: &SignaturePayload) -> Result<(), SignetError> {
        self.calls
            .borrow_mut()
            .push((format!("PUT /signatures/{id}"), payload.clone()));
        self.respond()
    }

    async fn create(&self, payload: &SignaturePayload) -> Result<(), SignetError> {
        self.calls
            .borrow_mut()
            .push(("POST /signatures".into(), payload.clone()));
        self.respond()
    }
}

struct MemoryImage {
    size: u64,
    data: Option<Bytes>,
    reads: Cell<usize>,
}

impl MemoryImage {
    fn png(size: u64) -> Self {
        Self {
            size,
            data: Some(Bytes::from_static(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR")),
            reads: Cell::new(0),
        }
    }

    fn unreadable() -> Self {
        Self {
            size: 10,
            data: None,
            reads: Cell::new(0),
        }
    }
}

impl ImageFile for MemoryImage {
    fn name(&self) -> &str {
        "logo.png"
    }
    fn size(&self) -> u64 {
        self.size
    }
    async fn read(&self) -> std::io::Result<Bytes> {
        self.reads.set(self.reads.get() + 1);
        self.data.clone().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "file went away")
        })
    }
}

struct Harness {
    session: EditingSession<FakeStore>,
    store: FakeStore,
    notices: Log,
    routes: Log,
    controls: Controls,
}

fn harness(target: SaveTarget, links: Vec<Option<String>>) -> Harness {
    let store = FakeStore::default();
    let notices = Log::default();
    let routes = Log::default();
    let controls = Controls {
        name: Rc::new(RefCell::new("Work".into())),
        is_default: Rc::new(Cell::new(false)),
    };
    let host = Host {
        notifier: Box::new(RecordingNotifier(notices.clone())),
        link_prompt: Box::new(ScriptedPrompt(RefCell::new(links))),
        navigator: Box::new(RecordingNavigator(routes.clone())),
        fields: Box::new(controls.clone()),
    };
    Harness {
        session: EditingSession::new(store.clone(), host, target),
        store,
        notices,
        routes,
        controls,
    }
}

fn update_harness() -> Harness {
    harness(SaveTarget::Update(RecordId::from(3)), Vec::new())
}

#[test]
fn test_hydration_is_idempotent() {
    let mut h = update_harness();
    assert_eq!(h.session.state(), SessionState::Hydrating);
    assert_eq!(h.session.display_markup(), LOADING_PLACEHOLDER);

    assert!(h.session.hydrate(Some("<p>Hi</p>")));
    assert!(!h.session.hydrate(Some("<p>Changed upstream</p>")));
    assert_eq!(h.session.surface().markup(), "<p>Hi</p>");
    assert_eq!(h.session.mirror().value(), "<p>Hi</p>");
    assert_eq!(h.session.preview().snapshot(), "<p>Hi</p>");
    assert_eq!(h.session.state(), SessionState::Ready);
}

#[test]
fn test_missing_content_hydrates_empty() {
    let mut h = update_harness();
    assert!(h.session.hydrate(None));
    assert!(!h.session.hydrate(Some("<p>late</p>")));
    assert_eq!(h.session.display_markup(), "");
}

#[test]
fn test_mutations_before_hydration_are_rejected() {
    let mut h = update_harness();
    assert_eq!(
        h.session.dispatch(CommandKind::Bold.into()),
        Err(SessionError::NotHydrated)
    );
    assert_eq!(
        h.session.handle_action(&EditorAction::Insert { text: "x".into() }),
        Err(SessionError::NotHydrated)
    );
    assert!(h.session.queue().is_idle());
    assert_eq!(h.session.preview().snapshot(), "");
}

#[test]
fn test_capture_converges_after_one_turn() {
    let mut h = update_harness();
    h.session.hydrate(Some("<p>Hi</p>"));
    h.session.set_selection(Some(Selection::collapsed(2))).unwrap();

    for ch in ["!", "!", "?"] {
        h.session
            .handle_input(&InputType::InsertText, Some(ch))
            .unwrap();
        // The preview follows synchronously, the field does not.
        assert_eq!(h.session.preview().snapshot(), h.session.live_markup());
    }
    assert_eq!(h.session.state(), SessionState::Editing);
    assert_eq!(h.session.mirror().value(), "<p>Hi</p>");

    assert_eq!(h.session.queue().run_turn(), 3);
    assert_eq!(h.session.mirror().value(), "<p>Hi!!?</p>");
    assert_eq!(h.session.mirror().value(), h.session.live_markup());
    assert_eq!(h.session.state(), SessionState::Ready);
}

#[test]
fn test_field_listener_is_notified() {
    let mut h = update_harness();
    let changes = Log::default();
    let sink = changes.clone();
    h.session
        .mirror()
        .on_change(move |value| sink.borrow_mut().push(value.to_owned()));

    h.session.hydrate(Some("<p>a</p>"));
    h.session.set_selection(Some(Selection::new(0, 1))).unwrap();
    h.session.dispatch(CommandKind::Italic.into()).unwrap();
    assert!(changes.borrow().is_empty());

    h.session.queue().settle();
    assert_eq!(*changes.borrow(), vec!["<p><i>a</i></p>".to_owned()]);
}

#[test]
fn test_bold_twice_restores_markup() {
    let mut h = update_harness();
    h.session.hydrate(Some("<p>Jane Doe</p>"));
    h.session.set_selection(Some(Selection::new(0, 4))).unwrap();

    assert!(h.session.dispatch(CommandKind::Bold.into()).unwrap());
    assert_eq!(h.session.live_markup(), "<p><b>Jane</b> Doe</p>");
    assert!(h.session.query_state(CommandKind::Bold));

    assert!(h.session.dispatch(CommandKind::Bold.into()).unwrap());
    assert_eq!(h.session.live_markup(), "<p>Jane Doe</p>");
    h.session.queue().settle();
    assert_eq!(h.session.mirror().value(), "<p>Jane Doe</p>");
}

#[test]
fn test_shortcuts_and_tab() {
    let mut h = update_harness();
    h.session.hydrate(Some("<p>ab</p>"));
    h.session.set_selection(Some(Selection::new(0, 2))).unwrap();

    let bold = KeyCombo::with_modifiers(Key::character("B"), Modifiers::CTRL);
    assert_eq!(h.session.handle_key(&bold), Ok(KeydownResult::Handled));
    assert_eq!(h.session.live_markup(), "<p><b>ab</b></p>");

    let undo = KeyCombo::with_modifiers(Key::character("z"), Modifiers::CTRL);
    assert_eq!(h.session.handle_key(&undo), Ok(KeydownResult::Handled));
    assert_eq!(h.session.live_markup(), "<p>ab</p>");

    h.session.set_selection(Some(Selection::collapsed(2))).unwrap();
    assert_eq!(
        h.session.handle_key(&KeyCombo::new(Key::Tab)),
        Ok(KeydownResult::Handled)
    );
    assert_eq!(h.session.live_markup(), "<p>ab&nbsp;&nbsp;&nbsp;&nbsp;</p>");

    assert_eq!(
        h.session.handle_key(&KeyCombo::new(Key::ArrowLeft)),
        Ok(KeydownResult::PassThrough)
    );
    assert_eq!(
        h.session.handle_key(&KeyCombo::new(Key::character("q"))),
        Ok(KeydownResult::NotHandled)
    );
}

#[test]
fn test_custom_binding() {
    let mut h = update_harness();
    let mut bindings = KeyBindings::defaults(false);
    let strike = KeyCombo::with_modifiers(Key::character("x"), Modifiers::CTRL_SHIFT);
    bindings.bind(
        strike.clone(),
        EditorAction::Command(CommandKind::StrikeThrough),
    );
    h.session = h.session.with_bindings(bindings);

    h.session.hydrate(Some("<p>ab</p>"));
    h.session.set_selection(Some(Selection::new(0, 2))).unwrap();
    assert_eq!(h.session.handle_key(&strike), Ok(KeydownResult::Handled));
    assert_eq!(h.session.live_markup(), "<p><strike>ab</strike></p>");
    assert!(h.session.query_state(CommandKind::StrikeThrough));
}

#[test]
fn test_paste_is_plain_text() {
    let mut h = update_harness();
    h.session.hydrate(Some("<p>az</p>"));
    h.session.set_selection(Some(Selection::collapsed(1))).unwrap();

    assert!(
        h.session
            .handle_input(&InputType::InsertFromPaste, Some("<b>b</b>\r\nc"))
            .unwrap()
    );
    assert_eq!(h.session.surface().text_content(), "a<b>b</b>\ncz");
    assert!(h.session.live_markup().contains("&lt;b&gt;"));
}

#[test]
fn test_link_prompt() {
    // Answers are popped from the end.
    let mut h = harness(
        SaveTarget::Create,
        vec![Some("https://example.com".into()), Some("   ".into()), None],
    );
    h.session.hydrate(Some("<p>site</p>"));
    h.session.set_selection(Some(Selection::new(0, 4))).unwrap();

    assert_eq!(h.session.dispatch(CommandKind::CreateLink.into()), Ok(false));
    assert_eq!(h.session.dispatch(CommandKind::CreateLink.into()), Ok(false));
    assert!(h.session.queue().is_idle());
    assert_eq!(h.session.live_markup(), "<p>site</p>");

    assert_eq!(h.session.dispatch(CommandKind::CreateLink.into()), Ok(true));
    assert_eq!(
        h.session.live_markup(),
        r#"<p><a href="https://example.com">site</a></p>"#
    );
}

#[test]
fn test_font_size_and_color() {
    let mut h = update_harness();
    h.session.hydrate(Some("<p>Call me</p>"));
    h.session.set_selection(Some(Selection::new(0, 4))).unwrap();

    assert!(h.session.dispatch(CommandRequest::font_size_px(24)).unwrap());
    assert_eq!(h.session.current_font_level(), Some(6));
    assert!(h.session.dispatch(CommandRequest::fore_color("#336699")).unwrap());
    insta::assert_snapshot!(
        h.session.live_markup(),
        @r##"<p><font color="#336699"><font size="6">Call</font></font> me</p>"##
    );
}

#[tokio::test]
async fn test_image_size_boundary() {
    let mut h = update_harness();
    h.session.hydrate(Some("<p>Hi</p>"));

    let over = MemoryImage::png(512_001);
    let err = h.session.embed_image(&over).await.unwrap_err();
    assert!(matches!(err, EmbedError::TooLarge { .. }));
    assert_eq!(over.reads.get(), 0);
    assert_eq!(h.session.live_markup(), "<p>Hi</p>");
    assert!(h.session.queue().is_idle());
    assert_eq!(
        *h.notices.borrow(),
        vec!["warn: Image must be smaller than 500 KB.".to_owned()]
    );

    let exact = MemoryImage::png(512_000);
    h.session.embed_image(&exact).await.unwrap();
    assert_eq!(exact.reads.get(), 1);
    assert!(h.session.live_markup().contains("<img src=\"data:image/png;base64,"));
}

#[tokio::test]
async fn test_image_read_failure_alerts() {
    let mut h = update_harness();
    h.session.hydrate(Some("<p>Hi</p>"));

    let err = h
        .session
        .embed_image(&MemoryImage::unreadable())
        .await
        .unwrap_err();
    assert!(matches!(err, EmbedError::Read(_)));
    assert_eq!(h.session.live_markup(), "<p>Hi</p>");
    assert_eq!(
        *h.notices.borrow(),
        vec!["alert: Could not read the image file.".to_owned()]
    );
}

#[tokio::test]
async fn test_image_appended_then_saved() {
    let mut h = update_harness();
    h.session.hydrate(Some("<p>Hi</p>"));

    h.session.embed_image(&MemoryImage::png(16)).await.unwrap();
    h.session.save().await.unwrap();

    let calls = h.store.calls.borrow();
    assert_eq!(calls.len(), 1);
    let (request, payload) = &calls[0];
    assert_eq!(request, "PUT /signatures/3");
    assert!(payload.content.starts_with("<p>Hi</p><img src=\"data:image/png;base64,"));
    assert!(
        payload
            .content
            .ends_with(r#"" style="width: 600px; height: auto;">"#)
    );
}

#[tokio::test]
async fn test_image_at_caret_goes_into_paragraph() {
    let mut h = update_harness();
    h.session.hydrate(Some("<p>Hi</p>"));
    h.session.set_selection(Some(Selection::collapsed(2))).unwrap();

    h.session.embed_image(&MemoryImage::png(16)).await.unwrap();
    let markup = h.session.live_markup();
    assert!(markup.starts_with("<p>Hi<img "));
    assert!(markup.ends_with("</p>"));
}

#[tokio::test]
async fn test_typed_text_saved_from_empty() {
    let mut h = harness(SaveTarget::Create, Vec::new());
    h.session.hydrate(None);
    h.session
        .handle_action(&EditorAction::Insert {
            text: "text".into(),
        })
        .unwrap();
    h.session.save().await.unwrap();

    let calls = h.store.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "POST /signatures");
    assert_eq!(calls[0].1.content, "<p>text</p>");
}

#[tokio::test]
async fn test_save_wins_over_stale_mirror() {
    let mut h = update_harness();
    h.session.hydrate(Some("<p>old</p>"));
    h.session.set_selection(Some(Selection::new(0, 3))).unwrap();
    h.session
        .handle_action(&EditorAction::Insert { text: "new".into() })
        .unwrap();
    *h.controls.name.borrow_mut() = "Personal".into();
    h.controls.is_default.set(true);

    // Nothing has run the queue, so the field still holds the seed.
    assert_eq!(h.session.mirror().value(), "<p>old</p>");
    h.session.save().await.unwrap();

    let calls = h.store.calls.borrow();
    assert_eq!(
        calls[0].1,
        SignaturePayload {
            name: "Personal".into(),
            content: "<p>new</p>".into(),
            is_default: true,
        }
    );
    assert_eq!(h.session.state(), SessionState::Saved);
    assert_eq!(*h.routes.borrow(), vec!["/signatures".to_owned()]);
    assert_eq!(
        h.notices.borrow().last().map(String::as_str),
        Some("success: Signature saved.")
    );
}

#[tokio::test]
async fn test_failed_save_keeps_content() {
    let mut h = update_harness();
    h.session.hydrate(Some("<p>keep me</p>"));
    *h.store.fail_with.borrow_mut() = Some("database unavailable".into());

    let err = h.session.save().await.unwrap_err();
    assert!(matches!(err, SaveError::Store(SignetError::Api { status: 500, .. })));
    assert_eq!(h.session.state(), SessionState::Ready);
    assert_eq!(h.session.live_markup(), "<p>keep me</p>");
    assert!(h.routes.borrow().is_empty());
    assert_eq!(
        *h.notices.borrow(),
        vec!["error: Failed to save signature: api error 500: database unavailable".to_owned()]
    );
    assert!(h.session.last_save_error().is_some());

    // A retry goes through.
    h.session.save().await.unwrap();
    assert_eq!(h.store.calls.borrow().len(), 2);
    assert_eq!(h.session.state(), SessionState::Saved);
}

#[tokio::test]
async fn test_saving_and_saved_reject_further_work() {
    let mut h = update_harness();
    h.session.hydrate(Some("<p>x</p>"));

    let payload = h.session.begin_save().unwrap();
    assert_eq!(payload.content, "<p>x</p>");
    assert_eq!(h.session.state(), SessionState::Saving);
    assert_eq!(h.session.begin_save(), Err(SessionError::Saving));
    assert_eq!(
        h.session.dispatch(CommandKind::Bold.into()),
        Err(SessionError::Saving)
    );

    h.session.finish_save(Ok(())).unwrap();
    assert!(matches!(
        h.session.save().await,
        Err(SaveError::Session(SessionError::Closed))
    ));
    assert!(h.store.calls.borrow().is_empty());
}

const OUTLOOK_SIGNATURE: &str = concat!(
    r#"<table cellpadding="0" cellspacing="0" style="font-family: Arial, sans-serif;"><tr>"#,
    r#"<td style="padding-right: 12px;"><img src="data:image/png;base64,AAAA" width="64"></td>"#,
    r#"<td><b style="color: #1a1a1a;">Ren&eacute; M&uuml;ller</b><br>"#,
    r#"<span style="font-size: 12px; color: #666666;">Gesch&auml;ftsf&uuml;hrer &middot; Caf&eacute; &amp; Co.</span><br>"#,
    r#"<a href="https://example.com/?a=1&amp;b=2" style="color: #0066cc;">example.com</a>"#,
    r#"</td></tr></table>"#,
);

/// `OUTLOOK_SIGNATURE` with its named references written as characters.
const OUTLOOK_SIGNATURE_DECODED: &str = concat!(
    r#"<table cellpadding="0" cellspacing="0" style="font-family: Arial, sans-serif;"><tr>"#,
    r#"<td style="padding-right: 12px;"><img src="data:image/png;base64,AAAA" width="64"></td>"#,
    r#"<td><b style="color: #1a1a1a;">René Müller</b><br>"#,
    r#"<span style="font-size: 12px; color: #666666;">Geschäftsführer · Café &amp; Co.</span><br>"#,
    r#"<a href="https://example.com/?a=1&amp;b=2" style="color: #0066cc;">example.com</a>"#,
    r#"</td></tr></table>"#,
);

fn stored(content: Option<&str>) -> SignatureRecord {
    SignatureRecord {
        id: RecordId::from(3),
        name: "Work".into(),
        content: content.map(str::to_owned),
        is_default: false,
    }
}

#[tokio::test]
async fn test_real_signature_survives_one_keystroke() {
    let mut h = update_harness();
    *h.store.record.borrow_mut() = Some(stored(Some(OUTLOOK_SIGNATURE)));
    assert!(h.session.load().await.unwrap());
    assert_eq!(h.session.live_markup(), OUTLOOK_SIGNATURE);

    // Logo cell is position 0, the name starts at 2 in the next cell.
    h.session.set_selection(Some(Selection::collapsed(13))).unwrap();
    h.session
        .handle_input(&InputType::InsertText, Some("!"))
        .unwrap();
    h.session.save().await.unwrap();

    let calls = h.store.calls.borrow();
    assert_eq!(calls.len(), 1);
    let content = &calls[0].1.content;
    assert_eq!(
        *content,
        OUTLOOK_SIGNATURE_DECODED.replacen("Müller", "Müller!", 1)
    );
    assert_eq!(content.replacen('!', "", 1), OUTLOOK_SIGNATURE_DECODED);
    assert!(
        h.session
            .surface()
            .text_content()
            .contains("René Müller!\nGeschäftsführer · Café & Co.")
    );
}

#[tokio::test]
async fn test_load_seeds_from_store() {
    let mut h = update_harness();
    *h.store.record.borrow_mut() = Some(stored(Some("<p>Hi</p>")));
    assert!(h.session.load().await.unwrap());
    assert_eq!(h.session.mirror().value(), "<p>Hi</p>");
    assert_eq!(h.session.state(), SessionState::Ready);

    // Later loads do not re-seed.
    *h.store.record.borrow_mut() = Some(stored(Some("<p>Changed upstream</p>")));
    assert!(!h.session.load().await.unwrap());
    assert_eq!(h.session.live_markup(), "<p>Hi</p>");
    assert_eq!(h.store.fetches.get(), 2);
}

#[tokio::test]
async fn test_load_for_new_signature_skips_fetch() {
    let mut h = harness(SaveTarget::Create, Vec::new());
    assert!(h.session.load().await.unwrap());
    assert_eq!(h.session.display_markup(), "");
    assert_eq!(h.store.fetches.get(), 0);
}

#[tokio::test]
async fn test_failed_load_stays_hydrating() {
    let mut h = update_harness();
    let err = h.session.load().await.unwrap_err();
    assert!(matches!(err, SignetError::Api { status: 404, .. }));
    assert_eq!(h.session.state(), SessionState::Hydrating);
    assert_eq!(h.session.display_markup(), LOADING_PLACEHOLDER);
}
