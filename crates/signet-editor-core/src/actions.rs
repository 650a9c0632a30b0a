//! Editor actions, input types and key bindings.
//!
//! Platform-agnostic definitions for editing operations. `EditorAction` is
//! the semantic operation, `InputType` the intent carried by an input event
//! and `KeyCombo` a keyboard shortcut.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::commands::CommandKind;

/// Text inserted by the Tab key: four non-breaking spaces.
pub const TAB_TEXT: &str = "\u{a0}\u{a0}\u{a0}\u{a0}";

/// The `inputType` of a `beforeinput` event, limited to what the surface
/// handles. Other values parse to `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputType {
    InsertText,
    /// Shift+Enter.
    InsertLineBreak,
    /// Enter.
    InsertParagraph,
    InsertFromPaste,
    /// Spellcheck and autocorrect replacements.
    InsertReplacementText,

    DeleteContentBackward,
    DeleteContentForward,
    DeleteByCut,

    HistoryUndo,
    HistoryRedo,

    FormatBold,
    FormatItalic,
    FormatUnderline,
    FormatStrikeThrough,

    Unknown(String),
}

impl InputType {
    /// Parse a W3C `inputType` string.
    pub fn parse(name: &str) -> Self {
        match name {
            "insertText" => Self::InsertText,
            "insertLineBreak" => Self::InsertLineBreak,
            "insertParagraph" => Self::InsertParagraph,
            "insertFromPaste" => Self::InsertFromPaste,
            "insertReplacementText" => Self::InsertReplacementText,
            "deleteContentBackward" => Self::DeleteContentBackward,
            "deleteContentForward" => Self::DeleteContentForward,
            "deleteByCut" => Self::DeleteByCut,
            "historyUndo" => Self::HistoryUndo,
            "historyRedo" => Self::HistoryRedo,
            "formatBold" => Self::FormatBold,
            "formatItalic" => Self::FormatItalic,
            "formatUnderline" => Self::FormatUnderline,
            "formatStrikeThrough" => Self::FormatStrikeThrough,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_deletion(&self) -> bool {
        matches!(
            self,
            Self::DeleteContentBackward | Self::DeleteContentForward | Self::DeleteByCut
        )
    }

    /// The action this input performs, given the event's text payload.
    ///
    /// Pasted text is inserted as plain text.
    pub fn to_action(&self, data: Option<&str>) -> Option<EditorAction> {
        let text = || data.filter(|d| !d.is_empty()).map(str::to_string);
        let action = match self {
            Self::InsertText | Self::InsertFromPaste | Self::InsertReplacementText => {
                EditorAction::Insert { text: text()? }
            }
            Self::InsertLineBreak => EditorAction::InsertLineBreak,
            Self::InsertParagraph => EditorAction::InsertParagraph,
            Self::DeleteContentBackward | Self::DeleteByCut => EditorAction::DeleteBackward,
            Self::DeleteContentForward => EditorAction::DeleteForward,
            Self::HistoryUndo => EditorAction::Command(CommandKind::Undo),
            Self::HistoryRedo => EditorAction::Command(CommandKind::Redo),
            Self::FormatBold => EditorAction::Command(CommandKind::Bold),
            Self::FormatItalic => EditorAction::Command(CommandKind::Italic),
            Self::FormatUnderline => EditorAction::Command(CommandKind::Underline),
            Self::FormatStrikeThrough => EditorAction::Command(CommandKind::StrikeThrough),
            Self::Unknown(_) => return None,
        };
        Some(action)
    }
}

/// Editing operations on the surface, decoupled from how they were triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    /// Insert text at the selection (replacing any selected content).
    Insert { text: String },
    /// Insert a line break (Shift+Enter).
    InsertLineBreak,
    /// Enter.
    InsertParagraph,
    /// Backspace.
    DeleteBackward,
    /// Delete.
    DeleteForward,
    /// Select all content.
    SelectAll,
    /// Run a value-less toolbar command.
    Command(CommandKind),
}

/// A pressed key.
///
/// Only the keys the surface reacts to are named; everything else is a
/// `Character` or `Unidentified`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),
    /// Unknown/unidentified key.
    Unidentified,
    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
}

impl Key {
    /// Create a character key. Letters are stored lowercase so that
    /// Shift does not change which binding matches.
    pub fn character(s: impl AsRef<str>) -> Self {
        Self::Character(SmolStr::new(s.as_ref().to_lowercase()))
    }

    /// Caret movement keys, left to the host.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::ArrowLeft
                | Self::ArrowRight
                | Self::ArrowUp
                | Self::ArrowDown
                | Self::Home
                | Self::End
        )
    }
}

/// Which modifier keys were held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };
    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };
    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };
    pub const META: Self = Self {
        meta: true,
        ..Self::NONE
    };
    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        shift: true,
        ..Self::NONE
    };
    pub const META_SHIFT: Self = Self {
        meta: true,
        shift: true,
        ..Self::NONE
    };

    /// Cmd on macOS, Ctrl everywhere else.
    pub fn primary(is_mac: bool) -> Self {
        if is_mac { Self::META } else { Self::CTRL }
    }

    pub fn primary_shift(is_mac: bool) -> Self {
        if is_mac {
            Self::META_SHIFT
        } else {
            Self::CTRL_SHIFT
        }
    }
}

/// A key plus modifiers, the lookup key for [`KeyBindings`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn ctrl(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::CTRL)
    }

    pub fn shift(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::SHIFT)
    }

    pub fn primary(key: Key, is_mac: bool) -> Self {
        Self::with_modifiers(key, Modifiers::primary(is_mac))
    }

    pub fn primary_shift(key: Key, is_mac: bool) -> Self {
        Self::with_modifiers(key, Modifiers::primary_shift(is_mac))
    }
}

/// What the host should do with a keydown after the surface saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum KeydownResult {
    /// Consumed; suppress the default.
    Handled,
    /// No binding matched.
    NotHandled,
    /// Caret movement; the host moves the caret itself.
    PassThrough,
}

/// Keyboard shortcuts for the surface.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: HashMap<KeyCombo, EditorAction>,
}

impl KeyBindings {
    /// The default bindings for the platform.
    pub fn defaults(is_mac: bool) -> Self {
        let mut bindings = HashMap::new();
        let command = |key: &str| KeyCombo::primary(Key::character(key), is_mac);

        bindings.insert(command("b"), EditorAction::Command(CommandKind::Bold));
        bindings.insert(command("i"), EditorAction::Command(CommandKind::Italic));
        bindings.insert(command("u"), EditorAction::Command(CommandKind::Underline));
        bindings.insert(command("z"), EditorAction::Command(CommandKind::Undo));
        bindings.insert(
            KeyCombo::primary_shift(Key::character("z"), is_mac),
            EditorAction::Command(CommandKind::Redo),
        );
        bindings.insert(
            KeyCombo::ctrl(Key::character("y")),
            EditorAction::Command(CommandKind::Redo),
        );
        bindings.insert(command("a"), EditorAction::SelectAll);

        bindings.insert(
            KeyCombo::new(Key::Tab),
            EditorAction::Insert {
                text: TAB_TEXT.to_string(),
            },
        );
        bindings.insert(KeyCombo::new(Key::Enter), EditorAction::InsertParagraph);
        bindings.insert(KeyCombo::shift(Key::Enter), EditorAction::InsertLineBreak);
        bindings.insert(KeyCombo::new(Key::Backspace), EditorAction::DeleteBackward);
        bindings.insert(KeyCombo::new(Key::Delete), EditorAction::DeleteForward);

        Self { bindings }
    }

    pub fn lookup(&self, combo: &KeyCombo) -> Option<&EditorAction> {
        self.bindings.get(combo)
    }

    /// Add or replace a binding.
    pub fn bind(&mut self, combo: KeyCombo, action: EditorAction) {
        self.bindings.insert(combo, action);
    }
}
