//! Toolbar command requests.
//!
//! Command names follow the rich-editing command vocabulary hosts already
//! speak (`bold`, `foreColor`, `insertOrderedList`...), so a toolbar can be
//! wired up by name.

use smol_str::SmolStr;

/// Kinds of command the surface understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    Undo,
    Redo,
    /// Font family; takes the family name.
    FontName,
    /// Font size; takes a pixel size like `"14px"`.
    FontSize,
    /// Text color; takes a CSS color.
    ForeColor,
    /// Highlight color; takes a CSS color.
    BackColor,
    JustifyLeft,
    JustifyCenter,
    JustifyRight,
    InsertOrderedList,
    InsertUnorderedList,
    /// Link over the selection; takes the URL.
    CreateLink,
    RemoveFormat,
}

impl CommandKind {
    pub const ALL: [CommandKind; 17] = [
        CommandKind::Bold,
        CommandKind::Italic,
        CommandKind::Underline,
        CommandKind::StrikeThrough,
        CommandKind::Undo,
        CommandKind::Redo,
        CommandKind::FontName,
        CommandKind::FontSize,
        CommandKind::ForeColor,
        CommandKind::BackColor,
        CommandKind::JustifyLeft,
        CommandKind::JustifyCenter,
        CommandKind::JustifyRight,
        CommandKind::InsertOrderedList,
        CommandKind::InsertUnorderedList,
        CommandKind::CreateLink,
        CommandKind::RemoveFormat,
    ];

    /// The command's wire name.
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Bold => "bold",
            CommandKind::Italic => "italic",
            CommandKind::Underline => "underline",
            CommandKind::StrikeThrough => "strikeThrough",
            CommandKind::Undo => "undo",
            CommandKind::Redo => "redo",
            CommandKind::FontName => "fontName",
            CommandKind::FontSize => "fontSize",
            CommandKind::ForeColor => "foreColor",
            CommandKind::BackColor => "hiliteColor",
            CommandKind::JustifyLeft => "justifyLeft",
            CommandKind::JustifyCenter => "justifyCenter",
            CommandKind::JustifyRight => "justifyRight",
            CommandKind::InsertOrderedList => "insertOrderedList",
            CommandKind::InsertUnorderedList => "insertUnorderedList",
            CommandKind::CreateLink => "createLink",
            CommandKind::RemoveFormat => "removeFormat",
        }
    }

    /// Look a command up by wire name. Matching is case-insensitive and
    /// accepts `backColor` as an alias for `hiliteColor`.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("backColor") {
            return Some(CommandKind::BackColor);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Inline toggles report an on/off state for toolbar buttons.
    pub fn is_toggle(self) -> bool {
        matches!(
            self,
            CommandKind::Bold
                | CommandKind::Italic
                | CommandKind::Underline
                | CommandKind::StrikeThrough
        )
    }

    /// Whether the command is meaningless without a value.
    pub fn needs_value(self) -> bool {
        matches!(
            self,
            CommandKind::FontName
                | CommandKind::FontSize
                | CommandKind::ForeColor
                | CommandKind::BackColor
                | CommandKind::CreateLink
        )
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single toolbar request: a kind plus an optional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub kind: CommandKind,
    pub value: Option<SmolStr>,
}

impl CommandRequest {
    pub fn new(kind: CommandKind) -> Self {
        Self { kind, value: None }
    }

    pub fn with_value(kind: CommandKind, value: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            value: Some(value.into()),
        }
    }

    pub fn font_name(family: impl Into<SmolStr>) -> Self {
        Self::with_value(CommandKind::FontName, family)
    }

    pub fn font_size_px(px: u32) -> Self {
        Self::with_value(CommandKind::FontSize, format!("{px}px"))
    }

    pub fn fore_color(color: impl Into<SmolStr>) -> Self {
        Self::with_value(CommandKind::ForeColor, color)
    }

    pub fn back_color(color: impl Into<SmolStr>) -> Self {
        Self::with_value(CommandKind::BackColor, color)
    }

    pub fn create_link(url: impl Into<SmolStr>) -> Self {
        Self::with_value(CommandKind::CreateLink, url)
    }

    /// The value with surrounding whitespace removed, if any is left.
    pub fn trimmed_value(&self) -> Option<&str> {
        self.value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

impl From<CommandKind> for CommandRequest {
    fn from(kind: CommandKind) -> Self {
        Self::new(kind)
    }
}

/// Pixel sizes offered by the toolbar and the legacy size level each maps to.
///
/// Levels 1 and 7 exist in the markup dialect but no toolbar size reaches them.
pub const FONT_SIZES: &[(u32, u8)] = &[(12, 2), (14, 3), (16, 3), (18, 4), (20, 5), (24, 6)];

/// Map a toolbar pixel size to its size level.
pub fn font_level_for_px(px: u32) -> Option<u8> {
    FONT_SIZES
        .iter()
        .find(|(size, _)| *size == px)
        .map(|(_, level)| *level)
}

/// Parse `"14px"`, `"14"` or `" 14 px "` into a pixel count.
pub fn parse_px(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits = value.strip_suffix("px").unwrap_or(value).trim();
    digits.parse().ok()
}

/// Resolve a font-size command value to a size level.
pub fn font_level_for_value(value: &str) -> Option<u8> {
    parse_px(value).and_then(font_level_for_px)
}
