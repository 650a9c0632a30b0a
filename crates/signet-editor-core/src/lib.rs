//! signet-editor-core: the rich-content editing surface, without host dependencies.
//!
//! This crate provides:
//! - a markup tree with a forgiving parser and serializer
//! - visible positions and selections over that tree
//! - `Surface`, the live editable region, with formatting, typing and undo
//! - toolbar command names and key bindings
//! - traits for the host interactions the editor needs (prompts, toasts, navigation)

pub mod actions;
pub mod blocks;
pub mod commands;
pub mod dom;
pub mod edit;
pub mod execute;
pub mod format;
pub mod markup;
pub mod platform;
pub mod position;
pub mod surface;
pub mod types;
pub mod undo;

pub use actions::{
    EditorAction, InputType, Key, KeyBindings, KeyCombo, KeydownResult, Modifiers, TAB_TEXT,
};
pub use blocks::{Alignment, ListKind};
pub use commands::{CommandKind, CommandRequest, FONT_SIZES, font_level_for_px};
pub use dom::{Element, Fragment, Node, NodePath};
pub use execute::{execute_action, execute_command, query_command_state};
pub use format::Format;
pub use platform::{LinkPrompt, Navigator, Notifier, PlatformError};
pub use position::PositionMap;
pub use smol_str::SmolStr;
pub use surface::{LiveContent, Surface};
pub use types::Selection;
pub use undo::UndoManager;
