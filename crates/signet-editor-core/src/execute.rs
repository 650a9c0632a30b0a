//! Command and action execution against a surface.
//!
//! `execute_command` is the single entry point toolbar buttons go through;
//! `execute_action` handles typing and key bindings.

use crate::actions::EditorAction;
use crate::blocks::{Alignment, ListKind};
use crate::commands::{CommandKind, CommandRequest, font_level_for_value};
use crate::format::Format;
use crate::surface::Surface;
use crate::undo::UndoManager;

/// Execute a toolbar command on the surface.
///
/// Returns true if the command was understood and acted on. Commands that
/// need a value are ignored without one.
pub fn execute_command(surface: &mut Surface, request: &CommandRequest) -> bool {
    let kind = request.kind;
    if kind.needs_value() && request.trimmed_value().is_none() {
        tracing::debug!(command = %kind, "command needs a value, ignoring");
        return false;
    }
    let value = request.trimmed_value().unwrap_or_default();

    let handled = match kind {
        CommandKind::Bold => surface.toggle(Format::Bold),
        CommandKind::Italic => surface.toggle(Format::Italic),
        CommandKind::Underline => surface.toggle(Format::Underline),
        CommandKind::StrikeThrough => surface.toggle(Format::Strike),
        CommandKind::Undo => surface.undo(),
        CommandKind::Redo => surface.redo(),
        CommandKind::FontName => surface.apply(Format::FontFace(value.to_string())),
        CommandKind::FontSize => match font_level_for_value(value) {
            Some(level) => surface.apply(Format::FontSize(level)),
            None => {
                tracing::debug!(value, "font size not in the size table");
                false
            }
        },
        CommandKind::ForeColor => surface.apply(Format::ForeColor(value.to_string())),
        CommandKind::BackColor => surface.apply(Format::BackColor(value.to_string())),
        CommandKind::JustifyLeft => surface.align(Alignment::Left),
        CommandKind::JustifyCenter => surface.align(Alignment::Center),
        CommandKind::JustifyRight => surface.align(Alignment::Right),
        CommandKind::InsertOrderedList => surface.toggle_list(ListKind::Ordered),
        CommandKind::InsertUnorderedList => surface.toggle_list(ListKind::Unordered),
        CommandKind::CreateLink => surface.create_link(value),
        CommandKind::RemoveFormat => surface.clear_formatting(),
    };

    tracing::debug!(command = %kind, handled, "executed command");
    handled
}

/// Whether an inline toggle is active at the selection (toolbar state).
///
/// Always false for commands that are not toggles.
pub fn query_command_state(surface: &Surface, kind: CommandKind) -> bool {
    let format = match kind {
        CommandKind::Bold => Format::Bold,
        CommandKind::Italic => Format::Italic,
        CommandKind::Underline => Format::Underline,
        CommandKind::StrikeThrough => Format::Strike,
        _ => return false,
    };
    surface.query_state(&format)
}

/// Execute an editor action on the surface.
pub fn execute_action(surface: &mut Surface, action: &EditorAction) -> bool {
    match action {
        EditorAction::Insert { text } => surface.insert_text(text),
        EditorAction::InsertLineBreak => surface.insert_line_break(),
        EditorAction::InsertParagraph => surface.insert_paragraph(),
        EditorAction::DeleteBackward => surface.delete_backward(),
        EditorAction::DeleteForward => surface.delete_forward(),
        EditorAction::SelectAll => {
            surface.select_all();
            true
        }
        EditorAction::Command(kind) => execute_command(surface, &CommandRequest::new(*kind)),
    }
}
