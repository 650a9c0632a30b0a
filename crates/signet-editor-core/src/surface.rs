//! The live editing surface.
//!
//! `Surface` owns the markup tree, the current selection and the undo
//! history. It plays the part a browser's editable region plays: every
//! mutation goes through it, and its serialized markup is the source of
//! truth while an editing session is mounted.

use crate::blocks::{self, Alignment, ListKind};
use crate::dom::{Element, Fragment, Node};
use crate::edit;
use crate::format::{self, Format};
use crate::markup;
use crate::position::{self, PositionMap};
use crate::types::Selection;
use crate::undo::{DEFAULT_MAX_STEPS, History, UndoManager};

/// Read access to the current serialized content of a live editor.
///
/// Save paths read through this rather than through any mirrored copy.
pub trait LiveContent {
    fn live_markup(&self) -> String;
}

/// Editable rich-content surface.
#[derive(Debug, Clone)]
pub struct Surface {
    fragment: Fragment,
    markup: String,
    selection: Option<Selection>,
    /// Formats to apply to the next text typed at a collapsed caret.
    pending: Vec<Format>,
    history: History,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    pub fn new() -> Self {
        Self {
            fragment: Fragment::default(),
            markup: String::new(),
            selection: None,
            pending: Vec::new(),
            history: History::new(DEFAULT_MAX_STEPS),
        }
    }

    /// Replace the content wholesale.
    ///
    /// The markup is kept exactly as given until the first edit. Seeding is
    /// not undoable and drops any selection.
    pub fn seed(&mut self, markup: &str) {
        self.fragment = markup::parse(markup);
        self.markup = markup.to_string();
        self.selection = None;
        self.pending.clear();
        self.history.clear();
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    /// Number of visible positions.
    pub fn len(&self) -> usize {
        PositionMap::build(&self.fragment).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn text_content(&self) -> String {
        position::text_content(&self.fragment)
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Set (or clear) the selection. Positions past the end are clamped.
    pub fn set_selection(&mut self, selection: Option<Selection>) {
        let len = self.len();
        self.selection = selection.map(|sel| sel.clamped(len));
        self.pending.clear();
    }

    /// Place a collapsed caret.
    pub fn set_caret(&mut self, pos: usize) {
        self.set_selection(Some(Selection::collapsed(pos)));
    }

    pub fn select_all(&mut self) {
        let len = self.len();
        self.set_selection(Some(Selection::new(0, len)));
    }

    /// The selection typing acts on: the current one, or a caret at the end.
    fn typing_selection(&self) -> Selection {
        self.selection
            .unwrap_or_else(|| Selection::collapsed(self.len()))
    }

    /// Serialize after a mutation and record it in the history.
    ///
    /// Returns true if the markup changed.
    fn commit(&mut self, selection_before: Option<Selection>) -> bool {
        let markup = markup::serialize(&self.fragment);
        if markup == self.markup {
            return false;
        }
        self.history
            .record(&self.markup, &markup, selection_before, self.selection);
        self.markup = markup;
        true
    }

    // === Formatting ===

    /// Toggle an inline format over the selection.
    ///
    /// At a collapsed caret the toggle is held for the next typed text.
    pub fn toggle(&mut self, format: Format) -> bool {
        let Some(sel) = self.selection else {
            return false;
        };
        if sel.is_collapsed() {
            match self.pending.iter().position(|f| *f == format) {
                Some(i) => {
                    self.pending.remove(i);
                }
                None => self.pending.push(format),
            }
            return true;
        }
        let before = self.selection;
        format::toggle_format(&mut self.fragment, sel.to_range(), &format);
        self.commit(before)
    }

    /// Apply a valued format (font, color, link) over the selection.
    ///
    /// At a collapsed caret the format is held for the next typed text.
    pub fn apply(&mut self, format: Format) -> bool {
        let Some(sel) = self.selection else {
            return false;
        };
        if sel.is_collapsed() {
            self.pending
                .retain(|f| std::mem::discriminant(f) != std::mem::discriminant(&format));
            self.pending.push(format);
            return true;
        }
        let before = self.selection;
        format::apply_format(&mut self.fragment, sel.to_range(), &format);
        self.commit(before)
    }

    /// Strip formatting (but not links) from the selection.
    pub fn clear_formatting(&mut self) -> bool {
        let Some(sel) = self.selection else {
            return false;
        };
        self.pending.clear();
        let before = self.selection;
        format::clear_formatting(&mut self.fragment, sel.to_range());
        self.commit(before)
    }

    /// Link the selection to `href`, or insert `href` itself as a link at a
    /// collapsed caret.
    pub fn create_link(&mut self, href: &str) -> bool {
        let Some(sel) = self.selection else {
            return false;
        };
        if !sel.is_collapsed() {
            return self.apply(Format::Link(href.to_string()));
        }
        let link = Element::new("a")
            .with_attr("href", href)
            .with_children(vec![Node::text(href)]);
        self.insert_node(Node::Element(link))
    }

    pub fn align(&mut self, alignment: Alignment) -> bool {
        let Some(sel) = self.selection else {
            return false;
        };
        let before = self.selection;
        blocks::align(&mut self.fragment, sel.to_range(), alignment);
        self.commit(before)
    }

    pub fn toggle_list(&mut self, kind: ListKind) -> bool {
        let Some(sel) = self.selection else {
            return false;
        };
        let before = self.selection;
        blocks::toggle_list(&mut self.fragment, sel.to_range(), kind);
        self.commit(before)
    }

    /// Whether the selection carries an inline format.
    pub fn query_state(&self, format: &Format) -> bool {
        let Some(sel) = self.selection else {
            return false;
        };
        if sel.is_collapsed() {
            let here = format::caret_has_format(&self.fragment, sel.head, format);
            here != self.pending.contains(format)
        } else {
            format::range_has_format(&self.fragment, sel.to_range(), format)
        }
    }

    /// The size level in effect at the selection, if any font size applies.
    pub fn current_font_level(&self) -> Option<u8> {
        if let Some(Format::FontSize(level)) = self
            .pending
            .iter()
            .find(|f| matches!(f, Format::FontSize(_)))
        {
            return Some(*level);
        }
        let sel = self.selection?;
        // Look inside the selection rather than at the character before it.
        let pos = if sel.is_collapsed() {
            sel.start()
        } else {
            sel.start() + 1
        };
        format::font_attr_at(&self.fragment, pos, "size")?
            .trim()
            .parse()
            .ok()
    }

    // === Typing ===

    /// Insert text at the selection, replacing any selected content.
    pub fn insert_text(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let before = self.selection;
        let sel = self.typing_selection();
        let pos = edit::delete_range(&mut self.fragment, sel.to_range());
        let caret = edit::insert_text(&mut self.fragment, pos, text);

        for format in std::mem::take(&mut self.pending) {
            if format.is_toggle() {
                format::toggle_format(&mut self.fragment, pos..caret, &format);
            } else {
                format::apply_format(&mut self.fragment, pos..caret, &format);
            }
        }

        self.selection = Some(Selection::collapsed(caret));
        self.commit(before)
    }

    /// Split the current block (Enter).
    pub fn insert_paragraph(&mut self) -> bool {
        let before = self.selection;
        let sel = self.typing_selection();
        let pos = edit::delete_range(&mut self.fragment, sel.to_range());
        let caret = edit::insert_paragraph(&mut self.fragment, pos);
        self.selection = Some(Selection::collapsed(caret));
        self.pending.clear();
        self.commit(before)
    }

    /// Insert a line break (Shift+Enter).
    pub fn insert_line_break(&mut self) -> bool {
        let before = self.selection;
        let sel = self.typing_selection();
        let pos = edit::delete_range(&mut self.fragment, sel.to_range());
        let caret = edit::insert_line_break(&mut self.fragment, pos);
        self.selection = Some(Selection::collapsed(caret));
        self.commit(before)
    }

    /// Delete the selection, or the position before the caret.
    pub fn delete_backward(&mut self) -> bool {
        let sel = self.typing_selection();
        if sel.is_collapsed() {
            if sel.head == 0 {
                return false;
            }
            self.delete(sel.head - 1..sel.head)
        } else {
            self.delete(sel.to_range())
        }
    }

    /// Delete the selection, or the position after the caret.
    pub fn delete_forward(&mut self) -> bool {
        let sel = self.typing_selection();
        if sel.is_collapsed() {
            if sel.head >= self.len() {
                return false;
            }
            self.delete(sel.head..sel.head + 1)
        } else {
            self.delete(sel.to_range())
        }
    }

    fn delete(&mut self, range: std::ops::Range<usize>) -> bool {
        let before = self.selection;
        let caret = edit::delete_range(&mut self.fragment, range);
        self.selection = Some(Selection::collapsed(caret));
        self.pending.clear();
        self.commit(before)
    }

    /// Insert a node at the selection, replacing selected content. With no
    /// selection the node is appended as the last top-level child.
    pub fn insert_node(&mut self, node: Node) -> bool {
        let before = self.selection;
        let caret = match self.selection {
            Some(sel) => {
                let pos = edit::delete_range(&mut self.fragment, sel.to_range());
                edit::insert_node(&mut self.fragment, pos, node)
            }
            None => edit::append_node(&mut self.fragment, node),
        };
        self.selection = Some(Selection::collapsed(caret));
        self.pending.clear();
        self.commit(before)
    }
}

impl UndoManager for Surface {
    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn undo(&mut self) -> bool {
        let Some(restored) = self.history.undo(&self.markup) else {
            return false;
        };
        self.fragment = markup::parse(&restored.markup);
        self.markup = restored.markup;
        self.selection = restored.selection;
        self.pending.clear();
        true
    }

    fn redo(&mut self) -> bool {
        let Some(restored) = self.history.redo(&self.markup) else {
            return false;
        };
        self.fragment = markup::parse(&restored.markup);
        self.markup = restored.markup;
        self.selection = restored.selection;
        self.pending.clear();
        true
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl LiveContent for Surface {
    fn live_markup(&self) -> String {
        self.markup.clone()
    }
}
