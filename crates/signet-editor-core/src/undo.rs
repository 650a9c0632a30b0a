//! Undo/redo history for the editing surface.
//!
//! Edits are recorded as markup diffs: the surface serializes before and
//! after every mutation and the history keeps only the changed middle.

use crate::types::Selection;

/// Undo and redo over a surface's own edits.
///
/// `undo` and `redo` change the content; they report false when there is
/// nothing to step over.
pub trait UndoManager {
    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    fn undo(&mut self) -> bool;

    fn redo(&mut self) -> bool;

    /// Forget both stacks.
    fn clear_history(&mut self);
}

/// Default number of steps kept.
pub const DEFAULT_MAX_STEPS: usize = 100;

/// One markup splice: the changed span before and after the edit.
#[derive(Debug, Clone)]
struct EditOperation {
    /// Byte position in the markup where the edit occurred
    pos: usize,
    /// Markup that was removed (empty for pure insertions)
    deleted: String,
    /// Markup that was inserted (empty for pure deletions)
    inserted: String,
    selection_before: Option<Selection>,
    selection_after: Option<Selection>,
}

impl EditOperation {
    /// Diff two markup strings down to their changed middle.
    fn diff(before: &str, after: &str) -> Self {
        let prefix = common_prefix(before, after);
        let suffix = common_suffix(&before[prefix..], &after[prefix..]);
        Self {
            pos: prefix,
            deleted: before[prefix..before.len() - suffix].to_string(),
            inserted: after[prefix..after.len() - suffix].to_string(),
            selection_before: None,
            selection_after: None,
        }
    }

    /// Swap `from` for `to` at `pos` in `markup`, if `from` is actually there.
    fn splice(markup: &str, pos: usize, from: &str, to: &str) -> Option<String> {
        let end = pos.checked_add(from.len())?;
        if markup.get(pos..end)? != from {
            return None;
        }
        let mut out = String::with_capacity(markup.len() - from.len() + to.len());
        out.push_str(&markup[..pos]);
        out.push_str(to);
        out.push_str(&markup[end..]);
        Some(out)
    }
}

fn common_prefix(a: &str, b: &str) -> usize {
    let mut len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    while !a.is_char_boundary(len) || !b.is_char_boundary(len) {
        len -= 1;
    }
    len
}

fn common_suffix(a: &str, b: &str) -> usize {
    let mut len = a
        .bytes()
        .rev()
        .zip(b.bytes().rev())
        .take_while(|(x, y)| x == y)
        .count();
    while !a.is_char_boundary(a.len() - len) || !b.is_char_boundary(b.len() - len) {
        len -= 1;
    }
    len
}

/// The markup and selection a history step restores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub markup: String,
    pub selection: Option<Selection>,
}

/// Bounded undo/redo stacks of markup edits.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<EditOperation>,
    redo_stack: Vec<EditOperation>,
    max_steps: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS)
    }
}

impl History {
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps,
        }
    }

    /// Record a mutation. Identical markup is not recorded.
    pub fn record(
        &mut self,
        before: &str,
        after: &str,
        selection_before: Option<Selection>,
        selection_after: Option<Selection>,
    ) {
        if before == after {
            return;
        }

        self.redo_stack.clear();

        let mut op = EditOperation::diff(before, after);
        op.selection_before = selection_before;
        op.selection_after = selection_after;
        self.undo_stack.push(op);

        // Trim if over max
        if self.undo_stack.len() > self.max_steps {
            let excess = self.undo_stack.len() - self.max_steps;
            self.undo_stack.drain(..excess);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Undo the last edit against `current` markup.
    ///
    /// A step whose recorded text no longer matches `current` is dropped
    /// together with the rest of the history.
    pub fn undo(&mut self, current: &str) -> Option<Restored> {
        let op = self.undo_stack.pop()?;
        match EditOperation::splice(current, op.pos, &op.inserted, &op.deleted) {
            Some(markup) => {
                let selection = op.selection_before;
                self.redo_stack.push(op);
                Some(Restored { markup, selection })
            }
            None => {
                tracing::warn!("undo history out of sync with surface, clearing");
                self.clear();
                None
            }
        }
    }

    /// Redo the last undone edit against `current` markup.
    pub fn redo(&mut self, current: &str) -> Option<Restored> {
        let op = self.redo_stack.pop()?;
        match EditOperation::splice(current, op.pos, &op.deleted, &op.inserted) {
            Some(markup) => {
                let selection = op.selection_after;
                self.undo_stack.push(op);
                Some(Restored { markup, selection })
            }
            None => {
                tracing::warn!("redo history out of sync with surface, clearing");
                self.clear();
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(history: &mut History, current: &mut String, next: &str) {
        history.record(current, next, None, None);
        *current = next.to_string();
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut history = History::default();
        let mut markup = "<p>Hi</p>".to_string();
        apply(&mut history, &mut markup, "<p><b>Hi</b></p>");
        assert!(history.can_undo());

        let undone = history.undo(&markup).map(|r| r.markup);
        assert_eq!(undone.as_deref(), Some("<p>Hi</p>"));
        assert!(history.can_redo());

        let redone = history.redo("<p>Hi</p>").map(|r| r.markup);
        assert_eq!(redone.as_deref(), Some("<p><b>Hi</b></p>"));
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut history = History::default();
        let mut markup = "abc".to_string();
        apply(&mut history, &mut markup, "abcd");
        markup = history.undo(&markup).map(|r| r.markup).unwrap_or_default();
        assert!(history.can_redo());

        apply(&mut history, &mut markup, "abce");
        assert!(!history.can_redo());
    }

    #[test]
    fn test_max_steps() {
        let mut history = History::new(3);
        let mut markup = String::new();
        for next in ["a", "ab", "abc", "abcd"] {
            apply(&mut history, &mut markup, next);
        }

        for _ in 0..3 {
            markup = history.undo(&markup).map(|r| r.markup).unwrap_or_default();
        }
        assert_eq!(markup, "a");
        assert!(history.undo(&markup).is_none());
    }

    #[test]
    fn test_diff_respects_char_boundaries() {
        let mut history = History::default();
        let mut markup = "é".to_string();
        apply(&mut history, &mut markup, "è");
        let undone = history.undo(&markup).map(|r| r.markup);
        assert_eq!(undone.as_deref(), Some("é"));
    }

    #[test]
    fn test_out_of_sync_history_is_dropped() {
        let mut history = History::default();
        let mut markup = "<p>a</p>".to_string();
        apply(&mut history, &mut markup, "<p>ab</p>");
        assert!(history.undo("<p>zzz</p>").is_none());
        assert!(!history.can_undo());
    }
}
