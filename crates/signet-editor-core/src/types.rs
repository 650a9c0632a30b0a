//! Selection over visible positions.

use std::ops::Range;

/// A selection on the surface, in visible positions.
///
/// `anchor` stays where the user pressed down; `head` follows the caret.
/// Dragging leftwards leaves `head < anchor`, so ordered bounds come from
/// [`Selection::start`] and [`Selection::end`].
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// A bare caret at `pos`.
    pub fn collapsed(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Number of positions covered.
    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// True when the caret sits before the anchor.
    pub fn is_backwards(&self) -> bool {
        self.head < self.anchor
    }

    /// Pull both ends inside a surface of `len` positions.
    pub fn clamped(self, len: usize) -> Self {
        Self::new(self.anchor.min(len), self.head.min(len))
    }
}
