//! Visible positions over the markup tree.
//!
//! Every text character and every inline atom (`img`, `br`) occupies one
//! position. Moving from one block container into another costs one extra
//! position, the same way a newline would in plain text. A block with nothing
//! visible in it still gets a zero-length leaf so a caret can sit in it.

use std::ops::Range;

use crate::dom::{Fragment, Node, NodePath, split_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    /// A text node; one position per character.
    Text,
    /// An `img` or `br`; one position.
    Atom,
    /// A block with no visible content; zero positions.
    Empty,
}

/// A run of positions backed by a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub path: NodePath,
    /// Nearest enclosing block-level element, or the root (empty path).
    ///
    /// For `Empty` leaves the container is the empty block itself.
    pub container: NodePath,
    pub kind: LeafKind,
    pub start: usize,
    pub len: usize,
}

impl Leaf {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Index of the child of `ancestor` that holds this leaf, if the leaf
    /// lies strictly below `ancestor`.
    pub fn child_index(&self, ancestor: &[usize]) -> Option<usize> {
        (self.path.len() > ancestor.len() && self.path.starts_with(ancestor))
            .then(|| self.path[ancestor.len()])
    }

    /// Whether the leaf lies at or below `path`.
    pub fn is_under(&self, path: &[usize]) -> bool {
        self.path.starts_with(path)
    }
}

/// Leaves of a fragment in document order.
#[derive(Debug, Clone, Default)]
pub struct PositionMap {
    leaves: Vec<Leaf>,
    len: usize,
}

impl PositionMap {
    pub fn build(fragment: &Fragment) -> Self {
        let mut builder = Builder::default();
        builder.walk(&fragment.nodes, &mut Vec::new(), &[]);
        Self {
            leaves: builder.leaves,
            len: builder.pos,
        }
    }

    /// Total number of positions. Valid carets are `0..=len`.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the fragment has no leaves at all.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// The first leaf whose span includes `pos` (either edge counts).
    ///
    /// A position shared by two leaves of the same container resolves to
    /// the earlier one.
    pub fn resolve(&self, pos: usize) -> Option<&Leaf> {
        self.leaves
            .iter()
            .find(|leaf| leaf.start <= pos && pos <= leaf.end())
    }

    /// Non-empty leaves lying entirely inside `range`.
    pub fn leaves_within(&self, range: Range<usize>) -> impl Iterator<Item = &Leaf> {
        self.leaves
            .iter()
            .filter(move |leaf| leaf.len > 0 && leaf.start >= range.start && leaf.end() <= range.end)
    }

    /// Non-empty leaves sharing at least one position with `range`.
    pub fn leaves_overlapping(&self, range: Range<usize>) -> impl Iterator<Item = &Leaf> {
        self.leaves
            .iter()
            .filter(move |leaf| leaf.len > 0 && leaf.start < range.end && leaf.end() > range.start)
    }

    /// Containers of every leaf the range touches, in document order.
    pub fn containers_touching(&self, range: Range<usize>) -> Vec<NodePath> {
        let mut out: Vec<NodePath> = Vec::new();
        for leaf in &self.leaves {
            if leaf.start <= range.end && leaf.end() >= range.start && !out.contains(&leaf.container) {
                out.push(leaf.container.clone());
            }
        }
        out
    }

    /// The first leaf at or below `path`.
    pub fn first_leaf_under(&self, path: &[usize]) -> Option<&Leaf> {
        self.leaves.iter().find(|leaf| leaf.is_under(path))
    }

    /// The last leaf at or below `path`.
    pub fn last_leaf_under(&self, path: &[usize]) -> Option<&Leaf> {
        self.leaves.iter().rev().find(|leaf| leaf.is_under(path))
    }
}

#[derive(Default)]
struct Builder {
    leaves: Vec<Leaf>,
    pos: usize,
    last_container: Option<NodePath>,
}

impl Builder {
    fn push(&mut self, path: NodePath, container: &[usize], kind: LeafKind, len: usize) {
        if let Some(last) = &self.last_container {
            if last.as_slice() != container {
                self.pos += 1;
            }
        }
        self.last_container = Some(container.to_vec());
        self.leaves.push(Leaf {
            path,
            container: container.to_vec(),
            kind,
            start: self.pos,
            len,
        });
        self.pos += len;
    }

    fn walk(&mut self, nodes: &[Node], path: &mut NodePath, container: &[usize]) {
        let has_blocks = nodes.iter().any(Node::is_block_level);
        for (i, node) in nodes.iter().enumerate() {
            path.push(i);
            match node {
                Node::Text(text) => {
                    // Indentation between blocks is not content.
                    let skip = text.is_empty() || (has_blocks && is_collapsible_whitespace(text));
                    if !skip {
                        self.push(path.clone(), container, LeafKind::Text, text.chars().count());
                    }
                }
                Node::Comment(_) => {}
                Node::Element(el) if el.is_hidden() => {}
                Node::Element(el) if el.is_atom() => {
                    self.push(path.clone(), container, LeafKind::Atom, 1);
                }
                Node::Element(el) if el.is_block() || el.is_structural() => {
                    let own = path.clone();
                    if el.is_block() && !node.has_visible_content() {
                        self.push(own.clone(), &own, LeafKind::Empty, 0);
                    } else {
                        self.walk(&el.children, path, &own);
                    }
                }
                Node::Element(el) => self.walk(&el.children, path, container),
            }
            path.pop();
        }
    }
}

pub(crate) fn is_collapsible_whitespace(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_whitespace())
}

/// Byte offset of the `char_offset`-th character (or the end of the string).
pub(crate) fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

/// Adjust `path` after the children of `parent` from index `at` onwards
/// moved by `delta`.
pub fn shift_path(path: &mut NodePath, parent: &[usize], at: usize, delta: isize) {
    let depth = parent.len();
    if path.len() > depth && path.starts_with(parent) && path[depth] >= at {
        path[depth] = path[depth].saturating_add_signed(delta);
    }
}

/// Where an insertion lands: child `index` of the node at `container`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub container: NodePath,
    pub index: usize,
}

/// Split the tree at `pos` so that the position falls between two children
/// of its container.
///
/// Text is split at the character, then every inline wrapper between the
/// text and the container is split in two. Returns `None` for an empty
/// fragment.
pub fn split_at(fragment: &mut Fragment, pos: usize) -> Option<Boundary> {
    let map = PositionMap::build(fragment);
    let leaf = map.resolve(pos.min(map.len()))?.clone();
    let offset = pos.saturating_sub(leaf.start);

    let (mut parent, mut index) = match leaf.kind {
        LeafKind::Empty => {
            return Some(Boundary {
                container: leaf.path,
                index: 0,
            });
        }
        LeafKind::Atom => {
            let (parent, i) = split_path(&leaf.path)?;
            (parent, i + offset.min(1))
        }
        LeafKind::Text if offset == 0 => split_path(&leaf.path)?,
        LeafKind::Text if offset >= leaf.len => {
            let (parent, i) = split_path(&leaf.path)?;
            (parent, i + 1)
        }
        LeafKind::Text => {
            let (parent, i) = split_path(&leaf.path)?;
            let children = fragment.children_mut(&parent)?;
            if let Some(Node::Text(text)) = children.get_mut(i) {
                let tail = text.split_off(char_to_byte(text, offset));
                children.insert(i + 1, Node::Text(tail));
            }
            (parent, i + 1)
        }
    };

    // Lift the boundary out of inline wrappers.
    while parent.len() > leaf.container.len() {
        let Some((grand, at)) = split_path(&parent) else {
            break;
        };
        let siblings = fragment.children_mut(&grand)?;
        let Some(Node::Element(el)) = siblings.get_mut(at) else {
            break;
        };
        if index == 0 {
            index = at;
        } else if index >= el.children.len() {
            index = at + 1;
        } else {
            let mut right = el.shallow_clone();
            right.children = el.children.split_off(index);
            siblings.insert(at + 1, Node::Element(right));
            index = at + 1;
        }
        parent = grand;
    }

    Some(Boundary {
        container: parent,
        index,
    })
}

/// A run of children of one container, all inside a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub container: NodePath,
    pub range: Range<usize>,
}

/// Split the tree at both ends of `range` and return the runs of container
/// children the range now covers exactly, in document order.
pub fn isolate(fragment: &mut Fragment, range: Range<usize>) -> Vec<Segment> {
    if range.is_empty() {
        return Vec::new();
    }
    split_at(fragment, range.end);
    split_at(fragment, range.start);
    segments(&PositionMap::build(fragment), range)
}

/// Group the leaves inside `range` into contiguous runs of container children.
pub fn segments(map: &PositionMap, range: Range<usize>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    for leaf in map.leaves_within(range) {
        let Some(index) = leaf.child_index(&leaf.container) else {
            continue;
        };
        match out.last_mut() {
            Some(seg)
                if seg.container == leaf.container
                    && (seg.range.end == index || seg.range.end == index + 1) =>
            {
                seg.range.end = index + 1;
            }
            _ => out.push(Segment {
                container: leaf.container.clone(),
                range: index..index + 1,
            }),
        }
    }
    out
}

/// Plain-text rendering of the fragment: block boundaries become newlines,
/// line breaks become newlines and images become U+FFFC.
pub fn text_content(fragment: &Fragment) -> String {
    let map = PositionMap::build(fragment);
    let mut out = String::new();
    let mut last_end = 0;
    for leaf in map.leaves() {
        if leaf.start > last_end {
            out.push('\n');
        }
        last_end = leaf.end();
        match (leaf.kind, fragment.node(&leaf.path)) {
            (LeafKind::Text, Some(Node::Text(text))) => out.push_str(text),
            (LeafKind::Atom, Some(Node::Element(el))) if el.tag == "br" => out.push('\n'),
            (LeafKind::Atom, _) => out.push('\u{fffc}'),
            _ => {}
        }
    }
    out
}
