//! Typing-level edits on the markup tree: insertion and deletion at
//! visible positions.
//!
//! Every function returns the caret position after the edit.

use std::ops::Range;

use crate::blocks::{ensure_blocks, unlist_items};
use crate::dom::{Element, Fragment, Node, NodePath, normalize, split_path};
use crate::position::{LeafKind, PositionMap, char_to_byte, isolate, shift_path};

/// A block whose only visible content is a single `<br>`.
///
/// Editors keep such a `<br>` in otherwise empty lines so the line has
/// height; it is replaced as soon as real content arrives.
pub fn is_placeholder(el: &Element) -> bool {
    if !el.is_block() {
        return false;
    }
    let mut visible = el.children.iter().filter(|n| n.has_visible_content());
    matches!(
        (visible.next(), visible.next()),
        (Some(Node::Element(br)), None) if br.tag == "br"
    )
}

fn placeholder_br() -> Node {
    Node::Element(Element::new("br"))
}

fn container_is_placeholder(fragment: &Fragment, container: &[usize]) -> bool {
    fragment.element(container).is_some_and(is_placeholder)
}

/// Insert plain text at `pos`.
///
/// Typing into a surface with no content creates a paragraph to hold it.
pub fn insert_text(fragment: &mut Fragment, pos: usize, text: &str) -> usize {
    if text.is_empty() {
        return pos;
    }
    let len = text.chars().count();
    let map = PositionMap::build(fragment);

    let Some(leaf) = map.resolve(pos.min(map.len())).cloned() else {
        fragment.nodes.push(Node::Element(
            Element::new("p").with_children(vec![Node::text(text)]),
        ));
        return len;
    };
    let offset = pos.saturating_sub(leaf.start);

    match leaf.kind {
        LeafKind::Text => {
            if let Some(Node::Text(existing)) = fragment.node_mut(&leaf.path) {
                let at = char_to_byte(existing, offset);
                existing.insert_str(at, text);
            }
            leaf.start + offset + len
        }
        LeafKind::Atom if container_is_placeholder(fragment, &leaf.container) => {
            if let Some(node) = fragment.node_mut(&leaf.path) {
                *node = Node::text(text);
            }
            leaf.start + len
        }
        LeafKind::Atom => {
            let Some((parent, i)) = split_path(&leaf.path) else {
                return pos;
            };
            if let Some(children) = fragment.children_mut(&parent) {
                children.insert(i + offset.min(1), Node::text(text));
                normalize(children);
            }
            leaf.start + offset.min(1) + len
        }
        LeafKind::Empty => {
            if let Some(children) = fragment.children_mut(&leaf.path) {
                children.push(Node::text(text));
            }
            leaf.start + len
        }
    }
}

/// Insert a node at `pos`.
///
/// A node dropped into a placeholder line replaces the placeholder.
pub fn insert_node(fragment: &mut Fragment, pos: usize, node: Node) -> usize {
    let map = PositionMap::build(fragment);
    if map.is_empty() {
        fragment.nodes.push(node);
        return PositionMap::build(fragment).len();
    }

    if let Some(leaf) = map.resolve(pos.min(map.len())) {
        let is_br = fragment
            .element(&leaf.path)
            .is_some_and(|el| el.tag == "br");
        if leaf.kind == LeafKind::Atom && is_br && container_is_placeholder(fragment, &leaf.container) {
            let path = leaf.path.clone();
            if let Some(slot) = fragment.node_mut(&path) {
                *slot = node;
            }
            return end_of(fragment, &path, pos);
        }
    }

    let Some(boundary) = crate::position::split_at(fragment, pos) else {
        fragment.nodes.push(node);
        return PositionMap::build(fragment).len();
    };
    let Some(children) = fragment.children_mut(&boundary.container) else {
        return pos;
    };
    let index = boundary.index.min(children.len());
    children.insert(index, node);

    let mut path = boundary.container;
    path.push(index);
    end_of(fragment, &path, pos)
}

/// Append a node as the last top-level child.
pub fn append_node(fragment: &mut Fragment, node: Node) -> usize {
    fragment.nodes.push(node);
    PositionMap::build(fragment).len()
}

/// Position just after the last leaf at or below `path`.
fn end_of(fragment: &Fragment, path: &[usize], fallback: usize) -> usize {
    PositionMap::build(fragment)
        .last_leaf_under(path)
        .map(|leaf| leaf.end())
        .unwrap_or(fallback)
}

/// Split the block at `pos` in two (Enter).
///
/// Enter in an empty list item leaves the list instead.
pub fn insert_paragraph(fragment: &mut Fragment, pos: usize) -> usize {
    if PositionMap::build(fragment).is_empty() {
        let line = || Node::Element(Element::new("p").with_children(vec![placeholder_br()]));
        fragment.nodes.push(line());
        fragment.nodes.push(line());
        return 2;
    }

    ensure_blocks(fragment);

    if let Some(caret) = exit_empty_list_item(fragment, pos) {
        return caret;
    }

    let Some(boundary) = crate::position::split_at(fragment, pos) else {
        return pos;
    };
    let Some((parent, index)) = split_path(&boundary.container) else {
        // Still at the root: there is no block to split.
        return insert_node(fragment, pos, placeholder_br());
    };
    let Some(block) = fragment.element_mut(&boundary.container) else {
        return pos;
    };

    let mut tail = block.shallow_clone();
    tail.remove_attr("id");
    tail.children = block.children.split_off(boundary.index.min(block.children.len()));
    if !block.children.iter().any(Node::has_visible_content) {
        block.children.push(placeholder_br());
    }
    if !tail.children.iter().any(Node::has_visible_content) {
        tail.children.push(placeholder_br());
    }

    let Some(siblings) = fragment.children_mut(&parent) else {
        return pos;
    };
    siblings.insert(index + 1, Node::Element(tail));

    let mut new_path = parent;
    new_path.push(index + 1);
    PositionMap::build(fragment)
        .first_leaf_under(&new_path)
        .map(|leaf| leaf.start)
        .unwrap_or(pos + 1)
}

fn exit_empty_list_item(fragment: &mut Fragment, pos: usize) -> Option<usize> {
    let map = PositionMap::build(fragment);
    let leaf = map.resolve(pos)?;
    let container = &leaf.container;
    if container.len() != 2 {
        return None;
    }
    let item = fragment.element(container)?;
    let empty = item.tag == "li" && (is_placeholder(item) || leaf.kind == LeafKind::Empty);
    if !empty {
        return None;
    }
    unlist_items(fragment, container[0], &[container[1]]).then_some(pos)
}

/// Insert a line break (Shift+Enter).
pub fn insert_line_break(fragment: &mut Fragment, pos: usize) -> usize {
    let caret = insert_node(fragment, pos, placeholder_br());

    // A break at the very end of a line needs a second one for the new line
    // to render.
    let map = PositionMap::build(fragment);
    let Some(index) = map.leaves().iter().position(|l| l.end() == caret && l.kind == LeafKind::Atom) else {
        return caret;
    };
    let leaf = &map.leaves()[index];
    let trailing = map
        .leaves()
        .get(index + 1)
        .is_none_or(|next| next.container != leaf.container);
    if trailing {
        if let Some((parent, i)) = split_path(&leaf.path) {
            if let Some(children) = fragment.children_mut(&parent) {
                children.insert(i + 1, placeholder_br());
            }
        }
    }
    caret
}

/// Delete everything in `range`, joining the blocks at either end.
pub fn delete_range(fragment: &mut Fragment, range: Range<usize>) -> usize {
    let map = PositionMap::build(fragment);
    let (s, e) = (range.start.min(map.len()), range.end.min(map.len()));
    if s >= e {
        return s;
    }
    let crosses_blocks = match (map.resolve(s), map.resolve(e)) {
        (Some(a), Some(b)) => a.container != b.container,
        _ => return s,
    };
    if crosses_blocks {
        ensure_blocks(fragment);
    }

    let segments = isolate(fragment, s..e);
    let map = PositionMap::build(fragment);
    let (Some(a_leaf), Some(b_leaf)) = (map.resolve(s), map.resolve(e)) else {
        return s;
    };
    let a = a_leaf.container.clone();
    let b = b_leaf.container.clone();
    let merging = a != b;
    let b_holds_a = merging && a.starts_with(&b);

    // Where the remainder of the end block will land in the start block.
    let mut ka = map
        .leaves()
        .iter()
        .filter(|l| l.path.len() > a.len() && l.end() <= s && (l.len > 0 || l.start < s))
        .filter_map(|l| l.child_index(&a))
        .map(|i| i + 1)
        .max()
        .unwrap_or(0);

    let mut moved: Vec<Node> = Vec::new();
    if merging {
        let kb = map
            .leaves()
            .iter()
            .filter(|l| l.path.len() > b.len() && l.start >= e && (l.len > 0 || l.start > e))
            .filter_map(|l| l.child_index(&b))
            .min();
        if let (Some(kb), Some(children)) = (kb, fragment.children_mut(&b)) {
            moved = children.split_off(kb.min(children.len()));
        }
    }

    // Blocks lying wholly inside the range go entirely.
    let mut removals: Vec<(NodePath, Option<Range<usize>>)> = segments
        .into_iter()
        .map(|seg| {
            let mut key = seg.container;
            key.push(seg.range.start);
            (key, Some(seg.range))
        })
        .collect();
    for leaf in map.leaves() {
        let c = &leaf.container;
        let inside = leaf.start >= s && leaf.end() <= e && (leaf.len > 0 || leaf.start > s);
        let doomed = inside && *c != a && *c != b && !a.starts_with(c) && !b.starts_with(c);
        if doomed && !removals.iter().any(|(p, r)| r.is_none() && p == c) {
            removals.push((c.clone(), None));
        }
    }
    if merging && !b_holds_a {
        removals.push((b.clone(), None));
    }

    let mut lists: Vec<NodePath> = removals
        .iter()
        .filter(|(_, r)| r.is_none())
        .filter_map(|(p, _)| split_path(p).map(|(parent, _)| parent))
        .filter(|parent| {
            fragment
                .element(parent)
                .is_some_and(|el| matches!(el.tag.as_str(), "ul" | "ol"))
        })
        .collect();
    lists.dedup();

    removals.sort_by(|x, y| y.0.cmp(&x.0));
    for (key, range) in removals {
        let Some((parent, first)) = split_path(&key) else {
            continue;
        };
        let removed = match range {
            Some(range) => match fragment.children_mut(&parent) {
                Some(children) if range.end <= children.len() => {
                    Some(children.drain(range).count())
                }
                _ => None,
            },
            None => fragment.remove(&key).map(|_| 1),
        };
        if let Some(count) = removed {
            for list in &mut lists {
                shift_path(list, &parent, first + count, -(count as isize));
            }
        }
    }

    let mut caret = s;
    if let Some(block) = fragment.element_mut(&a) {
        let a_has_content = block.children.iter().any(Node::has_visible_content);
        let moved_is_placeholder = moved.iter().filter(|n| n.has_visible_content()).count() == 1
            && moved.iter().any(|n| n.as_element().is_some_and(|el| el.tag == "br"));
        if moved_is_placeholder && a_has_content {
            moved.clear();
        }
        if is_placeholder(block) && moved.iter().any(Node::has_visible_content) {
            if let Some(br) = block.children.iter().position(|n| n.has_visible_content()) {
                block.children.remove(br);
                ka = ka.saturating_sub(1);
                caret = caret.saturating_sub(1);
            }
        }
        let ka = ka.min(block.children.len());
        block.children.splice(ka..ka, moved);
        normalize(&mut block.children);
        if !block.children.iter().any(Node::has_visible_content) {
            block.children.push(placeholder_br());
        }
    } else if a.is_empty() {
        let ka = ka.min(fragment.nodes.len());
        fragment.nodes.splice(ka..ka, moved);
        normalize(&mut fragment.nodes);
    }

    lists.sort();
    for list in lists.iter().rev() {
        let emptied = fragment
            .element(list)
            .is_some_and(|el| !el.children.iter().any(|n| n.as_element().is_some()));
        if emptied {
            fragment.remove(list);
        }
    }

    caret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{parse, serialize};

    fn edit(markup: &str, f: impl FnOnce(&mut Fragment) -> usize) -> (String, usize) {
        let mut frag = parse(markup);
        let caret = f(&mut frag);
        (serialize(&frag), caret)
    }

    #[test]
    fn test_type_into_empty_surface() {
        assert_eq!(
            edit("", |f| insert_text(f, 0, "text")),
            ("<p>text</p>".to_string(), 4)
        );
    }

    #[test]
    fn test_type_into_placeholder_line() {
        assert_eq!(
            edit("<p><br></p>", |f| insert_text(f, 0, "x")),
            ("<p>x</p>".to_string(), 1)
        );
    }

    #[test]
    fn test_type_mid_text_and_after_image() {
        assert_eq!(
            edit("<p>Hlo</p>", |f| insert_text(f, 1, "el")),
            ("<p>Hello</p>".to_string(), 3)
        );
        assert_eq!(
            edit("<p><img src=x></p>", |f| insert_text(f, 1, "a")),
            (r#"<p><img src="x">a</p>"#.to_string(), 2)
        );
    }

    #[test]
    fn test_delete_within_block() {
        assert_eq!(
            edit("<p>a<b>bc</b>d</p>", |f| delete_range(f, 1..2)),
            ("<p>a<b>c</b>d</p>".to_string(), 1)
        );
    }

    #[test]
    fn test_delete_joins_blocks() {
        assert_eq!(
            edit("<p>ab</p><p>cd</p>", |f| delete_range(f, 2..3)),
            ("<p>abcd</p>".to_string(), 2)
        );
        assert_eq!(
            edit("<p>ab</p><p>x</p><p>cd</p>", |f| delete_range(f, 1..6)),
            ("<p>ad</p>".to_string(), 1)
        );
    }

    #[test]
    fn test_delete_everything_leaves_placeholder() {
        assert_eq!(
            edit("<p>Hi</p>", |f| delete_range(f, 0..2)),
            ("<p><br></p>".to_string(), 0)
        );
    }

    #[test]
    fn test_delete_into_list_prunes_empty_list() {
        assert_eq!(
            edit("<p>a</p><ul><li>b</li></ul>", |f| delete_range(f, 1..2)),
            ("<p>ab</p>".to_string(), 1)
        );
    }

    #[test]
    fn test_backspace_into_placeholder_line() {
        assert_eq!(
            edit("<p><br></p><p>x</p>", |f| delete_range(f, 1..2)),
            ("<p>x</p>".to_string(), 0)
        );
    }

    #[test]
    fn test_enter_splits_paragraph() {
        assert_eq!(
            edit("<p>abcd</p>", |f| insert_paragraph(f, 2)),
            ("<p>ab</p><p>cd</p>".to_string(), 3)
        );
        assert_eq!(
            edit("<p>ab</p>", |f| insert_paragraph(f, 2)),
            ("<p>ab</p><p><br></p>".to_string(), 3)
        );
    }

    #[test]
    fn test_enter_in_empty_list_item_leaves_list() {
        assert_eq!(
            edit("<ul><li>a</li><li><br></li></ul>", |f| insert_paragraph(f, 2)),
            ("<ul><li>a</li></ul><p><br></p>".to_string(), 2)
        );
    }

    #[test]
    fn test_line_break_at_end_doubles() {
        assert_eq!(
            edit("<p>ab</p>", |f| insert_line_break(f, 2)),
            ("<p>ab<br><br></p>".to_string(), 3)
        );
        assert_eq!(
            edit("<p>ab</p>", |f| insert_line_break(f, 1)),
            ("<p>a<br>b</p>".to_string(), 2)
        );
    }

    #[test]
    fn test_insert_node_replaces_placeholder() {
        let img = Node::Element(Element::new("img").with_attr("src", "x"));
        assert_eq!(
            edit("<p><br></p>", |f| insert_node(f, 0, img)),
            (r#"<p><img src="x"></p>"#.to_string(), 1)
        );
    }
}
