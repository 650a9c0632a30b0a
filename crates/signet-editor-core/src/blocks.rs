//! Block-level commands: alignment and lists.
//!
//! None of these change visible positions; every container before a command
//! maps to exactly one container after it, so the selection stays put.

use std::ops::Range;

use crate::dom::{Element, Fragment, Node};
use crate::position::{PositionMap, is_collapsible_whitespace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_css(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    pub fn tag(self) -> &'static str {
        match self {
            ListKind::Ordered => "ol",
            ListKind::Unordered => "ul",
        }
    }
}

fn is_list(node: &Node) -> bool {
    node.as_element()
        .is_some_and(|el| matches!(el.tag.as_str(), "ul" | "ol"))
}

/// Whether a node contributes positions when it sits among block siblings.
fn is_significant(node: &Node, among_blocks: bool) -> bool {
    match node {
        Node::Text(text) if among_blocks => !is_collapsible_whitespace(text),
        other => other.has_visible_content(),
    }
}

/// Wrap every top-level run of inline content in a paragraph so that all
/// visible content lives in a block. Returns true if anything was wrapped.
pub fn ensure_blocks(fragment: &mut Fragment) -> bool {
    let among_blocks = fragment.nodes.iter().any(Node::is_block_level);
    let mut changed = false;
    let mut out = Vec::with_capacity(fragment.nodes.len());
    let mut run: Vec<Node> = Vec::new();

    for node in std::mem::take(&mut fragment.nodes) {
        if node.is_block_level() {
            changed |= flush_inline_run(&mut out, &mut run, among_blocks);
            out.push(node);
        } else {
            run.push(node);
        }
    }
    changed |= flush_inline_run(&mut out, &mut run, among_blocks);

    fragment.nodes = out;
    changed
}

fn flush_inline_run(out: &mut Vec<Node>, run: &mut Vec<Node>, among_blocks: bool) -> bool {
    let first = run.iter().position(|n| is_significant(n, among_blocks));
    let last = run.iter().rposition(|n| is_significant(n, among_blocks));
    let (Some(first), Some(last)) = (first, last) else {
        out.append(run);
        return false;
    };

    let mut rest = run.split_off(first);
    let tail = rest.split_off(last - first + 1);
    out.append(run);
    out.push(Node::Element(Element::new("p").with_children(rest)));
    out.extend(tail);
    true
}

/// Align every block the range touches.
pub fn align(fragment: &mut Fragment, range: Range<usize>, alignment: Alignment) -> bool {
    ensure_blocks(fragment);
    let containers = PositionMap::build(fragment).containers_touching(range);
    let mut changed = false;

    for path in containers.iter().filter(|p| !p.is_empty()) {
        // An aligned ancestor would otherwise win over a plain left block.
        let inherited = (1..path.len()).any(|depth| {
            fragment
                .element(&path[..depth])
                .and_then(|el| el.style_property("text-align"))
                .is_some_and(|value| !value.eq_ignore_ascii_case("left"))
        });
        let value = match alignment {
            Alignment::Left if !inherited => None,
            other => Some(other.as_css()),
        };
        if let Some(el) = fragment.element_mut(path) {
            el.set_style_property("text-align", value);
            changed = true;
        }
    }
    changed
}

/// Toggle a list over the blocks the range touches.
///
/// Blocks already in a list of this kind are taken out of it; otherwise the
/// touched top-level blocks (and any lists among them) become one list.
pub fn toggle_list(fragment: &mut Fragment, range: Range<usize>, kind: ListKind) -> bool {
    ensure_blocks(fragment);
    let containers = PositionMap::build(fragment).containers_touching(range);

    let mut tops: Vec<usize> = containers.iter().filter_map(|c| c.first().copied()).collect();
    tops.dedup();
    let (Some(&lo), Some(&hi)) = (tops.first(), tops.last()) else {
        return false;
    };

    let all_in_list = tops.iter().all(|&i| {
        fragment
            .nodes
            .get(i)
            .and_then(Node::as_element)
            .is_some_and(|el| el.tag == kind.tag())
    });

    if all_in_list {
        let mut items: Vec<(usize, usize)> = containers
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| (c[0], c[1]))
            .collect();
        items.dedup();
        for &top in tops.iter().rev() {
            let indices: Vec<usize> = items
                .iter()
                .filter(|(t, _)| *t == top)
                .map(|(_, i)| *i)
                .collect();
            unlist_items(fragment, top, &indices);
        }
        return true;
    }

    let span: Vec<Node> = fragment.nodes.drain(lo..=hi).collect();
    let shell = Element::new(kind.tag());
    let mut out = Vec::new();
    let mut list = shell.clone();
    for node in span {
        match node {
            Node::Element(el) if matches!(el.tag.as_str(), "ul" | "ol") => {
                list.children
                    .extend(el.children.into_iter().filter(|n| is_significant(n, true)));
            }
            Node::Element(mut el) if el.is_block() => {
                el.tag = "li".into();
                el.remove_attr("id");
                list.children.push(Node::Element(el));
            }
            other if !is_significant(&other, true) => {}
            other => {
                if !list.children.is_empty() {
                    out.push(Node::Element(std::mem::replace(&mut list, shell.clone())));
                }
                out.push(other);
            }
        }
    }
    if !list.children.is_empty() {
        out.push(Node::Element(list));
    }
    fragment.nodes.splice(lo..lo, out);
    true
}

/// Take the items at `indices` out of the top-level list at `top`, turning
/// each into a paragraph and splitting the list around it.
pub fn unlist_items(fragment: &mut Fragment, top: usize, indices: &[usize]) -> bool {
    if !fragment.nodes.get(top).is_some_and(is_list) || indices.is_empty() {
        return false;
    }
    let Node::Element(list) = fragment.nodes.remove(top) else {
        return false;
    };

    let shell = list.shallow_clone();
    let mut out = Vec::new();
    let mut pending = shell.clone();
    for (i, child) in list.children.into_iter().enumerate() {
        match child {
            Node::Element(mut item) if indices.contains(&i) => {
                if pending.children.iter().any(|n| n.as_element().is_some()) {
                    out.push(Node::Element(std::mem::replace(&mut pending, shell.clone())));
                } else {
                    pending.children.clear();
                }
                let has_blocks = item.children.iter().any(Node::is_block_level);
                item.tag = if has_blocks { "div" } else { "p" }.into();
                out.push(Node::Element(item));
            }
            other => pending.children.push(other),
        }
    }
    if pending.children.iter().any(|n| n.as_element().is_some()) {
        out.push(Node::Element(pending));
    }

    fragment.nodes.splice(top..top, out);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{parse, serialize};

    fn run(markup: &str, f: impl FnOnce(&mut Fragment) -> bool) -> String {
        let mut frag = parse(markup);
        f(&mut frag);
        serialize(&frag)
    }

    #[test]
    fn test_ensure_blocks_wraps_inline_runs() {
        assert_eq!(
            run("Hi <b>there</b><p>x</p>tail", ensure_blocks),
            "<p>Hi <b>there</b></p><p>x</p><p>tail</p>"
        );
        assert_eq!(run("<p>x</p>\n<p>y</p>", ensure_blocks), "<p>x</p>\n<p>y</p>");
    }

    #[test]
    fn test_align_center_then_left() {
        let mut frag = parse("<p>a</p><p>b</p>");
        assert!(align(&mut frag, 0..0, Alignment::Center));
        assert_eq!(
            serialize(&frag),
            r#"<p style="text-align: center;">a</p><p>b</p>"#
        );
        assert!(align(&mut frag, 0..3, Alignment::Right));
        assert_eq!(
            serialize(&frag),
            r#"<p style="text-align: right;">a</p><p style="text-align: right;">b</p>"#
        );
        assert!(align(&mut frag, 0..3, Alignment::Left));
        assert_eq!(serialize(&frag), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_list_roundtrip() {
        let mut frag = parse("<p>a</p><p>b</p><p>c</p>");
        assert!(toggle_list(&mut frag, 0..3, ListKind::Unordered));
        assert_eq!(serialize(&frag), "<ul><li>a</li><li>b</li></ul><p>c</p>");

        assert!(toggle_list(&mut frag, 0..3, ListKind::Unordered));
        assert_eq!(serialize(&frag), "<p>a</p><p>b</p><p>c</p>");
    }

    #[test]
    fn test_switch_list_kind() {
        assert_eq!(
            run("<ul><li>a</li><li>b</li></ul>", |f| toggle_list(
                f,
                0..0,
                ListKind::Ordered
            )),
            "<ol><li>a</li><li>b</li></ol>"
        );
    }

    #[test]
    fn test_unlist_middle_item_splits_list() {
        assert_eq!(
            run("<ol><li>a</li><li>b</li><li>c</li></ol>", |f| toggle_list(
                f,
                2..2,
                ListKind::Ordered
            )),
            "<ol><li>a</li></ol><p>b</p><ol><li>c</li></ol>"
        );
    }
}
