//! Inline formatting over selections.

use std::ops::Range;

use crate::dom::{Element, Fragment, Node, NodePath, normalize};
use crate::position::{LeafKind, PositionMap, isolate, shift_path};

/// An inline format and, for valued formats, its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Format {
    Bold,
    Italic,
    Underline,
    Strike,
    FontFace(String),
    /// Legacy size level, 1-7.
    FontSize(u8),
    ForeColor(String),
    BackColor(String),
    Link(String),
}

impl Format {
    /// Whether `el` carries this kind of format, whatever its value.
    ///
    /// The inline toggles also count the equivalent inline style on a
    /// formatting element, such as `font-weight: bold` on a `span`.
    pub fn matches(&self, el: &Element) -> bool {
        self.tag_matches(el) || self.style_matches(el)
    }

    fn tag_matches(&self, el: &Element) -> bool {
        let tag = el.tag.as_str();
        match self {
            Format::Bold => matches!(tag, "b" | "strong"),
            Format::Italic => matches!(tag, "i" | "em"),
            Format::Underline => tag == "u",
            Format::Strike => matches!(tag, "s" | "strike" | "del"),
            Format::FontFace(_) => tag == "font" && el.attr("face").is_some(),
            Format::FontSize(_) => tag == "font" && el.attr("size").is_some(),
            Format::ForeColor(_) => tag == "font" && el.attr("color").is_some(),
            Format::BackColor(_) => el.is_formatting() && el.style_property("background-color").is_some(),
            Format::Link(_) => tag == "a",
        }
    }

    fn style_matches(&self, el: &Element) -> bool {
        if !el.is_formatting() {
            return false;
        }
        match self {
            Format::Bold => el
                .style_property("font-weight")
                .is_some_and(|weight| is_bold_weight(&weight)),
            Format::Italic => el.style_property("font-style").is_some_and(|style| {
                style
                    .split_whitespace()
                    .next()
                    .is_some_and(|kw| kw.eq_ignore_ascii_case("italic") || kw.eq_ignore_ascii_case("oblique"))
            }),
            Format::Underline => has_decoration(el, "underline"),
            Format::Strike => has_decoration(el, "line-through"),
            _ => false,
        }
    }

    /// The element used to apply the format.
    pub fn wrapper(&self) -> Element {
        match self {
            Format::Bold => Element::new("b"),
            Format::Italic => Element::new("i"),
            Format::Underline => Element::new("u"),
            Format::Strike => Element::new("strike"),
            Format::FontFace(face) => Element::new("font").with_attr("face", face.as_str()),
            Format::FontSize(level) => Element::new("font").with_attr("size", level.to_string()),
            Format::ForeColor(color) => Element::new("font").with_attr("color", color.as_str()),
            Format::BackColor(color) => {
                let mut span = Element::new("span");
                span.set_style_property("background-color", Some(color));
                span
            }
            Format::Link(href) => Element::new("a").with_attr("href", href.as_str()),
        }
    }

    /// Remove this format from `el`. Returns true when the element carries
    /// nothing else and should be replaced by its children.
    fn strip(&self, el: &mut Element) -> bool {
        match self {
            Format::FontFace(_) => strip_font_attr(el, "face"),
            Format::FontSize(_) => strip_font_attr(el, "size"),
            Format::ForeColor(_) => strip_font_attr(el, "color"),
            Format::BackColor(_) => {
                el.set_style_property("background-color", None);
                is_bare_wrapper(el)
            }
            _ if self.tag_matches(el) => true,
            Format::Bold => {
                el.set_style_property("font-weight", None);
                is_bare_wrapper(el)
            }
            Format::Italic => {
                el.set_style_property("font-style", None);
                is_bare_wrapper(el)
            }
            Format::Underline => {
                strip_decoration(el, "underline");
                is_bare_wrapper(el)
            }
            Format::Strike => {
                strip_decoration(el, "line-through");
                is_bare_wrapper(el)
            }
            _ => true,
        }
    }

    /// Inline toggles flip on and off; valued formats are always applied.
    pub fn is_toggle(&self) -> bool {
        matches!(
            self,
            Format::Bold | Format::Italic | Format::Underline | Format::Strike
        )
    }
}

fn strip_font_attr(el: &mut Element, attr: &str) -> bool {
    el.remove_attr(attr);
    el.attrs.is_empty()
}

/// A `span` or `font` with no attributes left adds nothing.
fn is_bare_wrapper(el: &Element) -> bool {
    matches!(el.tag.as_str(), "span" | "font") && el.attrs.is_empty()
}

/// `bold`, `bolder`, or a numeric weight of 600 and up.
fn is_bold_weight(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("bold")
        || value.eq_ignore_ascii_case("bolder")
        || value.parse::<u16>().is_ok_and(|weight| weight >= 600)
}

const DECORATION_PROPERTIES: [&str; 2] = ["text-decoration", "text-decoration-line"];
const DECORATION_LINES: [&str; 3] = ["underline", "overline", "line-through"];

fn has_decoration(el: &Element, line: &str) -> bool {
    DECORATION_PROPERTIES.iter().any(|property| {
        el.style_property(property)
            .is_some_and(|value| value.split_whitespace().any(|kw| kw.eq_ignore_ascii_case(line)))
    })
}

/// Drop `line` from the decoration properties, and the property itself when
/// no other line remains.
fn strip_decoration(el: &mut Element, line: &str) {
    for property in DECORATION_PROPERTIES {
        let Some(value) = el.style_property(property) else {
            continue;
        };
        let rest: Vec<&str> = value
            .split_whitespace()
            .filter(|kw| !kw.eq_ignore_ascii_case(line))
            .collect();
        let other_line = rest
            .iter()
            .any(|kw| DECORATION_LINES.iter().any(|l| kw.eq_ignore_ascii_case(l)));
        let kept = other_line.then(|| rest.join(" "));
        el.set_style_property(property, kept.as_deref());
    }
}

/// Whether every visible character in `range` carries `format`.
///
/// Only text counts when the range has any; a range holding nothing but
/// images is judged by the images.
pub fn range_has_format(fragment: &Fragment, range: Range<usize>, format: &Format) -> bool {
    let map = PositionMap::build(fragment);
    let leaves: Vec<_> = map.leaves_overlapping(range).collect();
    let text: Vec<_> = leaves
        .iter()
        .filter(|leaf| leaf.kind == LeafKind::Text)
        .collect();
    let judged: Vec<_> = if text.is_empty() {
        leaves.iter().collect()
    } else {
        text
    };
    !judged.is_empty()
        && judged
            .iter()
            .all(|leaf| path_has_format(fragment, &leaf.path, leaf.container.len(), format))
}

/// Whether the caret at `pos` sits inside `format`.
///
/// Looks at the character before the caret, or after it at the start of a block.
pub fn caret_has_format(fragment: &Fragment, pos: usize, format: &Format) -> bool {
    let map = PositionMap::build(fragment);
    map.resolve(pos)
        .is_some_and(|leaf| path_has_format(fragment, &leaf.path, leaf.container.len(), format))
}

/// Check the elements between depth `floor` and the node at `path`.
fn path_has_format(fragment: &Fragment, path: &[usize], floor: usize, format: &Format) -> bool {
    (floor + 1..=path.len()).any(|depth| {
        fragment
            .element(&path[..depth])
            .is_some_and(|el| format.matches(el))
    })
}

/// Find the value of the innermost `attr` on a `font` element around `pos`.
pub fn font_attr_at(fragment: &Fragment, pos: usize, attr: &str) -> Option<String> {
    let map = PositionMap::build(fragment);
    let leaf = map.resolve(pos)?;
    (1..=leaf.path.len()).rev().find_map(|depth| {
        fragment
            .element(&leaf.path[..depth])
            .filter(|el| el.tag == "font")
            .and_then(|el| el.attr(attr))
            .map(str::to_string)
    })
}

/// Apply `format` over `range`, replacing any existing value of the same kind.
///
/// Returns false when the range covers nothing.
pub fn apply_format(fragment: &mut Fragment, range: Range<usize>, format: &Format) -> bool {
    rewrite_segments(fragment, range, |mut run| {
        strip_format(&mut run, format);
        vec![Node::Element(format.wrapper().with_children(run))]
    })
}

/// Remove `format` from everything in `range`.
pub fn remove_format(fragment: &mut Fragment, range: Range<usize>, format: &Format) -> bool {
    rewrite_segments(fragment, range, |mut run| {
        strip_format(&mut run, format);
        run
    })
}

/// Toggle an inline format: remove it if the whole range has it, apply it otherwise.
pub fn toggle_format(fragment: &mut Fragment, range: Range<usize>, format: &Format) -> bool {
    if range_has_format(fragment, range.clone(), format) {
        remove_format(fragment, range, format)
    } else {
        apply_format(fragment, range, format)
    }
}

/// Strip every formatting element except links from `range`.
pub fn clear_formatting(fragment: &mut Fragment, range: Range<usize>) -> bool {
    rewrite_segments(fragment, range, |mut run| {
        unwrap_all_formatting(&mut run);
        run
    })
}

/// Isolate `range` and replace each covered run of children with `rewrite(run)`.
fn rewrite_segments(
    fragment: &mut Fragment,
    range: Range<usize>,
    mut rewrite: impl FnMut(Vec<Node>) -> Vec<Node>,
) -> bool {
    let segments = isolate(fragment, range);
    if segments.is_empty() {
        return false;
    }

    // Later segments go first so earlier paths stay valid; paths already
    // visited are shifted as runs before them change length.
    let mut touched: Vec<NodePath> = Vec::new();
    for seg in segments.iter().rev() {
        let Some(children) = fragment.children_mut(&seg.container) else {
            continue;
        };
        let run: Vec<Node> = children.drain(seg.range.clone()).collect();
        let replacement = rewrite(run);
        let delta = replacement.len() as isize - seg.range.len() as isize;
        let tail = children.split_off(seg.range.start);
        children.extend(replacement);
        children.extend(tail);

        for path in &mut touched {
            shift_path(path, &seg.container, seg.range.end, delta);
        }
        if !touched.contains(&seg.container) {
            touched.push(seg.container.clone());
        }
    }

    touched.sort();
    for path in touched.iter().rev() {
        if let Some(children) = fragment.children_mut(path) {
            normalize(children);
        }
    }
    true
}

/// Remove `format` from a run of nodes, unwrapping elements left bare.
fn strip_format(nodes: &mut Vec<Node>, format: &Format) {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        match node {
            Node::Element(mut el) if !el.is_block() && !el.is_structural() => {
                strip_format(&mut el.children, format);
                if format.matches(&el) && format.strip(&mut el) {
                    out.extend(el.children);
                } else {
                    out.push(Node::Element(el));
                }
            }
            other => out.push(other),
        }
    }
    *nodes = out;
}

fn unwrap_all_formatting(nodes: &mut Vec<Node>) {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        match node {
            Node::Element(mut el) if el.is_formatting() => {
                unwrap_all_formatting(&mut el.children);
                if el.tag == "a" {
                    el.attrs.retain(|(k, _)| k == "href" || k == "target" || k == "title");
                    out.push(Node::Element(el));
                } else {
                    out.extend(el.children);
                }
            }
            other => out.push(other),
        }
    }
    *nodes = out;
}
