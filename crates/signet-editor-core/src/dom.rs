//! Markup tree for the editing surface.
//!
//! The surface keeps its content as a small owned tree rather than a string so
//! formatting commands can split and wrap nodes. Nodes are addressed by
//! [`NodePath`], a list of child indices from the fragment root.

use smol_str::SmolStr;

/// Child-index path from the fragment root to a node.
///
/// The empty path addresses the root itself.
pub type NodePath = Vec<usize>;

/// Elements that never have children or a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements that own a run of inline content (a "line" of the document).
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "td", "th",
    "address", "center", "section", "article", "header", "footer", "dd", "dt", "caption",
];

/// Block-level elements that only hold other blocks (lists, tables).
const STRUCTURAL_TAGS: &[&str] = &[
    "ul", "ol", "dl", "table", "thead", "tbody", "tfoot", "tr", "colgroup", "hr",
];

/// Elements whose text content is not rendered.
const HIDDEN_TAGS: &[&str] = &["style", "script", "head", "title", "template", "noscript"];

/// Elements whose content is raw text (no markup, no entity decoding).
pub(crate) const RAW_TEXT_TAGS: &[&str] = &["style", "script", "textarea", "title"];

/// Inline elements that only carry formatting and can be merged or dropped when empty.
const FORMATTING_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "u", "s", "strike", "del", "font", "span", "a", "sub", "sup",
    "small", "big", "mark", "code", "tt", "ins",
];

/// A node in the markup tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    /// Create a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    /// Get the element, if this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Get the element mutably, if this node is one.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Whether this node starts a new line box (block or structural element).
    pub fn is_block_level(&self) -> bool {
        self.as_element()
            .is_some_and(|el| el.is_block() || el.is_structural())
    }

    /// Whether this node renders anything a user can see or place a caret next to.
    pub fn has_visible_content(&self) -> bool {
        match self {
            Node::Text(t) => !t.is_empty(),
            Node::Comment(_) => false,
            Node::Element(el) if el.is_hidden() => false,
            Node::Element(el) if el.is_atom() => true,
            Node::Element(el) => el.children.iter().any(Node::has_visible_content),
        }
    }
}

/// An element with ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes or children.
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style children setter.
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Create an empty element carrying the same tag and attributes.
    pub fn shallow_clone(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            attrs: self.attrs.clone(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<SmolStr>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Remove an attribute. Returns true if it was present.
    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(k, _)| k != name);
        self.attrs.len() != before
    }

    /// Read one property out of the inline `style` attribute.
    pub fn style_property(&self, property: &str) -> Option<String> {
        let style = self.attr("style")?;
        parse_style(style)
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(property))
            .map(|(_, v)| v)
    }

    /// Set (or with `None`, remove) one property of the inline `style` attribute.
    ///
    /// The `style` attribute is dropped entirely once it has no properties left.
    pub fn set_style_property(&mut self, property: &str, value: Option<&str>) {
        let mut props = self.attr("style").map(parse_style).unwrap_or_default();
        props.retain(|(k, _)| !k.eq_ignore_ascii_case(property));
        if let Some(value) = value {
            props.push((property.to_string(), value.to_string()));
        }

        if props.is_empty() {
            self.remove_attr("style");
        } else {
            let style = props
                .iter()
                .map(|(k, v)| format!("{k}: {v};"))
                .collect::<Vec<_>>()
                .join(" ");
            self.set_attr("style", style);
        }
    }

    pub fn is_void(&self) -> bool {
        VOID_TAGS.contains(&self.tag.as_str())
    }

    pub fn is_block(&self) -> bool {
        BLOCK_TAGS.contains(&self.tag.as_str())
    }

    pub fn is_structural(&self) -> bool {
        STRUCTURAL_TAGS.contains(&self.tag.as_str())
    }

    pub fn is_hidden(&self) -> bool {
        HIDDEN_TAGS.contains(&self.tag.as_str())
    }

    pub fn is_formatting(&self) -> bool {
        FORMATTING_TAGS.contains(&self.tag.as_str())
    }

    /// Inline elements that occupy exactly one caret position.
    pub fn is_atom(&self) -> bool {
        matches!(self.tag.as_str(), "img" | "br")
    }

    /// Whether two elements would serialize to the same opening tag.
    pub fn same_shape(&self, other: &Element) -> bool {
        self.tag == other.tag && self.attrs == other.attrs
    }
}

/// Split an inline style declaration into `(property, value)` pairs.
fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty()).then(|| (k.to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

/// The root of a markup tree: an ordered list of top-level nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

impl Fragment {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the node at a path. The empty path has no node (it is the root).
    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (last, parent) = path.split_last()?;
        self.children(parent)?.get(*last)
    }

    /// Get the node at a path mutably.
    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (last, parent) = path.split_last()?;
        self.children_mut(parent)?.get_mut(*last)
    }

    /// Get the element at a path.
    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        self.node(path).and_then(Node::as_element)
    }

    /// Get the element at a path mutably.
    pub fn element_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        self.node_mut(path).and_then(Node::as_element_mut)
    }

    /// Children of the node at `path` (the root's nodes for the empty path).
    pub fn children(&self, path: &[usize]) -> Option<&Vec<Node>> {
        let mut cur = &self.nodes;
        for &i in path {
            cur = match cur.get(i) {
                Some(Node::Element(el)) => &el.children,
                _ => return None,
            };
        }
        Some(cur)
    }

    /// Children of the node at `path`, mutably.
    pub fn children_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        let mut cur = &mut self.nodes;
        for &i in path {
            cur = match cur.get_mut(i) {
                Some(Node::Element(el)) => &mut el.children,
                _ => return None,
            };
        }
        Some(cur)
    }

    /// Remove and return the node at `path`.
    pub fn remove(&mut self, path: &[usize]) -> Option<Node> {
        let (last, parent) = path.split_last()?;
        let children = self.children_mut(parent)?;
        (*last < children.len()).then(|| children.remove(*last))
    }

    /// Whether anything in the fragment is visible.
    pub fn has_visible_content(&self) -> bool {
        self.nodes.iter().any(Node::has_visible_content)
    }
}

/// Split a non-empty path into its parent path and last index.
pub fn split_path(path: &[usize]) -> Option<(NodePath, usize)> {
    let (last, parent) = path.split_last()?;
    Some((parent.to_vec(), *last))
}

/// Clean up a run of inline content after an edit.
///
/// Drops empty text and empty formatting elements, merges adjacent text
/// nodes, and merges adjacent formatting elements with identical tags and
/// attributes. Recurses into every child element.
pub fn normalize(nodes: &mut Vec<Node>) {
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            if !el.is_hidden() {
                normalize(&mut el.children);
            }
        }
    }

    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        match node {
            Node::Text(t) if t.is_empty() => {}
            Node::Element(el) if el.is_formatting() && el.children.is_empty() => {}
            Node::Text(t) => match out.last_mut() {
                Some(Node::Text(prev)) => prev.push_str(&t),
                _ => out.push(Node::Text(t)),
            },
            Node::Element(el) => match out.last_mut() {
                Some(Node::Element(prev)) if prev.is_formatting() && prev.same_shape(&el) => {
                    prev.children.extend(el.children);
                    normalize(&mut prev.children);
                }
                _ => out.push(Node::Element(el)),
            },
            other => out.push(other),
        }
    }
    *nodes = out;
}
