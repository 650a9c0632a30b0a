//! Markup parsing and serialization for the surface dialect.
//!
//! The parser is deliberately forgiving: operator-entered signatures are
//! trusted, often hand-written, and frequently not well-formed. Unknown end
//! tags are ignored, unclosed elements are closed at end of input, and a
//! handful of optional end tags (`p`, `li`, `td`...) are inferred.

use markdown_weaver_escape::{StrWrite, escape_html};
use smol_str::SmolStr;

use crate::dom::{Element, Fragment, Node, RAW_TEXT_TAGS};

/// Parse a markup string into a fragment.
pub fn parse(input: &str) -> Fragment {
    let mut parser = Parser {
        src: input,
        pos: 0,
        stack: Vec::new(),
        root: Vec::new(),
    };
    parser.run();
    Fragment::new(parser.root)
}

/// Serialize a fragment to markup.
pub fn serialize(fragment: &Fragment) -> String {
    serialize_nodes(&fragment.nodes)
}

/// Serialize a list of nodes to markup.
pub fn serialize_nodes(nodes: &[Node]) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_nodes(&mut out, nodes, false);
    out
}

/// Write nodes as markup into any `StrWrite` sink.
pub fn write_nodes<W: StrWrite>(w: &mut W, nodes: &[Node], raw: bool) -> Result<(), W::Error> {
    for node in nodes {
        match node {
            Node::Text(text) if raw => w.write_str(text)?,
            Node::Text(text) => write_text(w, text)?,
            Node::Comment(text) => {
                w.write_str("<!--")?;
                w.write_str(text)?;
                w.write_str("-->")?;
            }
            Node::Element(el) => write_element(w, el)?,
        }
    }
    Ok(())
}

fn write_element<W: StrWrite>(w: &mut W, el: &Element) -> Result<(), W::Error> {
    w.write_str("<")?;
    w.write_str(&el.tag)?;
    for (name, value) in &el.attrs {
        w.write_str(" ")?;
        w.write_str(name)?;
        w.write_str("=\"")?;
        escape_html(&mut *w, value)?;
        w.write_str("\"")?;
    }
    w.write_str(">")?;

    if el.is_void() {
        return Ok(());
    }

    let raw = RAW_TEXT_TAGS.contains(&el.tag.as_str());
    write_nodes(w, &el.children, raw)?;

    w.write_str("</")?;
    w.write_str(&el.tag)?;
    w.write_str(">")
}

/// Escape text content, spelling non-breaking spaces as `&nbsp;` so they
/// survive a trip through tools that trim whitespace.
fn write_text<W: StrWrite>(w: &mut W, text: &str) -> Result<(), W::Error> {
    let mut pieces = text.split('\u{a0}');
    if let Some(first) = pieces.next() {
        escape_html(&mut *w, first)?;
    }
    for piece in pieces {
        w.write_str("&nbsp;")?;
        escape_html(&mut *w, piece)?;
    }
    Ok(())
}

// === Parser ===

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    stack: Vec<Element>,
    root: Vec<Node>,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn run(&mut self) {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.comment();
            } else if rest.starts_with("</") {
                self.end_tag();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_declaration();
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.start_tag();
            } else {
                self.text();
            }
        }

        while let Some(el) = self.stack.pop() {
            self.append(Node::Element(el));
        }
    }

    /// Append a node to the innermost open element (or the root).
    fn append(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn close_top(&mut self) {
        if let Some(el) = self.stack.pop() {
            self.append(Node::Element(el));
        }
    }

    fn comment(&mut self) {
        let body_start = self.pos + 4;
        match self.src[body_start..].find("-->") {
            Some(end) => {
                let body = &self.src[body_start..body_start + end];
                self.append(Node::Comment(body.to_string()));
                self.pos = body_start + end + 3;
            }
            None => {
                let body = &self.src[body_start..];
                self.append(Node::Comment(body.to_string()));
                self.pos = self.src.len();
            }
        }
    }

    fn skip_declaration(&mut self) {
        self.pos = match self.rest().find('>') {
            Some(end) => self.pos + end + 1,
            None => self.src.len(),
        };
    }

    fn text(&mut self) {
        let rest = self.rest();
        // A stray '<' that does not open a tag is literal text.
        let skip = usize::from(rest.starts_with('<'));
        let end = rest[skip..]
            .find('<')
            .map(|i| i + skip)
            .unwrap_or(rest.len());
        let decoded = decode_entities(&rest[..end]);
        self.pos += end;

        match self.stack.last_mut().and_then(|el| el.children.last_mut()) {
            Some(Node::Text(prev)) => prev.push_str(&decoded),
            _ => match (self.stack.is_empty(), self.root.last_mut()) {
                (true, Some(Node::Text(prev))) => prev.push_str(&decoded),
                _ => self.append(Node::Text(decoded)),
            },
        }
    }

    fn end_tag(&mut self) {
        let start = self.pos + 2;
        let close = self.src[start..]
            .find('>')
            .map(|i| start + i)
            .unwrap_or(self.src.len());
        let name = self.src[start..close]
            .trim()
            .to_ascii_lowercase();
        self.pos = (close + 1).min(self.src.len());

        // Pop up to the matching open element; unmatched end tags are dropped.
        if let Some(depth) = self.stack.iter().rposition(|el| el.tag == name.as_str()) {
            while self.stack.len() > depth {
                self.close_top();
            }
        } else {
            tracing::trace!(tag = %name, "ignoring unmatched end tag");
        }
    }

    fn start_tag(&mut self) {
        self.pos += 1;
        let name = self.take_while(|c| !c.is_whitespace() && c != '>' && c != '/');
        let mut el = Element::new(SmolStr::new(name.to_ascii_lowercase()));
        let self_closing = self.attributes(&mut el);

        self.close_implied(&el.tag);

        if el.is_void() || self_closing {
            self.append(Node::Element(el));
            return;
        }

        if RAW_TEXT_TAGS.contains(&el.tag.as_str()) {
            let closing = format!("</{}", el.tag);
            let rest = self.rest();
            let end = find_ascii_case_insensitive(rest, &closing).unwrap_or(rest.len());
            if end > 0 {
                el.children.push(Node::Text(rest[..end].to_string()));
            }
            self.pos += end;
            // Consume the end tag itself, if present.
            if self.pos < self.src.len() {
                self.skip_declaration();
            }
            self.append(Node::Element(el));
            return;
        }

        self.stack.push(el);
    }

    /// Close elements whose end tag is implied by the tag being opened.
    fn close_implied(&mut self, tag: &str) {
        if self.stack.last().is_some_and(|top| top.tag == "p") {
            let opening = Element::new(tag);
            if opening.is_block() || opening.is_structural() {
                self.close_top();
            }
        }

        let (closes, scope): (&[&str], &[&str]) = match tag {
            "li" => (&["li"], &["ul", "ol", "table", "td", "th"]),
            "td" | "th" => (&["td", "th"], &["tr", "table"]),
            "tr" => (&["tr", "td", "th"], &["table", "thead", "tbody", "tfoot"]),
            "dt" | "dd" => (&["dt", "dd"], &["dl"]),
            _ => return,
        };
        while let Some(depth) = self.open_in_scope(closes, scope) {
            while self.stack.len() > depth {
                self.close_top();
            }
        }
    }

    /// Depth of the innermost open element tagged one of `closes`, searching
    /// outwards until an element tagged one of `scope`.
    fn open_in_scope(&self, closes: &[&str], scope: &[&str]) -> Option<usize> {
        for (depth, el) in self.stack.iter().enumerate().rev() {
            if closes.contains(&el.tag.as_str()) {
                return Some(depth);
            }
            if scope.contains(&el.tag.as_str()) {
                return None;
            }
        }
        None
    }

    /// Parse attributes up to and including the closing `>`.
    ///
    /// Returns true for a self-closing `/>` tag.
    fn attributes(&mut self, el: &mut Element) -> bool {
        loop {
            self.take_while(|c| c.is_whitespace());
            let rest = self.rest();
            if rest.is_empty() {
                return false;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                return true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return false;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }

            let name = self
                .take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/')
                .to_ascii_lowercase();
            self.take_while(|c| c.is_whitespace());

            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.take_while(|c| c.is_whitespace());
                self.attribute_value()
            } else {
                String::new()
            };

            if !name.is_empty() && el.attr(&name).is_none() {
                el.attrs.push((SmolStr::new(name), value));
            }
        }
    }

    fn attribute_value(&mut self) -> String {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(quote).unwrap_or(body.len());
                let value = decode_entities(&body[..end]);
                self.pos += 1 + end + usize::from(end < body.len());
                value
            }
            _ => {
                let raw = self.take_while(|c| !c.is_whitespace() && c != '>');
                decode_entities(raw)
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Decode character references in text or attribute values.
///
/// Covers numeric references and the full HTML5 named set. Anything that is
/// not a known reference stays as written.
pub fn decode_entities(input: &str) -> String {
    html_escape::decode_html_entities(input).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &str) -> String {
        serialize(&parse(input))
    }

    #[test]
    fn test_canonical_markup_roundtrips() {
        for input in [
            "<p>Hi</p>",
            "<p><b>bold</b> and <i>italic</i></p><p>second</p>",
            r#"<p style="text-align: center;"><font face="Arial" size="4">x</font></p>"#,
            r#"<ul><li>one</li><li>two</li></ul>"#,
            r#"<p>a<br>b<img src="data:image/png;base64,AAAA"></p>"#,
            "<p>&amp; &lt;tag&gt;</p>",
            "",
        ] {
            assert_eq!(roundtrip(input), input);
        }
    }

    #[test]
    fn test_nbsp_is_spelled_out() {
        let frag = parse("<p>a&nbsp;&nbsp;b</p>");
        let text = frag.children(&[0]).and_then(|c| c.first()).cloned();
        assert_eq!(text, Some(Node::text("a\u{a0}\u{a0}b")));
        assert_eq!(serialize(&frag), "<p>a&nbsp;&nbsp;b</p>");
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        assert_eq!(roundtrip("<p>one<p>two"), "<p>one</p><p>two</p>");
        assert_eq!(roundtrip("<li>a<li>b"), "<li>a</li><li>b</li>");
        assert_eq!(roundtrip("<b>x</i></b>"), "<b>x</b>");
        assert_eq!(roundtrip("a < b"), "a &lt; b");
    }

    #[test]
    fn test_attributes() {
        let frag = parse(r#"<a HREF='https://x.test/?a=1&amp;b=2' target=_blank hidden>l</a>"#);
        let a = frag.element(&[0]).cloned().unwrap_or_else(|| Element::new("missing"));
        assert_eq!(a.attr("href"), Some("https://x.test/?a=1&b=2"));
        assert_eq!(a.attr("target"), Some("_blank"));
        assert_eq!(a.attr("hidden"), Some(""));
    }

    #[test]
    fn test_comments_and_raw_text() {
        let input = "<style>p > b { color: red }</style><!-- note --><p>x</p>";
        assert_eq!(roundtrip(input), input);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("&#169; &#x2014; &bogus; & done"), "\u{a9} \u{2014} &bogus; & done");
        assert_eq!(
            decode_entities("Ren&eacute; M&uuml;ller &middot; Espa&ntilde;a &ouml;"),
            "Ren\u{e9} M\u{fc}ller \u{b7} Espa\u{f1}a \u{f6}"
        );
    }

    #[test]
    fn test_named_entities_survive_an_edit() {
        let mut surface = crate::surface::Surface::new();
        surface.seed("<p>Ren&eacute; M&uuml;ller</p>");
        surface.set_selection(Some(crate::types::Selection::collapsed(11)));
        assert!(surface.insert_text("!"));
        assert_eq!(surface.markup(), "<p>Ren\u{e9} M\u{fc}ller!</p>");
        assert_eq!(surface.text_content(), "Ren\u{e9} M\u{fc}ller!");
    }

    #[test]
    fn test_sibling_cells_and_items_close() {
        assert_eq!(roundtrip("<td>a<td>b"), "<td>a</td><td>b</td>");
        assert_eq!(roundtrip("<td><b>a<td>b"), "<td><b>a</b></td><td>b</td>");
        assert_eq!(roundtrip("<li><i>a<li>b"), "<li><i>a</i></li><li>b</li>");
        assert_eq!(
            roundtrip("<ul><li>a<ul><li>b<li>c</ul><li>d</ul>"),
            "<ul><li>a<ul><li>b</li><li>c</li></ul></li><li>d</li></ul>"
        );
        assert_eq!(
            roundtrip("<table><tr><td>a<tr><td>b</table>"),
            "<table><tr><td>a</td></tr><tr><td>b</td></tr></table>"
        );
    }

    #[test]
    fn test_reparse_is_stable() {
        for input in [
            "<td>a<td>b",
            "<li>a<td>b<li>c",
            "<p>one<td>two<p>three",
            "<dl><dt>a<dd>b<dt>c</dl>",
            "<table><tr><td><ul><li>x<li>y</ul><td>z</table>",
        ] {
            let once = roundtrip(input);
            assert_eq!(roundtrip(&once), once, "{input}");
        }
    }

    #[test]
    fn test_quotes_in_attribute_are_escaped() {
        let el = Element::new("a").with_attr("title", "say \"hi\"");
        insta::assert_snapshot!(serialize_nodes(&[Node::Element(el)]), @r#"<a title="say &quot;hi&quot;"></a>"#);
    }
}
