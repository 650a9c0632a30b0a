//! Read-only preview of the last captured markup.

use std::cell::RefCell;
use std::rc::Rc;

use markdown_weaver_escape::escape_html;

/// Shared snapshot cell. Cloning shares the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    inner: Rc<RefCell<String>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, markup: &str) {
        let mut snapshot = self.inner.borrow_mut();
        snapshot.clear();
        snapshot.push_str(markup);
    }

    pub fn snapshot(&self) -> String {
        self.inner.borrow().clone()
    }

    /// The snapshot as a standalone HTML document for a sandboxed frame.
    pub fn render_document(&self, title: &str) -> String {
        let mut escaped_title = String::new();
        // Writing into a String cannot fail.
        let _ = escape_html(&mut escaped_title, title);
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
             <style>body {{ margin: 16px; font-family: Arial, sans-serif; }}</style>\n\
             </head>\n<body>\n{}\n</body>\n</html>\n",
            escaped_title,
            self.inner.borrow()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_snapshot() {
        let preview = PreviewStore::new();
        let view = preview.clone();
        preview.set("<p>Hi</p>");
        assert_eq!(view.snapshot(), "<p>Hi</p>");
        preview.set("");
        assert_eq!(view.snapshot(), "");
    }

    #[test]
    fn test_render_document() {
        let preview = PreviewStore::new();
        preview.set("<p><b>Ann</b></p>");
        insta::assert_snapshot!(preview.render_document("Ann & Co").trim_end(), @r#"
        <!DOCTYPE html>
        <html>
        <head>
        <meta charset="utf-8">
        <title>Ann &amp; Co</title>
        <style>body { margin: 16px; font-family: Arial, sans-serif; }</style>
        </head>
        <body>
        <p><b>Ann</b></p>
        </body>
        </html>
        "#);
    }
}
