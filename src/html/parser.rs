//! Lenient HTML parser.
//!
//! Builds a [`Dom`] from export HTML. Handles void and self-closing
//! elements, comments, doctype, raw-text `<script>`/`<style>` content, and
//! quoted or unquoted attributes. Mismatched end tags are skipped instead
//! of failing; export files are machine-generated but not guaranteed to be
//! well formed.

use html_escape::decode_html_entities;

use super::dom::{Dom, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn parse_html(input: &str) -> Dom {
    let mut parser = Parser {
        input,
        pos: 0,
        dom: Dom::new(),
        stack: Vec::new(),
    };
    parser.run();
    parser.dom
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    dom: Dom,
    stack: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    fn run(&mut self) {
        while self.pos < self.input.len() {
            match self.input[self.pos..].find('<') {
                Some(offset) => {
                    if offset > 0 {
                        let text = &self.input[self.pos..self.pos + offset];
                        self.add_text(text);
                        self.pos += offset;
                    }
                    self.handle_angle();
                }
                None => {
                    let text = &self.input[self.pos..];
                    self.add_text(text);
                    self.pos = self.input.len();
                }
            }
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn parent(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.dom.root())
    }

    fn add_text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let decoded = decode_html_entities(raw);
        let node = self.dom.create_text(&decoded);
        let parent = self.parent();
        self.dom.append_child(parent, node);
    }

    fn handle_angle(&mut self) {
        let rest = self.rest();
        if rest.starts_with("<!--") {
            self.pos = match rest.find("-->") {
                Some(end) => self.pos + end + 3,
                None => self.input.len(),
            };
        } else if rest.starts_with("</") {
            self.handle_end_tag();
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            self.pos = match rest.find('>') {
                Some(end) => self.pos + end + 1,
                None => self.input.len(),
            };
        } else if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            self.handle_start_tag();
        } else {
            // A bare '<' in text content.
            self.add_text("<");
            self.pos += 1;
        }
    }

    fn handle_end_tag(&mut self) {
        let rest = self.rest();
        let Some(end) = rest.find('>') else {
            self.pos = self.input.len();
            return;
        };
        let name = rest[2..end].trim().to_ascii_lowercase();
        if let Some(open) = self.stack.iter().rposition(|&n| self.dom.tag(n) == Some(&name)) {
            self.stack.truncate(open);
        }
        self.pos += end + 1;
    }

    fn handle_start_tag(&mut self) {
        self.pos += 1; // consume '<'
        let name = self.read_while(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':');
        let name = name.to_ascii_lowercase();

        let element = self.dom.create_element(&name);
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                break;
            }
            if rest.starts_with("/>") {
                self_closing = true;
                self.pos += 2;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            let attr_name =
                self.read_while(|c| !c.is_ascii_whitespace() && c != '=' && c != '>' && c != '/');
            if attr_name.is_empty() {
                self.pos += 1;
                continue;
            }
            let attr_name = attr_name.to_ascii_lowercase();
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.read_attr_value()
            } else {
                String::new()
            };
            self.dom.set_attr(element, &attr_name, &value);
        }

        let parent = self.parent();
        self.dom.append_child(parent, element);

        if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
            return;
        }

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.consume_raw_text(element, &name);
            return;
        }

        self.stack.push(element);
    }

    fn read_attr_value(&mut self) -> String {
        let rest = self.rest();
        let raw = if let Some(quote) = rest.chars().next().filter(|&c| c == '"' || c == '\'') {
            let inner = &rest[1..];
            match inner.find(quote) {
                Some(end) => {
                    self.pos += end + 2;
                    &inner[..end]
                }
                None => {
                    self.pos = self.input.len();
                    inner
                }
            }
        } else {
            let end = rest
                .find(|c: char| c.is_ascii_whitespace() || c == '>')
                .unwrap_or(rest.len());
            self.pos += end;
            &rest[..end]
        };
        decode_html_entities(raw).into_owned()
    }

    /// Everything up to the matching end tag becomes one literal text child.
    fn consume_raw_text(&mut self, element: NodeId, name: &str) {
        let closer = format!("</{name}");
        let rest = self.rest();
        let end = find_ignore_ascii_case(rest, &closer).unwrap_or(rest.len());
        if end > 0 {
            let node = self.dom.create_text(&rest[..end]);
            self.dom.append_child(element, node);
        }
        self.pos += end;
        let rest = self.rest();
        self.pos = match rest.find('>') {
            Some(gt) => self.pos + gt + 1,
            None => self.input.len(),
        };
    }

    fn read_while<F: Fn(char) -> bool>(&mut self, pred: F) -> String {
        let rest = self.rest();
        let end = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += end;
        rest[..end].to_string()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !c.is_ascii_whitespace())
            .unwrap_or(rest.len());
        self.pos += end;
    }
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.len() > h.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_tree() {
        let dom = parse_html("<html><body><div class=\"page-body\"><p>Hi</p></div></body></html>");
        let body = dom.find_tag(dom.root(), "body").unwrap();
        let div = dom.find_first(body, |d, n| d.has_class(n, "page-body")).unwrap();
        assert_eq!(dom.text_content(div), "Hi");
    }

    #[test]
    fn test_parse_entities_and_attrs() {
        let dom = parse_html("<a href=\"Page%20abc.html\" title=\"A &amp; B\">x &lt; y</a>");
        let a = dom.find_tag(dom.root(), "a").unwrap();
        assert_eq!(dom.attr(a, "href"), Some("Page%20abc.html"));
        assert_eq!(dom.attr(a, "title"), Some("A & B"));
        assert_eq!(dom.text_content(a), "x < y");
    }

    #[test]
    fn test_parse_void_and_self_closing() {
        let dom = parse_html("<p>a<br />b<img src=\"i.png\">c</p>");
        let p = dom.find_tag(dom.root(), "p").unwrap();
        assert_eq!(dom.text_content(p), "abc");
        assert_eq!(dom.find_all_tags(p, "br").len(), 1);
        assert_eq!(dom.find_all_tags(p, "img").len(), 1);
    }

    #[test]
    fn test_parse_skips_comments_and_doctype() {
        let dom = parse_html("<!DOCTYPE html><!-- note --><p>text</p>");
        let p = dom.find_tag(dom.root(), "p").unwrap();
        assert_eq!(dom.text_content(p), "text");
    }

    #[test]
    fn test_parse_raw_script_content() {
        let dom = parse_html("<script>if (a < b) { x(); }</script><p>after</p>");
        let script = dom.find_tag(dom.root(), "script").unwrap();
        assert_eq!(dom.text_content(script), "if (a < b) { x(); }");
        assert!(dom.find_tag(dom.root(), "p").is_some());
    }

    #[test]
    fn test_parse_mismatched_end_tag() {
        let dom = parse_html("<div><p>text</span></p></div>");
        let div = dom.find_tag(dom.root(), "div").unwrap();
        assert_eq!(dom.text_content(div), "text");
    }

    #[test]
    fn test_parse_unquoted_attr() {
        let dom = parse_html("<td class=cell-title>v</td>");
        let td = dom.find_tag(dom.root(), "td").unwrap();
        assert_eq!(dom.attr(td, "class"), Some("cell-title"));
    }

    #[test]
    fn test_bare_less_than_is_text() {
        let dom = parse_html("<p>1 < 2</p>");
        let p = dom.find_tag(dom.root(), "p").unwrap();
        assert_eq!(dom.text_content(p), "1 < 2");
    }
}
