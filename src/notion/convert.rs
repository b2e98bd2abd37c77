//! Per-document conversion pipeline.
//!
//! Stages run in a fixed order over the parsed tree: table extraction,
//! link rewriting, property parsing, structural normalizations, then a
//! single serialize-and-render step followed by string-level fixups. The
//! string passes operate only on the rendered output and never re-enter
//! the tree.

use regex::Regex;

use crate::error::{ConvertError, Result};
use crate::html::{inner_html, parse_html, Dom, NodeId};
use crate::notion::database::{extract_databases, substitute_placeholders};
use crate::notion::inventory::find_document_id;
use crate::notion::links::{collect_links, convert_links, flatten_links_to_urls};
use crate::notion::types::{ConvertedDocument, PropertyValue, ResolverInfo};
use crate::notion::utils::{
    escape_hashtags, parse_notion_date, serialize_front_matter, timestamp_is_pure_date,
};
use crate::render::{IdGenerator, MarkdownRenderer};

/// Runs the full pipeline for one document against a fully populated
/// registry.
pub struct DocumentTransformer<'a> {
    info: &'a ResolverInfo,
    renderer: &'a dyn MarkdownRenderer,
    ids: &'a dyn IdGenerator,
}

impl<'a> DocumentTransformer<'a> {
    pub fn new(
        info: &'a ResolverInfo,
        renderer: &'a dyn MarkdownRenderer,
        ids: &'a dyn IdGenerator,
    ) -> Self {
        Self { info, renderer, ids }
    }

    pub fn read_to_markdown(&self, archive_path: &str, html: &str) -> Result<ConvertedDocument> {
        let mut dom = parse_html(html);
        let root = dom.root();

        let body = dom
            .find_first(root, |d, n| {
                d.tag(n) == Some("div") && d.attr(n, "class") == Some("page-body")
            })
            .ok_or_else(|| ConvertError::MissingBody(archive_path.to_string()))?;

        let source_id = find_document_id(&dom)
            .ok_or_else(|| ConvertError::MissingId(archive_path.to_string()))?;
        let title = self
            .info
            .file_by_id(&source_id)
            .map(|file| file.title.clone())
            .unwrap_or_else(|| "Untitled".to_string());

        // Tables first: row identity needs the title cell anchors intact.
        let attribute_views = extract_databases(&mut dom, self.info, self.ids, &title, body);

        let body_links = collect_links(&dom, self.info, body);
        convert_links(&mut dom, self.info, &body_links, true);

        let front_matter = self.parse_properties(&mut dom)?;

        replace_nested_tags(&mut dom, body, "strong");
        replace_nested_tags(&mut dom, body, "em");
        fix_bookmark_embeds(&mut dom, body);
        fix_callouts(&mut dom, body);
        strip_link_formatting(&mut dom, body);
        encode_newlines_to_br(&mut dom, body);
        fix_dates(&mut dom, body);
        fix_equations(&mut dom, body);

        // Wrapper elements the renderer would trip over.
        hoist_matching(&mut dom, body, |d, n| {
            d.tag(n) == Some("div") && d.has_class(n, "indented")
        });
        hoist_matching(&mut dom, body, |d, n| d.tag(n) == Some("details"));
        fix_toggle_headings(&mut dom, body);
        fix_adjacent_lists(&mut dom, body, "ul");
        fix_adjacent_lists(&mut dom, body, "ol");

        add_checkboxes(&mut dom, body);
        rewrite_page_anchors(&mut dom, body);
        format_leftover_tables(&mut dom, body);
        clean_invalid_dom(&mut dom, body);

        let mut html_string = inner_html(&dom, body);
        html_string = split_brs_in_formatting(&html_string, "strong");
        html_string = split_brs_in_formatting(&html_string, "em");

        let mut markdown = self.renderer.html_to_markdown(&html_string);

        if self.info.single_line_breaks {
            markdown = collapse_blank_lines(&markdown);
        }
        markdown = escape_hashtags(&markdown);
        markdown = fix_double_backslash(&markdown);
        markdown = substitute_placeholders(&markdown, &attribute_views);

        if let Some(description) = page_description(&dom) {
            markdown = format!("{description}\n\n{markdown}");
        }
        let markdown = format!("{}{markdown}", serialize_front_matter(&front_matter));

        Ok(ConvertedDocument {
            source_id,
            title,
            markdown,
            front_matter,
            attribute_views,
        })
    }

    fn parse_properties(&self, dom: &mut Dom) -> Result<Vec<(String, PropertyValue)>> {
        let root = dom.root();
        let Some(table) = dom.find_first(root, |d, n| {
            d.tag(n) == Some("table") && d.has_class(n, "properties")
        }) else {
            return Ok(Vec::new());
        };
        let scope = dom.find_tag(table, "tbody").unwrap_or(table);

        let links = collect_links(dom, self.info, scope);
        convert_links(dom, self.info, &links, false);
        // Front matter only takes raw URLs.
        flatten_links_to_urls(dom, scope);

        let mut properties = Vec::new();
        for row in dom.find_all_tags(scope, "tr") {
            let Some((title, value)) = parse_property_row(dom, row)? else {
                continue;
            };
            if title == "Tags" {
                let value = match value {
                    PropertyValue::Text(text) => PropertyValue::Text(text.replace(' ', "-")),
                    PropertyValue::List(tags) => PropertyValue::List(
                        tags.into_iter().map(|tag| tag.replace(' ', "-")).collect(),
                    ),
                    other => other,
                };
                properties.push(("tags".to_string(), value));
            } else {
                properties.push((title, value));
            }
        }
        Ok(properties)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertyKind {
    Checkbox,
    Date,
    List,
    Number,
    Text,
}

/// Fixed category table: every property row class maps to one of five
/// parse shapes. Unknown categories are a hard error so silently mangled
/// front matter never ships.
const PROPERTY_KINDS: &[(&str, PropertyKind)] = &[
    ("checkbox", PropertyKind::Checkbox),
    ("created_time", PropertyKind::Date),
    ("last_edited_time", PropertyKind::Date),
    ("date", PropertyKind::Date),
    ("file", PropertyKind::List),
    ("multi_select", PropertyKind::List),
    ("relation", PropertyKind::List),
    ("number", PropertyKind::Number),
    ("auto_increment_id", PropertyKind::Number),
    ("email", PropertyKind::Text),
    ("person", PropertyKind::Text),
    ("phone_number", PropertyKind::Text),
    ("text", PropertyKind::Text),
    ("url", PropertyKind::Text),
    ("status", PropertyKind::Text),
    ("select", PropertyKind::Text),
    ("formula", PropertyKind::Text),
    ("rollup", PropertyKind::Text),
    ("last_edited_by", PropertyKind::Text),
    ("created_by", PropertyKind::Text),
];

fn property_kind(raw: &str) -> Option<PropertyKind> {
    PROPERTY_KINDS
        .iter()
        .find(|(name, _)| *name == raw)
        .map(|(_, kind)| *kind)
}

fn parse_property_row(dom: &Dom, row: NodeId) -> Result<Option<(String, PropertyValue)>> {
    let class = dom.attr(row, "class").unwrap_or("").to_string();
    let raw_type = class
        .split_ascii_whitespace()
        .find_map(|token| token.strip_prefix("property-row-"))
        .ok_or_else(|| ConvertError::UnrecognizedPropertyType(class.clone()))?;
    let kind = property_kind(raw_type)
        .ok_or_else(|| ConvertError::UnrecognizedPropertyType(raw_type.to_string()))?;

    let cells: Vec<NodeId> = dom
        .element_children(row)
        .into_iter()
        .filter(|&cell| matches!(dom.tag(cell), Some("th") | Some("td")))
        .collect();
    let (Some(&name_cell), Some(&value_cell)) = (cells.first(), cells.get(1)) else {
        return Ok(None);
    };
    let title = dom.text_content(name_cell).trim().to_string();

    let value = match kind {
        PropertyKind::Checkbox => {
            // checkbox-on: checked, checkbox-off: unchecked.
            let checked = dom
                .find_first(value_cell, |d, n| d.class_contains(n, "checkbox-on"))
                .is_some();
            Some(PropertyValue::Bool(checked))
        }
        PropertyKind::Number => dom
            .text_content(value_cell)
            .trim()
            .parse::<f64>()
            .ok()
            .map(PropertyValue::Number),
        PropertyKind::Date => {
            let dates: Vec<String> = dom
                .find_all_tags(value_cell, "time")
                .into_iter()
                .filter_map(|time| parse_notion_date(&dom.text_content(time)))
                .map(|parsed| format_property_date(&parsed))
                .collect();
            if dates.is_empty() {
                None
            } else {
                Some(PropertyValue::Text(dates.join(" - ")))
            }
        }
        PropertyKind::List => {
            let items: Vec<String> = dom
                .children(value_cell)
                .into_iter()
                .map(|child| dom.text_content(child).trim().to_string())
                .filter(|item| !item.is_empty())
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(PropertyValue::List(items))
            }
        }
        PropertyKind::Text => {
            let text = dom.text_content(value_cell).trim().to_string();
            if text.is_empty() {
                None
            } else {
                Some(PropertyValue::Text(text))
            }
        }
    };

    Ok(value.map(|value| (title, value)))
}

fn format_property_date(parsed: &chrono::NaiveDateTime) -> String {
    if timestamp_is_pure_date(parsed) {
        parsed.format("%Y-%m-%d").to_string()
    } else {
        parsed.format("%Y-%m-%dT%H:%M").to_string()
    }
}

/// Hoist any same-style span nested inside a styled span, repeatedly, so
/// `<strong><strong>x</strong></strong>` flattens to one wrapper. Already
/// flat trees pass through unchanged.
fn replace_nested_tags(dom: &mut Dom, body: NodeId, tag: &str) {
    for element in dom.find_all_tags(body, tag) {
        let skip = match dom.parent(element) {
            None => true,
            Some(parent) => dom.tag(parent) == Some(tag),
        };
        if skip {
            continue;
        }
        while let Some(nested) = dom.find_tag(element, tag) {
            dom.hoist_children(nested);
        }
    }
}

fn is_callout(dom: &Dom, node: NodeId) -> bool {
    dom.class_contains(node, "callout") || dom.class_contains(node, "bookmark")
}

/// First sentence of a paragraph, for bookmark descriptions.
fn strip_to_sentence(paragraph: &str) -> String {
    Regex::new(r"^[^\.\?\!\n]*[\.\?\!]?")
        .unwrap()
        .find(paragraph)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Notion bookmarks are a box with image, title and description; collapse
/// them to a quote admonition carrying the link.
fn fix_bookmark_embeds(dom: &mut Dom, body: NodeId) {
    let embeds = dom.find_all(body, |d, n| {
        d.tag(n) == Some("a") && d.has_class(n, "bookmark") && d.has_class(n, "source")
    });
    for embed in embeds {
        let link = dom.attr(embed, "href").unwrap_or("").to_string();
        let title = dom
            .find_first(embed, |d, n| {
                d.tag(n) == Some("div") && d.has_class(n, "bookmark-title")
            })
            .map(|n| dom.text_content(n))
            .unwrap_or_default();
        let description = strip_to_sentence(
            &dom.find_first(embed, |d, n| {
                d.tag(n) == Some("div") && d.has_class(n, "bookmark-description")
            })
            .map(|n| dom.text_content(n))
            .unwrap_or_default(),
        );
        let mut block = format!("> [!info] {title}\n> {description}\n> [{link}]({link})\n");
        if let Some(next) = dom.next_element_sibling(embed) {
            // Adjacent callout blocks need a blank separator.
            if is_callout(dom, next) {
                block.push('\n');
            }
        }
        dom.replace_with_text(embed, &block);
    }
}

fn fix_callouts(dom: &mut Dom, body: NodeId) {
    let callouts = dom.find_all(body, |d, n| {
        d.tag(n) == Some("figure") && d.has_class(n, "callout")
    });
    for callout in callouts {
        let description = dom
            .element_children(callout)
            .get(1)
            .map(|&child| dom.text_content(child))
            .unwrap_or_default();
        let mut block = format!("> [!important]\n> {description}\n");
        if let Some(next) = dom.next_element_sibling(callout) {
            if is_callout(dom, next) {
                block.push('\n');
            }
        }
        dom.replace_with_text(callout, &block);
    }
}

/// `<link>` elements carry no renderable markup; keep only their text.
fn strip_link_formatting(dom: &mut Dom, body: NodeId) {
    for link in dom.find_all_tags(body, "link") {
        let text = dom.text_content(link);
        dom.set_text(link, &text);
    }
}

/// Newlines inside text become explicit `<br />` markers, except in code
/// blocks where markers revert to literal newlines.
fn encode_newlines_to_br(dom: &mut Dom, body: NodeId) {
    let texts: Vec<NodeId> = dom
        .descendants(body)
        .into_iter()
        .filter(|&node| {
            dom.text(node).map(|t| t.contains('\n')).unwrap_or(false)
                && dom.closest(node, |d, n| d.tag(n) == Some("code")).is_none()
        })
        .collect();
    for node in texts {
        let content = dom.text(node).unwrap_or("").to_string();
        let mut replacements = Vec::new();
        for (index, part) in content.split('\n').enumerate() {
            if index > 0 {
                replacements.push(dom.create_element("br"));
            }
            if !part.is_empty() {
                replacements.push(dom.create_text(part));
            }
        }
        dom.replace_with(node, &replacements);
    }

    for code in dom.find_all_tags(body, "code") {
        for br in dom.find_all_tags(code, "br") {
            dom.replace_with_text(br, "\n");
        }
    }
}

/// Notion date tokens always start with `@`.
fn fix_dates(dom: &mut Dom, body: NodeId) {
    for time in dom.find_all_tags(body, "time") {
        let text = dom.text_content(time).replace('@', "");
        dom.set_text(time, &text);
    }
}

/// Pull the TeX annotation out of its rendered math box and mark it up as
/// an inline equation.
fn fix_equations(dom: &mut Dom, body: NodeId) {
    let katex_boxes = dom.find_all(body, |d, n| d.has_class(n, "katex"));
    for katex in katex_boxes {
        let Some(annotation) = dom.find_tag(katex, "annotation") else {
            continue;
        };
        let text = dom.text_content(annotation);
        dom.set_text(annotation, &format!("${text}$"));
        dom.replace_with(katex, &[annotation]);
    }
}

fn hoist_matching<F>(dom: &mut Dom, body: NodeId, pred: F)
where
    F: Fn(&Dom, NodeId) -> bool,
{
    for element in dom.find_all(body, &pred) {
        dom.hoist_children(element);
    }
}

const FONT_SIZE_HEADINGS: &[(&str, &str)] = &[
    ("1.875em", "h1"),
    ("1.5em", "h2"),
    ("1.25em", "h3"),
];

/// Toggle headings export as styled `summary` elements; the font size tells
/// the heading level.
fn fix_toggle_headings(dom: &mut Dom, body: NodeId) {
    for summary in dom.find_all_tags(body, "summary") {
        let Some(style) = dom.attr(summary, "style").map(|s| s.to_string()) else {
            continue;
        };
        for (size, heading_tag) in FONT_SIZE_HEADINGS {
            if style.contains(size) {
                let text = dom.text_content(summary);
                let heading = dom.create_element(heading_tag);
                let text_node = dom.create_text(&text);
                dom.append_child(heading, text_node);
                dom.replace_with(summary, &[heading]);
                break;
            }
        }
    }
}

/// Notion emits one list element per item; merge each run of adjacent
/// same-class lists into a single list. Already-merged lists come out
/// unchanged.
fn fix_adjacent_lists(dom: &mut Dom, body: NodeId, tag: &str) {
    for list in dom.find_all_tags(body, tag) {
        if dom.parent(list).is_none() {
            // Consumed by an earlier run.
            continue;
        }

        let mut run = vec![list];
        let mut items = dom.element_children(list);
        let mut current = list;
        while let Some(next) = dom.next_element_sibling(current) {
            // Classes are always to-do-list, bulleted-list or numbered-list.
            if dom.tag(next) != Some(tag) || dom.attr(current, "class") != dom.attr(next, "class") {
                break;
            }
            run.push(next);
            items.extend(dom.element_children(next));
            current = next;
        }

        let joined = dom.create_element(tag);
        for item in items {
            dom.append_child(joined, item);
        }
        dom.replace_with(list, &[joined]);
        for &extra in &run[1..] {
            dom.detach(extra);
        }
    }
}

fn add_checkboxes(dom: &mut Dom, body: NodeId) {
    let checked = dom.find_all(body, |d, n| {
        d.has_class(n, "checkbox") && d.has_class(n, "checkbox-on")
    });
    for node in checked {
        dom.replace_with_text(node, "[x] ");
    }
    let unchecked = dom.find_all(body, |d, n| {
        d.has_class(n, "checkbox") && d.has_class(n, "checkbox-off")
    });
    for node in unchecked {
        dom.replace_with_text(node, "[ ] ");
    }
}

/// In-page anchors point at element ids; retarget them at the heading text
/// so they survive the markdown rendering.
fn rewrite_page_anchors(dom: &mut Dom, body: NodeId) {
    let anchors: Vec<NodeId> = dom
        .find_all_tags(body, "a")
        .into_iter()
        .filter(|&a| {
            dom.attr(a, "href")
                .map(|href| href.starts_with('#'))
                .unwrap_or(false)
        })
        .collect();
    for anchor in anchors {
        let text = dom.text_content(anchor);
        dom.set_attr(anchor, "href", &format!("#{text}"));
    }
}

/// Cleanup for tables that were not collection tables: user icons become
/// text, multi-select values get separators, and anchors without a real
/// URL scheme flatten to plain text.
fn format_leftover_tables(dom: &mut Dom, body: NodeId) {
    let users = dom.find_all(body, |d, n| {
        d.tag(n) == Some("span") && d.attr(n, "class") == Some("user")
    });
    for user in users {
        let text = dom.text_content(user);
        dom.set_text(user, &text);
    }

    let selects = dom.find_all(body, |d, n| {
        d.tag(n) == Some("span")
            && d.class_contains(n, "selected-value")
            && d.closest(n, |d2, m| d2.tag(m) == Some("table")).is_some()
    });
    for select in selects {
        let Some(parent) = dom.parent(select) else {
            continue;
        };
        if dom.element_children(parent).last() == Some(&select) {
            continue;
        }
        let text = dom.text_content(select);
        dom.set_text(select, &format!("{text}, "));
    }

    let valid_url = Regex::new(r"^(https?://|www\.|#)").unwrap();
    let invalid_anchors: Vec<NodeId> = dom
        .find_all_tags(body, "a")
        .into_iter()
        .filter(|&a| {
            dom.attr(a, "href")
                .map(|href| !valid_url.is_match(href))
                .unwrap_or(false)
        })
        .collect();
    for anchor in invalid_anchors {
        let text = dom.text_content(anchor);
        dom.replace_with_text(anchor, &text);
    }
}

/// Script references and stylesheet links corrupt downstream parsing.
fn clean_invalid_dom(dom: &mut Dom, body: NodeId) {
    let scripts = dom.find_all(body, |d, n| {
        d.tag(n) == Some("script") && d.attr(n, "src").is_some()
    });
    for node in scripts {
        dom.detach(node);
    }
    let stylesheets = dom.find_all(body, |d, n| {
        d.tag(n) == Some("link") && d.attr(n, "rel") == Some("stylesheet")
    });
    for node in stylesheets {
        dom.detach(node);
    }
}

/// Close and reopen inline formatting around line breaks so the rendered
/// markdown never carries a break inside a styled span. Operates on the
/// serialized string, not the tree.
fn split_brs_in_formatting(html: &str, tag: &str) -> String {
    let pattern = Regex::new(&format!("(?s)<{tag}>.*?</{tag}>")).unwrap();
    pattern
        .replace_all(html, |caps: &regex::Captures| {
            let run = &caps[0];
            if run.contains("<br />") {
                run.split("<br />")
                    .collect::<Vec<_>>()
                    .join(&format!("</{tag}><br /><{tag}>"))
            } else {
                run.to_string()
            }
        })
        .to_string()
}

/// Single-line-break mode: collapse blank lines, but keep the blank line
/// that precedes a blockquote. Consecutive quote blocks merge without it.
fn collapse_blank_lines(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut rest = markdown;
    while let Some(pos) = rest.find("\n\n") {
        let after = &rest[pos + 2..];
        if after.starts_with('>') {
            out.push_str(&rest[..pos + 2]);
        } else {
            out.push_str(&rest[..pos + 1]);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Internal links written as `[[path\|label]]` inside tables come out of
/// rendering with a doubled backslash; undo that.
fn fix_double_backslash(markdown: &str) -> String {
    let pattern = Regex::new(r"\[\[[^\]]*\\\\\|[^\]]*\]\]").unwrap();
    pattern
        .replace_all(markdown, |caps: &regex::Captures| {
            caps[0].replace("\\\\|", "\\|")
        })
        .to_string()
}

fn page_description(dom: &Dom) -> Option<String> {
    let node = dom.find_first(dom.root(), |d, n| {
        d.tag(n) == Some("p") && d.class_contains(n, "page-description")
    })?;
    let text = dom.text_content(node);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::outer_html;
    use crate::render::SequentialIds;

    /// Renderer stub: the pipeline's own transforms are what is under test.
    struct Passthrough;

    impl MarkdownRenderer for Passthrough {
        fn html_to_markdown(&self, html: &str) -> String {
            html.to_string()
        }
    }

    fn page(id: &str, properties: &str, body: &str) -> String {
        format!(
            "<html><head><title>Test Page</title></head><body>\
             <article id=\"{id}\" class=\"page sans\"><header>\
             <h1 class=\"page-title\">Test Pa</h1>{properties}</header>\
             <div class=\"page-body\">{body}</div></article></body></html>"
        )
    }

    fn convert(info: &ResolverInfo, html: &str) -> ConvertedDocument {
        let ids = SequentialIds::default();
        DocumentTransformer::new(info, &Passthrough, &ids)
            .read_to_markdown("Test Page.html", html)
            .unwrap()
    }

    fn registry_with(html: &str, path: &str) -> ResolverInfo {
        let mut info = ResolverInfo::new("assets/notion", false);
        crate::notion::inventory::scan_document(&mut info, path, html).unwrap();
        info
    }

    #[test]
    fn test_missing_body_is_fatal() {
        let info = ResolverInfo::new("assets/notion", false);
        let ids = SequentialIds::default();
        let result = DocumentTransformer::new(&info, &Passthrough, &ids)
            .read_to_markdown("x.html", "<html><body><p>no container</p></body></html>");
        assert!(matches!(result, Err(ConvertError::MissingBody(_))));
    }

    #[test]
    fn test_nested_strong_flattens_and_is_idempotent() {
        let mut dom = parse_html("<div><strong>a<strong>b</strong>c</strong></div>");
        let div = dom.find_tag(dom.root(), "div").unwrap();
        replace_nested_tags(&mut dom, div, "strong");
        assert_eq!(outer_html(&dom, div), "<div><strong>abc</strong></div>");

        // Already flat: a second run changes nothing.
        replace_nested_tags(&mut dom, div, "strong");
        assert_eq!(outer_html(&dom, div), "<div><strong>abc</strong></div>");
    }

    #[test]
    fn test_adjacent_lists_merge_and_are_idempotent() {
        let html = "<div>\
            <ul class=\"bulleted-list\"><li>a</li></ul>\
            <ul class=\"bulleted-list\"><li>b</li></ul>\
            <ul class=\"bulleted-list\"><li>c</li></ul>\
            </div>";
        let mut dom = parse_html(html);
        let div = dom.find_tag(dom.root(), "div").unwrap();
        fix_adjacent_lists(&mut dom, div, "ul");
        assert_eq!(outer_html(&dom, div), "<div><ul><li>a</li><li>b</li><li>c</li></ul></div>");

        fix_adjacent_lists(&mut dom, div, "ul");
        assert_eq!(outer_html(&dom, div), "<div><ul><li>a</li><li>b</li><li>c</li></ul></div>");
    }

    #[test]
    fn test_lists_with_different_classes_do_not_merge() {
        let html = "<div>\
            <ul class=\"bulleted-list\"><li>a</li></ul>\
            <ul class=\"to-do-list\"><li>b</li></ul>\
            </div>";
        let mut dom = parse_html(html);
        let div = dom.find_tag(dom.root(), "div").unwrap();
        fix_adjacent_lists(&mut dom, div, "ul");
        assert_eq!(dom.find_all_tags(div, "ul").len(), 2);
    }

    #[test]
    fn test_checkbox_markers_become_text() {
        let mut dom = parse_html(
            "<div><div class=\"checkbox checkbox-on\"></div>done\
             <div class=\"checkbox checkbox-off\"></div>todo</div>",
        );
        let div = dom.find_tag(dom.root(), "div").unwrap();
        add_checkboxes(&mut dom, div);
        assert_eq!(dom.text_content(div), "[x] done[ ] todo");
    }

    #[test]
    fn test_newlines_to_br_except_code() {
        let mut dom = parse_html("<div><p>a\nb</p><code>x\ny</code></div>");
        let div = dom.find_tag(dom.root(), "div").unwrap();
        encode_newlines_to_br(&mut dom, div);
        let p = dom.find_tag(div, "p").unwrap();
        assert_eq!(outer_html(&dom, p), "<p>a<br />b</p>");
        let code = dom.find_tag(div, "code").unwrap();
        assert_eq!(dom.text_content(code), "x\ny");
    }

    #[test]
    fn test_toggle_heading_promotion() {
        let mut dom = parse_html(
            "<div><summary style=\"font-size:1.5em\">Section</summary>\
             <summary>plain</summary></div>",
        );
        let div = dom.find_tag(dom.root(), "div").unwrap();
        fix_toggle_headings(&mut dom, div);
        let h2 = dom.find_tag(div, "h2").unwrap();
        assert_eq!(dom.text_content(h2), "Section");
        // No style: stays a summary.
        assert_eq!(dom.find_all_tags(div, "summary").len(), 1);
    }

    #[test]
    fn test_equation_unwrapping() {
        let mut dom = parse_html(
            "<div><span class=\"katex\"><span>rendered</span>\
             <annotation>x^2</annotation></span></div>",
        );
        let div = dom.find_tag(dom.root(), "div").unwrap();
        fix_equations(&mut dom, div);
        assert_eq!(dom.text_content(div), "$x^2$");
        assert!(dom.find_first(div, |d, n| d.has_class(n, "katex")).is_none());
    }

    #[test]
    fn test_callout_collapses_to_admonition() {
        let mut dom = parse_html(
            "<div><figure class=\"callout\"><div>icon</div><div>Watch out.</div></figure></div>",
        );
        let div = dom.find_tag(dom.root(), "div").unwrap();
        fix_callouts(&mut dom, div);
        assert_eq!(dom.text_content(div), "> [!important]\n> Watch out.\n");
    }

    #[test]
    fn test_adjacent_callouts_get_blank_separator() {
        let mut dom = parse_html(
            "<div><figure class=\"callout\"><div>i</div><div>First.</div></figure>\
             <figure class=\"callout\"><div>i</div><div>Second.</div></figure></div>",
        );
        let div = dom.find_tag(dom.root(), "div").unwrap();
        fix_callouts(&mut dom, div);
        let text = dom.text_content(div);
        assert!(text.starts_with("> [!important]\n> First.\n\n"));
        assert!(text.ends_with("> [!important]\n> Second.\n"));
    }

    #[test]
    fn test_bookmark_embed() {
        let mut dom = parse_html(
            "<div><a class=\"bookmark source\" href=\"https://example.com\">\
             <div class=\"bookmark-title\">Example</div>\
             <div class=\"bookmark-description\">First sentence. Second sentence.</div>\
             </a></div>",
        );
        let div = dom.find_tag(dom.root(), "div").unwrap();
        fix_bookmark_embeds(&mut dom, div);
        assert_eq!(
            dom.text_content(div),
            "> [!info] Example\n> First sentence.\n> [https://example.com](https://example.com)\n"
        );
    }

    #[test]
    fn test_split_brs_in_formatting() {
        let html = "<p><strong>a<br />b</strong></p>";
        assert_eq!(
            split_brs_in_formatting(html, "strong"),
            "<p><strong>a</strong><br /><strong>b</strong></p>"
        );
        // No break inside: unchanged.
        let html = "<p><strong>ab</strong><br /></p>";
        assert_eq!(split_brs_in_formatting(html, "strong"), html);
    }

    #[test]
    fn test_collapse_blank_lines_keeps_blockquotes() {
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\nb");
        assert_eq!(collapse_blank_lines("a\n\n> quote"), "a\n\n> quote");
        assert_eq!(collapse_blank_lines("a\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_fix_double_backslash() {
        let input = "cell [[Path\\\\|Title]] end";
        assert_eq!(fix_double_backslash(input), "cell [[Path\\|Title]] end");
        assert_eq!(fix_double_backslash("plain [[link]]"), "plain [[link]]");
    }

    #[test]
    fn test_property_parsing_checkbox_and_number() {
        let id = "a".repeat(32);
        let html = page(
            &id,
            "<table class=\"properties\"><tbody>\
             <tr class=\"property-row property-row-checkbox\"><th>Done</th>\
             <td><div class=\"checkbox checkbox-on\"></div></td></tr>\
             <tr class=\"property-row property-row-number\"><th>Count</th><td>abc</td></tr>\
             <tr class=\"property-row property-row-number\"><th>Size</th><td>42</td></tr>\
             </tbody></table>",
            "<p>body</p>",
        );
        let info = registry_with(&html, "Test Page.html");
        let doc = convert(&info, &html);

        assert_eq!(
            doc.front_matter,
            vec![
                ("Done".to_string(), PropertyValue::Bool(true)),
                ("Size".to_string(), PropertyValue::Number(42.0)),
            ]
        );
        assert!(doc.markdown.starts_with("---\n"));
        assert!(doc.markdown.contains("Done: true"));
        // Unparsable number: property entirely absent.
        assert!(!doc.markdown.contains("Count"));
    }

    #[test]
    fn test_property_parsing_tags_rename() {
        let id = "b".repeat(32);
        let html = page(
            &id,
            "<table class=\"properties\"><tbody>\
             <tr class=\"property-row property-row-multi_select\"><th>Tags</th>\
             <td><span>deep work</span><span>rust</span></td></tr>\
             </tbody></table>",
            "<p>body</p>",
        );
        let info = registry_with(&html, "Test Page.html");
        let doc = convert(&info, &html);
        assert_eq!(
            doc.front_matter,
            vec![(
                "tags".to_string(),
                PropertyValue::List(vec!["deep-work".to_string(), "rust".to_string()])
            )]
        );
    }

    #[test]
    fn test_property_parsing_date_range() {
        let id = "c".repeat(32);
        let html = page(
            &id,
            "<table class=\"properties\"><tbody>\
             <tr class=\"property-row property-row-date\"><th>When</th>\
             <td><time>@July 22, 2024</time><time>@July 23, 2024</time></td></tr>\
             </tbody></table>",
            "<p>body</p>",
        );
        let info = registry_with(&html, "Test Page.html");
        let doc = convert(&info, &html);
        assert_eq!(
            doc.front_matter,
            vec![(
                "When".to_string(),
                PropertyValue::Text("2024-07-22 - 2024-07-23".to_string())
            )]
        );
    }

    #[test]
    fn test_unknown_property_type_is_fatal() {
        let id = "d".repeat(32);
        let html = page(
            &id,
            "<table class=\"properties\"><tbody>\
             <tr class=\"property-row property-row-hologram\"><th>X</th><td>y</td></tr>\
             </tbody></table>",
            "<p>body</p>",
        );
        let info = registry_with(&html, "Test Page.html");
        let ids = SequentialIds::default();
        let result = DocumentTransformer::new(&info, &Passthrough, &ids)
            .read_to_markdown("Test Page.html", &html);
        assert!(matches!(
            result,
            Err(ConvertError::UnrecognizedPropertyType(t)) if t == "hologram"
        ));
    }

    #[test]
    fn test_page_description_prepended_after_front_matter() {
        let id = "e".repeat(32);
        let html = format!(
            "<html><head><title>T</title></head><body>\
             <article id=\"{id}\"><header>\
             <p class=\"page-description\">Summary line</p>\
             <table class=\"properties\"><tbody>\
             <tr class=\"property-row property-row-checkbox\"><th>Done</th>\
             <td><div class=\"checkbox checkbox-off\"></div></td></tr>\
             </tbody></table></header>\
             <div class=\"page-body\"><p>body</p></div></article></body></html>"
        );
        let info = registry_with(&html, "T.html");
        let doc = convert(&info, &html);
        let after_front_matter = doc.markdown.split("---\n").nth(2).unwrap();
        assert!(after_front_matter.starts_with("Summary line\n\n"));
    }

    #[test]
    fn test_determinism() {
        let id = "f".repeat(32);
        let html = page(
            &id,
            "",
            "<h2>Board</h2><table class=\"collection-content\">\
             <thead><tr><th><svg class=\"typesTitle\"></svg>Name</th>\
             <th><svg class=\"typesSelect\"></svg>Status</th></tr></thead>\
             <tbody><tr><td>a</td><td><span class=\"selected-value\">Open</span></td></tr>\
             </tbody></table><p>tail #tag</p>",
        );
        let info = registry_with(&html, "Test Page.html");
        let first = convert(&info, &html);
        let second = convert(&info, &html);
        assert_eq!(first.markdown, second.markdown);
        assert!(first.markdown.contains("data-av-id"));
        assert!(first.markdown.contains("\\#tag"));
    }

    #[test]
    fn test_forward_reference_resolution() {
        let target_id = "1234567890abcdef1234567890abcdef";
        let link_html = page(
            &"9".repeat(32),
            "",
            &format!(
                "<p><a href=\"Later%20Page%20{target_id}.html\">see</a></p>"
            ),
        );
        let target_html = format!(
            "<html><head><title>Later Page</title></head><body>\
             <article id=\"{target_id}\"><div class=\"page-body\"><p>x</p></div>\
             </article></body></html>"
        );

        // Negative control: registry missing the target, the link degrades.
        let info = registry_with(&link_html, "A.html");
        let degraded = convert(&info, &link_html);
        assert!(degraded.markdown.contains("[[Later Page]]"));
        assert!(!degraded.markdown.contains(target_id));

        // Inventory both (target after source), persist, then transform:
        // the same link now resolves to the real block.
        let mut info = registry_with(&link_html, "A.html");
        crate::notion::inventory::scan_document(&mut info, "B.html", &target_html).unwrap();
        info.assign_block_id(target_id, "block-77");
        let resolved = convert(&info, &link_html);
        assert!(resolved.markdown.contains("((block-77 \"Later Page\"))"));
    }
}
