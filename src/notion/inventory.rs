//! Phase one: inventory every archive entry into the resolver registry.
//!
//! Documents are keyed by the Notion id embedded in their markup,
//! attachments by archive path. The registry must be complete before any
//! document is transformed, otherwise forward references degrade.

use chrono::{DateTime, Utc};

use crate::archive::entry_name;
use crate::error::{ConvertError, Result};
use crate::html::{inner_html, parse_html, Dom};
use crate::notion::types::{AttachmentRecord, FileRecord, ResolverInfo};
use crate::notion::utils::{
    get_notion_id, parse_notion_date, parse_parent_ids, sanitize_file_name, strip_to_200,
};

/// First descendant element carrying a Notion id attribute, in document
/// order.
pub fn find_document_id(dom: &Dom) -> Option<String> {
    for node in dom.descendants(dom.root()) {
        if !dom.is_element(node) {
            continue;
        }
        if let Some(id) = dom.attr(node, "id").and_then(get_notion_id) {
            return Some(id);
        }
    }
    None
}

/// Inventory one exported document. Returns its Notion id.
pub fn scan_document(info: &mut ResolverInfo, archive_path: &str, html: &str) -> Result<String> {
    let dom = parse_html(html);

    let id = find_document_id(&dom)
        .ok_or_else(|| ConvertError::MissingId(archive_path.to_string()))?;

    let created_at = extract_time(&dom, "property-row-created_time");
    let modified_at = extract_time(&dom, "property-row-last_edited_time");

    // Notion truncates on-page headings and chops words in half; the
    // <title> node carries the complete text.
    let raw_title = dom
        .find_tag(dom.root(), "title")
        .map(|node| dom.text_content(node))
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| "Untitled".to_string());
    let cleaned = raw_title
        .replace('\n', " ")
        .replace([':', '/'], "-")
        .replace('#', "");
    let title = strip_to_200(&sanitize_file_name(cleaned.trim()));

    let has_content = dom
        .find_first(dom.root(), |d, n| {
            d.tag(n) == Some("div") && d.attr(n, "class") == Some("page-body")
        })
        .map(|body| !inner_html(&dom, body).trim().is_empty())
        .unwrap_or(false);

    info.register_file(FileRecord {
        source_id: id.clone(),
        title,
        parent_ids: parse_parent_ids(archive_path),
        target_block_id: String::new(),
        archive_path: archive_path.to_string(),
        created_at,
        modified_at,
        has_content,
    });

    Ok(id)
}

/// Inventory one attachment entry. The storage path is derived from a hash
/// of the archive path, sharded into a two-level directory, so repeated
/// file names across pages never collide.
pub fn scan_attachment(info: &mut ResolverInfo, archive_path: &str) {
    let hash = format!("{:x}", md5::compute(archive_path));

    let name = sanitize_file_name(entry_name(archive_path));
    let name = urlencoding::decode(&name)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(name);

    let (display_name, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), ext.to_lowercase()),
        _ => (name.clone(), String::new()),
    };

    let sharded_name = if extension.is_empty() {
        hash.clone()
    } else {
        format!("{hash}.{extension}")
    };
    let reference_path = format!("{}/{}/{}", info.attachment_dir, &hash[..2], sharded_name);
    let storage_path = format!("data/{reference_path}");

    info.register_attachment(AttachmentRecord {
        archive_path: archive_path.to_string(),
        parent_ids: parse_parent_ids(archive_path),
        display_name,
        storage_path,
        reference_path,
    });
}

fn extract_time(dom: &Dom, row_class: &str) -> Option<DateTime<Utc>> {
    let row = dom.find_first(dom.root(), |d, n| {
        d.tag(n) == Some("tr") && d.has_class(n, row_class)
    })?;
    let time = dom.find_tag(row, "time")?;
    parse_notion_date(&dom.text_content(time)).map(|parsed| parsed.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn doc(id: &str, title: &str, body: &str) -> String {
        format!(
            "<html><head><title>{title}</title></head><body>\
             <article id=\"{id}\" class=\"page sans\">\
             <header><h1 class=\"page-title\">{title}</h1>\
             <table class=\"properties\"><tbody>\
             <tr class=\"property-row property-row-created_time\"><th>Created</th>\
             <td><time>@July 22, 2024 8:15 AM</time></td></tr>\
             </tbody></table></header>\
             <div class=\"page-body\">{body}</div></article></body></html>"
        )
    }

    #[test]
    fn test_scan_document_extracts_id_and_title() {
        let mut info = ResolverInfo::new("assets/notion", false);
        let id = "abcdef0123456789abcdef0123456789";
        let html = doc(&format!("{}-{}", &id[..8], &id[8..]), "My Page", "<p>hi</p>");

        let found = scan_document(&mut info, "My Page abc.html", &html).unwrap();
        assert_eq!(found, id);

        let record = info.file_by_id(id).unwrap();
        assert_eq!(record.title, "My Page");
        assert!(record.has_content);
        assert!(record.target_block_id.is_empty());
        let created = record.created_at.unwrap();
        assert_eq!((created.year(), created.month(), created.day()), (2024, 7, 22));
        assert!(record.modified_at.is_none());
    }

    #[test]
    fn test_scan_document_without_id_fails() {
        let mut info = ResolverInfo::new("assets/notion", false);
        let html = "<html><body><div id=\"not-a-notion-id\"></div></body></html>";
        let err = scan_document(&mut info, "x.html", html).unwrap_err();
        assert!(matches!(err, ConvertError::MissingId(_)));
    }

    #[test]
    fn test_scan_document_empty_body_has_no_content() {
        let mut info = ResolverInfo::new("assets/notion", false);
        let id = "a".repeat(32);
        let html = doc(&id, "Empty", "  ");
        scan_document(&mut info, "Empty.html", &html).unwrap();
        assert!(!info.file_by_id(&id).unwrap().has_content);
    }

    #[test]
    fn test_scan_document_sanitizes_title() {
        let mut info = ResolverInfo::new("assets/notion", false);
        let id = "b".repeat(32);
        let html = doc(&id, "A:B/C#D", "<p>x</p>");
        scan_document(&mut info, "t.html", &html).unwrap();
        assert_eq!(info.file_by_id(&id).unwrap().title, "A-B-CD");
    }

    #[test]
    fn test_scan_attachment_shards_by_path_hash() {
        let mut info = ResolverInfo::new("assets/notion", false);
        scan_attachment(&mut info, "Page abc/photo of cat.PNG");

        let record = info.attachment_by_path("Page abc/photo of cat.PNG").unwrap();
        assert_eq!(record.display_name, "photo of cat");
        assert!(record.reference_path.starts_with("assets/notion/"));
        assert!(record.reference_path.ends_with(".png"));
        assert_eq!(record.storage_path, format!("data/{}", record.reference_path));

        // Two-level sharding: dir is the first two hash characters.
        let tail = record.reference_path.strip_prefix("assets/notion/").unwrap();
        let (shard, file) = tail.split_once('/').unwrap();
        assert_eq!(shard.len(), 2);
        assert!(file.starts_with(shard));
    }

    #[test]
    fn test_scan_attachment_same_name_different_paths() {
        let mut info = ResolverInfo::new("assets/notion", false);
        scan_attachment(&mut info, "A abc/image.png");
        scan_attachment(&mut info, "B def/image.png");
        let a = info.attachment_by_path("A abc/image.png").unwrap();
        let b = info.attachment_by_path("B def/image.png").unwrap();
        assert_ne!(a.reference_path, b.reference_path);
    }
}
