//! Link discovery, classification and rewriting.
//!
//! Anchors are classified against the registry: another document in the
//! archive becomes a relation, a registered asset becomes an attachment or
//! image, anything else is left alone. Lookups that miss degrade to a
//! fallback form with a logged warning; a broken link never fails the
//! document.

use crate::archive::entry_extension;
use crate::html::{Dom, NodeId};
use crate::notion::types::ResolverInfo;
use crate::notion::utils::{get_notion_id, strip_notion_id, strip_parent_directories};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg"];

/// A classified anchor, carrying its node and decoded target.
#[derive(Debug, Clone)]
pub enum LinkRef {
    Relation {
        node: NodeId,
        id: String,
        target: String,
    },
    Attachment {
        node: NodeId,
        path: String,
    },
    Image {
        node: NodeId,
        path: String,
    },
}

/// Classify every anchor within a scope. Anchors that are neither
/// relations nor registered attachments are not returned; they stay in the
/// tree as ordinary links.
pub fn collect_links(dom: &Dom, info: &ResolverInfo, scope: NodeId) -> Vec<LinkRef> {
    let mut links = Vec::new();

    for node in dom.find_all_tags(scope, "a") {
        let href = dom.attr(node, "href").unwrap_or("");
        let decoded = urlencoding::decode(href)
            .map(|cow| cow.into_owned())
            .unwrap_or_else(|_| href.to_string());
        let decoded = strip_parent_directories(&decoded).to_string();

        let id = get_notion_id(&decoded);
        if let (Some(id), true) = (id, decoded.ends_with(".html")) {
            links.push(LinkRef::Relation {
                node,
                id,
                target: decoded,
            });
            continue;
        }

        if let Some(path) = info.find_attachment_key(&decoded) {
            let extension = entry_extension(path);
            if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
                links.push(LinkRef::Image {
                    node,
                    path: path.to_string(),
                });
            } else {
                links.push(LinkRef::Attachment {
                    node,
                    path: path.to_string(),
                });
            }
        }
    }

    links
}

/// Rewrite classified anchors into destination reference syntax.
///
/// Relations with a persisted block id become native block references;
/// everything else degrades to a label-only wiki link. Attachments become
/// markdown links against their sharded reference path, images become
/// embeds when `embed_images` is set (the document body; property tables
/// need plain values).
pub fn convert_links(dom: &mut Dom, info: &ResolverInfo, links: &[LinkRef], embed_images: bool) {
    for link in links {
        match link {
            LinkRef::Relation { node, id, target } => {
                let text = match info.file_by_id(id) {
                    Some(file) if !file.target_block_id.is_empty() => {
                        format!("(({} \"{}\"))", file.target_block_id, file.title)
                    }
                    Some(file) => format!("[[{}]]", file.title),
                    None => {
                        log::warn!("missing relation data for id: {id}");
                        let basename = target.rsplit('/').next().unwrap_or(target);
                        let label = strip_notion_id(basename);
                        let label = label.strip_suffix(".html").unwrap_or(&label);
                        format!("[[{label}]]")
                    }
                };
                dom.replace_with_text(*node, &text);
            }
            LinkRef::Attachment { node, path } | LinkRef::Image { node, path } => {
                let Some(record) = info.attachment_by_path(path) else {
                    log::warn!("missing attachment data for: {path}");
                    let text = dom.text_content(*node);
                    dom.replace_with_text(*node, &text);
                    continue;
                };
                let embed = embed_images && matches!(link, LinkRef::Image { .. });
                let text = format!(
                    "{}[{}]({})",
                    if embed { "!" } else { "" },
                    record.display_name,
                    record.reference_path
                );
                dom.replace_with_text(*node, &text);
            }
        }
    }
}

/// Flatten every remaining anchor in a scope to its raw URL text. Front
/// matter only takes scalar-safe values.
pub fn flatten_links_to_urls(dom: &mut Dom, scope: NodeId) {
    for node in dom.find_all_tags(scope, "a") {
        let href = dom.attr(node, "href").unwrap_or("").to_string();
        dom.replace_with_text(node, &href);
    }
}
