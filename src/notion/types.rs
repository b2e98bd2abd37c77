//! Records and the cross-document resolution registry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::notion::database::DatabaseModel;

/// Inventory record for one exported document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// The 32-hex Notion id embedded in the document.
    pub source_id: String,
    /// Full title read from the `<title>` node, sanitized and truncated.
    pub title: String,
    /// Notion ids of the ancestor folders, outermost first.
    pub parent_ids: Vec<String>,
    /// Block id in the destination store. Empty until the importer has
    /// persisted the document; references resolved before that keep their
    /// degraded fallback form.
    pub target_block_id: String,
    pub archive_path: String,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub has_content: bool,
}

/// Inventory record for one exported asset file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    pub archive_path: String,
    pub parent_ids: Vec<String>,
    /// Sanitized file name without its extension.
    pub display_name: String,
    /// Where the importer stores the bytes, sharded by path hash.
    pub storage_path: String,
    /// The path written into generated links.
    pub reference_path: String,
}

/// Registry shared by both conversion phases.
///
/// Populated completely during the inventory pass, read-only during
/// document transformation. Looking up an id or path that was never
/// registered is not an error: callers degrade to a fallback label, which
/// is what makes forward references across the archive safe.
#[derive(Debug)]
pub struct ResolverInfo {
    pub ids_to_file_info: HashMap<String, FileRecord>,
    pub paths_to_attachment_info: HashMap<String, AttachmentRecord>,
    pub attachment_dir: String,
    pub single_line_breaks: bool,
}

impl ResolverInfo {
    pub fn new(attachment_dir: &str, single_line_breaks: bool) -> Self {
        Self {
            ids_to_file_info: HashMap::new(),
            paths_to_attachment_info: HashMap::new(),
            attachment_dir: attachment_dir.to_string(),
            single_line_breaks,
        }
    }

    pub fn register_file(&mut self, record: FileRecord) {
        self.ids_to_file_info.insert(record.source_id.clone(), record);
    }

    pub fn register_attachment(&mut self, record: AttachmentRecord) {
        self.paths_to_attachment_info
            .insert(record.archive_path.clone(), record);
    }

    pub fn file_by_id(&self, id: &str) -> Option<&FileRecord> {
        self.ids_to_file_info.get(id)
    }

    pub fn attachment_by_path(&self, path: &str) -> Option<&AttachmentRecord> {
        self.paths_to_attachment_info.get(path)
    }

    /// Registry key whose path contains the decoded link target.
    pub fn find_attachment_key(&self, decoded_target: &str) -> Option<&str> {
        if decoded_target.is_empty() {
            return None;
        }
        self.paths_to_attachment_info
            .keys()
            .find(|key| key.contains(decoded_target))
            .map(|key| key.as_str())
    }

    /// Set by the persistence layer exactly once, after the document has
    /// been written to the destination store.
    pub fn assign_block_id(&mut self, source_id: &str, block_id: &str) {
        if let Some(record) = self.ids_to_file_info.get_mut(source_id) {
            record.target_block_id = block_id.to_string();
        }
    }

    /// Destination folder path for an entry, derived from its ancestor ids.
    ///
    /// Each ancestor resolves to its inventoried title when known, else to a
    /// best-effort label taken from the raw path segment carrying that id.
    /// Inline databases have no document of their own and drop out of the
    /// hierarchy entirely.
    pub fn path_for_entry(&self, parent_ids: &[String], archive_path: &str) -> String {
        let segments: Vec<&str> = archive_path.split('/').collect();
        let folders: Vec<String> = parent_ids
            .iter()
            .filter_map(|parent_id| {
                self.ids_to_file_info
                    .get(parent_id)
                    .map(|file| file.title.clone())
                    .or_else(|| {
                        segments
                            .iter()
                            .find(|segment| segment.contains(parent_id.as_str()))
                            .map(|segment| segment.replace(&format!(" {parent_id}"), ""))
                    })
            })
            .filter(|folder| !folder.is_empty())
            // Folder names can't end in a dot or a space.
            .map(|folder| folder.trim_end_matches(['.', ' ']).to_string())
            .collect();
        format!("{}/", folders.join("/"))
    }

    pub fn path_for_file(&self, record: &FileRecord) -> String {
        self.path_for_entry(&record.parent_ids, &record.archive_path)
    }

    pub fn path_for_attachment(&self, record: &AttachmentRecord) -> String {
        self.path_for_entry(&record.parent_ids, &record.archive_path)
    }
}

/// A single front matter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

/// Result of converting one document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedDocument {
    pub source_id: String,
    pub title: String,
    /// Front matter block plus the rendered markdown body.
    pub markdown: String,
    /// Parsed front matter in document order.
    pub front_matter: Vec<(String, PropertyValue)>,
    /// One entry per collection table extracted from the body.
    pub attribute_views: Vec<DatabaseModel>,
}
