//! Two-phase archive conversion driver.
//!
//! Phase one inventories every entry into the registry; phase two
//! transforms each document against the finished registry. The phases
//! never interleave: a document may be referenced by id before it is
//! inventoried, and only the completed registry makes those forward
//! references resolve. One entry's failure excludes that entry and lets
//! the rest of the batch continue.

use serde::Serialize;

use crate::archive::{entry_extension, ArchiveSource};
use crate::error::Result;
use crate::notion::convert::DocumentTransformer;
use crate::notion::inventory::{scan_attachment, scan_document};
use crate::notion::types::{ConvertedDocument, ResolverInfo};
use crate::render::{IdGenerator, MarkdownRenderer};

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Base directory for attachment reference paths.
    pub attachment_dir: String,
    /// Collapse blank lines in the rendered markdown.
    pub single_line_breaks: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            attachment_dir: "assets/notion".to_string(),
            single_line_breaks: false,
        }
    }
}

/// Counts and warnings for one archive conversion.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub document_count: usize,
    pub attachment_count: usize,
    pub database_count: usize,
    pub failure_count: usize,
    pub warnings: Vec<String>,
}

/// Everything the import orchestrator needs to persist a conversion.
#[derive(Debug)]
pub struct ImportOutput {
    pub documents: Vec<ConvertedDocument>,
    pub info: ResolverInfo,
    pub summary: ImportSummary,
}

/// Phase one: populate a registry from every archive entry.
///
/// Entries that cannot be inventoried are logged, reported as warnings and
/// left out of the registry; inbound references to them degrade instead of
/// failing their documents.
pub fn inventory_archive(
    source: &mut dyn ArchiveSource,
    options: &ImportOptions,
) -> Result<(ResolverInfo, Vec<String>)> {
    let mut info = ResolverInfo::new(&options.attachment_dir, options.single_line_breaks);
    let mut warnings = Vec::new();

    for path in source.paths()? {
        if path.ends_with('/') {
            continue;
        }
        if entry_extension(&path) == "html" {
            let scanned = source
                .read_text(&path)
                .and_then(|html| scan_document(&mut info, &path, &html));
            if let Err(e) = scanned {
                log::warn!("inventory failed for {path}: {e}");
                warnings.push(format!("{path}: {e}"));
            }
        } else {
            scan_attachment(&mut info, &path);
        }
    }

    Ok((info, warnings))
}

/// Phase two: convert every inventoried document. The registry is
/// read-only from here on.
pub fn convert_documents(
    source: &mut dyn ArchiveSource,
    info: &ResolverInfo,
    renderer: &dyn MarkdownRenderer,
    ids: &dyn IdGenerator,
) -> Result<(Vec<ConvertedDocument>, Vec<String>)> {
    let transformer = DocumentTransformer::new(info, renderer, ids);
    let mut documents = Vec::new();
    let mut warnings = Vec::new();

    for path in source.paths()? {
        let registered = info
            .ids_to_file_info
            .values()
            .any(|file| file.archive_path == path);
        if !registered {
            continue;
        }
        let converted = source
            .read_text(&path)
            .and_then(|html| transformer.read_to_markdown(&path, &html));
        match converted {
            Ok(document) => documents.push(document),
            Err(e) => {
                log::warn!("conversion failed for {path}: {e}");
                warnings.push(format!("{path}: {e}"));
            }
        }
    }

    Ok((documents, warnings))
}

/// Run both phases over an archive.
pub fn convert_archive(
    source: &mut dyn ArchiveSource,
    renderer: &dyn MarkdownRenderer,
    ids: &dyn IdGenerator,
    options: &ImportOptions,
) -> Result<ImportOutput> {
    let (info, mut warnings) = inventory_archive(source, options)?;
    let (documents, conversion_warnings) = convert_documents(source, &info, renderer, ids)?;
    warnings.extend(conversion_warnings);

    let summary = ImportSummary {
        document_count: documents.len(),
        attachment_count: info.paths_to_attachment_info.len(),
        database_count: documents.iter().map(|d| d.attribute_views.len()).sum(),
        failure_count: warnings.len(),
        warnings,
    };

    Ok(ImportOutput {
        documents,
        info,
        summary,
    })
}
