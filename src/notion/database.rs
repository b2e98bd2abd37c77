//! Collection table extraction.
//!
//! Notion exports in-page databases as `<table class="collection-content">`
//! with a per-column type marker in the header. Each table becomes one
//! typed [`DatabaseModel`]; the table region itself is replaced by a
//! placeholder paragraph so the generic markdown renderer cannot mangle it,
//! and the placeholder is swapped for the real embed after rendering.

use serde::Serialize;

use crate::html::{Dom, NodeId};
use crate::notion::types::ResolverInfo;
use crate::notion::utils::{get_notion_id, parse_notion_date, timestamp_is_pure_date};
use crate::render::IdGenerator;

/// Semantic column type, read from the header cell marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    /// The primary column; its cells identify the rows.
    Block,
    Text,
    Date,
    Select,
    MultiSelect,
    Checkbox,
}

/// Header marker classes and the column kind each one encodes. Anything
/// not listed here is treated as plain text.
const COLUMN_MARKERS: &[(&str, ColumnKind)] = &[
    ("typesTitle", ColumnKind::Block),
    ("typesMultipleSelect", ColumnKind::MultiSelect),
    ("typesSelect", ColumnKind::Select),
    ("typesStatus", ColumnKind::Select),
    ("typesCheckbox", ColumnKind::Checkbox),
    ("typesDate", ColumnKind::Date),
    ("typesCreatedTime", ColumnKind::Date),
    ("typesLastEditedTime", ColumnKind::Date),
];

fn column_kind_for_marker(class_attr: &str) -> ColumnKind {
    COLUMN_MARKERS
        .iter()
        .find(|(marker, _)| class_attr.contains(marker))
        .map(|(_, kind)| *kind)
        .unwrap_or(ColumnKind::Text)
}

/// A select option, ordinal assigned in first-seen row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOption {
    pub name: String,
    pub ordinal: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateValue {
    /// Epoch milliseconds of the first endpoint.
    pub start: i64,
    /// Second endpoint for ranges.
    pub end: Option<i64>,
    /// Whether the cell encoded only a date, no time of day.
    pub date_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CellValue {
    Block { id: String, label: String },
    Text(String),
    Date(DateValue),
    Select(Vec<String>),
    Checkbox(bool),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowValue {
    pub row_id: String,
    /// False when the row's primary link was never matched to an
    /// inventoried document with a persisted block: the row is detached.
    pub resolved: bool,
    pub value: CellValue,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub name: String,
    pub kind: ColumnKind,
    /// Select-like columns only; insertion-ordered, deduplicated.
    pub options: Vec<SelectOption>,
    /// One entry per row that had a non-empty value in this column.
    pub values: Vec<RowValue>,
}

/// The single default view every extracted table gets: no filters, no
/// sorts, fixed page size.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub id: String,
    pub name: String,
    pub page_size: usize,
}

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseModel {
    pub id: String,
    pub title: String,
    pub columns: Vec<Column>,
    pub row_ids: Vec<String>,
    pub view: TableView,
}

/// Placeholder text standing in for an extracted table until rendering is
/// done.
pub fn database_placeholder(id: &str) -> String {
    format!("%%%DATABASE-VIEW:{id}%%%")
}

/// Final embed syntax written into the rendered markdown.
pub fn database_embed(id: &str) -> String {
    format!("<div data-type=\"NodeAttributeView\" data-av-id=\"{id}\" data-av-type=\"table\"></div>")
}

/// Swap every placeholder for its database embed.
pub fn substitute_placeholders(markdown: &str, models: &[DatabaseModel]) -> String {
    let mut out = markdown.to_string();
    for model in models {
        out = out.replace(&database_placeholder(&model.id), &database_embed(&model.id));
    }
    out
}

/// Extract every collection table under `scope` and replace each with a
/// placeholder paragraph. Returns one model per table, in document order.
pub fn extract_databases(
    dom: &mut Dom,
    info: &ResolverInfo,
    ids: &dyn IdGenerator,
    doc_title: &str,
    scope: NodeId,
) -> Vec<DatabaseModel> {
    let tables = dom.find_all(scope, |d, n| {
        d.tag(n) == Some("table") && d.class_contains(n, "collection-content")
    });

    let mut models = Vec::new();
    for table in tables {
        let Some(model) = extract_table(dom, info, ids, doc_title, table) else {
            continue;
        };
        let paragraph = dom.create_element("p");
        let token = dom.create_text(&database_placeholder(&model.id));
        dom.append_child(paragraph, token);
        dom.replace_with(table, &[paragraph]);
        models.push(model);
    }
    models
}

fn extract_table(
    dom: &Dom,
    info: &ResolverInfo,
    ids: &dyn IdGenerator,
    doc_title: &str,
    table: NodeId,
) -> Option<DatabaseModel> {
    let header_cells = dom.find_all_tags(table, "th");
    if header_cells.is_empty() {
        log::warn!("collection table without a header row, leaving it in place");
        return None;
    }

    let model_id = ids.next_id();
    let view = TableView {
        id: ids.next_id(),
        name: "Table".to_string(),
        page_size: DEFAULT_PAGE_SIZE,
    };

    let mut columns: Vec<Column> = header_cells
        .iter()
        .map(|&th| {
            let marker = dom
                .find_first(th, |d, n| d.class_contains(n, "types"))
                .and_then(|n| dom.attr(n, "class"))
                .unwrap_or("");
            Column {
                id: ids.next_id(),
                name: dom.text_content(th).trim().to_string(),
                kind: column_kind_for_marker(marker),
                options: Vec::new(),
                values: Vec::new(),
            }
        })
        .collect();

    let title_col = columns
        .iter()
        .position(|column| column.kind == ColumnKind::Block);
    let title_col = match title_col {
        Some(index) => index,
        None => {
            log::warn!("collection table without a title column, using the first column");
            columns[0].kind = ColumnKind::Block;
            0
        }
    };

    let body_rows: Vec<NodeId> = dom
        .find_all_tags(table, "tr")
        .into_iter()
        .filter(|&row| {
            dom.closest(row, |d, n| d.tag(n) == Some("thead")).is_none()
                && !dom.find_all_tags(row, "th").iter().any(|&th| header_cells.contains(&th))
        })
        .collect();

    let mut row_ids = Vec::new();
    for row in body_rows {
        let cells: Vec<NodeId> = dom
            .element_children(row)
            .into_iter()
            .filter(|&cell| matches!(dom.tag(cell), Some("td") | Some("th")))
            .collect();
        if cells.is_empty() {
            continue;
        }

        let (row_id, resolved) = resolve_row_identity(dom, info, ids, cells.get(title_col));
        row_ids.push(row_id.clone());

        for (index, column) in columns.iter_mut().enumerate() {
            let Some(&cell) = cells.get(index) else {
                continue;
            };
            let value = extract_cell(dom, column, cell, &row_id);
            if let Some(value) = value {
                column.values.push(RowValue {
                    row_id: row_id.clone(),
                    resolved,
                    value,
                });
            }
        }
    }

    Some(DatabaseModel {
        id: model_id,
        title: table_title(dom, table, doc_title),
        columns,
        row_ids,
        view,
    })
}

/// Reuse the persisted block id when the row's primary link points at an
/// inventoried document that already has one; otherwise mint a fresh id
/// and mark the row detached.
fn resolve_row_identity(
    dom: &Dom,
    info: &ResolverInfo,
    ids: &dyn IdGenerator,
    title_cell: Option<&NodeId>,
) -> (String, bool) {
    let linked = title_cell
        .and_then(|&cell| dom.find_tag(cell, "a"))
        .and_then(|anchor| dom.attr(anchor, "href"))
        .map(|href| {
            urlencoding::decode(href)
                .map(|cow| cow.into_owned())
                .unwrap_or_else(|_| href.to_string())
        })
        .and_then(|decoded| get_notion_id(&decoded))
        .and_then(|id| info.file_by_id(&id))
        .filter(|file| !file.target_block_id.is_empty());

    match linked {
        Some(file) => (file.target_block_id.clone(), true),
        None => (ids.next_id(), false),
    }
}

fn extract_cell(dom: &Dom, column: &mut Column, cell: NodeId, row_id: &str) -> Option<CellValue> {
    match column.kind {
        ColumnKind::Block => Some(CellValue::Block {
            id: row_id.to_string(),
            label: dom.text_content(cell).trim().to_string(),
        }),
        ColumnKind::Checkbox => {
            let checked = dom
                .find_first(cell, |d, n| d.class_contains(n, "checkbox-on"))
                .is_some();
            Some(CellValue::Checkbox(checked))
        }
        ColumnKind::Date => {
            let text = dom.text_content(cell).replace('@', "");
            let endpoints: Vec<_> = text
                .split('\u{2192}')
                .filter_map(|part| parse_notion_date(part))
                .collect();
            let first = endpoints.first()?;
            Some(CellValue::Date(DateValue {
                start: first.and_utc().timestamp_millis(),
                end: endpoints.get(1).map(|dt| dt.and_utc().timestamp_millis()),
                date_only: endpoints.iter().all(timestamp_is_pure_date),
            }))
        }
        ColumnKind::Select | ColumnKind::MultiSelect => {
            let labels: Vec<String> = dom
                .find_all(cell, |d, n| d.class_contains(n, "selected-value"))
                .into_iter()
                .map(|n| dom.text_content(n).trim().to_string())
                .filter(|label| !label.is_empty())
                .collect();
            if labels.is_empty() {
                return None;
            }
            for label in &labels {
                if !column.options.iter().any(|option| &option.name == label) {
                    let ordinal = column.options.len() + 1;
                    column.options.push(SelectOption {
                        name: label.clone(),
                        ordinal,
                    });
                }
            }
            Some(CellValue::Select(labels))
        }
        ColumnKind::Text => {
            let text = dom.text_content(cell).trim().to_string();
            if text.is_empty() {
                None
            } else {
                Some(CellValue::Text(text))
            }
        }
    }
}

/// Nearest preceding heading sibling names the table; page-level tables
/// fall back to the document title.
fn table_title(dom: &Dom, table: NodeId, doc_title: &str) -> String {
    let mut current = table;
    while let Some(prev) = dom.prev_element_sibling(current) {
        if matches!(dom.tag(prev), Some("h1" | "h2" | "h3" | "h4" | "h5" | "h6")) {
            let text = dom.text_content(prev).trim().to_string();
            if !text.is_empty() {
                return text;
            }
        }
        current = prev;
    }
    doc_title.to_string()
}
