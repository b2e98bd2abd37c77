//! Notion HTML export conversion.
//!
//! Handles converting Notion export archives into markdown notebooks:
//! - Document inventory with forward-reference-safe link resolution
//! - Internal link, attachment and image rewriting
//! - Collection tables extracted into typed database models
//! - Property tables parsed into YAML front matter

pub mod convert;
pub mod database;
pub mod import;
pub mod inventory;
pub mod links;
pub mod types;
pub mod utils;

pub use convert::DocumentTransformer;
pub use database::{
    CellValue, Column, ColumnKind, DatabaseModel, DateValue, RowValue, SelectOption, TableView,
};
pub use import::{
    convert_archive, convert_documents, inventory_archive, ImportOptions, ImportOutput,
    ImportSummary,
};
pub use inventory::{scan_attachment, scan_document};
pub use links::{collect_links, convert_links, LinkRef};
pub use types::{AttachmentRecord, ConvertedDocument, FileRecord, PropertyValue, ResolverInfo};
