//! Conversion engine for Notion HTML exports.
//!
//! Turns an export archive (HTML documents plus asset files) into markdown
//! bodies with YAML front matter and typed database models. Conversion is
//! strictly two-phase: [`notion::inventory_archive`] catalogs every entry
//! into a [`notion::ResolverInfo`] registry, then
//! [`notion::convert_documents`] rewrites each document against it. The
//! registry is complete before any document is transformed, which is what
//! makes links to not-yet-seen documents resolve.
//!
//! Writing results into the destination store, id issuance and the actual
//! HTML-to-markdown rendering are owned by the embedding application; see
//! [`render::MarkdownRenderer`] and [`render::IdGenerator`].

pub mod archive;
pub mod error;
pub mod html;
pub mod notion;
pub mod render;

pub use archive::{ArchiveSource, MemorySource, ZipSource};
pub use error::{ConvertError, Result};
pub use notion::{
    convert_archive, ConvertedDocument, DatabaseModel, ImportOptions, ImportOutput, ImportSummary,
    ResolverInfo,
};
pub use render::{IdGenerator, MarkdownRenderer, SequentialIds, UuidIds};
