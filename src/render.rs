//! Seams owned by the destination application.
//!
//! The engine never renders markdown or issues destination ids itself; both
//! come in through these traits so the import command can plug in the real
//! editor conversion and id allocator.

use std::cell::Cell;

use uuid::Uuid;

/// Converts a serialized HTML fragment to the destination markdown dialect.
///
/// Must be a pure function of its input: the pipeline calls it exactly once
/// per document, after all tree-level work is done, and applies only
/// string-level fixups to the result.
pub trait MarkdownRenderer {
    fn html_to_markdown(&self, html: &str) -> String;
}

/// Issues globally-unique ids for minted database rows, columns and views.
pub trait IdGenerator {
    fn next_id(&self) -> String;
}

/// Default generator backed by random v4 UUIDs.
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Deterministic counter-based generator. Fixing the id sequence makes a
/// whole conversion run reproducible byte for byte.
#[derive(Default)]
pub struct SequentialIds(Cell<u64>);

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.0.get() + 1;
        self.0.set(n);
        format!("id-{n:08}")
    }
}
