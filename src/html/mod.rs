//! Minimal HTML tree model for export processing.
//!
//! Parses export HTML into an indexed node arena, supports the mutation
//! passes the conversion pipeline needs, and serializes back to a string
//! for the external markdown renderer.

pub mod dom;
pub mod parser;
pub mod serializer;

pub use dom::{Dom, NodeData, NodeId};
pub use parser::parse_html;
pub use serializer::{inner_html, outer_html};
