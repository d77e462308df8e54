//! Sonora Document Library
//!
//! The host editor's document model is an external collaborator. This crate
//! defines the narrow interface the upload pipeline consumes (`EditorModel`),
//! the schema rules it queries, widget insertion helpers, and an in-memory
//! implementation used by tests and the CLI.
//!
//! # Atomic edits
//!
//! Every write can run on its own, but related writes should be grouped with
//! [`EditorModel::change`] so they land as one atomic edit: if any write in the
//! group fails, none of them is applied.

pub mod memory;
pub mod node;
pub mod schema;
pub mod traits;
pub mod widget;

// Re-export commonly used types
pub use memory::MemoryDocument;
pub use node::{NewElement, NodeId, Position, Selection};
pub use schema::{Schema, SchemaItem};
pub use traits::{DocumentError, DocumentResult, EditorModel};
pub use widget::{find_optimal_insertion_position, insertion_parent};
