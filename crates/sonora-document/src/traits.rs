//! Document model abstraction
//!
//! This module defines the `EditorModel` trait, the slice of the host editor's
//! model API that the upload pipeline consumes: tree reads, schema queries,
//! selection, and attribute/element writes grouped into atomic changes.

use thiserror::Error;

use crate::node::{NewElement, NodeId, Position, Selection};

/// Document operation errors
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Element '{child}' is not allowed in '{parent}'")]
    ChildNotAllowed { parent: String, child: String },

    #[error("Attribute '{key}' is not allowed on '{element}'")]
    AttributeNotAllowed { element: String, key: String },

    #[error("Invalid position: offset {offset} in {parent}")]
    InvalidPosition { parent: NodeId, offset: usize },

    #[error("The root element cannot be removed")]
    RootRemoval,
}

/// Result type for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Host document model, as seen by the upload pipeline.
///
/// Read methods on a node that is not in the document return `None`, `false`,
/// or an empty slice rather than failing: callers use them as existence checks.
pub trait EditorModel {
    fn root(&self) -> NodeId;

    /// Whether `node` is currently part of the document tree
    fn contains(&self, node: NodeId) -> bool;

    /// Element name, or `$text` for text nodes
    fn name(&self, node: NodeId) -> Option<&str>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> &[NodeId];

    fn attribute(&self, node: NodeId, key: &str) -> Option<&str>;

    fn selection(&self) -> Selection;

    /// Schema query: may an element named `child_name` be placed in `parent`?
    fn check_child(&self, parent: NodeId, child_name: &str) -> bool;

    fn is_object(&self, node: NodeId) -> bool;

    fn is_block(&self, node: NodeId) -> bool;

    fn insert_element(&mut self, element: NewElement, at: Position) -> DocumentResult<NodeId>;

    fn set_attribute(&mut self, node: NodeId, key: &str, value: &str) -> DocumentResult<()>;

    /// Removing an attribute that is not set is not an error
    fn remove_attribute(&mut self, node: NodeId, key: &str) -> DocumentResult<()>;

    /// Remove `node` and its subtree
    fn remove(&mut self, node: NodeId) -> DocumentResult<()>;

    fn set_selection(&mut self, selection: Selection) -> DocumentResult<()>;

    /// Run `edit` as one atomic change: either every write inside it is
    /// applied, or (when it returns an error) none is.
    fn change<R, F>(&mut self, edit: F) -> DocumentResult<R>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> DocumentResult<R>;

    fn is_root(&self, node: NodeId) -> bool {
        node == self.root()
    }

    fn is_empty(&self, node: NodeId) -> bool {
        self.children(node).is_empty()
    }

    fn is_named(&self, node: NodeId, name: &str) -> bool {
        self.name(node) == Some(name)
    }

    fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|child| *child == node)
    }

    fn position_before(&self, node: NodeId) -> Option<Position> {
        let parent = self.parent(node)?;
        let index = self.index_in_parent(node)?;
        Some(Position::new(parent, index))
    }

    fn position_after(&self, node: NodeId) -> Option<Position> {
        self.position_before(node)
            .map(|p| Position::new(p.parent, p.offset + 1))
    }

    /// `node` followed by its ancestors up to the root
    fn ancestors_and_self(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(n) = current {
            if !self.contains(n) {
                break;
            }
            chain.push(n);
            current = self.parent(n);
        }
        chain
    }

    /// `node` and everything below it, in document order
    fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        if !self.contains(node) {
            return nodes;
        }
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            nodes.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        nodes
    }

    /// First element in document order whose `key` attribute equals `value`
    fn find_by_attribute(&self, key: &str, value: &str) -> Option<NodeId> {
        self.subtree(self.root())
            .into_iter()
            .find(|n| self.attribute(*n, key) == Some(value))
    }

    /// Where the caret is; for a selection on a node, right after the node
    fn selection_focus(&self) -> Position {
        match self.selection() {
            Selection::Collapsed(position) => position,
            Selection::On(node) => self
                .position_after(node)
                .unwrap_or_else(|| Position::new(self.root(), 0)),
        }
    }
}
