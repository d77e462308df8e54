use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Handle to a node of the document tree.
///
/// Handles are never reused, so a handle to a removed node simply stops
/// resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{}", self.0)
    }
}

/// A place between two children of `parent` (`offset` counts children).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub parent: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(parent: NodeId, offset: usize) -> Self {
        Self { parent, offset }
    }
}

/// Document selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Caret at a position
    Collapsed(Position),
    /// The whole node is selected (e.g. a widget)
    On(NodeId),
}

impl Selection {
    pub fn selected_element(&self) -> Option<NodeId> {
        match self {
            Selection::On(node) => Some(*node),
            Selection::Collapsed(_) => None,
        }
    }
}

/// Element to be inserted into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

impl NewElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
