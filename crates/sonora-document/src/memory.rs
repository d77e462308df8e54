//! In-memory document
//!
//! A plain tree of elements and text nodes implementing [`EditorModel`]. It
//! stands in for the host editor in tests and in the CLI.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::node::{NewElement, NodeId, Position, Selection};
use crate::schema::{Schema, PARAGRAPH, ROOT, TEXT};
use crate::traits::{DocumentError, DocumentResult, EditorModel};

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        name: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone)]
struct Snapshot {
    nodes: HashMap<NodeId, Node>,
    next_id: u64,
    selection: Selection,
}

#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
    selection: Selection,
    schema: Arc<Schema>,
    version: u64,
    in_change: bool,
}

impl MemoryDocument {
    /// Empty document (just the root) with the caret inside the root
    pub fn new(schema: Arc<Schema>) -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                kind: NodeKind::Element {
                    name: ROOT.to_string(),
                    attributes: BTreeMap::new(),
                },
                parent: None,
                children: Vec::new(),
            },
        );

        Self {
            nodes,
            root,
            next_id: 1,
            selection: Selection::Collapsed(Position::new(root, 0)),
            schema,
            version: 0,
            in_change: false,
        }
    }

    /// Document holding one empty paragraph, caret inside it
    pub fn with_empty_paragraph(schema: Arc<Schema>) -> Self {
        let mut doc = Self::new(schema);
        let root = doc.root;
        // An empty paragraph in the root is valid for any schema with paragraphs
        if let Ok(paragraph) = doc.insert_element(NewElement::new(PARAGRAPH), Position::new(root, 0)) {
            doc.selection = Selection::Collapsed(Position::new(paragraph, 0));
        }
        doc
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Incremented once per applied change
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn attributes(&self, node: NodeId) -> Option<&BTreeMap<String, String>> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            NodeKind::Text(_) => None,
        }
    }

    pub fn insert_text(&mut self, text: &str, at: Position) -> DocumentResult<NodeId> {
        self.check_position(at)?;
        if !self.check_child(at.parent, TEXT) {
            return Err(DocumentError::ChildNotAllowed {
                parent: self.name(at.parent).unwrap_or_default().to_string(),
                child: TEXT.to_string(),
            });
        }
        let id = self.attach(NodeKind::Text(text.to_string()), at);
        self.bump();
        Ok(id)
    }

    /// Serialize the tree as markup, for display and assertions
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.root) {
            self.render_node(*child, &mut out);
        }
        out
    }

    fn render_node(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(&node) else {
            return;
        };
        match &n.kind {
            NodeKind::Text(text) => out.push_str(&escape_html(text)),
            NodeKind::Element { name, attributes } => {
                let tag = match name.as_str() {
                    PARAGRAPH => "p",
                    "blockQuote" => "blockquote",
                    other => other,
                };
                let _ = write!(out, "<{}", tag);
                for (key, value) in attributes {
                    let _ = write!(out, " {}=\"{}\"", key, escape_html(value));
                }
                out.push('>');
                for child in &n.children {
                    self.render_node(*child, out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }

    fn check_position(&self, at: Position) -> DocumentResult<()> {
        let parent = self
            .nodes
            .get(&at.parent)
            .ok_or(DocumentError::NodeNotFound(at.parent))?;
        if at.offset > parent.children.len() {
            return Err(DocumentError::InvalidPosition {
                parent: at.parent,
                offset: at.offset,
            });
        }
        Ok(())
    }

    fn attach(&mut self, kind: NodeKind, at: Position) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                kind,
                parent: Some(at.parent),
                children: Vec::new(),
            },
        );
        if let Some(parent) = self.nodes.get_mut(&at.parent) {
            parent.children.insert(at.offset, id);
        }
        id
    }

    fn element_mut(&mut self, node: NodeId) -> DocumentResult<(&str, &mut BTreeMap<String, String>)> {
        match self.nodes.get_mut(&node) {
            Some(Node {
                kind: NodeKind::Element { name, attributes },
                ..
            }) => Ok((name.as_str(), attributes)),
            _ => Err(DocumentError::NodeNotFound(node)),
        }
    }

    fn bump(&mut self) {
        if !self.in_change {
            self.version += 1;
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.nodes.clone(),
            next_id: self.next_id,
            selection: self.selection,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.nodes = snapshot.nodes;
        self.next_id = snapshot.next_id;
        self.selection = snapshot.selection;
    }
}

impl EditorModel for MemoryDocument {
    fn root(&self) -> NodeId {
        self.root
    }

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::Text(_) => Some(TEXT),
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    fn attribute(&self, node: NodeId, key: &str) -> Option<&str> {
        self.attributes(node)?.get(key).map(String::as_str)
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn check_child(&self, parent: NodeId, child_name: &str) -> bool {
        self.name(parent)
            .is_some_and(|name| self.schema.check_child(name, child_name))
    }

    fn is_object(&self, node: NodeId) -> bool {
        self.name(node).is_some_and(|name| self.schema.is_object(name))
    }

    fn is_block(&self, node: NodeId) -> bool {
        self.name(node).is_some_and(|name| self.schema.is_block(name))
    }

    fn insert_element(&mut self, element: NewElement, at: Position) -> DocumentResult<NodeId> {
        self.check_position(at)?;
        if !self.check_child(at.parent, &element.name) {
            return Err(DocumentError::ChildNotAllowed {
                parent: self.name(at.parent).unwrap_or_default().to_string(),
                child: element.name,
            });
        }
        if let Some(key) = element
            .attributes
            .keys()
            .find(|key| !self.schema.check_attribute(&element.name, key))
        {
            return Err(DocumentError::AttributeNotAllowed {
                element: element.name.clone(),
                key: key.clone(),
            });
        }

        let id = self.attach(
            NodeKind::Element {
                name: element.name,
                attributes: element.attributes,
            },
            at,
        );
        self.bump();
        Ok(id)
    }

    fn set_attribute(&mut self, node: NodeId, key: &str, value: &str) -> DocumentResult<()> {
        let schema = Arc::clone(&self.schema);
        let (name, attributes) = self.element_mut(node)?;
        if !schema.check_attribute(name, key) {
            return Err(DocumentError::AttributeNotAllowed {
                element: name.to_string(),
                key: key.to_string(),
            });
        }
        attributes.insert(key.to_string(), value.to_string());
        self.bump();
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, key: &str) -> DocumentResult<()> {
        let (_, attributes) = self.element_mut(node)?;
        if attributes.remove(key).is_some() {
            self.bump();
        }
        Ok(())
    }

    fn remove(&mut self, node: NodeId) -> DocumentResult<()> {
        if node == self.root {
            return Err(DocumentError::RootRemoval);
        }
        let position = self
            .position_before(node)
            .ok_or(DocumentError::NodeNotFound(node))?;

        for removed in self.subtree(node) {
            self.nodes.remove(&removed);
        }
        if let Some(parent) = self.nodes.get_mut(&position.parent) {
            parent.children.retain(|child| *child != node);
        }

        // Keep the selection inside the document
        let selection_lost = match self.selection {
            Selection::On(selected) => !self.contains(selected),
            Selection::Collapsed(caret) => !self.contains(caret.parent),
        };
        if selection_lost {
            self.selection = Selection::Collapsed(position);
        } else if let Selection::Collapsed(caret) = self.selection {
            if caret.parent == position.parent && caret.offset > position.offset {
                self.selection = Selection::Collapsed(Position::new(caret.parent, caret.offset - 1));
            }
        }

        self.bump();
        Ok(())
    }

    fn set_selection(&mut self, selection: Selection) -> DocumentResult<()> {
        match selection {
            Selection::On(node) => {
                if node == self.root || !self.contains(node) {
                    return Err(DocumentError::NodeNotFound(node));
                }
            }
            Selection::Collapsed(position) => self.check_position(position)?,
        }
        self.selection = selection;
        Ok(())
    }

    fn change<R, F>(&mut self, edit: F) -> DocumentResult<R>
    where
        F: FnOnce(&mut Self) -> DocumentResult<R>,
    {
        // Nested changes join the outermost one
        if self.in_change {
            return edit(self);
        }

        let snapshot = self.snapshot();
        self.in_change = true;
        let result = edit(self);
        self.in_change = false;

        match result {
            Ok(value) => {
                self.version += 1;
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Document change rolled back");
                self.restore(snapshot);
                Err(e)
            }
        }
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
