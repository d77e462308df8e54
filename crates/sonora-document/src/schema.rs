//! Schema rules
//!
//! A small rule set in the spirit of the host editor's schema: items declare
//! where they may appear (`allow_in`, or `allow_where` to copy another item's
//! placement), whose content they accept (`allow_content_of`), whether they
//! are blocks or objects, and which attributes they carry.

use std::collections::HashMap;

pub const ROOT: &str = "$root";
pub const BLOCK: &str = "$block";
pub const TEXT: &str = "$text";

pub const PARAGRAPH: &str = "paragraph";
pub const BLOCK_QUOTE: &str = "blockQuote";
pub const AUDIO: &str = "audio";

/// Attributes an `audio` element may carry.
pub const AUDIO_ATTRIBUTES: &[&str] = &[
    "src",
    "controls",
    "uploadId",
    "uploadStatus",
    "uploadProgress",
    "uploadError",
];

// Guards `allow_where`/`allow_content_of` chains against cycles
const MAX_RULE_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaItem {
    pub allow_in: Vec<String>,
    pub allow_where: Option<String>,
    pub allow_content_of: Option<String>,
    pub allow_attributes: Vec<String>,
    pub is_block: bool,
    pub is_object: bool,
}

impl SchemaItem {
    pub fn allow_in(mut self, parent: &str) -> Self {
        self.allow_in.push(parent.to_string());
        self
    }

    pub fn allow_where(mut self, item: &str) -> Self {
        self.allow_where = Some(item.to_string());
        self
    }

    pub fn allow_content_of(mut self, item: &str) -> Self {
        self.allow_content_of = Some(item.to_string());
        self
    }

    pub fn allow_attributes(mut self, keys: &[&str]) -> Self {
        self.allow_attributes
            .extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn block(mut self) -> Self {
        self.is_block = true;
        self
    }

    /// Objects are self-contained blocks (widgets)
    pub fn object(mut self) -> Self {
        self.is_object = true;
        self.is_block = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    items: HashMap<String, SchemaItem>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema with paragraphs, block quotes, and the `audio` widget.
    pub fn with_audio() -> Self {
        let mut schema = Self::new();
        schema.register(ROOT, SchemaItem::default());
        schema.register(BLOCK, SchemaItem::default().allow_in(ROOT));
        schema.register(TEXT, SchemaItem::default().allow_in(BLOCK));
        schema.register(
            PARAGRAPH,
            SchemaItem::default()
                .allow_where(BLOCK)
                .allow_content_of(BLOCK)
                .block(),
        );
        schema.register(
            BLOCK_QUOTE,
            SchemaItem::default()
                .allow_where(BLOCK)
                .allow_content_of(ROOT),
        );
        schema.register(
            AUDIO,
            SchemaItem::default()
                .allow_where(BLOCK)
                .allow_attributes(AUDIO_ATTRIBUTES)
                .object(),
        );
        schema
    }

    pub fn register(&mut self, name: &str, item: SchemaItem) {
        self.items.insert(name.to_string(), item);
    }

    pub fn item(&self, name: &str) -> Option<&SchemaItem> {
        self.items.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn is_object(&self, name: &str) -> bool {
        self.item(name).is_some_and(|item| item.is_object)
    }

    pub fn is_block(&self, name: &str) -> bool {
        self.item(name).is_some_and(|item| item.is_block)
    }

    /// Whether an element named `child` may be placed directly in `parent`.
    pub fn check_child(&self, parent: &str, child: &str) -> bool {
        self.check_child_at_depth(parent, child, 0)
    }

    fn check_child_at_depth(&self, parent: &str, child: &str, depth: usize) -> bool {
        if depth > MAX_RULE_DEPTH {
            return false;
        }

        if self.allowed_parents(child, 0).iter().any(|p| p == parent) {
            return true;
        }

        match self.item(parent).and_then(|item| item.allow_content_of.as_deref()) {
            Some(content_of) => self.check_child_at_depth(content_of, child, depth + 1),
            None => false,
        }
    }

    fn allowed_parents(&self, name: &str, depth: usize) -> Vec<String> {
        let Some(item) = self.item(name) else {
            return Vec::new();
        };
        let mut parents = item.allow_in.clone();
        if depth < MAX_RULE_DEPTH {
            if let Some(allow_where) = &item.allow_where {
                parents.extend(self.allowed_parents(allow_where, depth + 1));
            }
        }
        parents
    }

    /// Whether `key` may be set on an element named `element`.
    ///
    /// Items that declare no attributes accept any.
    pub fn check_attribute(&self, element: &str, key: &str) -> bool {
        match self.item(element) {
            Some(item) if !item.allow_attributes.is_empty() => {
                item.allow_attributes.iter().any(|k| k == key)
            }
            _ => true,
        }
    }
}
