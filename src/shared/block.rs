//! Context Block Data Structure
//!
//! A context block is a titled unit of text or list content attached to a
//! project. The content shape is a tagged variant so that every consumer has
//! to handle both block types explicitly.
//!
//! # Wire Format
//!
//! ```json
//! {
//!   "id": "b-1",
//!   "title": "Notes",
//!   "type": "text",
//!   "content": "Some notes",
//!   "pending_content": null,
//!   "isCollapsed": false
//! }
//! ```
//!
//! `content` is interpreted according to `type`: a string for text blocks and
//! an array of strings for list blocks. Older backends send `name` instead of
//! `title` and `string` instead of `text`; both are accepted.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque block identifier, unique within a project and stable across updates
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind of content a block holds.
///
/// Decoding is lenient: a missing, null or unrecognised type (such as a
/// plugin-defined `code` block) is read as [`BlockType::Text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    /// Free-form text
    #[default]
    Text,
    /// Ordered list of strings
    List,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Text => "text",
            BlockType::List => "list",
        }
    }

    /// Parse a user-supplied type name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Some(BlockType::Text),
            "list" => Some(BlockType::List),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(name.as_deref().and_then(BlockType::parse).unwrap_or_default())
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Block content, shaped by the block type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockContent {
    Text(String),
    List(Vec<String>),
}

impl BlockContent {
    /// Default content for a freshly created block
    pub fn empty(block_type: BlockType) -> Self {
        match block_type {
            BlockType::Text => BlockContent::Text(String::new()),
            BlockType::List => BlockContent::List(Vec::new()),
        }
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            BlockContent::Text(_) => BlockType::Text,
            BlockContent::List(_) => BlockType::List,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            BlockContent::Text(text) => text.is_empty(),
            BlockContent::List(items) => items.is_empty(),
        }
    }

    /// Flatten to text: list items are joined one per line.
    pub fn to_text(&self) -> String {
        match self {
            BlockContent::Text(text) => text.clone(),
            BlockContent::List(items) => items.join("\n"),
        }
    }

    /// Turn proposed (always textual) content into content of `block_type`.
    ///
    /// For lists every non-empty line becomes an item, with a leading `- ` or
    /// `* ` bullet stripped.
    pub fn from_proposal(block_type: BlockType, proposal: &str) -> Self {
        match block_type {
            BlockType::Text => BlockContent::Text(proposal.to_string()),
            BlockType::List => BlockContent::List(
                proposal
                    .lines()
                    .map(str::trim)
                    .map(|line| {
                        line.strip_prefix("- ")
                            .or_else(|| line.strip_prefix("* "))
                            .unwrap_or(line)
                            .trim()
                    })
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }

    /// Decode a raw JSON `content` value according to `block_type`
    fn from_wire(block_type: BlockType, value: Value) -> Self {
        match block_type {
            BlockType::Text => BlockContent::Text(match value {
                Value::Null => String::new(),
                Value::String(s) => s,
                Value::Array(items) => items
                    .into_iter()
                    .map(value_to_string)
                    .collect::<Vec<_>>()
                    .join("\n"),
                other => other.to_string(),
            }),
            BlockType::List => BlockContent::List(match value {
                Value::Null => Vec::new(),
                Value::Array(items) => items.into_iter().map(value_to_string).collect(),
                Value::String(s) => s.lines().map(str::to_string).collect(),
                other => vec![other.to_string()],
            }),
        }
    }

    fn to_wire(&self) -> Value {
        match self {
            BlockContent::Text(text) => Value::String(text.clone()),
            BlockContent::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn default_collapsed() -> bool {
    true
}

/// A context block as mirrored by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BlockRecord", into = "BlockRecord")]
pub struct ContextBlock {
    pub id: BlockId,
    pub title: String,
    pub content: BlockContent,
    /// AI-proposed replacement awaiting review; `None` when the block is clean
    pub pending_content: Option<String>,
    /// UI persistence flag; not relevant to domain correctness
    pub is_collapsed: bool,
}

impl ContextBlock {
    pub fn new(id: impl Into<BlockId>, title: impl Into<String>, content: BlockContent) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content,
            pending_content: None,
            is_collapsed: true,
        }
    }

    pub fn block_type(&self) -> BlockType {
        self.content.block_type()
    }

    pub fn has_pending(&self) -> bool {
        self.pending_content.is_some()
    }

    /// Apply a single field change in place
    pub fn apply(&mut self, field: &BlockField) {
        match field {
            BlockField::Title(title) => self.title = title.clone(),
            BlockField::Content(content) => self.content = content.clone(),
            BlockField::Collapsed(collapsed) => self.is_collapsed = *collapsed,
        }
    }

    /// A copy of this block with `field` applied
    pub fn with_field(&self, field: &BlockField) -> Self {
        let mut block = self.clone();
        block.apply(field);
        block
    }
}

/// Serde mirror of the backend representation
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlockRecord {
    id: BlockId,
    #[serde(alias = "name")]
    title: String,
    #[serde(rename = "type", default)]
    block_type: BlockType,
    #[serde(default)]
    content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_content: Option<String>,
    #[serde(rename = "isCollapsed", default = "default_collapsed")]
    is_collapsed: bool,
}

impl From<BlockRecord> for ContextBlock {
    fn from(record: BlockRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: BlockContent::from_wire(record.block_type, record.content),
            pending_content: record.pending_content,
            is_collapsed: record.is_collapsed,
        }
    }
}

impl From<ContextBlock> for BlockRecord {
    fn from(block: ContextBlock) -> Self {
        Self {
            block_type: block.block_type(),
            content: block.content.to_wire(),
            id: block.id,
            title: block.title,
            pending_content: block.pending_content,
            is_collapsed: block.is_collapsed,
        }
    }
}

/// A single editable block field and its new value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockField {
    Title(String),
    Content(BlockContent),
    Collapsed(bool),
}

impl BlockField {
    pub fn name(&self) -> &'static str {
        match self {
            BlockField::Title(_) => "title",
            BlockField::Content(_) => "content",
            BlockField::Collapsed(_) => "isCollapsed",
        }
    }

    /// Only content-affecting fields enter undo/redo history.
    pub fn is_historied(&self) -> bool {
        !matches!(self, BlockField::Collapsed(_))
    }
}

/// Request body for `POST /projects/{id}/context_blocks`
#[derive(Debug, Clone, Serialize)]
pub struct NewBlockRequest {
    pub title: String,
    pub content: Value,
    #[serde(rename = "type")]
    pub block_type: BlockType,
}

impl NewBlockRequest {
    pub fn new(title: impl Into<String>, block_type: BlockType) -> Self {
        Self {
            title: title.into(),
            content: BlockContent::empty(block_type).to_wire(),
            block_type,
        }
    }

    /// Assemble the block when the backend only echoes the assigned id
    pub fn into_block(self, id: BlockId) -> ContextBlock {
        ContextBlock::from(BlockRecord {
            id,
            title: self.title,
            block_type: self.block_type,
            content: self.content,
            pending_content: None,
            is_collapsed: default_collapsed(),
        })
    }
}

/// Request body for `PUT /projects/{id}/context_blocks/{blockId}`
#[derive(Debug, Clone, Serialize)]
pub struct UpdateBlockRequest {
    pub title: String,
    pub content: Value,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(rename = "isCollapsed")]
    pub is_collapsed: bool,
}

impl From<&ContextBlock> for UpdateBlockRequest {
    fn from(block: &ContextBlock) -> Self {
        Self {
            title: block.title.clone(),
            content: block.content.to_wire(),
            block_type: block.block_type(),
            is_collapsed: block.is_collapsed,
        }
    }
}

/// Request body for `PUT /projects/{id}/reorder_blocks`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub blocks: Vec<BlockId>,
}
