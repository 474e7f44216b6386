//! Block renderers
//!
//! Each block type has a renderer that turns content into display text and
//! parses edited text back into content. The registry is keyed by the wire
//! type name so additional renderers can be registered at startup.

use crate::shared::block::{BlockContent, BlockType};
use std::collections::HashMap;

pub trait BlockRenderer: Send + Sync {
    /// Wire type name this renderer handles
    fn type_name(&self) -> &'static str;

    fn render(&self, content: &BlockContent) -> String;

    /// Parse user-edited text into content of this type
    fn parse_edit(&self, input: &str) -> BlockContent;
}

pub struct TextRenderer;

impl BlockRenderer for TextRenderer {
    fn type_name(&self) -> &'static str {
        BlockType::Text.as_str()
    }

    fn render(&self, content: &BlockContent) -> String {
        content.to_text()
    }

    fn parse_edit(&self, input: &str) -> BlockContent {
        BlockContent::Text(input.to_string())
    }
}

pub struct ListRenderer;

impl BlockRenderer for ListRenderer {
    fn type_name(&self) -> &'static str {
        BlockType::List.as_str()
    }

    fn render(&self, content: &BlockContent) -> String {
        match content {
            BlockContent::List(items) => items
                .iter()
                .map(|item| format!("- {}", item))
                .collect::<Vec<_>>()
                .join("\n"),
            BlockContent::Text(text) => text.clone(),
        }
    }

    fn parse_edit(&self, input: &str) -> BlockContent {
        BlockContent::from_proposal(BlockType::List, input)
    }
}

/// Renderers keyed by type name
pub struct RendererRegistry {
    renderers: HashMap<&'static str, Box<dyn BlockRenderer>>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        let mut registry = Self {
            renderers: HashMap::new(),
        };
        registry.register(Box::new(TextRenderer));
        registry.register(Box::new(ListRenderer));
        registry
    }
}

impl RendererRegistry {
    /// Registry with the built-in text and list renderers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the renderer for its type name
    pub fn register(&mut self, renderer: Box<dyn BlockRenderer>) {
        self.renderers.insert(renderer.type_name(), renderer);
    }

    pub fn get(&self, type_name: &str) -> Option<&dyn BlockRenderer> {
        self.renderers.get(type_name).map(|r| r.as_ref())
    }

    /// Render with the renderer for the content's type, falling back to plain text
    pub fn render(&self, content: &BlockContent) -> String {
        self.get(content.block_type().as_str())
            .map(|r| r.render(content))
            .unwrap_or_else(|| content.to_text())
    }

    pub fn parse_edit(&self, block_type: BlockType, input: &str) -> BlockContent {
        self.get(block_type.as_str())
            .map(|r| r.parse_edit(input))
            .unwrap_or_else(|| BlockContent::from_proposal(block_type, input))
    }
}
