//! Seeded in-memory backends for store, reconciler, chat and workspace tests

use std::sync::Arc;
use structured_chat::client::{BlockStore, MemoryGateway, Scope, Workspace};
use structured_chat::shared::{BlockContent, ContextBlock, Project};

pub fn text_block(id: &str, title: &str, content: &str) -> ContextBlock {
    ContextBlock::new(id, title, BlockContent::Text(content.to_string()))
}

pub fn list_block(id: &str, title: &str, items: &[&str]) -> ContextBlock {
    ContextBlock::new(
        id,
        title,
        BlockContent::List(items.iter().map(|s| s.to_string()).collect()),
    )
}

/// The canonical three-block project used across scenarios
pub fn three_blocks() -> Vec<ContextBlock> {
    vec![
        text_block("B1", "Notes", "first"),
        text_block("B2", "Facts", "second"),
        text_block("B3", "Plan", "third"),
    ]
}

/// A workspace over a memory backend with one selected project
pub struct Harness {
    pub gateway: Arc<MemoryGateway>,
    pub workspace: Arc<Workspace>,
    pub project: Project,
}

pub async fn seeded_workspace(blocks: Vec<ContextBlock>) -> Harness {
    let gateway = Arc::new(MemoryGateway::new());
    let project = gateway.add_project("Research");
    gateway.set_blocks(&project.id, blocks);

    let workspace = Arc::new(Workspace::new(gateway.clone(), 100));
    workspace
        .refresh_projects()
        .await
        .expect("project list should load");
    workspace
        .select_project(&project.id)
        .await
        .expect("project should open");

    Harness {
        gateway,
        workspace,
        project,
    }
}

/// A store bound to a seeded project
pub async fn seeded_store(blocks: Vec<ContextBlock>) -> (Arc<MemoryGateway>, Arc<BlockStore>) {
    let gateway = Arc::new(MemoryGateway::new());
    let project = gateway.add_project("Research");
    gateway.set_blocks(&project.id, blocks);

    let store = Arc::new(BlockStore::new(gateway.clone(), 100));
    store.enter(Scope::new(project.id, 1)).await;
    store.refresh().await.expect("blocks should load");
    (gateway, store)
}
