//! Block store scenarios over the in-memory gateway

use crate::common::{seeded_store, text_block, three_blocks};
use std::time::Duration;
use structured_chat::client::{Direction, GatewayOp};
use structured_chat::shared::{BlockContent, BlockField, BlockId, ClientError};

fn content(text: &str) -> BlockField {
    BlockField::Content(BlockContent::Text(text.to_string()))
}

#[tokio::test]
async fn test_reorder_applies_before_backend_confirms() {
    let (gateway, store) = seeded_store(three_blocks()).await;
    gateway.delay(GatewayOp::ReorderBlocks, [Duration::from_millis(150)]);

    let task = {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .reorder(vec!["B3".into(), "B1".into(), "B2".into()])
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_order!(store, ["B3", "B1", "B2"]);
    assert!(gateway.successful(GatewayOp::ReorderBlocks).is_empty());

    assert_ok!(task.await.unwrap());
    assert_order!(store, ["B3", "B1", "B2"]);
    let backend: Vec<String> = gateway
        .blocks(&store.project_id().await.unwrap())
        .iter()
        .map(|b| b.id.to_string())
        .collect();
    assert_eq!(backend, vec!["B3", "B1", "B2"]);
}

#[tokio::test]
async fn test_failed_reorder_reloads_backend_order() {
    let (gateway, store) = seeded_store(three_blocks()).await;
    let project = store.project_id().await.unwrap();

    // Another client reordered the project in the meantime.
    gateway.set_blocks(
        &project,
        vec![
            text_block("B2", "Facts", "second"),
            text_block("B1", "Notes", "first"),
            text_block("B3", "Plan", "third"),
        ],
    );
    gateway.fail_next(GatewayOp::ReorderBlocks);

    let result = store.reorder(vec!["B3".into(), "B1".into(), "B2".into()]).await;
    assert_err!(result, ClientError::Network { .. });
    assert_order!(store, ["B2", "B1", "B3"]);
}

#[tokio::test]
async fn test_same_block_writes_are_serialized() {
    let (gateway, store) = seeded_store(three_blocks()).await;
    gateway.delay_writes([Duration::from_millis(120), Duration::ZERO]);
    let id = BlockId::from("B1");

    let first = {
        let (store, id) = (store.clone(), id.clone());
        tokio::spawn(async move { store.upsert_field(&id, content("draft one")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = {
        let (store, id) = (store.clone(), id.clone());
        tokio::spawn(async move { store.upsert_field(&id, content("draft two")).await })
    };

    assert_ok!(first.await.unwrap());
    assert_ok!(second.await.unwrap());

    let written: Vec<BlockContent> = gateway
        .writes()
        .into_iter()
        .filter_map(|call| call.content)
        .collect();
    assert_eq!(
        written,
        vec![
            BlockContent::Text("draft one".into()),
            BlockContent::Text("draft two".into()),
        ]
    );
    assert_eq!(
        store.get(&id).await.unwrap().content,
        BlockContent::Text("draft two".into())
    );
}

#[tokio::test]
async fn test_writes_to_different_blocks_overlap() {
    let (gateway, store) = seeded_store(three_blocks()).await;
    gateway.delay_writes([Duration::from_millis(120), Duration::ZERO]);

    let slow = {
        let store = store.clone();
        tokio::spawn(async move { store.upsert_field(&"B1".into(), content("slow")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_ok!(store.upsert_field(&"B2".into(), content("fast")).await);

    // B2 landed while B1 was still in flight.
    let blocks: Vec<String> = gateway
        .writes()
        .iter()
        .filter_map(|call| call.block.as_ref().map(|b| b.to_string()))
        .collect();
    assert_eq!(blocks, vec!["B2"]);

    assert_ok!(slow.await.unwrap());
    assert_eq!(gateway.writes().len(), 2);
}

#[tokio::test]
async fn test_undo_redo_restores_snapshots() {
    let (_, store) = seeded_store(three_blocks()).await;
    let id = BlockId::from("B1");

    assert_ok!(store.upsert_field(&id, content("v1")).await);
    assert_ok!(store.upsert_field(&id, content("v2")).await);
    assert!(store.can_undo().await);
    assert!(!store.can_redo().await);

    assert_ok!(store.undo().await);
    assert_eq!(store.get(&id).await.unwrap().content, BlockContent::Text("v1".into()));
    assert_err!(store.undo().await, ClientError::Unavailable { action: "undo" });

    assert_ok!(store.redo().await);
    assert_eq!(store.get(&id).await.unwrap().content, BlockContent::Text("v2".into()));
    assert_err!(store.redo().await, ClientError::Unavailable { action: "redo" });
}

#[tokio::test]
async fn test_move_down_persists_order() {
    let (gateway, store) = seeded_store(three_blocks()).await;
    assert_ok!(store.move_block(&"B1".into(), Direction::Down).await);
    assert_order!(store, ["B2", "B1", "B3"]);
    assert_eq!(gateway.successful(GatewayOp::ReorderBlocks).len(), 1);
}

#[tokio::test]
async fn test_leave_clears_state() {
    let (_, store) = seeded_store(three_blocks()).await;
    assert_ok!(store.upsert_field(&"B1".into(), content("v1")).await);

    store.leave().await;
    assert!(store.blocks().await.is_empty());
    assert!(store.project_id().await.is_none());
    assert!(!store.can_undo().await);
    assert_err!(store.refresh().await, ClientError::NoActiveProject);
}
