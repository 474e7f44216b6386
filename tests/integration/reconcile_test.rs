//! Pending-change review scenarios

use crate::common::{list_block, seeded_store, text_block};
use pretty_assertions::assert_eq;
use std::time::Duration;
use structured_chat::client::{GatewayOp, Reconciler};
use structured_chat::shared::{BlockContent, BlockField, BlockId};

fn blocks() -> Vec<structured_chat::shared::ContextBlock> {
    vec![
        text_block("B1", "Notes", "old one"),
        text_block("B2", "Facts", "untouched"),
        text_block("B3", "Plan", "old three"),
    ]
}

#[tokio::test]
async fn test_propose_then_reject_round_trip() {
    let (gateway, store) = seeded_store(blocks()).await;
    let reconciler = Reconciler::new(store.clone());
    let id = BlockId::from("B1");

    assert_ok!(reconciler.propose(&id, "X").await);
    assert!(assert_ok!(reconciler.reject(&id).await));

    let block = store.get(&id).await.unwrap();
    assert_eq!(block.content, BlockContent::Text("old one".into()));
    assert!(block.pending_content.is_none());
    assert!(gateway.writes().is_empty());
}

#[tokio::test]
async fn test_propose_then_accept_round_trip() {
    let (gateway, store) = seeded_store(blocks()).await;
    let reconciler = Reconciler::new(store.clone());
    let id = BlockId::from("B1");

    assert_ok!(reconciler.propose(&id, "X").await);
    assert!(assert_ok!(reconciler.accept(&id).await));

    let block = store.get(&id).await.unwrap();
    assert_eq!(block.content, BlockContent::Text("X".into()));
    assert!(block.pending_content.is_none());

    let writes = gateway.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].content, Some(BlockContent::Text("X".into())));
}

#[tokio::test]
async fn test_accept_without_pending_writes_nothing() {
    let (gateway, store) = seeded_store(blocks()).await;
    let reconciler = Reconciler::new(store.clone());

    assert!(!assert_ok!(reconciler.accept(&"B2".into()).await));
    assert!(gateway.writes().is_empty());
    assert_eq!(store.history_len().await, 0);
}

#[tokio::test]
async fn test_accept_all_writes_pending_blocks_in_order() {
    let (gateway, store) = seeded_store(blocks()).await;
    let reconciler = Reconciler::new(store.clone());
    assert_ok!(reconciler.propose(&"B1".into(), "P1").await);
    assert_ok!(reconciler.propose(&"B3".into(), "P3").await);

    let report = reconciler.accept_all().await;
    assert!(report.is_complete());
    assert_eq!(report.accepted, vec![BlockId::from("B1"), BlockId::from("B3")]);

    let written: Vec<String> = gateway
        .writes()
        .iter()
        .filter_map(|call| call.block.as_ref().map(|b| b.to_string()))
        .collect();
    assert_eq!(written, vec!["B1", "B3"]);
    assert_eq!(store.history_len().await, 1);

    // The batch snapshot holds all three blocks; step past it and back.
    assert_ok!(
        store
            .upsert_field(&"B2".into(), BlockField::Content(BlockContent::Text("later".into())))
            .await
    );
    assert_ok!(store.undo().await);
    let contents: Vec<BlockContent> = store.blocks().await.into_iter().map(|b| b.content).collect();
    assert_eq!(
        contents,
        vec![
            BlockContent::Text("P1".into()),
            BlockContent::Text("untouched".into()),
            BlockContent::Text("P3".into()),
        ]
    );
}

#[tokio::test]
async fn test_accept_all_stops_at_first_failure() {
    let mut seeded = blocks();
    seeded.push(text_block("B4", "Extra", "old four"));
    let (gateway, store) = seeded_store(seeded).await;
    let reconciler = Reconciler::new(store.clone());
    for id in ["B1", "B3", "B4"] {
        assert_ok!(reconciler.propose(&id.into(), format!("new {}", id)).await);
    }
    gateway.fail_on_call(GatewayOp::UpdateBlock, 1);

    let report = reconciler.accept_all().await;
    assert_eq!(report.accepted, vec![BlockId::from("B1")]);
    let failure = report.failed.expect("second accept should fail");
    assert_eq!(failure.block_id, BlockId::from("B3"));
    assert!(failure.error.is_network());
    assert_eq!(report.remaining, vec![BlockId::from("B4")]);

    assert_eq!(
        store.pending_ids().await,
        vec![BlockId::from("B3"), BlockId::from("B4")]
    );
    assert_eq!(store.history_len().await, 1);
}

#[tokio::test]
async fn test_newer_proposal_survives_inflight_accept() {
    let (gateway, store) = seeded_store(blocks()).await;
    let reconciler = Reconciler::new(store.clone());
    let id = BlockId::from("B1");
    assert_ok!(reconciler.propose(&id, "first").await);
    gateway.delay_writes([Duration::from_millis(100)]);

    let accept = {
        let (reconciler, id) = (reconciler.clone(), id.clone());
        tokio::spawn(async move { reconciler.accept(&id).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_ok!(reconciler.propose(&id, "second").await);
    assert!(assert_ok!(accept.await.unwrap()));

    let block = store.get(&id).await.unwrap();
    assert_eq!(block.content, BlockContent::Text("first".into()));
    assert_eq!(block.pending_content.as_deref(), Some("second"));
}

#[tokio::test]
async fn test_accepted_list_proposal_becomes_items() {
    let (_, store) = seeded_store(vec![list_block("L1", "Todo", &["old"])]).await;
    let reconciler = Reconciler::new(store.clone());
    let id = BlockId::from("L1");

    assert_ok!(reconciler.propose(&id, "* buy milk\n* call Sam\n").await);
    assert_ok!(reconciler.accept(&id).await);
    assert_eq!(
        store.get(&id).await.unwrap().content,
        BlockContent::List(vec!["buy milk".into(), "call Sam".into()])
    );
}
