//! Project orchestration scenarios

use crate::common::{seeded_workspace, text_block, three_blocks};
use std::sync::Arc;
use std::time::Duration;
use structured_chat::client::{AssistOutcome, GatewayOp, MemoryGateway, Workspace};
use structured_chat::shared::{BlockContent, BlockId, BlockType, ClientError};

#[tokio::test]
async fn test_project_lifecycle() {
    let gateway = Arc::new(MemoryGateway::new());
    let workspace = Workspace::new(gateway.clone(), 10);

    let first = assert_ok!(workspace.create_project("First").await);
    let second = assert_ok!(workspace.create_project("Second").await);
    assert_eq!(workspace.active_project_id().await, Some(second.id.clone()));

    let renamed = assert_ok!(workspace.rename_project(&first.id, "Renamed").await);
    assert_eq!(renamed.name, "Renamed");
    let names: Vec<String> = workspace.projects().await.into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Renamed", "Second"]);

    // Deleting an inactive project keeps the selection.
    assert_ok!(workspace.delete_project(&first.id).await);
    assert_eq!(workspace.active_project_id().await, Some(second.id.clone()));

    assert_ok!(workspace.refresh_projects().await);
    assert_eq!(workspace.projects().await.len(), 1);
}

#[tokio::test]
async fn test_stale_block_load_is_dropped() {
    let harness = seeded_workspace(three_blocks()).await;
    let other = harness.gateway.add_project("Other");
    harness
        .gateway
        .set_blocks(&other.id, vec![text_block("O1", "Elsewhere", "x")]);
    harness
        .gateway
        .delay(GatewayOp::ListBlocks, [Duration::from_millis(100)]);

    let slow = {
        let workspace = harness.workspace.clone();
        let id = harness.project.id.clone();
        tokio::spawn(async move { workspace.select_project(&id).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_ok!(harness.workspace.select_project(&other.id).await);

    assert_err!(slow.await.unwrap(), ClientError::Stale { .. });
    assert_eq!(harness.workspace.active_project_id().await, Some(other.id));
    let ids: Vec<String> = harness
        .workspace
        .blocks()
        .await
        .iter()
        .map(|b| b.id.to_string())
        .collect();
    assert_eq!(ids, vec!["O1"]);
}

#[tokio::test]
async fn test_failed_block_load_leaves_store_empty() {
    let harness = seeded_workspace(three_blocks()).await;
    harness.gateway.fail_next(GatewayOp::ListBlocks);

    assert_err!(
        harness.workspace.select_project(&harness.project.id).await,
        ClientError::Network { .. }
    );
    assert!(harness.workspace.blocks().await.is_empty());
    assert_eq!(
        harness.workspace.active_project_id().await,
        Some(harness.project.id.clone())
    );
}

#[tokio::test]
async fn test_improve_creates_reviewable_proposal() {
    let harness = seeded_workspace(three_blocks()).await;
    let id = BlockId::from("B2");

    let outcome = assert_ok!(harness.workspace.improve_content(&id).await);
    assert_eq!(outcome, AssistOutcome::Proposed("second\n\nImproved.".into()));
    assert!(harness.gateway.writes().is_empty());

    let spans = assert_ok!(harness.workspace.diff(&id, Default::default()).await).unwrap();
    assert!(!spans.is_empty());

    assert_err!(
        harness.workspace.edit_content(&id, BlockContent::Text("typed".into())).await,
        ClientError::PendingReview { .. }
    );
    assert!(assert_ok!(harness.workspace.accept(&id).await));
    assert_eq!(
        harness.workspace.store().get(&id).await.unwrap().content,
        BlockContent::Text("second\n\nImproved.".into())
    );
}

#[tokio::test]
async fn test_generate_into_empty_list_block() {
    let harness = seeded_workspace(Vec::new()).await;
    let block = assert_ok!(harness.workspace.create_block("Steps", BlockType::List).await);
    harness.gateway.script_generation("- plan\n- build\n- ship");

    let outcome = assert_ok!(harness.workspace.generate_content(&block.id).await);
    assert!(matches!(outcome, AssistOutcome::Written(_)));
    assert_eq!(
        harness.workspace.store().get(&block.id).await.unwrap().content,
        BlockContent::List(vec!["plan".into(), "build".into(), "ship".into()])
    );
}

#[tokio::test]
async fn test_assist_failure_changes_nothing() {
    let harness = seeded_workspace(three_blocks()).await;
    harness.gateway.fail_next(GatewayOp::FixContent);

    assert_err!(
        harness.workspace.fix_content(&"B1".into()).await,
        ClientError::Network { .. }
    );
    assert!(harness.workspace.store().pending_ids().await.is_empty());
}

#[tokio::test]
async fn test_commands_need_a_project() {
    let workspace = Workspace::new(Arc::new(MemoryGateway::new()), 10);
    assert_err!(
        workspace.create_block("Notes", BlockType::Text).await,
        ClientError::NoActiveProject
    );
    assert_err!(workspace.send_message("hi").await, ClientError::NoActiveProject);
    assert_err!(
        workspace.generate_content(&"B1".into()).await,
        ClientError::NoActiveProject
    );
}

#[tokio::test]
async fn test_accept_all_interrupted_by_project_switch() {
    let harness = seeded_workspace(three_blocks()).await;
    let other = harness.gateway.add_project("Other");
    harness
        .gateway
        .set_blocks(&other.id, vec![text_block("O1", "Elsewhere", "x")]);
    assert_ok!(harness.workspace.reconciler().propose(&"B1".into(), "P1").await);
    assert_ok!(harness.workspace.reconciler().propose(&"B3".into(), "P3").await);
    harness
        .gateway
        .delay_writes([Duration::ZERO, Duration::from_millis(150)]);

    let batch = {
        let workspace = harness.workspace.clone();
        tokio::spawn(async move { workspace.accept_all().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_ok!(harness.workspace.select_project(&other.id).await);

    let report = batch.await.unwrap();
    assert_eq!(report.accepted, vec![BlockId::from("B1")]);
    let failure = report.failed.expect("second accept lands after the switch");
    assert!(failure.error.is_stale());

    let store = harness.workspace.store();
    assert_eq!(store.history_len().await, 0);
    assert!(!store.can_undo().await);
    assert_eq!(store.order().await, vec![BlockId::from("O1")]);
}

#[tokio::test]
async fn test_rename_landing_after_switch_records_nothing() {
    let harness = seeded_workspace(three_blocks()).await;
    let other = harness.gateway.add_project("Other");
    harness
        .gateway
        .set_blocks(&other.id, vec![text_block("O1", "Elsewhere", "x")]);
    harness.gateway.delay_writes([Duration::from_millis(100)]);

    let rename = {
        let workspace = harness.workspace.clone();
        tokio::spawn(async move { workspace.rename_block(&"B1".into(), "Late").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_ok!(harness.workspace.select_project(&other.id).await);

    assert_err!(rename.await.unwrap(), ClientError::Stale { .. });
    assert_eq!(harness.workspace.store().history_len().await, 0);
    assert_eq!(harness.workspace.blocks().await[0].title, "Elsewhere");
}
