//! Chat session scenarios

use crate::common::{seeded_workspace, text_block, three_blocks};
use std::time::Duration;
use structured_chat::client::GatewayOp;
use structured_chat::shared::{BlockId, ChatReply, ChatRole, ClientError, ContextUpdate};

#[tokio::test]
async fn test_reply_updates_become_proposals() {
    let harness = seeded_workspace(vec![text_block("B1", "Notes", "raw notes")]).await;
    harness.gateway.script_reply(ChatReply {
        response: "ok".into(),
        context_updates: vec![ContextUpdate {
            block_id: BlockId::from("B1"),
            block_title: "Notes".into(),
            new_content: "A tidy summary".into(),
        }],
    });
    let before = harness.workspace.messages().await.len();

    let outcome = assert_ok!(harness.workspace.send_message("summarize X").await);
    assert_eq!(outcome.proposed, vec![BlockId::from("B1")]);

    let block = harness.workspace.store().get(&"B1".into()).await.unwrap();
    assert_eq!(block.pending_content.as_deref(), Some("A tidy summary"));

    let messages = harness.workspace.messages().await;
    assert_eq!(messages.len(), before + 2);
    assert_eq!(messages[before].role, ChatRole::User);
    assert_eq!(messages[before].content, "summarize X");
    let assistant = &messages[before + 1];
    assert_eq!(assistant.role, ChatRole::Assistant);
    assert_eq!(assistant.context_updates.as_ref().map(Vec::len), Some(1));
    assert_contains!(assistant.update_summary().unwrap(), "\"Notes\"");
}

#[tokio::test]
async fn test_history_loads_on_select() {
    let harness = seeded_workspace(three_blocks()).await;
    assert_ok!(harness.workspace.send_message("first").await);
    assert_ok!(harness.workspace.send_message("second").await);

    assert_ok!(harness.workspace.select_project(&harness.project.id).await);
    let contents: Vec<String> = harness
        .workspace
        .messages()
        .await
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(
        contents,
        vec!["first", "Received: first", "second", "Received: second"]
    );
}

#[tokio::test]
async fn test_send_failure_surfaces_system_message() {
    let harness = seeded_workspace(three_blocks()).await;
    harness.gateway.fail_next(GatewayOp::SendChat);

    assert_err!(
        harness.workspace.send_message("hello").await,
        ClientError::Network { .. }
    );
    let last = harness.workspace.messages().await.pop().unwrap();
    assert_eq!(last.role, ChatRole::System);
    assert_contains!(last.content, "Failed to get a response");
}

#[tokio::test]
async fn test_reply_after_project_switch_is_dropped() {
    let harness = seeded_workspace(three_blocks()).await;
    let other = harness.gateway.add_project("Other");
    harness.gateway.script_reply(ChatReply {
        response: "late".into(),
        context_updates: vec![ContextUpdate {
            block_id: BlockId::from("B1"),
            block_title: "Notes".into(),
            new_content: "should not land".into(),
        }],
    });
    harness
        .gateway
        .delay(GatewayOp::SendChat, [Duration::from_millis(100)]);

    let send = {
        let workspace = harness.workspace.clone();
        tokio::spawn(async move { workspace.send_message("slow question").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_ok!(harness.workspace.select_project(&other.id).await);

    assert_err!(send.await.unwrap(), ClientError::Stale { .. });
    assert!(harness.workspace.messages().await.is_empty());
    assert!(harness.workspace.blocks().await.is_empty());
}

#[tokio::test]
async fn test_clear_chat() {
    let harness = seeded_workspace(three_blocks()).await;
    assert_ok!(harness.workspace.send_message("hello").await);
    assert_ok!(harness.workspace.clear_chat().await);
    assert!(harness.workspace.messages().await.is_empty());
    assert!(harness.gateway.chat(&harness.project.id).is_empty());
}
