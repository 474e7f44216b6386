//! # In-Memory Gateway
//!
//! A process-local backend implementing [`Gateway`]. It keeps projects, blocks,
//! chat history and the plugin registry in memory, assigns uuid ids, and records every call it
//! receives. Used by the CLI's `--offline` mode and throughout the test suite.
//!
//! ## Scripting
//!
//! - [`MemoryGateway::fail_next`] / [`MemoryGateway::fail_on_call`] inject a
//!   network failure into a future call of one operation.
//! - [`MemoryGateway::script_reply`] queues chat replies; otherwise the chat
//!   endpoint echoes the message with no context updates.
//! - [`MemoryGateway::delay`] queues latencies for the block and chat
//!   operations, so tests can overlap in-flight requests.

use crate::client::gateway::Gateway;
use crate::shared::block::{BlockContent, BlockId, ContextBlock, NewBlockRequest};
use crate::shared::chat::{ChatMessage, ChatReply};
use crate::shared::error::{ClientError, Result};
use crate::shared::plugin::{NewPlugin, PluginId, PluginInfo};
use crate::shared::project::{Project, ProjectId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// Gateway operations, used for failure injection and the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    ListProjects,
    CreateProject,
    RenameProject,
    DeleteProject,
    ListBlocks,
    CreateBlock,
    UpdateBlock,
    DeleteBlock,
    ReorderBlocks,
    ChatHistory,
    ClearChatHistory,
    SendChat,
    GenerateContent,
    FixContent,
    ListPlugins,
    AddPlugin,
    RemovePlugin,
}

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCall {
    pub op: GatewayOp,
    pub project: Option<ProjectId>,
    pub block: Option<BlockId>,
    /// Content written by `update_block`
    pub content: Option<BlockContent>,
    pub succeeded: bool,
}

#[derive(Debug, Default)]
struct ProjectRecord {
    project: Option<Project>,
    blocks: Vec<ContextBlock>,
    chat: Vec<ChatMessage>,
}

#[derive(Debug, Default)]
struct Backend {
    order: Vec<ProjectId>,
    projects: HashMap<ProjectId, ProjectRecord>,
    plugins: Vec<PluginInfo>,
}

impl Backend {
    fn record(&mut self, id: &ProjectId) -> Result<&mut ProjectRecord> {
        self.projects
            .get_mut(id)
            .ok_or_else(|| ClientError::project_not_found(id))
    }
}

/// In-process `Gateway` implementation
#[derive(Debug, Default)]
pub struct MemoryGateway {
    backend: Mutex<Backend>,
    calls: Mutex<Vec<GatewayCall>>,
    /// Per operation: one entry per upcoming call, `true` meaning "fail it"
    failures: Mutex<HashMap<GatewayOp, VecDeque<bool>>>,
    replies: Mutex<VecDeque<ChatReply>>,
    generations: Mutex<VecDeque<String>>,
    latencies: Mutex<HashMap<GatewayOp, VecDeque<Duration>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a project directly in the backend
    pub fn add_project(&self, name: &str) -> Project {
        let project = Project {
            id: ProjectId::new(new_id()),
            name: name.to_string(),
        };
        let mut backend = lock(&self.backend);
        backend.order.push(project.id.clone());
        backend.projects.insert(
            project.id.clone(),
            ProjectRecord {
                project: Some(project.clone()),
                ..ProjectRecord::default()
            },
        );
        project
    }

    /// Replace a project's blocks in the backend
    pub fn set_blocks(&self, project: &ProjectId, blocks: Vec<ContextBlock>) {
        let mut backend = lock(&self.backend);
        if let Some(record) = backend.projects.get_mut(project) {
            record.blocks = blocks;
        }
    }

    /// Blocks as the backend currently stores them
    pub fn blocks(&self, project: &ProjectId) -> Vec<ContextBlock> {
        lock(&self.backend)
            .projects
            .get(project)
            .map(|record| record.blocks.clone())
            .unwrap_or_default()
    }

    /// Chat history as the backend currently stores it
    pub fn chat(&self, project: &ProjectId) -> Vec<ChatMessage> {
        lock(&self.backend)
            .projects
            .get(project)
            .map(|record| record.chat.clone())
            .unwrap_or_default()
    }

    /// Plugin registry as the backend currently stores it
    pub fn plugins(&self) -> Vec<PluginInfo> {
        lock(&self.backend).plugins.clone()
    }

    /// Fail the next call of `op`
    pub fn fail_next(&self, op: GatewayOp) {
        self.fail_on_call(op, 0);
    }

    /// Let the next `successes` calls of `op` through, then fail one
    pub fn fail_on_call(&self, op: GatewayOp, successes: usize) {
        let mut failures = lock(&self.failures);
        let plan = failures.entry(op).or_default();
        plan.extend(std::iter::repeat(false).take(successes));
        plan.push_back(true);
    }

    /// Queue the reply for the next chat call
    pub fn script_reply(&self, reply: ChatReply) {
        lock(&self.replies).push_back(reply);
    }

    /// Queue the result of the next generate/fix call
    pub fn script_generation(&self, content: impl Into<String>) {
        lock(&self.generations).push_back(content.into());
    }

    /// Queue latencies for upcoming calls of `op`
    pub fn delay(&self, op: GatewayOp, latencies: impl IntoIterator<Item = Duration>) {
        lock(&self.latencies).entry(op).or_default().extend(latencies);
    }

    /// Queue latencies for upcoming `update_block` calls
    pub fn delay_writes(&self, latencies: impl IntoIterator<Item = Duration>) {
        self.delay(GatewayOp::UpdateBlock, latencies);
    }

    async fn wait(&self, op: GatewayOp) {
        let latency = lock(&self.latencies).get_mut(&op).and_then(VecDeque::pop_front);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Every call received so far, in completion order
    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.calls).clone()
    }

    /// Successful calls of one operation
    pub fn successful(&self, op: GatewayOp) -> Vec<GatewayCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.op == op && call.succeeded)
            .cloned()
            .collect()
    }

    /// Successful `update_block` calls
    pub fn writes(&self) -> Vec<GatewayCall> {
        self.successful(GatewayOp::UpdateBlock)
    }

    fn should_fail(&self, op: GatewayOp) -> bool {
        lock(&self.failures)
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
            .unwrap_or(false)
    }

    fn log(
        &self,
        op: GatewayOp,
        project: Option<&ProjectId>,
        block: Option<&BlockId>,
        content: Option<&BlockContent>,
        succeeded: bool,
    ) {
        lock(&self.calls).push(GatewayCall {
            op,
            project: project.cloned(),
            block: block.cloned(),
            content: content.cloned(),
            succeeded,
        });
    }

    /// Run `f` against the backend unless a failure is scheduled for `op`
    fn run<T>(
        &self,
        op: GatewayOp,
        project: Option<&ProjectId>,
        block: Option<&BlockId>,
        f: impl FnOnce(&mut Backend) -> Result<T>,
    ) -> Result<T> {
        if self.should_fail(op) {
            self.log(op, project, block, None, false);
            return Err(ClientError::network(format!("injected failure for {:?}", op)));
        }
        let result = f(&mut lock(&self.backend));
        self.log(op, project, block, None, result.is_ok());
        result
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.run(GatewayOp::ListProjects, None, None, |backend| {
            Ok(backend
                .order
                .iter()
                .filter_map(|id| backend.projects.get(id))
                .filter_map(|record| record.project.clone())
                .collect())
        })
    }

    async fn create_project(&self, name: &str) -> Result<Project> {
        if self.should_fail(GatewayOp::CreateProject) {
            self.log(GatewayOp::CreateProject, None, None, None, false);
            return Err(ClientError::network("injected failure for CreateProject"));
        }
        let project = self.add_project(name);
        self.log(GatewayOp::CreateProject, Some(&project.id), None, None, true);
        Ok(project)
    }

    async fn rename_project(&self, project: &ProjectId, name: &str) -> Result<Project> {
        self.run(GatewayOp::RenameProject, Some(project), None, |backend| {
            let record = backend.record(project)?;
            let renamed = Project {
                id: project.clone(),
                name: name.to_string(),
            };
            record.project = Some(renamed.clone());
            Ok(renamed)
        })
    }

    async fn delete_project(&self, project: &ProjectId) -> Result<()> {
        self.run(GatewayOp::DeleteProject, Some(project), None, |backend| {
            backend
                .projects
                .remove(project)
                .ok_or_else(|| ClientError::project_not_found(project))?;
            backend.order.retain(|id| id != project);
            Ok(())
        })
    }

    async fn list_blocks(&self, project: &ProjectId) -> Result<Vec<ContextBlock>> {
        self.wait(GatewayOp::ListBlocks).await;
        self.run(GatewayOp::ListBlocks, Some(project), None, |backend| {
            Ok(backend.record(project)?.blocks.clone())
        })
    }

    async fn create_block(
        &self,
        project: &ProjectId,
        draft: NewBlockRequest,
    ) -> Result<ContextBlock> {
        self.run(GatewayOp::CreateBlock, Some(project), None, |backend| {
            let record = backend.record(project)?;
            let block = draft.into_block(BlockId::new(new_id()));
            record.blocks.push(block.clone());
            Ok(block)
        })
    }

    async fn update_block(&self, project: &ProjectId, block: &ContextBlock) -> Result<()> {
        self.wait(GatewayOp::UpdateBlock).await;
        if self.should_fail(GatewayOp::UpdateBlock) {
            self.log(GatewayOp::UpdateBlock, Some(project), Some(&block.id), Some(&block.content), false);
            return Err(ClientError::network("injected failure for UpdateBlock"));
        }
        let result = {
            let mut backend = lock(&self.backend);
            backend.record(project).and_then(|record| {
                let stored = record
                    .blocks
                    .iter_mut()
                    .find(|b| b.id == block.id)
                    .ok_or_else(|| ClientError::block_not_found(&block.id))?;
                stored.title = block.title.clone();
                stored.content = block.content.clone();
                stored.is_collapsed = block.is_collapsed;
                stored.pending_content = None;
                Ok(())
            })
        };
        self.log(
            GatewayOp::UpdateBlock,
            Some(project),
            Some(&block.id),
            Some(&block.content),
            result.is_ok(),
        );
        result
    }

    async fn delete_block(&self, project: &ProjectId, block: &BlockId) -> Result<()> {
        self.run(GatewayOp::DeleteBlock, Some(project), Some(block), |backend| {
            let record = backend.record(project)?;
            let before = record.blocks.len();
            record.blocks.retain(|b| &b.id != block);
            if record.blocks.len() == before {
                return Err(ClientError::block_not_found(block));
            }
            Ok(())
        })
    }

    async fn reorder_blocks(&self, project: &ProjectId, order: &[BlockId]) -> Result<()> {
        self.wait(GatewayOp::ReorderBlocks).await;
        self.run(GatewayOp::ReorderBlocks, Some(project), None, |backend| {
            let record = backend.record(project)?;
            let known: HashSet<&BlockId> = record.blocks.iter().map(|b| &b.id).collect();
            let requested: HashSet<&BlockId> = order.iter().collect();
            if known != requested || order.len() != record.blocks.len() {
                return Err(ClientError::http_status(400, "Block ids do not match project"));
            }
            let mut by_id: HashMap<BlockId, ContextBlock> = record
                .blocks
                .drain(..)
                .map(|b| (b.id.clone(), b))
                .collect();
            record.blocks = order.iter().filter_map(|id| by_id.remove(id)).collect();
            Ok(())
        })
    }

    async fn chat_history(&self, project: &ProjectId) -> Result<Vec<ChatMessage>> {
        self.run(GatewayOp::ChatHistory, Some(project), None, |backend| {
            Ok(backend.record(project)?.chat.clone())
        })
    }

    async fn clear_chat_history(&self, project: &ProjectId) -> Result<()> {
        self.run(GatewayOp::ClearChatHistory, Some(project), None, |backend| {
            backend.record(project)?.chat.clear();
            Ok(())
        })
    }

    async fn send_chat(&self, project: &ProjectId, message: &str) -> Result<ChatReply> {
        self.wait(GatewayOp::SendChat).await;
        let scripted = lock(&self.replies).pop_front();
        self.run(GatewayOp::SendChat, Some(project), None, |backend| {
            let record = backend.record(project)?;
            let reply = scripted.unwrap_or_else(|| ChatReply {
                response: format!("Received: {}", message),
                context_updates: Vec::new(),
            });
            record.chat.push(ChatMessage::user(message));
            record.chat.push(ChatMessage::assistant(
                reply.response.clone(),
                reply.context_updates.clone(),
            ));
            Ok(reply)
        })
    }

    async fn generate_content(
        &self,
        project: &ProjectId,
        block: &BlockId,
        content: &str,
    ) -> Result<String> {
        let scripted = lock(&self.generations).pop_front();
        self.run(GatewayOp::GenerateContent, Some(project), Some(block), |backend| {
            let record = backend.record(project)?;
            let stored = record
                .blocks
                .iter()
                .find(|b| &b.id == block)
                .ok_or_else(|| ClientError::block_not_found(block))?;
            Ok(scripted.unwrap_or_else(|| {
                if content.is_empty() {
                    format!("Generated content for {}", stored.title)
                } else {
                    format!("{}\n\nImproved.", content)
                }
            }))
        })
    }

    async fn fix_content(
        &self,
        project: &ProjectId,
        block: &BlockId,
        content: &str,
    ) -> Result<String> {
        let scripted = lock(&self.generations).pop_front();
        self.run(GatewayOp::FixContent, Some(project), Some(block), |backend| {
            let record = backend.record(project)?;
            if !record.blocks.iter().any(|b| &b.id == block) {
                return Err(ClientError::block_not_found(block));
            }
            Ok(scripted.unwrap_or_else(|| content.trim().to_string()))
        })
    }

    async fn list_plugins(&self) -> Result<Vec<PluginInfo>> {
        self.run(GatewayOp::ListPlugins, None, None, |backend| Ok(backend.plugins.clone()))
    }

    async fn add_plugin(&self, plugin: &NewPlugin) -> Result<()> {
        self.run(GatewayOp::AddPlugin, None, None, |backend| {
            backend
                .plugins
                .push(plugin.clone().into_info(PluginId::new(new_id())));
            Ok(())
        })
    }

    async fn remove_plugin(&self, plugin: &PluginId) -> Result<()> {
        self.run(GatewayOp::RemovePlugin, None, None, |backend| {
            let before = backend.plugins.len();
            backend.plugins.retain(|p| &p.id != plugin);
            if backend.plugins.len() == before {
                return Err(ClientError::plugin_not_found(plugin));
            }
            Ok(())
        })
    }
}
