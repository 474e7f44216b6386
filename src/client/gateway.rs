//! # Remote Resource Gateway
//!
//! Thin client over the backend's REST endpoints. The rest of the client core
//! only sees the [`Gateway`] trait, so the HTTP implementation can be swapped
//! for [`MemoryGateway`](crate::client::memory::MemoryGateway) in offline mode
//! and in tests.
//!
//! ## Endpoints
//!
//! | Operation            | Request                                              |
//! |----------------------|------------------------------------------------------|
//! | `list_projects`      | `GET /projects`                                      |
//! | `create_project`     | `POST /projects {name}`                              |
//! | `rename_project`     | `PUT /projects/{id} {name}`                          |
//! | `delete_project`     | `DELETE /projects/{id}`                              |
//! | `list_blocks`        | `GET /projects/{id}/context_blocks`                  |
//! | `create_block`       | `POST /projects/{id}/context_blocks`                 |
//! | `update_block`       | `PUT /projects/{id}/context_blocks/{blockId}`        |
//! | `delete_block`       | `DELETE /projects/{id}/context_blocks/{blockId}`     |
//! | `reorder_blocks`     | `PUT /projects/{id}/reorder_blocks {blocks}`         |
//! | `chat_history`       | `GET /projects/{id}/chat_history`                    |
//! | `clear_chat_history` | `DELETE /projects/{id}/chat_history`                 |
//! | `send_chat`          | `POST /projects/{id}/chat {message}`                 |
//! | `generate_content`   | `POST /projects/{id}/generate_content`               |
//! | `fix_content`        | `POST /projects/{id}/fix_content`                    |
//! | `list_plugins`       | `GET /plugins`                                       |
//! | `add_plugin`         | `POST /plugins {name, type, config}`                 |
//! | `remove_plugin`      | `DELETE /plugins/{pluginId}`                         |

use crate::client::config::Config;
use crate::shared::block::{
    BlockId, ContextBlock, NewBlockRequest, ReorderRequest, UpdateBlockRequest,
};
use crate::shared::chat::{
    ChatMessage, ChatReply, ChatRequest, ContentRequest, FixedContent, GeneratedContent,
};
use crate::shared::error::{ClientError, Result};
use crate::shared::plugin::{NewPlugin, PluginId, PluginInfo};
use crate::shared::project::{Project, ProjectId, ProjectNameRequest};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Remote operations the client core depends on
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn create_project(&self, name: &str) -> Result<Project>;
    async fn rename_project(&self, project: &ProjectId, name: &str) -> Result<Project>;
    async fn delete_project(&self, project: &ProjectId) -> Result<()>;

    async fn list_blocks(&self, project: &ProjectId) -> Result<Vec<ContextBlock>>;
    async fn create_block(&self, project: &ProjectId, draft: NewBlockRequest)
        -> Result<ContextBlock>;
    /// Persist the block's title, content, type and collapse flag
    async fn update_block(&self, project: &ProjectId, block: &ContextBlock) -> Result<()>;
    async fn delete_block(&self, project: &ProjectId, block: &BlockId) -> Result<()>;
    async fn reorder_blocks(&self, project: &ProjectId, order: &[BlockId]) -> Result<()>;

    async fn chat_history(&self, project: &ProjectId) -> Result<Vec<ChatMessage>>;
    async fn clear_chat_history(&self, project: &ProjectId) -> Result<()>;
    async fn send_chat(&self, project: &ProjectId, message: &str) -> Result<ChatReply>;

    async fn generate_content(
        &self,
        project: &ProjectId,
        block: &BlockId,
        content: &str,
    ) -> Result<String>;
    async fn fix_content(&self, project: &ProjectId, block: &BlockId, content: &str)
        -> Result<String>;

    async fn list_plugins(&self) -> Result<Vec<PluginInfo>>;
    /// Register a plugin; the response body is not relied on
    async fn add_plugin(&self, plugin: &NewPlugin) -> Result<()>;
    async fn remove_plugin(&self, plugin: &PluginId) -> Result<()>;
}

/// Resource a request refers to, used to turn a 404 into `NotFound`
enum Target<'a> {
    Collection,
    Project(&'a ProjectId),
    Block(&'a BlockId),
    Plugin(&'a PluginId),
}

/// Response of `create_block`: a full block, or just the assigned id
#[derive(Deserialize)]
#[serde(untagged)]
enum CreatedBlock {
    Full(ContextBlock),
    IdOnly { id: BlockId },
}

/// `Gateway` over HTTP/JSON
#[derive(Debug, Clone)]
pub struct HttpGateway {
    config: Config,
    client: Client,
}

impl HttpGateway {
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        self.config.api_url(path)
    }

    async fn execute(&self, request: RequestBuilder, target: Target<'_>) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("[GATEWAY] Request failed: {}", e);
            ClientError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());
        tracing::warn!("[GATEWAY] Request failed: {} - {}", status, error_text);

        Err(match (status, target) {
            (StatusCode::NOT_FOUND, Target::Project(id)) => ClientError::project_not_found(id),
            (StatusCode::NOT_FOUND, Target::Block(id)) => ClientError::block_not_found(id),
            (StatusCode::NOT_FOUND, Target::Plugin(id)) => ClientError::plugin_not_found(id),
            _ => ClientError::http_status(
                status.as_u16(),
                format!("Request failed: {} - {}", status, error_text),
            ),
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder, target: Target<'_>) -> Result<T> {
        let response = self.execute(request, target).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::serialization(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let request = self.client.get(self.url("/projects"));
        self.json(request, Target::Collection).await
    }

    async fn create_project(&self, name: &str) -> Result<Project> {
        let body = ProjectNameRequest {
            name: name.to_string(),
        };
        let request = self.client.post(self.url("/projects")).json(&body);
        self.json(request, Target::Collection).await
    }

    async fn rename_project(&self, project: &ProjectId, name: &str) -> Result<Project> {
        let body = ProjectNameRequest {
            name: name.to_string(),
        };
        let request = self
            .client
            .put(self.url(&format!("/projects/{}", project)))
            .json(&body);
        self.json(request, Target::Project(project)).await
    }

    async fn delete_project(&self, project: &ProjectId) -> Result<()> {
        let request = self.client.delete(self.url(&format!("/projects/{}", project)));
        self.execute(request, Target::Project(project)).await?;
        Ok(())
    }

    async fn list_blocks(&self, project: &ProjectId) -> Result<Vec<ContextBlock>> {
        let request = self
            .client
            .get(self.url(&format!("/projects/{}/context_blocks", project)));
        self.json(request, Target::Project(project)).await
    }

    async fn create_block(
        &self,
        project: &ProjectId,
        draft: NewBlockRequest,
    ) -> Result<ContextBlock> {
        let request = self
            .client
            .post(self.url(&format!("/projects/{}/context_blocks", project)))
            .json(&draft);
        match self.json::<CreatedBlock>(request, Target::Project(project)).await? {
            CreatedBlock::Full(block) => Ok(block),
            CreatedBlock::IdOnly { id } => Ok(draft.into_block(id)),
        }
    }

    async fn update_block(&self, project: &ProjectId, block: &ContextBlock) -> Result<()> {
        let body = UpdateBlockRequest::from(block);
        let request = self
            .client
            .put(self.url(&format!("/projects/{}/context_blocks/{}", project, block.id)))
            .json(&body);
        self.execute(request, Target::Block(&block.id)).await?;
        Ok(())
    }

    async fn delete_block(&self, project: &ProjectId, block: &BlockId) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/projects/{}/context_blocks/{}", project, block)));
        self.execute(request, Target::Block(block)).await?;
        Ok(())
    }

    async fn reorder_blocks(&self, project: &ProjectId, order: &[BlockId]) -> Result<()> {
        let body = ReorderRequest {
            blocks: order.to_vec(),
        };
        let request = self
            .client
            .put(self.url(&format!("/projects/{}/reorder_blocks", project)))
            .json(&body);
        self.execute(request, Target::Project(project)).await?;
        Ok(())
    }

    async fn chat_history(&self, project: &ProjectId) -> Result<Vec<ChatMessage>> {
        let request = self
            .client
            .get(self.url(&format!("/projects/{}/chat_history", project)));
        self.json(request, Target::Project(project)).await
    }

    async fn clear_chat_history(&self, project: &ProjectId) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/projects/{}/chat_history", project)));
        self.execute(request, Target::Project(project)).await?;
        Ok(())
    }

    async fn send_chat(&self, project: &ProjectId, message: &str) -> Result<ChatReply> {
        let body = ChatRequest {
            message: message.to_string(),
        };
        let request = self
            .client
            .post(self.url(&format!("/projects/{}/chat", project)))
            .json(&body);
        self.json(request, Target::Project(project)).await
    }

    async fn generate_content(
        &self,
        project: &ProjectId,
        block: &BlockId,
        content: &str,
    ) -> Result<String> {
        let body = ContentRequest {
            block_id: block.clone(),
            content: content.to_string(),
        };
        let request = self
            .client
            .post(self.url(&format!("/projects/{}/generate_content", project)))
            .json(&body);
        let generated: GeneratedContent = self.json(request, Target::Block(block)).await?;
        Ok(generated.content)
    }

    async fn fix_content(
        &self,
        project: &ProjectId,
        block: &BlockId,
        content: &str,
    ) -> Result<String> {
        let body = ContentRequest {
            block_id: block.clone(),
            content: content.to_string(),
        };
        let request = self
            .client
            .post(self.url(&format!("/projects/{}/fix_content", project)))
            .json(&body);
        let fixed: FixedContent = self.json(request, Target::Block(block)).await?;
        Ok(fixed.fixed_content)
    }

    async fn list_plugins(&self) -> Result<Vec<PluginInfo>> {
        let request = self.client.get(self.url("/plugins"));
        self.json(request, Target::Collection).await
    }

    async fn add_plugin(&self, plugin: &NewPlugin) -> Result<()> {
        let request = self.client.post(self.url("/plugins")).json(plugin);
        self.execute(request, Target::Collection).await?;
        Ok(())
    }

    async fn remove_plugin(&self, plugin: &PluginId) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/plugins/{}", plugin)));
        self.execute(request, Target::Plugin(plugin)).await?;
        Ok(())
    }
}
