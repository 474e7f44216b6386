//! Backend Plugin Registry Types
//!
//! The backend keeps a registry of block plugins (`text`, `code`, ...). Each
//! entry carries a free-form JSON `config` that the client passes through
//! untouched.
//!
//! # Wire Format
//!
//! ```json
//! { "id": "pl-1", "name": "Code", "type": "code", "config": { "language": "rust" } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Plugin type the backend always provides; it cannot be removed
pub const BUILTIN_PLUGIN_TYPE: &str = "text";

/// Opaque plugin identifier assigned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PluginId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A registered plugin as served by `GET /plugins`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: PluginId,
    pub name: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    #[serde(default)]
    pub config: Value,
}

impl PluginInfo {
    pub fn is_builtin(&self) -> bool {
        self.plugin_type == BUILTIN_PLUGIN_TYPE
    }
}

/// Request body for `POST /plugins`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlugin {
    pub name: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub config: Value,
}

impl NewPlugin {
    pub fn new(name: impl Into<String>, plugin_type: impl Into<String>, config: Value) -> Self {
        Self {
            name: name.into(),
            plugin_type: plugin_type.into(),
            config,
        }
    }

    pub fn into_info(self, id: PluginId) -> PluginInfo {
        PluginInfo {
            id,
            name: self.name,
            plugin_type: self.plugin_type,
            config: self.config,
        }
    }
}
