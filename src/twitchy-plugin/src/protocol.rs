//! Line-delimited JSON protocol spoken with the launcher host.
//!
//! The host writes one [`PluginRequest`] per line to the plugin's stdin and
//! reads one [`PluginResponse`] per line from its stdout. Responses carry the
//! id of the request they answer.

use serde::{Deserialize, Serialize};
use twitchy_core::models::{Action, DisplayItem, ItemContext};

/// Protocol version for compatibility checking.
pub const PROTOCOL_VERSION: u32 = 1;

/// Request sent from the host to the plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRequest {
    /// Unique request ID for correlation.
    pub id: u64,
    pub method: PluginMethod,
}

/// Response from the plugin to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginResponse {
    /// Request ID this response correlates to, 0 when the request was unreadable.
    pub id: u64,
    pub result: PluginResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum PluginMethod {
    /// Check credentials and open a session.
    Initialize,
    /// Run a search for the raw text typed by the user.
    Query { query: String },
    /// Secondary actions for a selected item.
    ContextMenu { context: ItemContext },
    /// Run the action bound to an item the user activated.
    Invoke { action: Action },
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum PluginResult {
    Initialized(PluginInfo),
    Items { items: Vec<DisplayItem> },
    Invoked(InvokeOutcome),
    ShutdownAck,
    Error(PluginError),
}

/// Plugin metadata returned after Initialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub protocol_version: u32,
    /// Whether the credential check produced a usable session.
    pub authenticated: bool,
}

/// What happened when an item's action ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeOutcome {
    /// Items to show in place of the current results, usually an error.
    #[serde(default)]
    pub items: Vec<DisplayItem>,
    /// The host should run the current query again.
    #[serde(default)]
    pub requery: bool,
}

impl InvokeOutcome {
    pub fn done() -> Self {
        Self::default()
    }

    pub fn requery() -> Self {
        Self {
            items: Vec::new(),
            requery: true,
        }
    }

    pub fn show(item: DisplayItem) -> Self {
        Self {
            items: vec![item],
            requery: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginError {
    pub kind: PluginErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginErrorKind {
    /// The request line was not a valid [`PluginRequest`].
    InvalidRequest,
    Internal,
}

impl PluginError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: PluginErrorKind::InvalidRequest,
            message: message.into(),
        }
    }
}
