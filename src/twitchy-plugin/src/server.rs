//! Request loop serving the plugin protocol over a line-oriented byte stream.

use crate::plugin::TwitchyPlugin;
use crate::protocol::{PluginError, PluginMethod, PluginRequest, PluginResponse, PluginResult};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to read request: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write response: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct PluginServer<R, W> {
    reader: R,
    writer: W,
    plugin: TwitchyPlugin,
}

impl<R, W> PluginServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, plugin: TwitchyPlugin) -> Self {
        Self {
            reader,
            writer,
            plugin,
        }
    }

    /// Serve requests until Shutdown or end of input.
    pub async fn run(mut self) -> Result<TwitchyPlugin, ServerError> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(ServerError::Read)?;
            if read == 0 {
                tracing::info!("host closed input");
                break;
            }
            if line.trim().is_empty() {
                continue;
            }

            let request: PluginRequest = match serde_json::from_str(line.trim()) {
                Ok(request) => request,
                Err(err) => {
                    tracing::warn!(error = %err, "unreadable request");
                    let result = PluginResult::Error(PluginError::invalid_request(err.to_string()));
                    self.respond(0, result).await?;
                    continue;
                }
            };

            let shutdown = matches!(request.method, PluginMethod::Shutdown);
            let result = self.handle(request.method).await;
            self.respond(request.id, result).await?;
            if shutdown {
                tracing::info!("shutdown requested");
                break;
            }
        }
        Ok(self.plugin)
    }

    async fn handle(&mut self, method: PluginMethod) -> PluginResult {
        match method {
            PluginMethod::Initialize => PluginResult::Initialized(self.plugin.initialize().await),
            PluginMethod::Query { query } => PluginResult::Items {
                items: self.plugin.query(&query).await,
            },
            PluginMethod::ContextMenu { context } => PluginResult::Items {
                items: self.plugin.context_menu(&context),
            },
            PluginMethod::Invoke { action } => {
                PluginResult::Invoked(self.plugin.invoke(&action).await)
            }
            PluginMethod::Shutdown => PluginResult::ShutdownAck,
        }
    }

    async fn respond(&mut self, id: u64, result: PluginResult) -> Result<(), ServerError> {
        let mut json = serde_json::to_string(&PluginResponse { id, result })?;
        json.push('\n');
        self.writer
            .write_all(json.as_bytes())
            .await
            .map_err(ServerError::Write)?;
        self.writer.flush().await.map_err(ServerError::Write)
    }
}
