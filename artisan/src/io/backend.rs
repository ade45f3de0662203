//! Modeling backend abstraction and the Blender addon TCP client.
//!
//! The [`ModelingBackend`] trait decouples the session loop from the actual
//! backend transport. Tests use scripted backends that return predetermined
//! outcomes without opening sockets.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

/// Execute arbitrary Python against the backend. The only scene-mutating tool.
pub const TOOL_EXECUTE_CODE: &str = "execute_code";
/// Read-only scene summary (object list plus metadata).
pub const TOOL_GET_SCENE_INFO: &str = "get_scene_info";
/// Read-only per-object detail (vertices, modifiers, materials).
pub const TOOL_GET_OBJECT_INFO: &str = "get_object_info";
/// Viewport capture; replies carry base64 image data.
pub const TOOL_GET_VIEWPORT_SCREENSHOT: &str = "get_viewport_screenshot";

/// Outcome of one backend tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub success: bool,
    /// Result payload on success, error message on failure.
    pub result: String,
    /// Base64-encoded PNG when the tool captured an image.
    pub image_data: Option<String>,
}

/// Abstraction over modeling backend transports.
pub trait ModelingBackend {
    /// Invoke one tool. `Err` means the backend itself was unreachable;
    /// in-band tool failures come back as `ToolOutcome { success: false, .. }`.
    fn invoke(&self, tool_name: &str, args: &Value) -> Result<ToolOutcome>;
}

/// JSON-over-TCP client for the Blender addon protocol.
///
/// One connection per command: the addon closes the socket after replying,
/// so each invoke connects, sends `{"tool": ..., "params": ...}`, and reads
/// until the accumulated bytes parse as a JSON document.
#[derive(Debug, Clone)]
pub struct SocketBackend {
    host: String,
    port: u16,
    timeout: Duration,
}

impl SocketBackend {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    fn send_command(&self, payload: &Value) -> Result<Value> {
        let addr = format!("{}:{}", self.host, self.port);
        let mut stream = TcpStream::connect(&addr)
            .with_context(|| format!("connect to modeling backend at {addr}"))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .context("set backend read timeout")?;
        stream
            .set_write_timeout(Some(self.timeout))
            .context("set backend write timeout")?;

        let message = serde_json::to_vec(payload).context("serialize backend command")?;
        stream
            .write_all(&message)
            .with_context(|| format!("send command to {addr}"))?;

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream
                .read(&mut chunk)
                .with_context(|| format!("read reply from {addr}"))?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            // The addon streams one JSON document; stop as soon as it parses.
            if let Ok(value) = serde_json::from_slice::<Value>(&buf) {
                return Ok(value);
            }
        }
        serde_json::from_slice(&buf).map_err(|err| anyhow!("malformed backend reply: {err}"))
    }
}

impl ModelingBackend for SocketBackend {
    #[instrument(skip_all, fields(tool = tool_name))]
    fn invoke(&self, tool_name: &str, args: &Value) -> Result<ToolOutcome> {
        let payload = json!({"tool": tool_name, "params": args});
        let reply = self.send_command(&payload)?;

        if reply.get("status").and_then(Value::as_str) == Some("error") {
            let message = reply
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("backend reported an error")
                .to_string();
            warn!(error = %message, "backend tool call failed");
            return Ok(ToolOutcome {
                success: false,
                result: message,
                image_data: None,
            });
        }

        let result_value = reply.get("result").cloned().unwrap_or(Value::Null);
        let image_data = result_value
            .get("image_data")
            .or_else(|| reply.get("image_data"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let result = match &result_value {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        debug!(bytes = result.len(), has_image = image_data.is_some(), "tool call completed");
        Ok(ToolOutcome {
            success: true,
            result,
            image_data,
        })
    }
}
