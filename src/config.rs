//! Server configuration
//!
//! Options arrive as `initializationOptions` on `initialize` and may be
//! replaced wholesale by `workspace/didChangeConfiguration`. Unknown or
//! malformed settings are logged and ignored; the server always runs with
//! a complete option set.

use serde::Deserialize;
use serde_json::Value;

use tracing::warn;

/// Workspace-level options consumed by the completion front-end.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerOptions {
    /// Whether unimported-symbol completion is attempted at all. When off,
    /// the engine's "expanded items available" signal is ignored and lists
    /// are never reported incomplete.
    pub enable_import_completion: bool,
    /// Whether clients get the two-step insertion flow: cheap placeholder
    /// text up front, the real edit computed once an item is chosen.
    pub enable_async_completion: bool,
}

impl ServerOptions {
    /// Parses options from a JSON settings blob, falling back to defaults
    /// on absence or parse failure.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => ServerOptions::default(),
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(options) => options,
                Err(err) => {
                    warn!("Ignoring malformed server options: {}", err);
                    ServerOptions::default()
                }
            },
        }
    }
}
