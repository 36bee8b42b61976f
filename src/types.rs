use serde::{Deserialize, Serialize};

/// Contents of `.tailgate/config.json` and `~/.config/tailgate/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailgateConfig {
    /// Agent HTTP address, e.g. `http://127.0.0.1:4646`.
    #[serde(default)]
    pub address: Option<String>,
    /// Lines shown by `logs` when `-n` is not given.
    #[serde(default)]
    pub default_lines: Option<usize>,
    /// Idle timeout in milliseconds for remote follow streams.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}
