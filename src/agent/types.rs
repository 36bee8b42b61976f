use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Response of `GET /v1/agent/self`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSelf {
    #[serde(default)]
    pub member: Member,
    /// Subsystem name to flat string statistics, e.g. `stats["client"]["node_id"]`.
    #[serde(default)]
    pub stats: HashMap<String, HashMap<String, String>>,
}

/// A gossip pool member as reported by the agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Member {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub addr: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Response of `GET /v1/agent/members`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Members {
    #[serde(rename = "ServerName", default)]
    pub server_name: String,
    #[serde(rename = "ServerRegion", default)]
    pub server_region: String,
    #[serde(rename = "ServerDC", default)]
    pub server_dc: String,
    #[serde(rename = "Members", default)]
    pub members: Vec<Member>,
}

/// Which output stream of a task to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogKind {
    #[default]
    Stdout,
    Stderr,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Stdout => "stdout",
            LogKind::Stderr => "stderr",
        }
    }
}

/// Parameters for streaming a task's logs from the end.
#[derive(Debug, Clone)]
pub struct LogRequest {
    pub alloc_id: String,
    pub task: String,
    pub kind: LogKind,
    /// Bytes before the end of the log to start streaming from.
    pub offset: usize,
    /// Keep the connection open for new output.
    pub follow: bool,
}
