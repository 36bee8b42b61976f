//! HTTP client for the local agent API.

mod types;

use std::io;
use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

pub use types::{AgentSelf, LogKind, LogRequest, Member, Members};

/// Address used when no other address is configured.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:4646";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("invalid agent address {0:?}, expected an http:// or https:// URL")]
    InvalidAddress(String),

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("no local agent reachable at {address}")]
    Unreachable {
        address: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("agent returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode agent response")]
    Decode(#[source] reqwest::Error),

    #[error("agent is not running in client mode")]
    NotClientMode,
}

/// Thin async client over the agent's HTTP API.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    address: String,
}

impl AgentClient {
    pub fn new(address: impl Into<String>) -> Result<Self, AgentError> {
        let address = address.into().trim_end_matches('/').to_string();
        if !(address.starts_with("http://") || address.starts_with("https://")) {
            return Err(AgentError::InvalidAddress(address));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("tailgate/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(AgentError::Client)?;

        Ok(Self { http, address })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// `GET /v1/agent/self`
    pub async fn self_info(&self) -> Result<AgentSelf, AgentError> {
        self.get_json("/v1/agent/self").await
    }

    /// `GET /v1/agent/members`
    pub async fn members(&self) -> Result<Members, AgentError> {
        self.get_json("/v1/agent/members").await
    }

    /// Open a plain-text log stream for a task, positioned `offset` bytes
    /// before the end of its log.
    pub async fn stream_logs(
        &self,
        request: &LogRequest,
    ) -> Result<impl AsyncRead + Send + Unpin, AgentError> {
        let url = format!(
            "{}/v1/client/fs/logs/{}?task={}&type={}&origin=end&offset={}&follow={}&plain=true",
            self.address,
            urlencoding::encode(&request.alloc_id),
            urlencoding::encode(&request.task),
            request.kind.as_str(),
            request.offset,
            request.follow,
        );
        debug!(%url, "opening log stream");

        // No overall timeout: follow streams stay open until the reader lets go.
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| self.unreachable(source))?;
        let response = check_status(response).await?;

        let body = response.bytes_stream().map_err(io::Error::other);
        Ok(StreamReader::new(Box::pin(body)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AgentError> {
        let url = format!("{}{}", self.address, path);
        debug!(%url, "agent request");

        let response = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|source| self.unreachable(source))?;
        let response = check_status(response).await?;

        response.json::<T>().await.map_err(AgentError::Decode)
    }

    fn unreachable(&self, source: reqwest::Error) -> AgentError {
        warn!(address = %self.address, error = %source, "agent request failed");
        AgentError::Unreachable {
            address: self.address.clone(),
            source,
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AgentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AgentError::Status {
        status,
        body: body.trim().to_string(),
    })
}

/// Node ID of the client running inside the local agent.
///
/// Fails with [`AgentError::Unreachable`] when no agent answers at the
/// client's address, and with [`AgentError::NotClientMode`] when the agent
/// answers but hosts no client.
pub async fn local_node_id(client: &AgentClient) -> Result<String, AgentError> {
    let info = client.self_info().await?;
    node_id_from(&info).ok_or(AgentError::NotClientMode)
}

fn node_id_from(info: &AgentSelf) -> Option<String> {
    info.stats
        .get("client")
        .and_then(|client| client.get("node_id"))
        .filter(|id| !id.is_empty())
        .cloned()
}
