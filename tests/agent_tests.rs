use std::collections::HashMap;
use std::convert::Infallible;
use std::process::Output;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream::{self, StreamExt};
use serde_json::json;
use tailgate_lib::agent::{local_node_id, AgentClient, AgentError, LogKind, LogRequest};
use tailgate_lib::tail::{LineLimitReader, TailLimits};
use tokio::io::AsyncReadExt;

const NODE_ID: &str = "f7476465-4d6e-c0de-26d0-e383c49be941";
const TASK_LOG: &str = "starting\nlistening on :8080\nGET /health 200\nGET /api 500\n";

async fn agent_self(client_mode: bool) -> Json<serde_json::Value> {
    let mut stats = json!({ "nomad": { "server": "true", "leader": "true" } });
    if client_mode {
        stats["client"] = json!({ "node_id": NODE_ID, "known_servers": "1" });
    }
    Json(json!({
        "member": {
            "Name": "node-1.global",
            "Addr": "127.0.0.1",
            "Port": 4648,
            "Status": "alive",
            "Tags": { "region": "global", "dc": "dc1" }
        },
        "stats": stats
    }))
}

async fn agent_members() -> Json<serde_json::Value> {
    Json(json!({
        "ServerName": "node-1.global",
        "ServerRegion": "global",
        "ServerDC": "dc1",
        "Members": [
            { "Name": "node-1.global", "Addr": "127.0.0.1", "Port": 4648, "Status": "alive",
              "Tags": { "region": "global", "dc": "dc1" } },
            { "Name": "node-2.global", "Addr": "127.0.0.2", "Port": 4648, "Status": "failed",
              "Tags": { "region": "global" } }
        ]
    }))
}

/// Serves the task log and then holds the connection open like a follow stream.
async fn task_logs(
    Path(alloc): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let param = |key: &str| params.get(key).map(String::as_str);
    let valid = alloc == "5a1e-9c"
        && param("task") == Some("web")
        && param("type") == Some("stdout")
        && param("origin") == Some("end")
        && param("follow") == Some("true")
        && param("plain") == Some("true")
        && param("offset") == Some("240");
    if !valid {
        return (StatusCode::BAD_REQUEST, format!("unexpected request: {params:?}")).into_response();
    }

    let body = stream::iter(vec![Ok::<_, Infallible>(Bytes::from_static(TASK_LOG.as_bytes()))])
        .chain(stream::pending());
    Body::from_stream(body).into_response()
}

async fn spawn_agent(client_mode: bool) -> String {
    let router = Router::new()
        .route("/v1/agent/self", get(move || agent_self(client_mode)))
        .route("/v1/agent/members", get(agent_members))
        .route("/v1/client/fs/logs/{alloc}", get(task_logs));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn run_cli(args: &[&str]) -> Output {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_tailgate"))
        .args(args)
        .env_remove("TAILGATE_ADDR")
        .output()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_local_node_id_from_client_agent() {
    let address = spawn_agent(true).await;
    let client = AgentClient::new(address).unwrap();

    assert_eq!(local_node_id(&client).await.unwrap(), NODE_ID);
}

#[tokio::test]
async fn test_local_node_id_fails_on_server_only_agent() {
    let address = spawn_agent(false).await;
    let client = AgentClient::new(address).unwrap();

    let err = local_node_id(&client).await.unwrap_err();
    assert!(matches!(err, AgentError::NotClientMode));
}

#[tokio::test]
async fn test_agent_status_error() {
    let address = spawn_agent(true).await;
    let client = AgentClient::new(address).unwrap();

    let request = LogRequest {
        alloc_id: "unknown".to_string(),
        task: "web".to_string(),
        kind: LogKind::Stdout,
        offset: 240,
        follow: true,
    };
    let err = client.stream_logs(&request).await.err().unwrap();
    assert!(matches!(
        err,
        AgentError::Status { status, .. } if status == StatusCode::BAD_REQUEST
    ));
}

#[tokio::test]
async fn test_follow_stream_ends_at_time_limit() {
    let address = spawn_agent(true).await;
    let client = AgentClient::new(address).unwrap();

    let request = LogRequest {
        alloc_id: "5a1e-9c".to_string(),
        task: "web".to_string(),
        kind: LogKind::Stdout,
        offset: 240,
        follow: true,
    };
    let stream = client.stream_logs(&request).await.unwrap();
    let limits = TailLimits::for_lines(2).with_time_limit(Duration::from_millis(200));
    let mut reader = LineLimitReader::with_limits(stream, limits);

    let started = Instant::now();
    let mut out = String::new();
    tokio::time::timeout(Duration::from_secs(2), reader.read_to_string(&mut out))
        .await
        .expect("follow stream did not end at the time limit")
        .unwrap();

    assert_eq!(out, "GET /health 200\nGET /api 500\n");
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_cli_node_id() {
    let address = spawn_agent(true).await;

    let output = run_cli(&["--address", &address, "node-id"]).await;

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), NODE_ID);
}

#[tokio::test]
async fn test_cli_node_id_without_agent() {
    let output = run_cli(&["--address", "http://127.0.0.1:9", "node-id"]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no local agent reachable"), "stderr: {stderr}");
}

#[tokio::test]
async fn test_cli_members_table() {
    let address = spawn_agent(true).await;

    let output = run_cli(&["--address", &address, "members"]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Name"));
    assert!(lines[1].starts_with("node-1.global  127.0.0.1"));
    assert!(lines[2].ends_with("<none>"));
}

#[tokio::test]
async fn test_cli_agent_info() {
    let address = spawn_agent(true).await;

    let output = run_cli(&["--address", &address, "agent-info"]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("Node ID = {NODE_ID}")));
    assert!(stdout.contains("node_id"));
}

#[tokio::test]
async fn test_cli_remote_logs_tail() {
    let address = spawn_agent(true).await;

    let output = run_cli(&[
        "--address",
        &address,
        "logs",
        "--alloc",
        "5a1e-9c",
        "--task",
        "web",
        "-n",
        "2",
        "--timeout-ms",
        "200",
    ])
    .await;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "GET /health 200\nGET /api 500\n"
    );
}
