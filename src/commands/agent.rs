use anyhow::{Context, Result};
use colored::Colorize;

use crate::agent::{local_node_id, AgentClient, AgentSelf, Members};
use crate::commands::common::{format_kv, format_list};
use crate::config;

/// Build a client for the configured agent address.
pub fn connect(address: Option<String>) -> Result<AgentClient> {
    let address = config::get_agent_address(address);
    AgentClient::new(address).context("Failed to create agent client")
}

/// Print the node ID of the local client agent.
pub fn node_id(address: Option<String>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(print_node_id(address))
}

async fn print_node_id(address: Option<String>) -> Result<()> {
    let client = connect(address)?;
    let id = local_node_id(&client)
        .await
        .context("Failed to determine local node ID")?;
    println!("{id}");
    Ok(())
}

/// Print the local agent's member details and statistics.
pub fn info(address: Option<String>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(print_info(address))
}

async fn print_info(address: Option<String>) -> Result<()> {
    let client = connect(address)?;
    let info = client
        .self_info()
        .await
        .context("Failed to query agent")?;

    println!("{}", "Agent".bright_white().bold());
    println!("{}", format_kv(&agent_rows(&info)));

    let mut subsystems: Vec<_> = info.stats.iter().collect();
    subsystems.sort_by(|a, b| a.0.cmp(b.0));
    for (name, stats) in subsystems {
        let mut rows: Vec<String> = stats
            .iter()
            .map(|(key, value)| format!("{key}|{value}"))
            .collect();
        rows.sort();
        println!();
        println!("{}", name.bright_cyan().bold());
        println!("{}", format_kv(&rows));
    }
    Ok(())
}

/// Print the gossip members known to the local agent.
pub fn members(address: Option<String>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(print_members(address))
}

async fn print_members(address: Option<String>) -> Result<()> {
    let client = connect(address)?;
    let members = client
        .members()
        .await
        .context("Failed to query agent members")?;

    println!("{}", format_list(&member_rows(&members)));
    Ok(())
}

fn agent_rows(info: &AgentSelf) -> Vec<String> {
    let member = &info.member;
    let node_id = info
        .stats
        .get("client")
        .and_then(|client| client.get("node_id"))
        .map(String::as_str)
        .unwrap_or("");

    vec![
        format!("Name|{}", member.name),
        format!("Address|{}", member.addr),
        format!("Port|{}", member.port),
        format!("Status|{}", member.status),
        format!("Node ID|{node_id}"),
    ]
}

fn member_rows(members: &Members) -> Vec<String> {
    let mut rows = vec!["Name|Address|Port|Status|Leader|Region|Datacenter".to_string()];
    for member in &members.members {
        let tag = |key: &str| member.tags.get(key).map(String::as_str).unwrap_or("");
        let leader = member.name == members.server_name;
        rows.push(format!(
            "{}|{}|{}|{}|{}|{}|{}",
            member.name,
            member.addr,
            member.port,
            member.status,
            leader,
            tag("region"),
            tag("dc"),
        ));
    }
    rows
}
