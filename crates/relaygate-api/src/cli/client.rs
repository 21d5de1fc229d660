//! Client registry CLI commands: register, list.

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde_json::Value;

use relaygate_core::repository::client::ClientRegistry;
use relaygate_types::admission::ClientStatusRecord;

use crate::state::AppState;

/// Create a client or update its name, task and workflows.
///
/// Processing history (last status, last run) survives re-registration.
pub async fn register_client(
    state: &AppState,
    id: &str,
    name: &str,
    task: &str,
    workflows: Vec<(String, String)>,
    json: bool,
) -> Result<()> {
    let mut record = match state.clients.get(id).await? {
        Some(existing) => existing,
        None => ClientStatusRecord::new(id, name, task),
    };
    record.client_name = name.to_string();
    record.task_id = task.to_string();
    for (key, value) in workflows {
        record.workflow_ids.insert(key, Value::String(value));
    }
    record.updated_at = Utc::now();

    state.clients.upsert(&record).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!(
            "  {} Client '{}' bound to task {}",
            style("✓").green().bold(),
            style(&record.client_name).bold(),
            style(&record.task_id).cyan()
        );
    }

    Ok(())
}

pub async fn list_clients(state: &AppState, json: bool) -> Result<()> {
    let clients = state.clients.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&clients)?);
        return Ok(());
    }

    if clients.is_empty() {
        println!();
        println!(
            "  {} No clients registered. Add one with: {}",
            style("i").blue().bold(),
            style("rgate client register <id> --name <name> --task <task>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Client").fg(Color::White),
        Cell::new("Task").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Last processed").fg(Color::White),
        Cell::new("At").fg(Color::White),
    ]);

    for client in &clients {
        let status = if client.is_claiming() {
            Cell::new(&client.status).fg(Color::Yellow)
        } else {
            Cell::new(&client.status)
        };
        table.add_row(vec![
            Cell::new(format!("{} ({})", client.client_name, client.client_id)).fg(Color::Cyan),
            Cell::new(&client.task_id),
            status,
            Cell::new(client.last_processed_status.as_deref().unwrap_or("-")),
            Cell::new(
                client
                    .last_execution_timestamp
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            )
            .fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} client{}",
        style(clients.len()).bold(),
        if clients.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}
