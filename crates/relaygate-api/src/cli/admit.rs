//! `rgate admit`: feed a stored webhook body through admission.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use tokio::io::AsyncReadExt;

use crate::state::AppState;

pub async fn admit_file(state: &AppState, file: &Path, json: bool) -> Result<()> {
    let raw = if file == Path::new("-") {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("failed to read {}", file.display()))?
    };
    let envelope: serde_json::Value =
        serde_json::from_str(&raw).context("webhook body is not valid JSON")?;

    let outcome = state.admission.admit(&envelope).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match (&outcome.trigger, outcome.decision.reason.as_deref()) {
        (Some(trigger), _) => {
            println!(
                "  {} Admitted {} -> {} for {} ({})",
                style("✓").green().bold(),
                trigger.old_status,
                style(&trigger.new_status).bold(),
                style(&trigger.client_name).cyan(),
                style(&trigger.dedup_key).dim()
            );
        }
        (None, reason) => {
            println!(
                "  {} Skipped: {}",
                style("-").yellow().bold(),
                reason.unwrap_or("no reason given")
            );
        }
    }

    Ok(())
}
