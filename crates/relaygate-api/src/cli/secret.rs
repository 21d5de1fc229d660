//! Secret management CLI commands: show, seed.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Password;

use relaygate_core::repository::secret_store::SecretStore;
use relaygate_types::secret::{Redacted, SecretPayload, SecretStage};

use crate::state::AppState;

fn resolve_secret_id<'a>(state: &'a AppState, secret_id: Option<&'a str>) -> Result<&'a str> {
    match secret_id {
        Some(id) => Ok(id),
        None => state.verifier_secret_id(),
    }
}

/// List every version of the secret with its stages and a masked value.
pub async fn show_secret(state: &AppState, secret_id: Option<&str>, json: bool) -> Result<()> {
    let secret_id = resolve_secret_id(state, secret_id)?;
    let versions = state.secrets.list_versions(secret_id).await?;

    let mut rows = Vec::with_capacity(versions.len());
    for version in &versions {
        let masked = match state.secrets.get_version(secret_id, &version.version_id).await? {
            Some(v) => Redacted::new(SecretPayload::secret_from_stored(v.value.expose())).masked(),
            None => "****".to_string(),
        };
        rows.push((version, masked));
    }

    if json {
        let entries: Vec<_> = rows
            .iter()
            .map(|(v, masked)| {
                serde_json::json!({
                    "version_id": v.version_id,
                    "stages": v.stages,
                    "created_at": v.created_at.to_rfc3339(),
                    "masked_value": masked,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "secret_id": secret_id,
                "versions": entries,
            }))?
        );
        return Ok(());
    }

    if rows.is_empty() {
        println!();
        println!(
            "  {} No versions of '{}'. Add one with: {}",
            style("i").blue().bold(),
            secret_id,
            style("rgate secret seed").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Version").fg(Color::White),
        Cell::new("Stages").fg(Color::White),
        Cell::new("Value").fg(Color::White),
        Cell::new("Created").fg(Color::White),
    ]);

    for (version, masked) in &rows {
        let stages = version
            .stages
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let stage_cell = if version.stages.contains(&SecretStage::Current) {
            Cell::new(stages).fg(Color::Green)
        } else {
            Cell::new(stages)
        };
        table.add_row(vec![
            Cell::new(&version.version_id).fg(Color::Cyan),
            stage_cell,
            Cell::new(masked),
            Cell::new(version.created_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("  {}", style(secret_id).bold());
    println!("{table}");
    println!();

    Ok(())
}

/// Store the first CURRENT version of a secret.
///
/// Refuses when a CURRENT version already exists; use `rgate rotate` then.
pub async fn seed_secret(
    state: &AppState,
    secret_id: Option<&str>,
    value: Option<&str>,
    json: bool,
) -> Result<()> {
    let secret_id = resolve_secret_id(state, secret_id)?;

    if state.secrets.get(secret_id, SecretStage::Current).await?.is_some() {
        bail!("'{secret_id}' already has a CURRENT version; run `rgate rotate` to replace it");
    }

    let secret_value = match value {
        Some(v) => v.to_string(),
        None => Password::new()
            .with_prompt(format!("Enter value for {}", style(secret_id).bold()))
            .interact()?,
    };
    if secret_value.trim().is_empty() {
        bail!("secret value must not be empty");
    }

    let payload = serde_json::to_string(&SecretPayload::new(&secret_value, "seed"))?;
    let version_id = uuid::Uuid::new_v4().to_string();
    state
        .secrets
        .put(secret_id, &version_id, &payload, &[SecretStage::Current])
        .await?;

    tracing::info!(secret_id, version_id = %version_id, "seeded secret");

    let masked = Redacted::new(secret_value).masked();
    if json {
        println!(
            "{}",
            serde_json::json!({"secret_id": secret_id, "version_id": version_id, "masked": masked})
        );
    } else {
        println!(
            "  {} Secret '{}' seeded as {} ({})",
            style("✓").green().bold(),
            style(secret_id).bold(),
            style(&version_id).cyan(),
            masked
        );
    }

    Ok(())
}
