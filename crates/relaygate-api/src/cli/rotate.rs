//! Rotation CLI commands: full rotation and single steps.

use anyhow::Result;
use console::style;

use relaygate_types::rotation::RotationRequest;

use crate::state::AppState;

/// Run all four steps with a fresh version id.
pub async fn rotate(state: &AppState, secret_id: Option<&str>, json: bool) -> Result<()> {
    let summary = match secret_id {
        Some(id) => state.rotation.rotate(id).await?,
        None => state.rotation.rotate_scheduled().await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Rotated '{}' to version {}",
        style("✓").green().bold(),
        style(&summary.secret_id).bold(),
        style(&summary.version_id).cyan()
    );
    if let Some(id) = &summary.consumer.new_credential_id {
        println!("    credential: {}", style(id).dim());
    }
    if let Some(count) = summary.consumer.workflows_updated {
        println!("    workflows updated: {count}");
    }
    println!();

    Ok(())
}

/// Run one step of a scheduler-driven rotation.
pub async fn rotate_step(
    state: &AppState,
    secret_id: &str,
    token: &str,
    step: &str,
    json: bool,
) -> Result<()> {
    let request = RotationRequest {
        secret_id: secret_id.to_string(),
        client_request_token: token.to_string(),
        step: step.to_string(),
    };
    state.rotation.handle(&request).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"secret_id": secret_id, "token": token, "step": step, "ok": true})
        );
    } else {
        println!(
            "  {} {} for '{}' ({})",
            style("✓").green().bold(),
            style(step).bold(),
            secret_id,
            style(token).dim()
        );
    }

    Ok(())
}
