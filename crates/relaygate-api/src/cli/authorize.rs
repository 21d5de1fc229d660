//! `rgate authorize`: run a token through the authorizer.

use anyhow::Result;
use console::style;

use relaygate_types::token::{AuthorizerRequest, Effect};

use crate::state::AppState;

pub async fn authorize(state: &AppState, token: &str, resource: &str, json: bool) -> Result<()> {
    let request = AuthorizerRequest {
        kind: Some("TOKEN".to_string()),
        authorization_token: Some(token.to_string()),
        method_arn: resource.to_string(),
    };
    let response = state.authorizer.authorize(&request).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let allowed = response
        .policy_document
        .statement
        .iter()
        .any(|s| s.effect == Effect::Allow);

    println!();
    if allowed {
        println!(
            "  {} Allow as {}",
            style("✓").green().bold(),
            style(&response.principal_id).cyan()
        );
    } else {
        println!("  {} Deny", style("✗").red().bold());
    }
    if let Some(context) = &response.context {
        for (key, value) in context {
            println!("    {}: {}", style(key).dim(), value);
        }
    }
    println!();

    Ok(())
}
