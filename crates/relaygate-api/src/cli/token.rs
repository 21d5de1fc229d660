//! `rgate token issue`: mint a token for an automation workflow.

use anyhow::Result;
use console::style;

use relaygate_core::auth::token;
use relaygate_types::token::Claims;

use crate::state::AppState;

/// Build the claims for a new token issued at `now` (unix seconds).
pub fn issue_claims(
    sub: &str,
    now: i64,
    ttl: i64,
    workflow_id: Option<&str>,
    execution_id: Option<&str>,
) -> Claims {
    let mut claims = Claims::new()
        .with("sub", sub)
        .with("iat", now)
        .with("exp", now + ttl);
    if let Some(id) = workflow_id {
        claims = claims.with("workflowId", id);
    }
    if let Some(id) = execution_id {
        claims = claims.with("executionId", id);
    }
    claims
}

pub async fn issue(
    state: &AppState,
    sub: &str,
    ttl: i64,
    workflow_id: Option<&str>,
    execution_id: Option<&str>,
    json: bool,
) -> Result<()> {
    anyhow::ensure!(ttl > 0, "--ttl must be positive");

    let secret = state.authorizer.cache().get_secret().await?;
    let now = chrono::Utc::now().timestamp();
    let claims = issue_claims(sub, now, ttl, workflow_id, execution_id);
    let token = token::sign(&claims, secret.expose())?;

    if json {
        println!(
            "{}",
            serde_json::json!({"token": token, "expires_at": now + ttl, "claims": claims})
        );
    } else {
        println!("{token}");
        eprintln!(
            "  {} expires in {}s",
            style("i").blue().bold(),
            style(ttl).bold()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_claims_sets_window_and_ids() {
        let claims = issue_claims("svc", 1_700_000_000, 600, Some("wf-1"), None);
        assert_eq!(claims.get("exp"), Some(&json!(1_700_000_600)));
        assert_eq!(claims.get("workflowId"), Some(&json!("wf-1")));
        assert!(claims.get("executionId").is_none());
    }

    #[test]
    fn test_issued_token_verifies() {
        let now = chrono::Utc::now();
        let claims = issue_claims("svc", now.timestamp(), 60, None, Some("exec-1"));
        let signed = token::sign(&claims, "k").unwrap();
        let verified = token::verify(&signed, "k", now).unwrap();
        assert_eq!(verified.subject().as_deref(), Some("svc"));
    }
}
