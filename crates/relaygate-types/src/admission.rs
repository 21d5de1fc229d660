//! Webhook admission types: lifecycle statuses, client status records and
//! the `{skip, reason}` decision returned to the webhook caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use std::fmt;

/// Client lifecycle, in progression order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStatus {
    NotStarted,
    Onboarding,
    Reply,
    CampaignLive,
    Complete,
}

impl LifecycleStatus {
    pub const ORDER: [LifecycleStatus; 5] = [
        LifecycleStatus::NotStarted,
        LifecycleStatus::Onboarding,
        LifecycleStatus::Reply,
        LifecycleStatus::CampaignLive,
        LifecycleStatus::Complete,
    ];

    /// Ordinal position in the lifecycle.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Canonical (normalized) spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::NotStarted => "not started",
            LifecycleStatus::Onboarding => "onboarding",
            LifecycleStatus::Reply => "reply",
            LifecycleStatus::CampaignLive => "campaign live",
            LifecycleStatus::Complete => "complete",
        }
    }

    /// Parse any spelling that normalizes to a known status.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_status(raw);
        LifecycleStatus::ORDER
            .into_iter()
            .find(|status| status.as_str() == normalized)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a raw status string: trimmed, lowercase, `-`/`_` read as spaces,
/// runs of whitespace collapsed.
pub fn normalize_status(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Gate result returned at the webhook boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    pub skip: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AdmissionDecision {
    pub fn proceed() -> Self {
        Self {
            skip: false,
            reason: None,
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            skip: true,
            reason: Some(reason.into()),
        }
    }

    pub fn is_admitted(&self) -> bool {
        !self.skip
    }
}

/// Status change extracted from a webhook envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub task_id: Option<String>,
    /// Normalized status before the change (empty when absent).
    pub old_status: String,
    /// Normalized status after the change; `None` when the event carries no
    /// status history entry at all.
    pub new_status: Option<String>,
}

/// Per-client record owned by the client registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientStatusRecord {
    pub client_id: String,
    pub client_name: String,
    pub task_id: String,
    /// Registry status of the record itself (e.g. `active`, `claiming`).
    pub status: String,
    pub last_processed_status: Option<String>,
    pub last_execution_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub workflow_ids: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClientStatusRecord {
    /// Registry status marking a placeholder row created while a task is claimed.
    pub const CLAIMING: &'static str = "claiming";

    pub fn new(
        client_id: impl Into<String>,
        client_name: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            client_id: client_id.into(),
            client_name: client_name.into(),
            task_id: task_id.into(),
            status: "active".to_string(),
            last_processed_status: None,
            last_execution_timestamp: None,
            workflow_ids: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_claiming(&self) -> bool {
        self.status == Self::CLAIMING
    }
}

/// Trigger handed to the downstream automation after admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmittedTrigger {
    pub task_id: String,
    pub client_id: String,
    pub client_name: String,
    pub workflow_ids: Map<String, Value>,
    pub old_status: String,
    pub new_status: String,
    pub dedup_key: String,
}

/// Full result of running an envelope through the admission pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionOutcome {
    #[serde(flatten)]
    pub decision: AdmissionDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<AdmittedTrigger>,
}

impl AdmissionOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            decision: AdmissionDecision::skip(reason),
            trigger: None,
        }
    }

    pub fn admitted(trigger: AdmittedTrigger) -> Self {
        Self {
            decision: AdmissionDecision::proceed(),
            trigger: Some(trigger),
        }
    }
}
