//! Webhook admission pipeline.
//!
//! Runs extract, dedup lock, parse, client lookup and progression check in
//! that order. Every rejection is a `{skip: true, reason}` outcome; the
//! service itself never fails.

use chrono::Duration;
use relaygate_types::admission::{AdmissionOutcome, AdmittedTrigger, normalize_status};
use relaygate_types::config::AdmissionConfig;
use serde_json::Value;

use super::dedup::{DedupGuard, dedup_key};
use super::envelope::extract_status_change;
use super::progression::StatusProgressionGate;
use crate::clock::Clock;
use crate::repository::client::ClientRegistry;
use crate::repository::lock::LockTable;

/// Admission tunables.
#[derive(Debug, Clone)]
pub struct AdmissionSettings {
    pub lock_ttl: Duration,
    pub replay_window: Duration,
    /// Normalized trigger statuses; a new status matches when it contains one.
    pub trigger_statuses: Vec<String>,
}

impl From<&AdmissionConfig> for AdmissionSettings {
    fn from(config: &AdmissionConfig) -> Self {
        Self {
            lock_ttl: Duration::seconds(config.lock_ttl_secs as i64),
            replay_window: Duration::seconds(config.replay_window_secs as i64),
            trigger_statuses: config
                .trigger_statuses
                .iter()
                .map(|s| normalize_status(s))
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

impl Default for AdmissionSettings {
    fn default() -> Self {
        Self::from(&AdmissionConfig::default())
    }
}

pub struct AdmissionService<L: LockTable, R: ClientRegistry, C: Clock + Clone> {
    dedup: DedupGuard<L, C>,
    clients: R,
    gate: StatusProgressionGate,
    clock: C,
    trigger_statuses: Vec<String>,
}

impl<L: LockTable, R: ClientRegistry, C: Clock + Clone> AdmissionService<L, R, C> {
    pub fn new(locks: L, clients: R, clock: C, settings: AdmissionSettings) -> Self {
        Self {
            dedup: DedupGuard::new(locks, clock.clone(), settings.lock_ttl),
            clients,
            gate: StatusProgressionGate::new(settings.replay_window),
            clock,
            trigger_statuses: settings.trigger_statuses,
        }
    }

    /// Run one webhook envelope through the pipeline.
    pub async fn admit(&self, envelope: &Value) -> AdmissionOutcome {
        let change = extract_status_change(envelope);

        // Dedup runs before parsing; events missing either identifier fall
        // through and are rejected below with a specific reason.
        let key = match (&change.task_id, change.new_status.as_deref()) {
            (Some(task_id), Some(status)) if !status.is_empty() => {
                let key = dedup_key(task_id, status);
                match self.dedup.acquire(&key).await {
                    Ok(decision) if decision.skip => {
                        return AdmissionOutcome {
                            decision,
                            trigger: None,
                        };
                    }
                    Ok(_) => Some(key),
                    Err(e) => {
                        tracing::error!(dedup_key = %key, error = %e, "dedup lock unavailable");
                        return AdmissionOutcome::skipped("Dedup lock unavailable");
                    }
                }
            }
            _ => None,
        };

        let Some(task_id) = change.task_id else {
            return AdmissionOutcome::skipped("No task ID");
        };
        let Some(new_status) = change.new_status.filter(|s| !s.is_empty()) else {
            return AdmissionOutcome::skipped("Not a status change");
        };
        if !self.is_trigger(&new_status) {
            tracing::debug!(task_id = %task_id, status = %new_status, "status is not a trigger");
            return AdmissionOutcome::skipped(format!("Status '{new_status}' not in trigger list"));
        }

        let client = match self.clients.find_by_task(&task_id).await {
            Ok(Some(client)) => client,
            Ok(None) => {
                tracing::info!(task_id = %task_id, "no client bound to task");
                return AdmissionOutcome::skipped(format!("No client found for task {task_id}"));
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "client lookup failed");
                return AdmissionOutcome::skipped("Client lookup failed");
            }
        };

        let now = self.clock.now();
        let decision = self.gate.check(
            client.last_processed_status.as_deref(),
            client.last_execution_timestamp,
            &new_status,
            now,
        );
        if decision.skip {
            tracing::info!(
                task_id = %task_id,
                client_id = %client.client_id,
                reason = decision.reason.as_deref().unwrap_or(""),
                "status change rejected"
            );
            return AdmissionOutcome {
                decision,
                trigger: None,
            };
        }

        if let Err(e) = self
            .clients
            .record_processed(&client.client_id, &new_status, now)
            .await
        {
            tracing::error!(client_id = %client.client_id, error = %e, "failed to record processed status");
            return AdmissionOutcome::skipped("Failed to record processed status");
        }

        let lock_key = key.unwrap_or_else(|| dedup_key(&task_id, &new_status));
        tracing::info!(
            task_id = %task_id,
            client_id = %client.client_id,
            status = %new_status,
            dedup_key = %lock_key,
            "status change admitted"
        );

        AdmissionOutcome::admitted(AdmittedTrigger {
            task_id,
            client_id: client.client_id,
            client_name: client.client_name,
            workflow_ids: client.workflow_ids,
            old_status: change.old_status,
            new_status,
            dedup_key: lock_key,
        })
    }

    fn is_trigger(&self, status: &str) -> bool {
        self.trigger_statuses.iter().any(|t| status.contains(t.as_str()))
    }
}
