use serde::{Deserialize, Serialize};

use crate::error::RotationError;

use std::fmt;
use std::str::FromStr;

/// One step of the four-step rotation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RotationStep {
    CreateSecret,
    SetSecret,
    TestSecret,
    FinishSecret,
}

impl RotationStep {
    pub const ALL: [RotationStep; 4] = [
        RotationStep::CreateSecret,
        RotationStep::SetSecret,
        RotationStep::TestSecret,
        RotationStep::FinishSecret,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RotationStep::CreateSecret => "createSecret",
            RotationStep::SetSecret => "setSecret",
            RotationStep::TestSecret => "testSecret",
            RotationStep::FinishSecret => "finishSecret",
        }
    }
}

impl fmt::Display for RotationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RotationStep {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RotationStep::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| RotationError::UnknownStep(s.to_string()))
    }
}

/// Step-mode invocation from an external rotation scheduler.
///
/// `step` stays a string so an unknown step surfaces as
/// [`RotationError::UnknownStep`] instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RotationRequest {
    pub secret_id: String,
    pub client_request_token: String,
    pub step: String,
}

/// Acknowledgement returned by a credential consumer after an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerAck {
    #[serde(default)]
    pub new_credential_id: Option<String>,
    #[serde(default)]
    pub old_credential_id: Option<String>,
    #[serde(default)]
    pub workflows_updated: Option<u64>,
}

/// Result of a completed scheduled rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationSummary {
    pub secret_id: String,
    pub version_id: String,
    pub consumer: ConsumerAck,
}
