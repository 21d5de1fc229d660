use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Stage label attached to a secret version.
///
/// Each label points at no more than one version of a given secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecretStage {
    /// The version actively trusted by verifiers.
    Current,
    /// A candidate created by an in-flight rotation, awaiting promotion.
    Pending,
    /// The version demoted by the most recent promotion.
    Previous,
}

impl SecretStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretStage::Current => "CURRENT",
            SecretStage::Pending => "PENDING",
            SecretStage::Previous => "PREVIOUS",
        }
    }
}

impl fmt::Display for SecretStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CURRENT" | "AWSCURRENT" => Ok(SecretStage::Current),
            "PENDING" | "AWSPENDING" => Ok(SecretStage::Pending),
            "PREVIOUS" | "AWSPREVIOUS" => Ok(SecretStage::Previous),
            other => Err(format!("unknown secret stage: '{other}'")),
        }
    }
}

/// One stored version of a secret, with the stage labels it currently holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretVersion {
    pub secret_id: String,
    /// Version identifier; equals the `client_request_token` of the rotation
    /// attempt that created it.
    pub version_id: String,
    pub value: Redacted,
    pub stages: Vec<SecretStage>,
    pub created_at: DateTime<Utc>,
}

impl SecretVersion {
    pub fn has_stage(&self, stage: SecretStage) -> bool {
        self.stages.contains(&stage)
    }
}

/// Version id plus stage labels, without the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStages {
    pub version_id: String,
    pub stages: Vec<SecretStage>,
    pub created_at: DateTime<Utc>,
}

/// JSON document stored as the value of a rotated secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPayload {
    pub secret: String,
    pub created_at: DateTime<Utc>,
    pub rotated_by: String,
}

impl SecretPayload {
    pub fn new(secret: impl Into<String>, rotated_by: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            created_at: Utc::now(),
            rotated_by: rotated_by.into(),
        }
    }

    /// Extract the signing secret from a stored value.
    ///
    /// Values written by the rotation coordinator are JSON payloads; anything
    /// else (e.g. a plain string seeded by an operator) is used verbatim.
    pub fn secret_from_stored(value: &str) -> String {
        match serde_json::from_str::<serde_json::Value>(value) {
            Ok(serde_json::Value::Object(map)) => match map.get("secret") {
                Some(serde_json::Value::String(s)) => s.clone(),
                _ => value.to_string(),
            },
            _ => value.to_string(),
        }
    }

    /// Parse a stored value as a payload written by the rotation coordinator.
    pub fn from_stored(value: &str) -> Option<Self> {
        serde_json::from_str(value).ok()
    }
}

/// A wrapper that redacts secret values in Debug and Display output.
///
/// Use this to wrap any `String` that might contain sensitive data.
/// The actual value is accessible via `.expose()`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redacted(String);

impl Redacted {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Show masked representation: last 4 chars visible.
    pub fn masked(&self) -> String {
        if self.0.len() <= 4 {
            "****".to_string()
        } else {
            format!("****{}", &self.0[self.0.len() - 4..])
        }
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Redacted(\"***\")")
    }
}

impl fmt::Display for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_debug_hides_value() {
        let secret = Redacted::new("sk-abc123xyz");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("abc123xyz"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_redacted_masked() {
        assert_eq!(Redacted::new("sk-abc123xyz").masked(), "****3xyz");
        assert_eq!(Redacted::new("ab").masked(), "****");
    }

    #[test]
    fn test_stage_parse_accepts_aws_labels() {
        assert_eq!("AWSCURRENT".parse::<SecretStage>().unwrap(), SecretStage::Current);
        assert_eq!("pending".parse::<SecretStage>().unwrap(), SecretStage::Pending);
        assert!("LATEST".parse::<SecretStage>().is_err());
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let payload = SecretPayload::new("abcd", "scheduled-rotation");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["secret"], "abcd");
        assert_eq!(json["rotatedBy"], "scheduled-rotation");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_secret_from_stored_payload() {
        let stored = serde_json::to_string(&SecretPayload::new("deadbeef", "test")).unwrap();
        assert_eq!(SecretPayload::secret_from_stored(&stored), "deadbeef");
    }

    #[test]
    fn test_secret_from_stored_plain_value() {
        assert_eq!(SecretPayload::secret_from_stored("plain-secret"), "plain-secret");
        // JSON without a string `secret` field is treated as opaque
        assert_eq!(SecretPayload::secret_from_stored("{\"key\":1}"), "{\"key\":1}");
    }
}
