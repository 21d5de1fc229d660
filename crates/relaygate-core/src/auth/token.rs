//! Compact HS256 token verification and signing.
//!
//! Wire format: `base64url(header).base64url(payload).base64url(signature)`,
//! where the signature is HMAC-SHA256 over the literal `header.payload` text.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use sha2::Sha256;

use relaygate_types::error::TokenError;
use relaygate_types::token::{Claims, HS256, TokenHeader};

type HmacSha256 = Hmac<Sha256>;

/// URL-safe alphabet that accepts segments with or without `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Verify a compact token against `secret` at time `now`.
///
/// Checks, in order: segment count, header/payload decoding, algorithm,
/// signature, `exp`, `nbf`. Returns the decoded claims on success.
pub fn verify(token: &str, secret: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = segments[..] else {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    };

    let header: TokenHeader = decode_segment(header_b64, "header")?;
    let claims: Claims = decode_segment(payload_b64, "payload")?;

    if header.alg != HS256 {
        return Err(TokenError::UnsupportedAlgorithm(header.alg));
    }

    let expected = sign_input(secret, &format!("{header_b64}.{payload_b64}"))?;

    // Length is not secret; only equal-length signatures reach the
    // constant-time comparison.
    if expected.len() != signature_b64.len() {
        return Err(TokenError::InvalidSignature);
    }
    if !constant_time_eq(expected.as_bytes(), signature_b64.as_bytes()) {
        return Err(TokenError::InvalidSignature);
    }

    let now_secs = now.timestamp();
    if let Some(exp) = claims.time_claim("exp")? {
        if exp < now_secs {
            return Err(TokenError::Expired);
        }
    }
    if let Some(nbf) = claims.time_claim("nbf")? {
        if nbf > now_secs {
            return Err(TokenError::NotYetValid);
        }
    }

    Ok(claims)
}

/// Issue an HS256 token for `claims`.
pub fn sign(claims: &Claims, secret: &str) -> Result<String, TokenError> {
    let header = serde_json::to_vec(&TokenHeader::hs256())
        .map_err(|e| TokenError::Malformed(format!("header: {e}")))?;
    let payload = serde_json::to_vec(claims)
        .map_err(|e| TokenError::Malformed(format!("payload: {e}")))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(payload)
    );
    let signature = sign_input(secret, &signing_input)?;
    Ok(format!("{signing_input}.{signature}"))
}

/// Strip an optional `Bearer ` prefix from an Authorization header value.
pub fn extract_token(header: Option<&str>) -> Result<&str, TokenError> {
    let raw = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| TokenError::Malformed("missing Authorization header".to_string()))?;
    Ok(raw.strip_prefix("Bearer ").unwrap_or(raw))
}

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_LENIENT
        .decode(segment)
        .map_err(|e| TokenError::Malformed(format!("{what} is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("{what} is not valid JSON: {e}")))
}

/// HMAC-SHA256 over `input`, base64url-encoded without padding.
fn sign_input(secret: &str, input: &str) -> Result<String, TokenError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TokenError::Malformed(format!("invalid key: {e}")))?;
    mac.update(input.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Constant-time byte comparison (XOR-based).
///
/// Returns true if and only if `a == b`. Time taken is independent of
/// how many bytes match (mitigates timing attacks).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    const SECRET: &str = "9f2c4e6a8b0d1f3e5a7c9e1b3d5f7a9c";

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn valid_claims() -> Claims {
        Claims::new()
            .with("sub", "automation")
            .with("workflowId", "wf-1")
            .with("iat", now().timestamp())
            .with("exp", (now() + Duration::minutes(10)).timestamp())
    }

    /// Build a token from raw header/payload JSON, signed with `secret`.
    fn forge(header: serde_json::Value, payload: serde_json::Value, secret: &str) -> String {
        let input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(payload.to_string())
        );
        let sig = sign_input(secret, &input).unwrap();
        format!("{input}.{sig}")
    }

    #[test]
    fn test_sign_then_verify_returns_claims() {
        let claims = valid_claims();
        let token = sign(&claims, SECRET).unwrap();
        assert_eq!(verify(&token, SECRET, now()).unwrap(), claims);
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        assert!(matches!(verify("a.b", SECRET, now()), Err(TokenError::Malformed(_))));
        assert!(matches!(verify("a.b.c.d", SECRET, now()), Err(TokenError::Malformed(_))));
        assert!(matches!(verify("", SECRET, now()), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_non_json_payload_is_malformed() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode("not json");
        let token = format!("{header}.{payload}.sig");
        assert!(matches!(verify(&token, SECRET, now()), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_invalid_base64_is_malformed() {
        let token = "***.***.***";
        assert!(matches!(verify(token, SECRET, now()), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_padded_segments_are_accepted() {
        let header = base64::engine::general_purpose::URL_SAFE.encode(r#"{"alg":"HS256"}"#);
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"sub":"x"}"#);
        let input = format!("{header}.{payload}");
        let token = format!("{input}.{}", sign_input(SECRET, &input).unwrap());
        assert!(verify(&token, SECRET, now()).is_ok());
    }

    #[test]
    fn test_other_algorithms_rejected() {
        for alg in ["none", "HS512", "RS256", "hs256"] {
            let token = forge(json!({"alg": alg}), json!({"sub": "x"}), SECRET);
            assert_eq!(
                verify(&token, SECRET, now()),
                Err(TokenError::UnsupportedAlgorithm(alg.to_string()))
            );
        }
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let token = sign(&valid_claims(), SECRET).unwrap();
        assert_eq!(
            verify(&token, "another-secret", now()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_any_flipped_signature_bit_is_rejected() {
        let token = sign(&valid_claims(), SECRET).unwrap();
        let (signing_input, signature) = token.rsplit_once('.').unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(signature).unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                raw[byte] ^= 1 << bit;
                let tampered = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(&raw));
                assert_eq!(
                    verify(&tampered, SECRET, now()),
                    Err(TokenError::InvalidSignature),
                    "flip of byte {byte} bit {bit} accepted"
                );
                raw[byte] ^= 1 << bit;
            }
        }
    }

    #[test]
    fn test_signature_length_mismatch_rejected() {
        let token = sign(&valid_claims(), SECRET).unwrap();
        let truncated = &token[..token.len() - 1];
        assert_eq!(verify(truncated, SECRET, now()), Err(TokenError::InvalidSignature));

        let extended = format!("{token}A");
        assert_eq!(verify(&extended, SECRET, now()), Err(TokenError::InvalidSignature));

        let (signing_input, _) = token.rsplit_once('.').unwrap();
        let empty = format!("{signing_input}.");
        assert_eq!(verify(&empty, SECRET, now()), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = sign(&valid_claims(), SECRET).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"admin"}"#);
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert_eq!(verify(&tampered, SECRET, now()), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_expired_token() {
        let claims = valid_claims().with("exp", (now() - Duration::seconds(1)).timestamp());
        let token = sign(&claims, SECRET).unwrap();
        assert_eq!(verify(&token, SECRET, now()), Err(TokenError::Expired));
    }

    #[test]
    fn test_exp_equal_to_now_is_still_valid() {
        let claims = valid_claims().with("exp", now().timestamp());
        let token = sign(&claims, SECRET).unwrap();
        assert!(verify(&token, SECRET, now()).is_ok());
    }

    #[test]
    fn test_not_yet_valid_token() {
        let claims = valid_claims().with("nbf", (now() + Duration::seconds(30)).timestamp());
        let token = sign(&claims, SECRET).unwrap();
        assert_eq!(verify(&token, SECRET, now()), Err(TokenError::NotYetValid));
    }

    #[test]
    fn test_signature_checked_before_expiry() {
        // An expired token with a bad signature reports the signature failure.
        let claims = valid_claims().with("exp", 1);
        let token = sign(&claims, "other").unwrap();
        assert_eq!(verify(&token, SECRET, now()), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(extract_token(Some("abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert!(extract_token(None).is_err());
        assert!(extract_token(Some("   ")).is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer string"));
        assert!(constant_time_eq(b"", b""));
    }
}
