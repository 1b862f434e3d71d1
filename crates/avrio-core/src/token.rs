//! Access token payload decoding.
//!
//! Access tokens issued by the scheduler service are JWTs. The client never
//! verifies signatures; it only reads the claims segment to learn the email
//! address the token was issued for.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::{Map, Value};
use thiserror::Error;

/// Lenient base64url: unused bits in the final symbol are ignored and
/// padding is optional.
const CLAIMS_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors raised while reading claims from an access token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token is not made of exactly three dot-separated segments.
    #[error("Invalid JWT token format.")]
    InvalidFormat,

    /// The claims segment is not valid base64url or UTF-8.
    #[error("base64 decode: {0}")]
    Decode(String),

    /// The claims segment is not a JSON object.
    #[error("parsing claims: {0}")]
    Claims(String),

    /// The claims carry no usable `email`.
    #[error("Email key not found in the JWT payload.")]
    MissingEmail,
}

/// Extract the `email` claim from an access token.
///
/// # Errors
///
/// Returns an error if the token is malformed or has no non-empty `email`
/// string claim.
pub fn extract_email(token: &str) -> Result<String, TokenError> {
    let claims = decode_claims(token)?;
    claims
        .get("email")
        .and_then(Value::as_str)
        .filter(|email| !email.is_empty())
        .map(str::to_string)
        .ok_or(TokenError::MissingEmail)
}

/// Decode the claims (middle) segment of a three-part token.
///
/// # Errors
///
/// Returns an error if the token does not have three segments or the claims
/// segment does not decode to a JSON object.
pub fn decode_claims(token: &str) -> Result<Map<String, Value>, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::InvalidFormat);
    }

    let payload = base64_url_decode(parts[1])?;

    match serde_json::from_str(&payload).map_err(|e| TokenError::Claims(e.to_string()))? {
        Value::Object(claims) => Ok(claims),
        other => Err(TokenError::Claims(format!("expected a JSON object, got {other}"))),
    }
}

fn base64_url_decode(input: &str) -> Result<String, TokenError> {
    let padded = match input.len() % 4 {
        0 => input.to_string(),
        n => format!("{input}{}", "=".repeat(4 - n)),
    };

    let decoded = CLAIMS_ENGINE
        .decode(padded)
        .map_err(|e| TokenError::Decode(e.to_string()))?;

    String::from_utf8(decoded).map_err(|e| TokenError::Decode(format!("invalid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn token_with_claims(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    #[test]
    fn extracts_email_round_trip() {
        let token = token_with_claims(&json!({"email": "x@y.com"}));
        assert_eq!(extract_email(&token).expect("email"), "x@y.com");
    }

    #[test]
    fn decodes_url_safe_alphabet_without_padding() {
        let claims = json!({"email": "x@y.com", "name": "???>>>"});
        let token = token_with_claims(&claims);
        let payload = token.split('.').nth(1).expect("payload segment");
        assert!(payload.contains('_') && payload.contains('-'));
        assert_eq!(payload.len() % 4, 3);

        assert_eq!(extract_email(&token).expect("email"), "x@y.com");
    }

    #[test]
    fn ignores_nonzero_trailing_bits_in_last_symbol() {
        // canonical encoding ends in 'Q'; 'R' sets an unused low bit
        let token = "eyJhbGciOiJIUzI1NiJ9.eyJlbWFpbCI6InhAeS5jb20ifR.sig";
        assert_eq!(extract_email(token).expect("email"), "x@y.com");
    }

    #[test]
    fn rejects_tokens_without_three_segments() {
        for token in ["onlyone", "two.parts", "a.b.c.d"] {
            let err = extract_email(token).expect_err("format error");
            assert!(matches!(err, TokenError::InvalidFormat), "{token}: {err}");
        }
    }

    #[test]
    fn missing_email_claim_is_reported() {
        let token = token_with_claims(&json!({"sub": "1234"}));
        let err = extract_email(&token).expect_err("missing claim");
        assert!(matches!(err, TokenError::MissingEmail));
        assert_eq!(err.to_string(), "Email key not found in the JWT payload.");
    }

    #[test]
    fn empty_or_non_string_email_counts_as_missing() {
        for claims in [json!({"email": ""}), json!({"email": 42})] {
            let token = token_with_claims(&claims);
            assert!(matches!(
                extract_email(&token),
                Err(TokenError::MissingEmail)
            ));
        }
    }

    #[test]
    fn garbage_payload_names_the_cause() {
        let err = extract_email("header.!!!.sig").expect_err("decode error");
        assert!(matches!(err, TokenError::Decode(_)));

        let not_json = URL_SAFE_NO_PAD.encode("not json");
        let err = extract_email(&format!("h.{not_json}.s")).expect_err("claims error");
        assert!(err.to_string().starts_with("parsing claims:"));

        let array = URL_SAFE_NO_PAD.encode("[1,2]");
        let err = decode_claims(&format!("h.{array}.s")).expect_err("not an object");
        assert!(matches!(err, TokenError::Claims(_)));
    }
}
