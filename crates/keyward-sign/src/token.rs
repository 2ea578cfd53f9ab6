use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use keyward_core::claims::{claim_kind, AnyClaims, ClaimBody, Claims};
use keyward_core::errors::CoreError;
use keyward_core::types::EntityKind;
use serde_json::Value;

use crate::canonical::{canonicalize, digest};
use crate::keys::{self, KeyError, KeyPair};

pub const ALGORITHM: &str = "ed25519";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("a {claim} claim cannot be issued by a {signer} key")]
    WrongSigner { claim: EntityKind, signer: EntityKind },
    #[error("expected a {expected} claim, found {found}")]
    TypeMismatch { expected: EntityKind, found: String },
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("cannot serialize claims: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Stamp issuer, issue time and `jti` onto the claims, then sign them.
///
/// The claims are updated in place so callers see what was signed.
pub fn encode<B: ClaimBody>(
    claims: &mut Claims<B>,
    signer: &KeyPair,
) -> Result<String, TokenError> {
    if signer.kind() != B::KIND.issuer() {
        return Err(TokenError::WrongSigner {
            claim: B::KIND,
            signer: signer.kind(),
        });
    }
    claims.iss = signer.public_key();
    claims.iat = chrono::Utc::now().timestamp();
    claims.jti = String::new();
    claims.jti = digest(&serde_json::to_value(&*claims)?);

    let header = serde_json::json!({ "alg": ALGORITHM, "typ": "JWT" });
    let payload = serde_json::to_value(&*claims)?;
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(canonicalize(&header)),
        URL_SAFE_NO_PAD.encode(canonicalize(&payload))
    );
    let signature = signer.sign(signing_input.as_bytes());
    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Verify a token and return its raw payload.
///
/// Checks the header algorithm, the signature against `iss`, and that the
/// issuer's role may issue claims of the payload's kind.
pub fn decode_value(token: &str) -> Result<Value, TokenError> {
    let token = token.trim();
    let parts: Vec<&str> = token.split('.').collect();
    let [header_b64, payload_b64, sig_b64] = parts.as_slice() else {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    };

    let header: Value = serde_json::from_slice(&decode_segment(header_b64)?)
        .map_err(|e| TokenError::Malformed(format!("header: {e}")))?;
    let alg = header.get("alg").and_then(Value::as_str).unwrap_or("");
    if alg != ALGORITHM {
        return Err(TokenError::Malformed(format!("unsupported algorithm {alg:?}")));
    }

    let payload: Value = serde_json::from_slice(&decode_segment(payload_b64)?)
        .map_err(|e| TokenError::Malformed(format!("payload: {e}")))?;
    let issuer = payload
        .get("iss")
        .and_then(Value::as_str)
        .ok_or_else(|| TokenError::Malformed("missing iss".into()))?;

    let signature = decode_segment(sig_b64)?;
    let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
    keys::verify(issuer, signing_input.as_bytes(), &signature)?;

    let kind = claim_kind(&payload).map_err(|e| TokenError::Malformed(e.to_string()))?;
    let (signer, _) = keys::parse_public_key(issuer)?;
    if signer != kind.issuer() {
        return Err(TokenError::WrongSigner { claim: kind, signer });
    }
    Ok(payload)
}

/// Decode a token into claims of a specific kind.
pub fn decode<B: ClaimBody>(token: &str) -> Result<Claims<B>, TokenError> {
    let payload = decode_value(token)?;
    Claims::from_value(payload).map_err(map_core_error)
}

pub fn decode_any(token: &str) -> Result<AnyClaims, TokenError> {
    let payload = decode_value(token)?;
    AnyClaims::from_value(payload).map_err(map_core_error)
}

fn map_core_error(err: CoreError) -> TokenError {
    match err {
        CoreError::BodyMismatch { expected, found } => TokenError::TypeMismatch { expected, found },
        other => TokenError::Malformed(other.to_string()),
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(format!("bad base64 segment: {e}")))
}
