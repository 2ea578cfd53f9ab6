//! Role-tagged ed25519 key pairs and their textual encodings.
//!
//! A public key is the role prefix (`O`, `A`, `U`) followed by the
//! base64url verifying key. A seed is `S`, the role prefix, then the
//! base64url secret.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use keyward_core::types::EntityKind;
use rand::rngs::OsRng;

const KEY_LEN: usize = 32;
const SEED_MARKER: char = 'S';

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid key prefix in {0:?}")]
    InvalidPrefix(String),
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid key encoding: {0}")]
    Encoding(String),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("signature verification failed")]
    BadSignature,
}

pub struct KeyPair {
    kind: EntityKind,
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn generate(kind: EntityKind) -> Self {
        Self {
            kind,
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Parse a textual seed (`S` + role prefix + secret).
    pub fn from_seed(seed: &str) -> Result<Self, KeyError> {
        let seed = seed.trim();
        let mut chars = seed.chars();
        if chars.next() != Some(SEED_MARKER) {
            return Err(KeyError::InvalidPrefix(redact(seed)));
        }
        let kind = chars
            .next()
            .and_then(EntityKind::from_prefix)
            .ok_or_else(|| KeyError::InvalidPrefix(redact(seed)))?;
        let secret = decode_key_bytes(&seed[2..])?;
        Ok(Self {
            kind,
            signing_key: SigningKey::from_bytes(&secret),
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn seed(&self) -> String {
        format!(
            "{SEED_MARKER}{}{}",
            self.kind.prefix(),
            URL_SAFE_NO_PAD.encode(self.signing_key.to_bytes())
        )
    }

    pub fn public_key(&self) -> String {
        encode_public_key(self.kind, &self.signing_key.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("kind", &self.kind)
            .field("public_key", &self.public_key())
            .finish()
    }
}

fn encode_public_key(kind: EntityKind, key: &VerifyingKey) -> String {
    format!("{}{}", kind.prefix(), URL_SAFE_NO_PAD.encode(key.as_bytes()))
}

fn decode_key_bytes(text: &str) -> Result<[u8; KEY_LEN], KeyError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|e| KeyError::Encoding(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::InvalidLength {
            expected: KEY_LEN,
            actual: bytes.len(),
        })
}

// Seeds must never end up in error messages verbatim.
fn redact(seed: &str) -> String {
    seed.chars().take(2).chain("...".chars()).collect()
}

/// True if the text looks like a seed rather than a public key.
pub fn is_seed(text: &str) -> bool {
    let mut chars = text.trim().chars();
    chars.next() == Some(SEED_MARKER) && chars.next().and_then(EntityKind::from_prefix).is_some()
}

/// Parse a textual public key into its role and verifying key.
pub fn parse_public_key(text: &str) -> Result<(EntityKind, VerifyingKey), KeyError> {
    let text = text.trim();
    let kind = text
        .chars()
        .next()
        .and_then(EntityKind::from_prefix)
        .ok_or_else(|| KeyError::InvalidPrefix(text.to_string()))?;
    let bytes = decode_key_bytes(&text[1..])?;
    let key =
        VerifyingKey::from_bytes(&bytes).map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;
    Ok((kind, key))
}

pub fn verify(public_key: &str, message: &[u8], signature: &[u8]) -> Result<(), KeyError> {
    let (_, key) = parse_public_key(public_key)?;
    let signature = Signature::from_slice(signature).map_err(|_| KeyError::BadSignature)?;
    key.verify(message, &signature)
        .map_err(|_| KeyError::BadSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_roundtrip_preserves_identity() {
        let kp = KeyPair::generate(EntityKind::User);
        let again = KeyPair::from_seed(&kp.seed()).unwrap();
        assert_eq!(again.kind(), EntityKind::User);
        assert_eq!(again.public_key(), kp.public_key());
        assert!(kp.seed().starts_with("SU"));
        assert!(kp.public_key().starts_with('U'));
    }

    #[test]
    fn public_key_parses_with_role() {
        let kp = KeyPair::generate(EntityKind::Account);
        let (kind, _) = parse_public_key(&kp.public_key()).unwrap();
        assert_eq!(kind, EntityKind::Account);
        assert!(!is_seed(&kp.public_key()));
        assert!(is_seed(&kp.seed()));
    }

    #[test]
    fn rejects_bad_prefix_and_length() {
        assert!(matches!(
            parse_public_key("Xabc"),
            Err(KeyError::InvalidPrefix(_))
        ));
        assert!(matches!(
            parse_public_key("UAAAA"),
            Err(KeyError::InvalidLength { expected: 32, .. })
        ));
        assert!(matches!(
            KeyPair::from_seed("SQxyz"),
            Err(KeyError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn sign_and_verify() {
        let kp = KeyPair::generate(EntityKind::Operator);
        let sig = kp.sign(b"payload");
        verify(&kp.public_key(), b"payload", &sig).unwrap();
        assert!(matches!(
            verify(&kp.public_key(), b"tampered", &sig),
            Err(KeyError::BadSignature)
        ));
    }

    #[test]
    fn debug_hides_secret() {
        let kp = KeyPair::generate(EntityKind::User);
        let dbg = format!("{kp:?}");
        assert!(!dbg.contains(&kp.seed()));
    }
}
