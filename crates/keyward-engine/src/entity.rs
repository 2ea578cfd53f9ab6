use std::path::PathBuf;

use keyward_core::claims::{ClaimBody, Claims};
use keyward_core::types::EntityKind;
use keyward_sign::keys::{is_seed, parse_public_key};
use keyward_sign::KeyPair;

use crate::error::{ActionError, ActionResult};
use crate::key_resolver::resolve_reference;
use crate::prompt::{non_empty, Prompter};
use crate::store::KeyStore;

/// The subject key of the entity being created.
#[derive(Debug)]
pub enum EntityKey {
    /// Freshly generated, not yet persisted.
    Generated(KeyPair),
    /// Supplied by the operator as a seed or seed file.
    Seed(KeyPair),
    /// Only the public half is known; nothing to store.
    Public(String),
}

impl EntityKey {
    pub fn public_key(&self) -> String {
        match self {
            EntityKey::Generated(kp) | EntityKey::Seed(kp) => kp.public_key(),
            EntityKey::Public(pk) => pk.clone(),
        }
    }
}

/// Identity and key material of the entity a command creates.
#[derive(Debug)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    /// Public key, seed, or path to a seed file given with `--public-key`.
    pub key_ref: Option<String>,
    pub generate: bool,
    key: Option<EntityKey>,
}

impl Entity {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            name: String::new(),
            kind,
            key_ref: None,
            generate: false,
            key: None,
        }
    }

    pub fn set_defaults(&mut self) {
        self.name = self.name.trim().to_string();
        let reference = self.key_ref.as_deref().unwrap_or_default();
        if reference.trim().is_empty() {
            self.key_ref = None;
            self.generate = true;
        }
    }

    pub fn edit_name(&mut self, prompter: &dyn Prompter) -> ActionResult<()> {
        let label = format!("{} name", self.kind);
        self.name = prompter
            .input(&label, &self.name, &non_empty)?
            .trim()
            .to_string();
        Ok(())
    }

    /// Ask whether to generate a key, and for a reference if not.
    pub fn edit_key(&mut self, prompter: &dyn Prompter, keys: &dyn KeyStore) -> ActionResult<()> {
        let label = format!("generate a new {} key", self.kind);
        self.generate = prompter.confirm(&label, self.generate)?;
        if self.generate {
            self.key_ref = None;
            return Ok(());
        }
        let kind = self.kind;
        let check = |value: &str| {
            subject_key(keys, kind, value)
                .map(|_| ())
                .map_err(|e| e.to_string())
        };
        let current = self.key_ref.clone().unwrap_or_default();
        let reference = prompter.input(
            &format!("path to a {kind} seed, or a public key"),
            &current,
            &check,
        )?;
        self.key_ref = Some(reference);
        Ok(())
    }

    /// The `name required` rule, with usage shown again on failure.
    pub fn check_name(&self) -> ActionResult<()> {
        if self.name.trim().is_empty() {
            return Err(ActionError::usage(format!("{} name is required", self.kind)));
        }
        Ok(())
    }

    /// Check the name and settle the subject key. Nothing is persisted.
    pub fn valid(&mut self, keys: &dyn KeyStore) -> ActionResult<()> {
        self.check_name()?;
        let key = match (&self.key_ref, self.generate) {
            (Some(reference), _) => subject_key(keys, self.kind, reference)?,
            (None, true) => EntityKey::Generated(KeyPair::generate(self.kind)),
            (None, false) => {
                return Err(ActionError::key_resolution(
                    self.kind,
                    "no key given and generation disabled",
                ))
            }
        };
        self.key = Some(key);
        Ok(())
    }

    pub fn public_key(&self) -> Option<String> {
        self.key.as_ref().map(EntityKey::public_key)
    }

    /// The subject key pair, when its seed is known.
    pub fn key_pair(&self) -> Option<&KeyPair> {
        match &self.key {
            Some(EntityKey::Generated(kp) | EntityKey::Seed(kp)) => Some(kp),
            _ => None,
        }
    }

    /// Persist the subject seed, if we hold one.
    ///
    /// Returns the seed path only when the key was generated here, so the
    /// caller can tell the operator where it went.
    pub fn store_keys(&self, keys: &dyn KeyStore) -> ActionResult<Option<PathBuf>> {
        match &self.key {
            Some(EntityKey::Generated(kp)) => {
                let path = keys.store(kp)?;
                tracing::info!(
                    kind = %self.kind,
                    name = %self.name,
                    path = %path.display(),
                    "generated key"
                );
                Ok(Some(path))
            }
            Some(EntityKey::Seed(kp)) => {
                keys.store(kp)?;
                Ok(None)
            }
            Some(EntityKey::Public(_)) | None => Ok(None),
        }
    }

    /// A blank claim for this entity.
    pub fn new_claims<B: ClaimBody>(&self) -> ActionResult<Claims<B>> {
        if B::KIND != self.kind {
            return Err(ActionError::ClaimTypeMismatch {
                expected: self.kind,
                found: B::KIND.to_string(),
            });
        }
        let subject = self.public_key().ok_or_else(|| {
            ActionError::key_resolution(self.kind, "subject key was not resolved")
        })?;
        Ok(Claims::new(subject, self.name.clone()))
    }
}

fn subject_key(keys: &dyn KeyStore, kind: EntityKind, reference: &str) -> ActionResult<EntityKey> {
    let reference = reference.trim();
    if !is_seed(reference) {
        if let Ok((found, _)) = parse_public_key(reference) {
            if found != kind {
                return Err(ActionError::key_resolution(
                    kind,
                    format!("expected {kind} public key, got {found} key"),
                ));
            }
            return Ok(match keys.find(reference)? {
                Some(kp) => EntityKey::Seed(kp),
                None => EntityKey::Public(reference.to_string()),
            });
        }
    }
    resolve_reference(keys, kind, reference).map(EntityKey::Seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Answer, Fixture, ScriptedPrompter};
    use keyward_core::claims::{AccountBody, UserBody};

    #[test]
    fn defaults_to_generation() {
        let fx = Fixture::new();
        let mut e = Entity::new(EntityKind::User);
        e.name = " u ".into();
        e.set_defaults();
        assert!(e.generate);
        e.valid(&fx.keys).unwrap();
        assert!(matches!(e.key, Some(EntityKey::Generated(_))));
        assert_eq!(e.name, "u");
        assert_eq!(fx.key_count(EntityKind::User), 0);

        let path = e.store_keys(&fx.keys).unwrap().unwrap();
        assert!(path.exists());
        assert_eq!(fx.key_count(EntityKind::User), 1);
    }

    #[test]
    fn empty_name_shows_usage() {
        let fx = Fixture::new();
        let mut e = Entity::new(EntityKind::User);
        e.set_defaults();
        let err = e.valid(&fx.keys).unwrap_err();
        assert!(err.shows_usage());
        assert_eq!(err.to_string(), "user name is required");
    }

    #[test]
    fn public_key_reference_stores_nothing() {
        let fx = Fixture::new();
        let kp = KeyPair::generate(EntityKind::User);
        let mut e = Entity::new(EntityKind::User);
        e.name = "u".into();
        e.key_ref = Some(kp.public_key());
        e.set_defaults();
        assert!(!e.generate);
        e.valid(&fx.keys).unwrap();
        assert_eq!(e.public_key(), Some(kp.public_key()));
        assert_eq!(e.store_keys(&fx.keys).unwrap(), None);
        assert_eq!(fx.key_count(EntityKind::User), 0);
    }

    #[test]
    fn wrong_role_public_key_is_rejected() {
        let fx = Fixture::new();
        let mut e = Entity::new(EntityKind::User);
        e.name = "u".into();
        e.key_ref = Some(KeyPair::generate(EntityKind::Account).public_key());
        e.set_defaults();
        assert!(matches!(
            e.valid(&fx.keys),
            Err(ActionError::KeyResolution { .. })
        ));
    }

    #[test]
    fn claims_must_match_entity_kind() {
        let fx = Fixture::new();
        let mut e = Entity::new(EntityKind::User);
        e.name = "u".into();
        e.set_defaults();
        e.valid(&fx.keys).unwrap();
        assert!(e.new_claims::<UserBody>().is_ok());
        assert!(matches!(
            e.new_claims::<AccountBody>(),
            Err(ActionError::ClaimTypeMismatch { .. })
        ));
    }

    #[test]
    fn edit_key_asks_for_reference_when_not_generating() {
        let fx = Fixture::new();
        let kp = KeyPair::generate(EntityKind::User);
        let p = ScriptedPrompter::new(vec![Answer::Confirm(false), Answer::Text(kp.seed())]);
        let mut e = Entity::new(EntityKind::User);
        e.generate = true;
        e.edit_key(&p, &fx.keys).unwrap();
        assert!(!e.generate);
        assert_eq!(e.key_ref.as_deref(), Some(kp.seed().as_str()));
    }
}
