//! Locates the key pair a command needs to sign with.
//!
//! Resolution order: an explicit reference from the command's own flags,
//! then the ambient context (the owning scope's stored key), then, in
//! interactive mode only, a prompt.

use std::path::Path;

use keyward_core::claims::{AccountBody, OperatorBody};
use keyward_core::types::EntityKind;
use keyward_sign::keys::{is_seed, parse_public_key};
use keyward_sign::{token, KeyPair};

use crate::context::ActionCtx;
use crate::error::{ActionError, ActionResult};
use crate::store::{EntryRef, KeyStore};

/// Resolve a key for `role`.
///
/// `scope` names the account whose key is the contextual default for the
/// account role. Returns `Ok(None)` when nothing could be found and no
/// prompt was possible.
pub fn resolve_key(
    ctx: &ActionCtx<'_>,
    role: EntityKind,
    explicit: Option<&str>,
    scope: Option<&str>,
) -> ActionResult<Option<KeyPair>> {
    if let Some(reference) = explicit.filter(|r| !r.trim().is_empty()) {
        return resolve_reference(ctx.keys, role, reference).map(Some);
    }
    if let Some(kp) = context_key(ctx, role, scope)? {
        tracing::debug!(%role, public_key = %kp.public_key(), "resolved key from context");
        return Ok(Some(kp));
    }
    if ctx.interactive {
        return edit_key_path(ctx, role).map(Some);
    }
    Ok(None)
}

/// Like [`resolve_key`], but a missing key is an error.
pub fn require_key(
    ctx: &ActionCtx<'_>,
    role: EntityKind,
    explicit: Option<&str>,
    scope: Option<&str>,
) -> ActionResult<KeyPair> {
    resolve_key(ctx, role, explicit, scope)?.ok_or_else(|| {
        ActionError::key_resolution(
            role,
            format!("no stored {role} key found - specify one with --{role}-key"),
        )
    })
}

/// Resolve a path to a seed file, a literal seed, or a public key whose
/// seed is in the keystore.
pub fn resolve_reference(
    keys: &dyn KeyStore,
    role: EntityKind,
    reference: &str,
) -> ActionResult<KeyPair> {
    let reference = reference.trim();
    let path = Path::new(reference);
    let kp = if path.is_file() {
        let seed = std::fs::read_to_string(path)
            .map_err(|e| ActionError::key_resolution(role, format!("{}: {e}", path.display())))?;
        KeyPair::from_seed(&seed)
            .map_err(|e| ActionError::key_resolution(role, format!("{}: {e}", path.display())))?
    } else if is_seed(reference) {
        KeyPair::from_seed(reference)
            .map_err(|e| ActionError::key_resolution(role, e.to_string()))?
    } else if parse_public_key(reference).is_ok() {
        keys.find(reference)?.ok_or_else(|| {
            ActionError::key_resolution(role, format!("no seed stored for {reference}"))
        })?
    } else {
        let reason = "not a key file, seed or public key";
        return Err(ActionError::key_resolution(role, reason));
    };
    if kp.kind() != role {
        return Err(ActionError::key_resolution(
            role,
            format!("expected {role} key, got {} key", kp.kind()),
        ));
    }
    Ok(kp)
}

/// Prompt until the operator supplies a usable key reference.
pub fn edit_key_path(ctx: &ActionCtx<'_>, role: EntityKind) -> ActionResult<KeyPair> {
    let keys = ctx.keys;
    let check = |value: &str| {
        resolve_reference(keys, role, value)
            .map(|_| ())
            .map_err(|e| e.to_string())
    };
    let reference = ctx
        .prompter
        .input(&format!("path to {role} key or seed"), "", &check)?;
    resolve_reference(keys, role, &reference)
}

fn context_key(
    ctx: &ActionCtx<'_>,
    role: EntityKind,
    scope: Option<&str>,
) -> ActionResult<Option<KeyPair>> {
    let subject = match role {
        EntityKind::Operator => {
            let Some(op) = ctx.store.operator_name()? else {
                return Ok(None);
            };
            let token = ctx.store.read_token(EntryRef::Operator(&op))?;
            token::decode::<OperatorBody>(&token)?.sub
        }
        EntityKind::Account => {
            let Some(account) = scope.filter(|a| !a.is_empty()) else {
                return Ok(None);
            };
            if !ctx.store.has(EntryRef::Account(account))? {
                return Ok(None);
            }
            let token = ctx.store.read_token(EntryRef::Account(account))?;
            token::decode::<AccountBody>(&token)?.sub
        }
        // users never sign claims
        EntityKind::User => return Ok(None),
    };
    Ok(ctx.keys.find(&subject)?)
}
