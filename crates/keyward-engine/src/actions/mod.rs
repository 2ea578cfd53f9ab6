//! Parameter objects for every entity-mutation command.
//!
//! Each implements [`EntityLifecycle`](crate::lifecycle::EntityLifecycle)
//! and is driven by [`run_action`](crate::lifecycle::run_action).

pub mod add_account;
pub mod add_operator;
pub mod add_user;
pub mod edit_user;

use std::path::PathBuf;

use keyward_core::claims::{AccountBody, ClaimBody, Claims, OperatorBody};
use keyward_core::types::EntityKind;
use keyward_sign::{token, KeyPair};

use crate::context::ActionCtx;
use crate::error::{ActionError, ActionResult};
use crate::store::{EntryRef, StoreError};

/// Read and decode a stored claim, checking its kind.
pub fn load_claims<B: ClaimBody>(
    ctx: &ActionCtx<'_>,
    entry: EntryRef<'_>,
) -> ActionResult<Claims<B>> {
    let token = ctx.store.read_token(entry)?;
    Ok(token::decode::<B>(&token)?)
}

/// Sign `claims` and persist the token.
pub(crate) fn sign_and_store<B: ClaimBody>(
    ctx: &ActionCtx<'_>,
    entry: EntryRef<'_>,
    claims: &mut Claims<B>,
    signer: Option<&KeyPair>,
) -> ActionResult<PathBuf> {
    let signer = signer.ok_or_else(|| {
        ActionError::key_resolution(B::KIND.issuer(), "signing key was not resolved")
    })?;
    let token = token::encode(claims, signer)?;
    let path = ctx.store.write_token(entry, &token)?;
    tracing::info!(
        kind = %B::KIND,
        name = entry.name(),
        path = %path.display(),
        "claim written"
    );
    Ok(path)
}

/// Fail unless `signer` is the account's identity or one of its signing keys.
pub(crate) fn check_account_signer(
    ctx: &ActionCtx<'_>,
    account: &str,
    signer: &KeyPair,
) -> ActionResult<()> {
    let claims = load_claims::<AccountBody>(ctx, EntryRef::Account(account))?;
    let public_key = signer.public_key();
    if claims.sub == public_key || claims.keyward.signing_keys.contains(&public_key) {
        return Ok(());
    }
    Err(ActionError::key_resolution(
        EntityKind::Account,
        format!("{public_key} is not a signing key of account {account:?}"),
    ))
}

/// Fail unless `signer` is the store operator's identity or one of its signing keys.
pub(crate) fn check_operator_signer(ctx: &ActionCtx<'_>, signer: &KeyPair) -> ActionResult<()> {
    let operator = ctx.store.operator_name()?.ok_or(StoreError::NoOperator)?;
    let claims = load_claims::<OperatorBody>(ctx, EntryRef::Operator(&operator))?;
    let public_key = signer.public_key();
    if claims.sub == public_key || claims.keyward.signing_keys.contains(&public_key) {
        return Ok(());
    }
    Err(ActionError::key_resolution(
        EntityKind::Operator,
        format!("{public_key} is not a signing key of operator {operator:?}"),
    ))
}
