use chrono::{DateTime, Utc};
use keyward_core::claims::{UserBody, UserClaims};
use keyward_core::permissions::PermissionLists;
use keyward_core::types::EntityKind;
use keyward_sign::KeyPair;

use crate::context::ActionCtx;
use crate::editor::{ClaimEditor, EntityEdits, UserEdits};
use crate::error::{ActionError, ActionResult};
use crate::key_resolver::{require_key, resolve_key};
use crate::lifecycle::{ActionReport, EntityLifecycle};
use crate::prompt::PromptError;
use crate::store::EntryRef;
use crate::time_window::{TimeParams, TimeWindow};

/// `edit user`: re-issue an existing user claim with changes.
#[derive(Debug, Default)]
pub struct EditUserParams {
    pub name: String,
    pub account: String,
    pub account_key: Option<String>,
    pub permissions: PermissionLists,
    /// Patterns removed from every permission list (`--rm`).
    pub remove_permissions: Vec<String>,
    pub tags: Vec<String>,
    pub remove_tags: Vec<String>,
    pub src: Vec<String>,
    pub time: TimeParams,
    claims: Option<UserClaims>,
    signer: Option<KeyPair>,
    window: TimeWindow,
}

impl EditUserParams {
    fn edits(&self) -> UserEdits {
        UserEdits {
            common: EntityEdits {
                window: self.window,
                tags: self.tags.clone(),
                remove_tags: self.remove_tags.clone(),
            },
            permissions: self.permissions.clone(),
            remove_permissions: self.remove_permissions.clone(),
            src: self.src.clone(),
        }
    }

    fn pick_user(&self, ctx: &ActionCtx<'_>) -> ActionResult<String> {
        let users = ctx.store.list_users(&self.account)?;
        match users.len() {
            0 => Err(ActionError::NotFound {
                kind: EntityKind::User,
                name: format!("any user in {}", self.account),
            }),
            1 => Ok(users[0].clone()),
            _ => {
                let default = users.iter().position(|u| *u == self.name).unwrap_or(0);
                let idx = ctx.prompter.select("select user", &users, default)?;
                users
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| PromptError::Io(format!("selection {idx} out of range")).into())
            }
        }
    }
}

impl EntityLifecycle for EditUserParams {
    fn set_defaults(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()> {
        self.name = self.name.trim().to_string();
        if self.account.is_empty() {
            self.account = ctx.default_account()?.unwrap_or_default();
        }
        Ok(())
    }

    fn pre_interactive(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()> {
        self.account = ctx.pick_account(&self.account)?;
        self.name = self.pick_user(ctx)?;
        self.signer = resolve_key(
            ctx,
            EntityKind::Account,
            self.account_key.as_deref(),
            Some(&self.account),
        )?;
        Ok(())
    }

    fn load(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()> {
        if self.name.is_empty() || self.account.is_empty() {
            return Ok(());
        }
        let entry = EntryRef::User {
            account: &self.account,
            name: &self.name,
        };
        if ctx.store.has(entry)? {
            self.claims = Some(super::load_claims::<UserBody>(ctx, entry)?);
        }
        Ok(())
    }

    fn post_interactive(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()> {
        let Some(claims) = &self.claims else {
            return Ok(());
        };
        let current = claims.keyward.tags.as_slice().to_vec();
        // current bounds become the prompt defaults
        if self.time.start.is_none() {
            self.time.start = claims.nbf.and_then(rfc3339);
        }
        if self.time.expiry.is_none() {
            self.time.expiry = claims.exp.and_then(rfc3339);
        }
        self.time.edit(ctx.prompter)?;

        let mut initial = current.clone();
        initial.extend(self.tags.iter().filter(|t| !current.contains(t)).cloned());
        let edited = ctx.prompter.input_list("user tags", &initial)?;
        self.remove_tags = current.into_iter().filter(|t| !edited.contains(t)).collect();
        self.tags = edited;
        Ok(())
    }

    fn validate(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()> {
        if self.name.is_empty() {
            return Err(ActionError::usage("user name is required"));
        }
        ctx.require_account(&self.account)?;
        let Some(claims) = &self.claims else {
            return Err(ActionError::NotFound {
                kind: EntityKind::User,
                name: self.name.clone(),
            });
        };
        let (nbf, exp) = (claims.nbf, claims.exp);
        let signer = match self.signer.take() {
            Some(kp) => kp,
            None => require_key(
                ctx,
                EntityKind::Account,
                self.account_key.as_deref(),
                Some(&self.account),
            )?,
        };
        super::check_account_signer(ctx, &self.account, &signer)?;
        self.signer = Some(signer);
        self.window = self.time.resolve(Utc::now())?;
        self.window.check_order(nbf, exp)
    }

    fn run(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<ActionReport> {
        let edits = self.edits();
        let claims = self.claims.as_mut().ok_or_else(|| ActionError::NotFound {
            kind: EntityKind::User,
            name: self.name.clone(),
        })?;
        edits.apply(claims)?;
        let token_path = super::sign_and_store(
            ctx,
            EntryRef::User {
                account: &self.account,
                name: &self.name,
            },
            claims,
            self.signer.as_ref(),
        )?;
        Ok(ActionReport {
            kind: EntityKind::User,
            name: self.name.clone(),
            scope: Some(self.account.clone()),
            public_key: claims.sub.clone(),
            token_path,
            generated_key: None,
        })
    }
}

fn rfc3339(ts: i64) -> Option<String> {
    DateTime::from_timestamp(ts, 0).map(|t| t.to_rfc3339())
}
