use chrono::Utc;
use keyward_core::claims::UserBody;
use keyward_core::permissions::PermissionLists;
use keyward_core::types::EntityKind;
use keyward_sign::KeyPair;

use crate::context::ActionCtx;
use crate::editor::{ClaimEditor, EntityEdits, UserEdits};
use crate::entity::Entity;
use crate::error::{ActionError, ActionResult};
use crate::key_resolver::{require_key, resolve_key};
use crate::lifecycle::{ActionReport, EntityLifecycle};
use crate::store::EntryRef;
use crate::time_window::{TimeParams, TimeWindow};

/// `add user`: a user claim issued by its owning account.
#[derive(Debug)]
pub struct AddUserParams {
    pub entity: Entity,
    /// Owning account. Defaulted from context when empty.
    pub account: String,
    /// Explicit account key reference (`--account-key`).
    pub account_key: Option<String>,
    pub permissions: PermissionLists,
    pub tags: Vec<String>,
    pub src: Vec<String>,
    pub time: TimeParams,
    signer: Option<KeyPair>,
    window: TimeWindow,
}

impl Default for AddUserParams {
    fn default() -> Self {
        Self {
            entity: Entity::new(EntityKind::User),
            account: String::new(),
            account_key: None,
            permissions: PermissionLists::default(),
            tags: Vec::new(),
            src: Vec::new(),
            time: TimeParams::default(),
            signer: None,
            window: TimeWindow::default(),
        }
    }
}

impl AddUserParams {
    fn edits(&self) -> UserEdits {
        UserEdits {
            common: EntityEdits {
                window: self.window,
                tags: self.tags.clone(),
                remove_tags: Vec::new(),
            },
            permissions: self.permissions.clone(),
            remove_permissions: Vec::new(),
            src: self.src.clone(),
        }
    }
}

impl EntityLifecycle for AddUserParams {
    fn set_defaults(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()> {
        self.entity.set_defaults();
        if self.account.is_empty() {
            self.account = ctx.default_account()?.unwrap_or_default();
        }
        Ok(())
    }

    fn pre_interactive(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()> {
        self.entity.edit_name(ctx.prompter)?;
        self.entity.edit_key(ctx.prompter, ctx.keys)?;
        self.account = ctx.pick_account(&self.account)?;
        self.time.edit(ctx.prompter)?;
        self.signer = resolve_key(
            ctx,
            EntityKind::Account,
            self.account_key.as_deref(),
            Some(&self.account),
        )?;
        Ok(())
    }

    fn validate(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()> {
        self.entity.check_name()?;
        ctx.require_account(&self.account)?;
        let entry = EntryRef::User {
            account: &self.account,
            name: &self.entity.name,
        };
        if ctx.store.has(entry)? {
            return Err(ActionError::AlreadyExists {
                kind: EntityKind::User,
                name: self.entity.name.clone(),
            });
        }
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
        self.entity.valid(ctx.keys)
    }

    fn run(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<ActionReport> {
        let generated_key = self.entity.store_keys(ctx.keys)?;
        let mut claims = self.entity.new_claims::<UserBody>()?;
        self.edits().apply(&mut claims)?;
        let token_path = super::sign_and_store(
            ctx,
            EntryRef::User {
                account: &self.account,
                name: &self.entity.name,
            },
            &mut claims,
            self.signer.as_ref(),
        )?;
        Ok(ActionReport {
            kind: EntityKind::User,
            name: self.entity.name.clone(),
            scope: Some(self.account.clone()),
            public_key: claims.sub,
            token_path,
            generated_key,
        })
    }
}
