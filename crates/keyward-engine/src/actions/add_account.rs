use chrono::Utc;
use keyward_core::claims::AccountBody;
use keyward_core::types::EntityKind;
use keyward_sign::KeyPair;

use crate::context::ActionCtx;
use crate::editor::{ClaimEditor, EntityEdits};
use crate::entity::Entity;
use crate::error::{ActionError, ActionResult};
use crate::key_resolver::{require_key, resolve_key};
use crate::lifecycle::{ActionReport, EntityLifecycle};
use crate::store::{EntryRef, StoreError};
use crate::time_window::{TimeParams, TimeWindow};

/// `add account`: an account claim signed by the operator key.
#[derive(Debug)]
pub struct AddAccountParams {
    pub entity: Entity,
    pub time: TimeParams,
    pub tags: Vec<String>,
    /// Explicit operator key reference (`--operator-key`).
    pub operator_key: Option<String>,
    signer: Option<KeyPair>,
    window: TimeWindow,
}

impl Default for AddAccountParams {
    fn default() -> Self {
        Self {
            entity: Entity::new(EntityKind::Account),
            time: TimeParams::default(),
            tags: Vec::new(),
            operator_key: None,
            signer: None,
            window: TimeWindow::default(),
        }
    }
}

impl EntityLifecycle for AddAccountParams {
    fn set_defaults(&mut self, _ctx: &ActionCtx<'_>) -> ActionResult<()> {
        self.entity.set_defaults();
        Ok(())
    }

    fn pre_interactive(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()> {
        self.entity.edit_name(ctx.prompter)?;
        self.entity.edit_key(ctx.prompter, ctx.keys)?;
        self.time.edit(ctx.prompter)?;
        self.signer = resolve_key(ctx, EntityKind::Operator, self.operator_key.as_deref(), None)?;
        Ok(())
    }

    fn validate(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()> {
        self.entity.check_name()?;
        if ctx.store.operator_name()?.is_none() {
            return Err(StoreError::NoOperator.into());
        }
        if ctx.store.has(EntryRef::Account(&self.entity.name))? {
            return Err(ActionError::AlreadyExists {
                kind: EntityKind::Account,
                name: self.entity.name.clone(),
            });
        }
        if self.signer.is_none() {
            self.signer = Some(require_key(
                ctx,
                EntityKind::Operator,
                self.operator_key.as_deref(),
                None,
            )?);
        }
        if let Some(signer) = &self.signer {
            super::check_operator_signer(ctx, signer)?;
        }
        self.window = self.time.resolve(Utc::now())?;
        self.entity.valid(ctx.keys)
    }

    fn run(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<ActionReport> {
        let generated_key = self.entity.store_keys(ctx.keys)?;
        let mut claims = self.entity.new_claims::<AccountBody>()?;
        let edits = EntityEdits {
            window: self.window,
            tags: self.tags.clone(),
            remove_tags: Vec::new(),
        };
        edits.apply(&mut claims)?;
        let token_path = super::sign_and_store(
            ctx,
            EntryRef::Account(&self.entity.name),
            &mut claims,
            self.signer.as_ref(),
        )?;
        Ok(ActionReport {
            kind: EntityKind::Account,
            name: self.entity.name.clone(),
            scope: ctx.store.operator_name()?,
            public_key: claims.sub,
            token_path,
            generated_key,
        })
    }
}
