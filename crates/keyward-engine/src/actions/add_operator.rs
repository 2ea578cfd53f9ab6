use chrono::Utc;
use keyward_core::claims::OperatorBody;
use keyward_core::types::EntityKind;

use crate::context::ActionCtx;
use crate::editor::{ClaimEditor, EntityEdits, OperatorEdits};
use crate::entity::Entity;
use crate::error::{ActionError, ActionResult};
use crate::lifecycle::{ActionReport, EntityLifecycle};
use crate::store::EntryRef;
use crate::time_window::{TimeParams, TimeWindow};

/// `add operator`: creates the store's single, self-signed operator.
#[derive(Debug)]
pub struct AddOperatorParams {
    pub entity: Entity,
    pub time: TimeParams,
    pub tags: Vec<String>,
    pub account_server_url: Option<String>,
    window: TimeWindow,
}

impl Default for AddOperatorParams {
    fn default() -> Self {
        Self {
            entity: Entity::new(EntityKind::Operator),
            time: TimeParams::default(),
            tags: Vec::new(),
            account_server_url: None,
            window: TimeWindow::default(),
        }
    }
}

impl AddOperatorParams {
    fn edits(&self) -> OperatorEdits {
        OperatorEdits {
            common: EntityEdits {
                window: self.window,
                tags: self.tags.clone(),
                remove_tags: Vec::new(),
            },
            account_server_url: self.account_server_url.clone(),
        }
    }
}

impl EntityLifecycle for AddOperatorParams {
    fn set_defaults(&mut self, _ctx: &ActionCtx<'_>) -> ActionResult<()> {
        self.entity.set_defaults();
        Ok(())
    }

    fn pre_interactive(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()> {
        self.entity.edit_name(ctx.prompter)?;
        self.entity.edit_key(ctx.prompter, ctx.keys)?;
        self.time.edit(ctx.prompter)?;
        Ok(())
    }

    fn validate(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()> {
        self.entity.check_name()?;
        if let Some(existing) = ctx.store.operator_name()? {
            return Err(ActionError::AlreadyExists {
                kind: EntityKind::Operator,
                name: existing,
            });
        }
        self.window = self.time.resolve(Utc::now())?;
        self.entity.valid(ctx.keys)?;
        if self.entity.key_pair().is_none() {
            return Err(ActionError::key_resolution(
                EntityKind::Operator,
                "operator claims are self-signed, a seed is required",
            ));
        }
        Ok(())
    }

    fn run(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<ActionReport> {
        let generated_key = self.entity.store_keys(ctx.keys)?;
        let mut claims = self.entity.new_claims::<OperatorBody>()?;
        self.edits().apply(&mut claims)?;
        let token_path = super::sign_and_store(
            ctx,
            EntryRef::Operator(&self.entity.name),
            &mut claims,
            self.entity.key_pair(),
        )?;
        Ok(ActionReport {
            kind: EntityKind::Operator,
            name: self.entity.name.clone(),
            scope: None,
            public_key: claims.sub,
            token_path,
            generated_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::load_claims;
    use crate::lifecycle::run_action;
    use crate::prompt::NoPrompt;
    use crate::store::EntityStore;
    use crate::testing::Fixture;
    use keyward_sign::KeyPair;

    fn params(name: &str) -> AddOperatorParams {
        let mut p = AddOperatorParams::default();
        p.entity.name = name.into();
        p
    }

    #[test]
    fn creates_self_signed_operator() {
        let fx = Fixture::new();
        let p = NoPrompt;
        let ctx = fx.ctx(&p);
        let mut op = params("O");
        op.tags = vec!["prod".into()];
        op.account_server_url = Some("https://accounts.example".into());
        let report = run_action(&ctx, op).unwrap();
        assert!(report.generated_key.is_some());
        assert_eq!(fx.store.operator_name().unwrap().as_deref(), Some("O"));

        let claims = load_claims::<OperatorBody>(&ctx, EntryRef::Operator("O")).unwrap();
        assert_eq!(claims.iss, claims.sub);
        assert_eq!(claims.keyward.tags.as_slice(), ["prod"]);
        assert_eq!(
            claims.keyward.account_server_url.as_deref(),
            Some("https://accounts.example")
        );
    }

    #[test]
    fn second_operator_is_rejected() {
        let fx = Fixture::with_accounts(&[]);
        let p = NoPrompt;
        let err = run_action(&fx.ctx(&p), params("P")).unwrap_err();
        assert!(matches!(
            err,
            ActionError::AlreadyExists {
                kind: EntityKind::Operator,
                ..
            }
        ));
        assert_eq!(fx.key_count(EntityKind::Operator), 1);
    }

    #[test]
    fn public_key_only_cannot_self_sign() {
        let fx = Fixture::new();
        let p = NoPrompt;
        let mut op = params("O");
        op.entity.key_ref = Some(KeyPair::generate(EntityKind::Operator).public_key());
        let err = run_action(&fx.ctx(&p), op).unwrap_err();
        assert!(matches!(err, ActionError::KeyResolution { .. }));
        assert_eq!(fx.store.operator_name().unwrap(), None);
    }
}
