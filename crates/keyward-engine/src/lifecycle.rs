//! The action lifecycle: one ordered pass of phases per command invocation.

use std::path::PathBuf;

use keyward_core::types::EntityKind;
use serde::Serialize;

use crate::context::ActionCtx;
use crate::error::ActionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    SetDefaults,
    PreInteractive,
    Load,
    PostInteractive,
    Validate,
    Run,
}

impl Phase {
    pub const ORDER: [Phase; 6] = [
        Phase::SetDefaults,
        Phase::PreInteractive,
        Phase::Load,
        Phase::PostInteractive,
        Phase::Validate,
        Phase::Run,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::SetDefaults => "set_defaults",
            Phase::PreInteractive => "pre_interactive",
            Phase::Load => "load",
            Phase::PostInteractive => "post_interactive",
            Phase::Validate => "validate",
            Phase::Run => "run",
        }
    }

    /// Phases that only run when the invocation is interactive.
    pub fn is_interactive_only(self) -> bool {
        matches!(self, Phase::PreInteractive | Phase::PostInteractive)
    }
}

/// What a successful command did, for the CLI to report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub kind: EntityKind,
    pub name: String,
    /// Owning scope, e.g. the account of a user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub public_key: String,
    pub token_path: PathBuf,
    /// Where a newly generated seed was stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_key: Option<PathBuf>,
}

/// Capability set every entity-mutation command implements.
///
/// Only `run` may have side effects on the store or keystore.
pub trait EntityLifecycle {
    /// Fill in unambiguous defaults. Must not fail on missing optional data.
    fn set_defaults(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()>;

    /// Prompt for anything still unset.
    fn pre_interactive(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()>;

    /// Fetch data that depends on the resolved identity.
    fn load(&mut self, _ctx: &ActionCtx<'_>) -> ActionResult<()> {
        Ok(())
    }

    fn post_interactive(&mut self, _ctx: &ActionCtx<'_>) -> ActionResult<()> {
        Ok(())
    }

    /// Enforce every invariant. Runs in both modes.
    fn validate(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<()>;

    fn run(&mut self, ctx: &ActionCtx<'_>) -> ActionResult<ActionReport>;
}

/// Drive `params` through every phase in order.
///
/// The first failing phase ends the invocation; nothing after it runs.
/// `params` is consumed, so it cannot be run twice.
pub fn run_action<P: EntityLifecycle>(
    ctx: &ActionCtx<'_>,
    mut params: P,
) -> ActionResult<ActionReport> {
    for phase in Phase::ORDER.into_iter().filter(|p| *p != Phase::Run) {
        if phase.is_interactive_only() && !ctx.interactive {
            tracing::debug!(phase = phase.as_str(), "skipped (non-interactive)");
            continue;
        }
        let result = match phase {
            Phase::SetDefaults => params.set_defaults(ctx),
            Phase::PreInteractive => params.pre_interactive(ctx),
            Phase::Load => params.load(ctx),
            Phase::PostInteractive => params.post_interactive(ctx),
            Phase::Validate => params.validate(ctx),
            Phase::Run => Ok(()),
        };
        logged(phase, result)?;
    }
    logged(Phase::Run, params.run(ctx))
}

fn logged<T>(phase: Phase, result: ActionResult<T>) -> ActionResult<T> {
    match &result {
        Ok(_) => tracing::debug!(phase = phase.as_str(), "done"),
        Err(err) => tracing::warn!(phase = phase.as_str(), error = %err, "phase failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use crate::prompt::NoPrompt;
    use crate::testing::Fixture;
    use std::cell::RefCell;

    struct Recorder<'a> {
        seen: &'a RefCell<Vec<Phase>>,
        fail_at: Option<Phase>,
    }

    impl Recorder<'_> {
        fn step(&self, phase: Phase) -> ActionResult<()> {
            self.seen.borrow_mut().push(phase);
            if self.fail_at == Some(phase) {
                return Err(ActionError::validation(phase.as_str()));
            }
            Ok(())
        }
    }

    impl EntityLifecycle for Recorder<'_> {
        fn set_defaults(&mut self, _: &ActionCtx<'_>) -> ActionResult<()> {
            self.step(Phase::SetDefaults)
        }
        fn pre_interactive(&mut self, _: &ActionCtx<'_>) -> ActionResult<()> {
            self.step(Phase::PreInteractive)
        }
        fn load(&mut self, _: &ActionCtx<'_>) -> ActionResult<()> {
            self.step(Phase::Load)
        }
        fn post_interactive(&mut self, _: &ActionCtx<'_>) -> ActionResult<()> {
            self.step(Phase::PostInteractive)
        }
        fn validate(&mut self, _: &ActionCtx<'_>) -> ActionResult<()> {
            self.step(Phase::Validate)
        }
        fn run(&mut self, _: &ActionCtx<'_>) -> ActionResult<ActionReport> {
            self.step(Phase::Run)?;
            Ok(ActionReport {
                kind: EntityKind::User,
                name: "u".into(),
                scope: None,
                public_key: "U".into(),
                token_path: PathBuf::from("u.jwt"),
                generated_key: None,
            })
        }
    }

    fn run(interactive: bool, fail_at: Option<Phase>) -> (ActionResult<ActionReport>, Vec<Phase>) {
        let fx = Fixture::new();
        let p = NoPrompt;
        let ctx = fx.ctx(&p).with_interactive(interactive);
        let seen = RefCell::new(Vec::new());
        let result = run_action(&ctx, Recorder { seen: &seen, fail_at });
        (result, seen.into_inner())
    }

    #[test]
    fn interactive_runs_every_phase_in_order() {
        let (result, seen) = run(true, None);
        assert!(result.is_ok());
        assert_eq!(seen, Phase::ORDER);
    }

    #[test]
    fn non_interactive_skips_prompt_phases_only() {
        let (result, seen) = run(false, None);
        assert!(result.is_ok());
        assert_eq!(
            seen,
            [Phase::SetDefaults, Phase::Load, Phase::Validate, Phase::Run]
        );
    }

    #[test]
    fn failure_stops_later_phases() {
        let (result, seen) = run(false, Some(Phase::Validate));
        assert!(result.is_err());
        assert_eq!(seen.last(), Some(&Phase::Validate));
        assert!(!seen.contains(&Phase::Run));

        let (_, seen) = run(true, Some(Phase::PreInteractive));
        assert_eq!(seen, [Phase::SetDefaults, Phase::PreInteractive]);
    }
}
