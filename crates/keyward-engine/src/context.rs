use keyward_core::types::EntityKind;

use crate::error::{ActionError, ActionResult};
use crate::prompt::{PromptError, Prompter};
use crate::store::{EntityStore, EntryRef, KeyStore};

/// Collaborators and ambient state shared by every phase of one invocation.
pub struct ActionCtx<'a> {
    pub store: &'a dyn EntityStore,
    pub keys: &'a dyn KeyStore,
    pub prompter: &'a dyn Prompter,
    /// Gates the PreInteractive and PostInteractive phases.
    pub interactive: bool,
    /// Account selected in the tool configuration, if any.
    pub current_account: Option<String>,
}

impl<'a> ActionCtx<'a> {
    pub fn new(
        store: &'a dyn EntityStore,
        keys: &'a dyn KeyStore,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            store,
            keys,
            prompter,
            interactive: false,
            current_account: None,
        }
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_current_account(mut self, account: Option<String>) -> Self {
        self.current_account = account;
        self
    }

    pub fn account_candidates(&self) -> ActionResult<Vec<String>> {
        Ok(self.store.list_accounts()?)
    }

    /// The configured account if it still exists, else the only account.
    ///
    /// `None` when there are zero or several accounts and none is configured.
    pub fn default_account(&self) -> ActionResult<Option<String>> {
        let candidates = self.account_candidates()?;
        if let Some(current) = &self.current_account {
            if candidates.contains(current) {
                return Ok(Some(current.clone()));
            }
            tracing::debug!(account = %current, "configured account no longer exists");
        }
        Ok(match candidates.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        })
    }

    /// Choose the owning account, prompting only when there is a real choice.
    pub fn pick_account(&self, current: &str) -> ActionResult<String> {
        let candidates = self.account_candidates()?;
        match candidates.len() {
            0 => Err(ActionError::AmbiguousScope {
                kind: EntityKind::Account,
                count: 0,
            }),
            1 => Ok(candidates[0].clone()),
            _ => {
                let default = candidates.iter().position(|a| a == current).unwrap_or(0);
                let idx = self.prompter.select("select account", &candidates, default)?;
                match candidates.get(idx) {
                    Some(account) => Ok(account.clone()),
                    None => Err(PromptError::Io(format!("no account at {idx}")).into()),
                }
            }
        }
    }

    /// Fail unless `account` names an existing account.
    ///
    /// An empty name is an ambiguity, reported with the candidate count.
    pub fn require_account(&self, account: &str) -> ActionResult<()> {
        if account.is_empty() {
            return Err(ActionError::AmbiguousScope {
                kind: EntityKind::Account,
                count: self.account_candidates()?.len(),
            });
        }
        if !self.store.has(EntryRef::Account(account))? {
            return Err(ActionError::NotFound {
                kind: EntityKind::Account,
                name: account.to_string(),
            });
        }
        Ok(())
    }
}
