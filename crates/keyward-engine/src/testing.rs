//! Fixtures shared by the engine's unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use keyward_core::types::EntityKind;
use keyward_sign::KeyPair;
use tempfile::TempDir;

use crate::actions::add_account::AddAccountParams;
use crate::actions::add_operator::AddOperatorParams;
use crate::context::ActionCtx;
use crate::lifecycle::run_action;
use crate::prompt::{PromptError, Prompter, Validator};
use crate::store::{EntityStore, EntryRef, FsKeyStore, FsStore, KeyStore};

#[derive(Debug, Clone)]
pub enum Answer {
    Select(usize),
    Text(String),
    List(Vec<String>),
    Confirm(bool),
    Abort,
}

/// Prompter replaying canned answers and recording every label asked.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<Answer>>,
    pub asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: RefCell::new(answers.into()),
            asked: RefCell::new(Vec::new()),
        }
    }

    fn next(&self, label: &str) -> Result<Answer, PromptError> {
        self.asked.borrow_mut().push(label.to_string());
        match self.answers.borrow_mut().pop_front() {
            None | Some(Answer::Abort) => Err(PromptError::Aborted),
            Some(answer) => Ok(answer),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.borrow().len()
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&self, label: &str, items: &[String], _default: usize) -> Result<usize, PromptError> {
        match self.next(label)? {
            Answer::Select(i) if i < items.len() => Ok(i),
            other => panic!("unexpected answer {other:?} for select {label:?}"),
        }
    }

    fn input(
        &self,
        label: &str,
        default: &str,
        validate: Validator<'_>,
    ) -> Result<String, PromptError> {
        loop {
            let value = match self.next(label)? {
                Answer::Text(t) if t.is_empty() => default.to_string(),
                Answer::Text(t) => t,
                other => panic!("unexpected answer {other:?} for input {label:?}"),
            };
            if validate(&value).is_ok() {
                return Ok(value);
            }
        }
    }

    fn input_list(&self, label: &str, _initial: &[String]) -> Result<Vec<String>, PromptError> {
        match self.next(label)? {
            Answer::List(items) => Ok(items),
            other => panic!("unexpected answer {other:?} for list {label:?}"),
        }
    }

    fn confirm(&self, label: &str, _default: bool) -> Result<bool, PromptError> {
        match self.next(label)? {
            Answer::Confirm(b) => Ok(b),
            other => panic!("unexpected answer {other:?} for confirm {label:?}"),
        }
    }
}

/// A temporary store and keystore.
pub struct Fixture {
    _dir: TempDir,
    pub store: FsStore,
    pub keys: FsKeyStore,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().join("store"));
        let keys = FsKeyStore::new(dir.path().join("keys"));
        Self {
            _dir: dir,
            store,
            keys,
        }
    }

    /// Fixture with operator `O` and the given accounts already created.
    pub fn with_accounts(accounts: &[&str]) -> Self {
        let fx = Self::new();
        let prompter = crate::prompt::NoPrompt;
        let ctx = fx.ctx(&prompter);
        let mut op = AddOperatorParams::default();
        op.entity.name = "O".into();
        run_action(&ctx, op).unwrap();
        for name in accounts {
            let mut acct = AddAccountParams::default();
            acct.entity.name = (*name).into();
            run_action(&ctx, acct).unwrap();
        }
        fx
    }

    pub fn ctx<'a>(&'a self, prompter: &'a dyn Prompter) -> ActionCtx<'a> {
        ActionCtx::new(&self.store, &self.keys, prompter)
    }

    pub fn account_key(&self, account: &str) -> KeyPair {
        let token = self.store.read_token(EntryRef::Account(account)).unwrap();
        let claims = keyward_sign::token::decode_any(&token).unwrap();
        self.keys.find(claims.subject()).unwrap().unwrap()
    }

    pub fn key_count(&self, kind: EntityKind) -> usize {
        self.keys.list(kind).unwrap().len()
    }
}
