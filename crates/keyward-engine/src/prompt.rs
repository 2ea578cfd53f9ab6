//! Prompt surface used by the interactive phases.
//!
//! The engine only talks to [`Prompter`]; the CLI supplies a terminal
//! implementation and non-interactive runs get [`NoPrompt`].

/// Rejects an answer with a message shown to the operator.
pub type Validator<'a> = &'a dyn Fn(&str) -> Result<(), String>;

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("aborted by operator")]
    Aborted,
    #[error("no interactive terminal available")]
    Unavailable,
    #[error("prompt failed: {0}")]
    Io(String),
}

pub trait Prompter {
    /// Single-choice picker, returns the chosen index.
    fn select(&self, label: &str, items: &[String], default: usize) -> Result<usize, PromptError>;

    /// Free-text input, repeated until `validate` accepts it.
    fn input(
        &self,
        label: &str,
        default: &str,
        validate: Validator<'_>,
    ) -> Result<String, PromptError>;

    /// Edit a list of values starting from `initial`.
    fn input_list(&self, label: &str, initial: &[String]) -> Result<Vec<String>, PromptError>;

    fn confirm(&self, label: &str, default: bool) -> Result<bool, PromptError>;
}

/// Prompter for flag-only invocations: every prompt fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn select(&self, _: &str, _: &[String], _: usize) -> Result<usize, PromptError> {
        Err(PromptError::Unavailable)
    }

    fn input(&self, _: &str, _: &str, _: Validator<'_>) -> Result<String, PromptError> {
        Err(PromptError::Unavailable)
    }

    fn input_list(&self, _: &str, _: &[String]) -> Result<Vec<String>, PromptError> {
        Err(PromptError::Unavailable)
    }

    fn confirm(&self, _: &str, _: bool) -> Result<bool, PromptError> {
        Err(PromptError::Unavailable)
    }
}

/// Validator accepting any non-blank answer.
pub fn non_empty(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err("value is required".to_string())
    } else {
        Ok(())
    }
}
