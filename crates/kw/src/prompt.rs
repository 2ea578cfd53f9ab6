//! Terminal prompt surface backed by `dialoguer`.

use std::io::IsTerminal;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use keyward_engine::prompt::{PromptError, Prompter, Validator};

pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    fn ensure_terminal(&self) -> Result<(), PromptError> {
        if std::io::stdin().is_terminal() {
            Ok(())
        } else {
            Err(PromptError::Unavailable)
        }
    }
}

fn map_err(err: dialoguer::Error) -> PromptError {
    match err {
        dialoguer::Error::IO(io) if io.kind() == std::io::ErrorKind::Interrupted => {
            PromptError::Aborted
        }
        other => PromptError::Io(other.to_string()),
    }
}

impl Prompter for DialoguerPrompter {
    fn select(&self, label: &str, items: &[String], default: usize) -> Result<usize, PromptError> {
        self.ensure_terminal()?;
        Select::with_theme(&self.theme)
            .with_prompt(label)
            .items(items)
            .default(default)
            .interact_opt()
            .map_err(map_err)?
            .ok_or(PromptError::Aborted)
    }

    fn input(
        &self,
        label: &str,
        default: &str,
        validate: Validator<'_>,
    ) -> Result<String, PromptError> {
        self.ensure_terminal()?;
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(label)
            .validate_with(|value: &String| validate(value));
        if !default.is_empty() {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(map_err)
    }

    fn input_list(&self, label: &str, initial: &[String]) -> Result<Vec<String>, PromptError> {
        self.ensure_terminal()?;
        let raw = Input::<String>::with_theme(&self.theme)
            .with_prompt(format!("{label} (comma separated)"))
            .with_initial_text(initial.join(", "))
            .allow_empty(true)
            .interact_text()
            .map_err(map_err)?;
        Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect())
    }

    fn confirm(&self, label: &str, default: bool) -> Result<bool, PromptError> {
        self.ensure_terminal()?;
        Confirm::with_theme(&self.theme)
            .with_prompt(label)
            .default(default)
            .interact_opt()
            .map_err(map_err)?
            .ok_or(PromptError::Aborted)
    }
}
