use keyward_core::types::EntityKind;
use keyward_sign::keys::KeyError;
use keyward_sign::token::TokenError;

use crate::prompt::PromptError;
use crate::store::StoreError;

/// Everything that can abort a command invocation.
///
/// Errors are never retried; the first one ends the lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Missing or invalid required input.
    #[error("{message}")]
    Validation { message: String, show_usage: bool },

    /// Zero or several candidate owning scopes and none was named.
    #[error("{}", ambiguous_scope_message(.kind, .count))]
    AmbiguousScope { kind: EntityKind, count: usize },

    #[error("cannot resolve {role} key: {reason}")]
    KeyResolution { role: EntityKind, reason: String },

    #[error("{0}")]
    TimeRange(String),

    /// An editor was wired to a claim of the wrong kind.
    #[error("claim editor expected a {expected} claim, got {found}")]
    ClaimTypeMismatch { expected: EntityKind, found: String },

    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: EntityKind, name: String },

    #[error("{kind} {name:?} not found")]
    NotFound { kind: EntityKind, name: String },

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Token(TokenError),
}

pub type ActionResult<T> = Result<T, ActionError>;

impl ActionError {
    pub fn validation(message: impl Into<String>) -> Self {
        ActionError::Validation {
            message: message.into(),
            show_usage: false,
        }
    }

    /// A validation failure after which the command usage should be shown again.
    pub fn usage(message: impl Into<String>) -> Self {
        ActionError::Validation {
            message: message.into(),
            show_usage: true,
        }
    }

    pub fn shows_usage(&self) -> bool {
        matches!(
            self,
            ActionError::Validation {
                show_usage: true,
                ..
            }
        )
    }

    pub(crate) fn key_resolution(role: EntityKind, reason: impl Into<String>) -> Self {
        ActionError::KeyResolution {
            role,
            reason: reason.into(),
        }
    }
}

impl From<TokenError> for ActionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::TypeMismatch { expected, found } => {
                ActionError::ClaimTypeMismatch { expected, found }
            }
            other => ActionError::Token(other),
        }
    }
}

fn ambiguous_scope_message(kind: &EntityKind, count: &usize) -> String {
    if *count == 0 {
        format!("no {} defined - add {kind} first", kind.plural())
    } else {
        format!(
            "multiple {} found ({count}) - specify --{kind} or select one with `kw env --{kind}`",
            kind.plural()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_scope_messages() {
        let none = ActionError::AmbiguousScope {
            kind: EntityKind::Account,
            count: 0,
        };
        assert_eq!(none.to_string(), "no accounts defined - add account first");
        let many = ActionError::AmbiguousScope {
            kind: EntityKind::Account,
            count: 2,
        };
        assert!(many.to_string().starts_with("multiple accounts found (2)"));
    }

    #[test]
    fn token_type_mismatch_maps_to_claim_type_mismatch() {
        let err: ActionError = TokenError::TypeMismatch {
            expected: EntityKind::User,
            found: "account".into(),
        }
        .into();
        assert!(matches!(err, ActionError::ClaimTypeMismatch { .. }));
    }

    #[test]
    fn usage_flag() {
        assert!(ActionError::usage("user name is required").shows_usage());
        assert!(!ActionError::validation("x").shows_usage());
    }
}
