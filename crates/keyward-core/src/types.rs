use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

/// The three principals of the trust hierarchy.
///
/// Operators issue accounts, accounts issue users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Operator,
    Account,
    User,
}

impl EntityKind {
    /// Role prefix used in textual public keys.
    pub fn prefix(self) -> char {
        match self {
            EntityKind::Operator => 'O',
            EntityKind::Account => 'A',
            EntityKind::User => 'U',
        }
    }

    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            'O' => Some(EntityKind::Operator),
            'A' => Some(EntityKind::Account),
            'U' => Some(EntityKind::User),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Operator => "operator",
            EntityKind::Account => "account",
            EntityKind::User => "user",
        }
    }

    /// Kind whose key signs claims of this kind.
    pub fn issuer(self) -> EntityKind {
        match self {
            EntityKind::Operator | EntityKind::Account => EntityKind::Operator,
            EntityKind::User => EntityKind::Account,
        }
    }

    /// Plural used for store directories and messages.
    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::Operator => "operators",
            EntityKind::Account => "accounts",
            EntityKind::User => "users",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "operator" => Ok(EntityKind::Operator),
            "account" => Ok(EntityKind::Account),
            "user" => Ok(EntityKind::User),
            other => Err(CoreError::UnknownKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_roundtrip() {
        for kind in [EntityKind::Operator, EntityKind::Account, EntityKind::User] {
            assert_eq!(EntityKind::from_prefix(kind.prefix()), Some(kind));
        }
        assert_eq!(EntityKind::from_prefix('X'), None);
    }

    #[test]
    fn issuer_chain() {
        assert_eq!(EntityKind::User.issuer(), EntityKind::Account);
        assert_eq!(EntityKind::Account.issuer(), EntityKind::Operator);
        assert_eq!(EntityKind::Operator.issuer(), EntityKind::Operator);
    }

    #[test]
    fn parse_kind() {
        assert_eq!("User".parse::<EntityKind>().unwrap(), EntityKind::User);
        assert!("team".parse::<EntityKind>().is_err());
        let json = serde_json::to_string(&EntityKind::Account).unwrap();
        assert_eq!(json, "\"account\"");
    }
}
