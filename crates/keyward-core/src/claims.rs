use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::errors::CoreError;
use crate::permissions::{Permissions, StringList};
use crate::types::EntityKind;

/// Kind-specific part of a claim, stored under the `keyward` key.
pub trait ClaimBody: Serialize + DeserializeOwned + Clone + fmt::Debug {
    const KIND: EntityKind;

    fn new() -> Self;
    /// Kind recorded in the document itself, which may disagree with `KIND`
    /// for a hand-built or corrupted body.
    fn declared_kind(&self) -> EntityKind;
    fn tags_mut(&mut self) -> &mut StringList;
}

/// A credential document describing one entity.
///
/// `jti`, `iat` and `iss` are filled in when the claim is encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims<B> {
    #[serde(default)]
    pub jti: String,
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub iss: String,
    pub name: String,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub keyward: B,
}

impl<B: ClaimBody> Claims<B> {
    pub fn new(subject: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            jti: String::new(),
            iat: 0,
            iss: String::new(),
            name: name.into(),
            sub: subject.into(),
            nbf: None,
            exp: None,
            keyward: B::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        B::KIND
    }

    /// Parse a payload, refusing documents of another kind.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        let found = claim_kind(&value)?;
        if found != B::KIND {
            return Err(CoreError::BodyMismatch {
                expected: B::KIND,
                found: found.to_string(),
            });
        }
        serde_json::from_value(value).map_err(|e| CoreError::InvalidDocument(e.to_string()))
    }
}

/// Read the `keyward.type` discriminator of a raw payload.
pub fn claim_kind(value: &Value) -> Result<EntityKind, CoreError> {
    let raw = value
        .pointer("/keyward/type")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::InvalidDocument("missing keyward.type".into()))?;
    raw.parse()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorBody {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "StringList::is_empty")]
    pub signing_keys: StringList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_server_url: Option<String>,
    #[serde(default, skip_serializing_if = "StringList::is_empty")]
    pub tags: StringList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBody {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "StringList::is_empty")]
    pub signing_keys: StringList,
    #[serde(default, skip_serializing_if = "StringList::is_empty")]
    pub tags: StringList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBody {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(flatten)]
    pub permissions: Permissions,
    /// Source networks the user may connect from.
    #[serde(default, skip_serializing_if = "StringList::is_empty")]
    pub src: StringList,
    #[serde(default, skip_serializing_if = "StringList::is_empty")]
    pub tags: StringList,
}

impl ClaimBody for OperatorBody {
    const KIND: EntityKind = EntityKind::Operator;

    fn new() -> Self {
        Self {
            kind: Self::KIND,
            signing_keys: StringList::new(),
            account_server_url: None,
            tags: StringList::new(),
        }
    }

    fn declared_kind(&self) -> EntityKind {
        self.kind
    }

    fn tags_mut(&mut self) -> &mut StringList {
        &mut self.tags
    }
}

impl ClaimBody for AccountBody {
    const KIND: EntityKind = EntityKind::Account;

    fn new() -> Self {
        Self {
            kind: Self::KIND,
            signing_keys: StringList::new(),
            tags: StringList::new(),
        }
    }

    fn declared_kind(&self) -> EntityKind {
        self.kind
    }

    fn tags_mut(&mut self) -> &mut StringList {
        &mut self.tags
    }
}

impl ClaimBody for UserBody {
    const KIND: EntityKind = EntityKind::User;

    fn new() -> Self {
        Self {
            kind: Self::KIND,
            permissions: Permissions::default(),
            src: StringList::new(),
            tags: StringList::new(),
        }
    }

    fn declared_kind(&self) -> EntityKind {
        self.kind
    }

    fn tags_mut(&mut self) -> &mut StringList {
        &mut self.tags
    }
}

pub type OperatorClaims = Claims<OperatorBody>;
pub type AccountClaims = Claims<AccountBody>;
pub type UserClaims = Claims<UserBody>;

/// A decoded claim of any kind, for read-only commands.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyClaims {
    Operator(OperatorClaims),
    Account(AccountClaims),
    User(UserClaims),
}

impl AnyClaims {
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        Ok(match claim_kind(&value)? {
            EntityKind::Operator => AnyClaims::Operator(Claims::from_value(value)?),
            EntityKind::Account => AnyClaims::Account(Claims::from_value(value)?),
            EntityKind::User => AnyClaims::User(Claims::from_value(value)?),
        })
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            AnyClaims::Operator(_) => EntityKind::Operator,
            AnyClaims::Account(_) => EntityKind::Account,
            AnyClaims::User(_) => EntityKind::User,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AnyClaims::Operator(c) => &c.name,
            AnyClaims::Account(c) => &c.name,
            AnyClaims::User(c) => &c.name,
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            AnyClaims::Operator(c) => &c.sub,
            AnyClaims::Account(c) => &c.sub,
            AnyClaims::User(c) => &c.sub,
        }
    }
}
