use crate::types::EntityKind;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),
    #[error("claim body is not a {expected} claim (found {found})")]
    BodyMismatch { expected: EntityKind, found: String },
    #[error("invalid claim document: {0}")]
    InvalidDocument(String),
}
