#![forbid(unsafe_code)]

pub mod claims;
pub mod errors;
pub mod permissions;
pub mod types;
