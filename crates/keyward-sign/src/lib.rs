#![forbid(unsafe_code)]

pub mod canonical;
pub mod keys;
pub mod token;

pub use keys::KeyPair;
