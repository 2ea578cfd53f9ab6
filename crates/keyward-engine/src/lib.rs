#![forbid(unsafe_code)]

pub mod actions;
pub mod config;
pub mod context;
pub mod editor;
pub mod entity;
pub mod error;
pub mod key_resolver;
pub mod lifecycle;
pub mod prompt;
pub mod store;
pub mod time_window;

#[cfg(test)]
pub(crate) mod testing;

pub use context::ActionCtx;
pub use error::{ActionError, ActionResult};
pub use lifecycle::{run_action, ActionReport, EntityLifecycle, Phase};
