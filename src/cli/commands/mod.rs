//! CLI command implementations

pub mod clause;
pub mod completions;
pub mod config;
pub mod doc;
pub mod fill;
pub mod init;
pub mod new;
pub mod session;
pub mod template;
pub mod validate;
