// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "settings/mod.rs"]
pub mod settings;

// Re-export command types for convenience
pub use commands::settings::{Data, Error};
