// Core settings module - per-guild configuration with validation and
// channel resolution. Following the same layout as the other core features.

pub mod channel_resolution;
pub mod prefixes;
pub mod settings_errors;
pub mod settings_models;
pub mod settings_service;
pub mod settings_store;
pub mod welcome_template;
pub mod worlds;

pub use settings_errors::{PermissionError, SettingsError, StoreError};
pub use settings_models::*;
pub use settings_service::SettingsService;
pub use settings_store::SettingsStore;
pub use worlds::WorldCatalog;
