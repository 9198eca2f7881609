// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "settings/mod.rs"]
pub mod settings;
