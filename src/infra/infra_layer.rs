// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "settings/settings_stores.rs"]
pub mod settings;
