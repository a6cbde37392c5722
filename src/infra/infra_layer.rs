// The infra module contains implementations of core traits.
// Each remote service gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "composio/mod.rs"]
pub mod composio;

#[path = "browser/mod.rs"]
pub mod browser;
