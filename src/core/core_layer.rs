// The core module contains all business logic.
// Each feature gets its own submodule; nothing here knows about HTTP or
// about which remote services back the traits.

#[path = "identity/user_identity.rs"]
pub mod identity;

#[path = "tools/mod.rs"]
pub mod tools;

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "slides/mod.rs"]
pub mod slides;

#[path = "browser/mod.rs"]
pub mod browser;

#[path = "agent/mod.rs"]
pub mod agent;

#[path = "connections/mod.rs"]
pub mod connections;

#[path = "presentations/mod.rs"]
pub mod presentations;
