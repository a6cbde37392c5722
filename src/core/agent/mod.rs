pub mod superagent_service;

pub use superagent_service::{classify_failure, SuperAgentRequest, SuperAgentService};
