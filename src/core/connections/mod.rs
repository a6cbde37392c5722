pub mod connection_service;

pub use connection_service::ConnectionService;
