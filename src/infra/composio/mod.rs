pub mod composio_client;

pub use composio_client::ComposioClient;
