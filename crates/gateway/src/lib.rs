pub mod http;
pub mod memory;

pub use http::HttpDeletionRequestGateway;
pub use memory::InMemoryDeletionRequestGateway;
