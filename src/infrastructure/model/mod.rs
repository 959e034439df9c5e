//! Model client implementations.

pub mod factory;
pub mod http_api;
pub mod mock;
pub mod retry;

pub use factory::ModelClientFactory;
pub use http_api::HttpModelClient;
pub use mock::MockModelClient;
pub use retry::RetryPolicy;
