pub mod engine_api;
pub mod engine_client;

pub use engine_api::EngineApi;
pub use engine_client::EngineClient;
