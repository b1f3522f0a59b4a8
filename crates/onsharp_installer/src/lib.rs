pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod http;
pub mod manifest;
pub mod orchestrator;
pub mod platform;
pub mod progress;
pub mod server_config;
pub mod state;
