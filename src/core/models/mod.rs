pub mod app_config;
pub mod environment;
pub mod node;
