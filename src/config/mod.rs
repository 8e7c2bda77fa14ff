pub mod percy_config;
