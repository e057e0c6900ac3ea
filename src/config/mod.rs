//! Application configuration

pub mod app_config;

pub use app_config::{
    AppConfiguration, ClusterEndpoints, CommandConfig, ConfigManager, HaEndpoints, LoggingConfig,
    NodeEndpoint, ObservabilityConfig, ProbeConfig, ServerConfig, StreamingConfig,
};
