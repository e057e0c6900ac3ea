use crate::core::cluster::{
    FailoverConfig, FailoverTargets, HaPair, MonitorConfig, RoleSlot, ServiceKind,
    SimulationConfig,
};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfiguration {
    pub server: ServerConfig,
    pub cluster: ClusterEndpoints,
    pub probe: ProbeConfig,
    pub monitor: MonitorConfig,
    pub failover: FailoverConfig,
    pub commands: CommandConfig,
    pub simulation: SimulationConfig,
    pub streaming: StreamingConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub graceful_shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            graceful_shutdown_timeout_seconds: 30,
        }
    }
}

/// One reachable Hadoop daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEndpoint {
    /// HA service id used by the admin tooling
    pub id: String,
    pub host: String,
    pub port: u16,
}

impl NodeEndpoint {
    pub fn new(id: &str, host: &str, port: u16) -> Self {
        Self {
            id: id.to_string(),
            host: host.to_string(),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaEndpoints {
    pub active: NodeEndpoint,
    pub standby: NodeEndpoint,
    #[serde(default = "default_true")]
    pub ha_enabled: bool,
}

impl HaEndpoints {
    pub fn endpoint(&self, slot: RoleSlot) -> &NodeEndpoint {
        match slot {
            RoleSlot::Active => &self.active,
            RoleSlot::Standby => &self.standby,
        }
    }

    pub fn ha_pair(&self) -> HaPair {
        HaPair::new(self.active.id.clone(), self.standby.id.clone())
    }
}

fn default_true() -> bool {
    true
}

/// Where every probed daemon lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterEndpoints {
    pub namenode: HaEndpoints,
    pub resourcemanager: HaEndpoints,
    pub journalnodes: Vec<NodeEndpoint>,
    pub historyserver: NodeEndpoint,
    pub hive: NodeEndpoint,
}

impl ClusterEndpoints {
    pub fn pair(&self, service: ServiceKind) -> &HaEndpoints {
        match service {
            ServiceKind::NameNode => &self.namenode,
            ServiceKind::ResourceManager => &self.resourcemanager,
        }
    }

    pub fn failover_targets(&self) -> FailoverTargets {
        FailoverTargets {
            namenode: self.namenode.ha_pair(),
            resourcemanager: self.resourcemanager.ha_pair(),
        }
    }

    fn all(&self) -> impl Iterator<Item = &NodeEndpoint> {
        [
            &self.namenode.active,
            &self.namenode.standby,
            &self.resourcemanager.active,
            &self.resourcemanager.standby,
            &self.historyserver,
            &self.hive,
        ]
        .into_iter()
        .chain(self.journalnodes.iter())
    }
}

impl Default for ClusterEndpoints {
    fn default() -> Self {
        Self {
            namenode: HaEndpoints {
                active: NodeEndpoint::new("active-nn", "active-nn", 9870),
                standby: NodeEndpoint::new("standby-nn", "standby-nn", 9870),
                ha_enabled: true,
            },
            resourcemanager: HaEndpoints {
                active: NodeEndpoint::new("active-rm", "active-rm", 8088),
                standby: NodeEndpoint::new("standby-rm", "standby-rm", 8088),
                ha_enabled: true,
            },
            journalnodes: (1..=3)
                .map(|i| {
                    let host = format!("journalnode{}", i);
                    NodeEndpoint::new(&host, &host, 8480)
                })
                .collect(),
            historyserver: NodeEndpoint::new("historyserver", "historyserver", 19888),
            hive: NodeEndpoint::new("hive-server", "hive-server", 10002),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub request_timeout_seconds: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 30,
        }
    }
}

/// How failover commands reach the cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub docker_binary: String,
    pub namenode_container: String,
    pub resourcemanager_container: String,
    pub hdfs_binary: String,
    pub yarn_binary: String,
    pub timeout_seconds: u64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            docker_binary: "docker".to_string(),
            namenode_container: "active-nn".to_string(),
            resourcemanager_container: "active-rm".to_string(),
            hdfs_binary: "/usr/local/hadoop/bin/hdfs".to_string(),
            yarn_binary: "/usr/local/hadoop/bin/yarn".to_string(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub metrics_interval_ms: u64,
    pub logs_interval_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            metrics_interval_ms: 5000,
            logs_interval_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json", "pretty" or "compact"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Loads, validates and holds the application configuration
pub struct ConfigManager {
    config: Arc<RwLock<AppConfiguration>>,
    config_path: Option<String>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfiguration::default())),
            config_path: None,
        }
    }

    /// Load configuration: defaults, then `CONFIG_FILE`, then environment overrides
    pub async fn load(&mut self) -> Result<()> {
        let mut config = AppConfiguration::default();

        if let Ok(config_path) = std::env::var("CONFIG_FILE") {
            config = Self::load_from_file(&config_path).await?;
            self.config_path = Some(config_path);
        }

        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

        Self::validate_config(&config)?;

        *self.config.write().await = config;

        info!(config_file = ?self.config_path, "📋 Configuration loaded successfully");
        Ok(())
    }

    /// Parse a configuration file. Missing fields keep their defaults.
    pub async fn load_from_file(path: &str) -> Result<AppConfiguration> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::ConfigError(format!("Failed to read config file {}: {}", path, e))
        })?;

        let config: AppConfiguration = if path.ends_with(".yaml") || path.ends_with(".yml") {
            serde_yaml::from_str(&content)
                .map_err(|e| AppError::ConfigError(format!("Invalid YAML config: {}", e)))?
        } else if path.ends_with(".json") {
            serde_json::from_str(&content)
                .map_err(|e| AppError::ConfigError(format!("Invalid JSON config: {}", e)))?
        } else {
            return Err(AppError::ConfigError(
                "Config file must be .yaml, .yml, or .json".to_string(),
            ));
        };

        debug!(path = path, "📁 Configuration loaded from file");
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env_overrides<F>(config: &mut AppConfiguration, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server configuration
        if let Some(host) = lookup("SERVER_HOST") {
            config.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.server.port = parse_var("PORT", &port)?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            config.observability.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.observability.logging.format = format;
        }

        // Monitoring
        if let Some(value) = lookup("MONITOR_INTERVAL_MS") {
            config.monitor.interval_ms = parse_var("MONITOR_INTERVAL_MS", &value)?;
        }
        if let Some(value) = lookup("MONITOR_ERROR_BACKOFF_MS") {
            config.monitor.error_backoff_ms = parse_var("MONITOR_ERROR_BACKOFF_MS", &value)?;
        }
        if let Some(value) = lookup("MONITOR_MAX_HISTORY") {
            config.monitor.max_history = parse_var("MONITOR_MAX_HISTORY", &value)?;
        }
        if let Some(value) = lookup("MONITOR_MAX_LOGS") {
            config.monitor.max_logs = parse_var("MONITOR_MAX_LOGS", &value)?;
        }

        // Failover
        if let Some(value) = lookup("FAILOVER_SETTLE_DELAY_MS") {
            config.failover.settle_delay_ms = parse_var("FAILOVER_SETTLE_DELAY_MS", &value)?;
        }
        if let Some(value) = lookup("FAILOVER_VERIFY_ATTEMPTS") {
            config.failover.verify_attempts = parse_var("FAILOVER_VERIFY_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("FAILOVER_VERIFY_INTERVAL_MS") {
            config.failover.verify_interval_ms =
                parse_var("FAILOVER_VERIFY_INTERVAL_MS", &value)?;
        }

        // Probing and command dispatch
        if let Some(value) = lookup("PROBE_TIMEOUT_SECONDS") {
            config.probe.request_timeout_seconds = parse_var("PROBE_TIMEOUT_SECONDS", &value)?;
        }
        if let Some(binary) = lookup("DOCKER_BINARY") {
            config.commands.docker_binary = binary;
        }
        if let Some(value) = lookup("COMMAND_TIMEOUT_SECONDS") {
            config.commands.timeout_seconds = parse_var("COMMAND_TIMEOUT_SECONDS", &value)?;
        }
        if let Some(value) = lookup("SIMULATION_PAUSE_MS") {
            config.simulation.pause_ms = parse_var("SIMULATION_PAUSE_MS", &value)?;
        }

        debug!("🔧 Environment overrides applied");
        Ok(())
    }

    /// Validate configuration
    pub fn validate_config(config: &AppConfiguration) -> Result<()> {
        if config.server.port == 0 {
            return Err(AppError::ConfigError("Invalid server port".to_string()));
        }

        if config.monitor.interval_ms == 0 {
            return Err(AppError::ConfigError(
                "Monitor interval must be greater than zero".to_string(),
            ));
        }
        if config.monitor.max_history == 0 || config.monitor.max_logs == 0 {
            return Err(AppError::ConfigError(
                "History and log capacities must be greater than zero".to_string(),
            ));
        }

        if config.failover.verify_attempts == 0 {
            return Err(AppError::ConfigError(
                "Failover verification needs at least one attempt".to_string(),
            ));
        }

        if config.probe.request_timeout_seconds == 0 || config.commands.timeout_seconds == 0 {
            return Err(AppError::ConfigError(
                "Timeouts must be greater than zero".to_string(),
            ));
        }

        for endpoint in config.cluster.all() {
            if endpoint.host.is_empty() || endpoint.id.is_empty() {
                return Err(AppError::ConfigError(format!(
                    "Endpoint '{}' needs both an id and a host",
                    endpoint.id
                )));
            }
            url::Url::parse(&endpoint.base_url()).map_err(|e| {
                AppError::ConfigError(format!("Invalid endpoint '{}': {}", endpoint.id, e))
            })?;
        }

        // Validate log level
        match config.observability.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err(AppError::ConfigError("Invalid log level".to_string())),
        }

        debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get current configuration
    pub async fn get(&self) -> AppConfiguration {
        self.config.read().await.clone()
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e)))
}
