//! Adapters to the outside world: HTTP probing and command dispatch

pub mod command_executor;
pub mod hadoop_client;

pub use command_executor::DockerExecCommandExecutor;
pub use hadoop_client::HttpClusterProbe;
