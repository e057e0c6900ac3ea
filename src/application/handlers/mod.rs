pub mod cluster;
pub mod failover;
