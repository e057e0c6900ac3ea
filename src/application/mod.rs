//! Application layer: HTTP handlers over the core cluster services

pub mod handlers;
