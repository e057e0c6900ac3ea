//! HTTP presentation layer

pub mod routes;

pub use routes::create_router;
