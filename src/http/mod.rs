//! HTTP surface of the host

pub mod routes;

pub use routes::build_router;
