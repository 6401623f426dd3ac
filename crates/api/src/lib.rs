//! HTTP API: configuration, authentication middleware and the router.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
