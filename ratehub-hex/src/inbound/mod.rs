//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server exposing rate, conversion, integration, and
//! monitoring endpoints over the application services.

mod handlers;
mod server;

pub use server::HttpServer;
