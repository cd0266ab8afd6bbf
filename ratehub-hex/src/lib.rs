//! # RateHub Hex
//!
//! Application layer and HTTP adapter for the exchange rate hub.
//!
//! ## Architecture
//!
//! - `service/` - Application services (conversion engine, integration
//!   management, usage reporting)
//! - `scheduler/` - The polling scheduler that keeps rates fresh
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! Everything is generic over `R: RateRepository`, so adapters are injected
//! at compile time and tests run against in-memory ports.

pub mod inbound;
pub mod scheduler;
pub mod service;

mod openapi;

#[cfg(test)]
mod scheduler_tests;
#[cfg(test)]
mod service_tests;

pub use scheduler::PollingScheduler;
pub use service::{IntegrationService, RatesService, UsageService};
