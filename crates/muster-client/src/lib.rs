//! Client side of the registry: self-registration, deregistration, and
//! provider lookup fed by the registry's dependency patches.

pub mod error;
pub mod client;
pub mod providers;
pub mod service;

pub use client::RegistryClient;
pub use error::ClientError;
pub use providers::Providers;
pub use service::{client_routes, run_service};
