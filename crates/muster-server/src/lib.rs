pub mod api;
pub mod config;

pub use api::{AppState, router};
pub use config::Config;
