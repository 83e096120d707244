//! Application layer - orchestrates use cases and coordinates between domains

pub mod commands;
pub mod errors;
pub mod service;

pub use commands::*;
pub use errors::*;
pub use service::GatewayService;
