//! Core building blocks shared by every layer: errors and settings

pub mod config;
pub mod error;

pub use config::{GatewaySettings, ImportSettings, ResponseNormalization, Settings};
pub use error::{Error, Result};
