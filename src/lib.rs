//! apigw-sync
//!
//! Resolves OpenAPI documents split across files into one self-contained
//! document, and reconciles declarative API descriptions against an API
//! Gateway: resource trees, methods, request parameters and integrations.
//! Whole APIs can be exported to a portable document and replayed into a new
//! API with a step journal.
//!
//! The gateway is reached through the directory traits in [`gateway`];
//! [`infrastructure::memory::InMemoryGateway`] implements them in process.
#![deny(unsafe_code)]

pub mod application;
pub mod core;
pub mod gateway;
pub mod infrastructure;
pub mod openapi;
pub mod sync;

pub use application::{ApplicationError, GatewayService};
pub use core::{Error, Result, Settings};
