//! Adapters behind the port traits

pub mod memory;
pub mod openapi;
