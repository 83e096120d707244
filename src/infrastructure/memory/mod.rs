//! In-memory gateway used for dry runs and tests

pub mod gateway;

pub use gateway::{InMemoryGateway, RecordedCall};
