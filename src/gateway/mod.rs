//! Gateway domain - the remote resource model and the ports used to reach it

pub mod errors;
pub mod parameters;
pub mod traits;
pub mod types;

pub use errors::*;
pub use parameters::*;
pub use traits::*;
pub use types::*;
