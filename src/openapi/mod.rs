//! OpenAPI document handling: pointer lookup, loading ports and `$ref` resolution

pub mod errors;
pub mod pointer;
pub mod resolver;
pub mod traits;

pub use errors::*;
pub use resolver::{ReferenceResolver, ResolutionMode, ResolverOptions, prune_nulls};
pub use traits::*;
