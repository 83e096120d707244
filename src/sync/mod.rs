//! Reconciling desired API state with a gateway
//!
//! Each synchronizer reads what exists, computes the difference and issues
//! only the calls needed to close it. Calls are awaited one after another.

pub mod errors;
pub mod integration;
pub mod methods;
pub mod path_items;
pub mod porter;
pub mod resource_tree;

pub use errors::SyncError;
pub use integration::{DesiredIntegration, IntegrationManager, IntegrationTarget, http_uri};
pub use methods::{MethodReconciler, ParameterDiff};
pub use path_items::{PathItemReport, PathItemSynchronizer};
pub use porter::{
    FullApiDocument, FullApiPorter, ImportFailure, ImportJournal, ImportOutcome, ImportPlan,
    ImportStep,
};
pub use resource_tree::{ResourceIndex, ResourceTreeSynchronizer};
