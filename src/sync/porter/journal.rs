//! What an import did, and how it ended

use serde::Serialize;
use thiserror::Error;

use crate::gateway::{Deployment, RestApi};
use crate::sync::SyncError;
use crate::sync::porter::plan::ImportStep;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedStep {
    pub step: ImportStep,
    /// Id of the entity the step created, if it created one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_id: Option<String>,
}

/// Completed steps of an import, in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportJournal {
    /// Id of the API created by the import, once it exists
    pub api_id: Option<String>,
    pub completed: Vec<CompletedStep>,
}

impl ImportJournal {
    pub fn record(&mut self, step: ImportStep, created_id: Option<String>) {
        if matches!(step, ImportStep::CreateApi { .. }) {
            self.api_id = created_id.clone();
        }
        self.completed.push(CompletedStep { step, created_id });
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// Ids of the resources created so far
    pub fn created_resources(&self) -> Vec<&str> {
        self.completed
            .iter()
            .filter(|c| matches!(c.step, ImportStep::CreateResource { .. }))
            .filter_map(|c| c.created_id.as_deref())
            .collect()
    }
}

/// A finished import
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub api: RestApi,
    pub deployment: Option<Deployment>,
    pub journal: ImportJournal,
}

/// An import that stopped part way.
///
/// Nothing is undone; `journal` lists what exists remotely.
#[derive(Error, Debug)]
#[error("Import stopped at step {index} after {} completed step(s): {source}", .journal.len())]
pub struct ImportFailure {
    pub journal: ImportJournal,
    pub index: usize,
    /// The failing step; `None` when the plan did not create an API
    pub step: Option<ImportStep>,
    #[source]
    pub source: SyncError,
}
