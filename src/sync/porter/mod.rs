//! Full API export and two-phase import
//!
//! Export snapshots one API into a [`FullApiDocument`]. Import first lays the
//! document out as an [`ImportPlan`], then runs it step by step, keeping an
//! [`ImportJournal`] of what was created. A failed import is reported with
//! its journal and left in place.

pub mod document;
pub mod execute;
pub mod journal;
pub mod plan;

pub use document::{ExportedMethod, ExportedResource, FullApiDocument};
pub use execute::ResourceIdMap;
pub use journal::{CompletedStep, ImportFailure, ImportJournal, ImportOutcome};
pub use plan::{ImportPlan, ImportStep, PlanOptions};

use tracing::{debug, info, warn};

use crate::core::config::{GatewaySettings, ImportSettings};
use crate::gateway::{Directories, OptionalExt};
use crate::sync::SyncError;
use execute::ImportRun;

/// Exports APIs to full documents and replays them into new APIs
pub struct FullApiPorter {
    directories: Directories,
    options: PlanOptions,
}

impl FullApiPorter {
    pub fn new(
        directories: Directories,
        gateway: &GatewaySettings,
        import: &ImportSettings,
    ) -> Self {
        Self {
            directories,
            options: PlanOptions {
                responses: import.responses,
                stage_name: gateway.stage_name.clone(),
                default_timeout_millis: gateway.default_timeout_millis,
            },
        }
    }

    /// Snapshot an API with its resources, methods and integrations.
    ///
    /// Resources come out parents first (by depth, then path). A method that
    /// disappears between listing and reading is skipped.
    pub async fn export(&self, api_id: &str) -> Result<FullApiDocument, SyncError> {
        let d = &self.directories;
        let api = d.apis.get_api(api_id).await?;
        let mut resources = d.resources.list_resources(api_id).await?;
        let stages = d.stages.list_stages(api_id).await?;
        let validators = d.validators.list_validators(api_id).await?;
        let models = d.models.list_models(api_id).await?;
        let authorizers = d.authorizers.list_authorizers(api_id).await?;

        resources.sort_by(|a, b| {
            a.segments()
                .len()
                .cmp(&b.segments().len())
                .then_with(|| a.path.cmp(&b.path))
        });

        let mut exported = Vec::with_capacity(resources.len());
        for resource in resources {
            let mut methods = Vec::new();
            for verb in &resource.resource_methods {
                let Some(method) = d
                    .methods
                    .get_method(api_id, &resource.id, *verb)
                    .await
                    .optional()?
                else {
                    warn!("Method {verb} {} vanished during export, skipping", resource.path);
                    continue;
                };
                let integration = d
                    .integrations
                    .get_integration(api_id, &resource.id, *verb)
                    .await
                    .optional()?;
                methods.push(ExportedMethod {
                    method,
                    integration,
                });
            }
            exported.push(ExportedResource { resource, methods });
        }

        info!(
            "Exported API {api_id} with {} resource(s)",
            exported.len()
        );
        Ok(FullApiDocument {
            policy: api.policy.clone(),
            api,
            resources: exported,
            stages,
            validators,
            models,
            authorizers,
        })
    }

    /// Lay out the import of `document` without touching the gateway
    pub fn plan(&self, document: &FullApiDocument) -> ImportPlan {
        ImportPlan::build(document, &self.options)
    }

    /// Run `plan` step by step; the first failing step ends the import
    pub async fn execute(&self, plan: &ImportPlan) -> Result<ImportOutcome, ImportFailure> {
        let mut run = ImportRun::new(&self.directories);
        let mut journal = ImportJournal::default();

        for (index, step) in plan.steps().iter().enumerate() {
            debug!("Import step {index}: {step}");
            match run.apply(step).await {
                Ok(created_id) => journal.record(step.clone(), created_id),
                Err(source) => {
                    warn!("Import step {index} ({step}) failed: {source}");
                    return Err(ImportFailure {
                        journal,
                        index,
                        step: Some(step.clone()),
                        source,
                    });
                }
            }
        }

        match run.into_parts() {
            (Some(api), deployment) => {
                info!(
                    "Imported API {} ({}) in {} step(s)",
                    api.name,
                    api.id,
                    journal.len()
                );
                Ok(ImportOutcome {
                    api,
                    deployment,
                    journal,
                })
            }
            (None, _) => Err(ImportFailure {
                index: journal.len(),
                journal,
                step: None,
                source: SyncError::InvalidDocument("import plan created no API".to_string()),
            }),
        }
    }

    /// Plan and execute in one go
    pub async fn import(&self, document: &FullApiDocument) -> Result<ImportOutcome, ImportFailure> {
        self.execute(&self.plan(document)).await
    }
}
