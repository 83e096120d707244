//! Find-or-create of path segment chains in a remote resource tree

use std::sync::Arc;
use tracing::debug;

use crate::gateway::{ResourceDirectory, ResourceNode, path_segments};
use crate::sync::SyncError;

/// Resources of one API as seen during a single synchronization run.
///
/// Built from a fresh listing, grown with every resource the run creates, and
/// dropped when the run ends. It is passed by value through each step of the
/// tree walk and never kept between runs.
#[derive(Debug, Clone, Default)]
pub struct ResourceIndex {
    resources: Vec<ResourceNode>,
}

impl ResourceIndex {
    pub fn new(resources: Vec<ResourceNode>) -> Self {
        Self { resources }
    }

    pub fn root(&self) -> Option<&ResourceNode> {
        self.resources.iter().find(|r| r.is_root())
    }

    /// Child of `parent_id` whose segment literal equals `segment`
    pub fn child(&self, parent_id: &str, segment: &str) -> Option<&ResourceNode> {
        self.resources.iter().find(|r| {
            r.parent_id.as_deref() == Some(parent_id) && r.path_part.as_deref() == Some(segment)
        })
    }

    /// Record a newly created resource
    pub fn with(mut self, node: ResourceNode) -> Self {
        self.resources.push(node);
        self
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn into_inner(self) -> Vec<ResourceNode> {
        self.resources
    }
}

/// Ensures that resource chains exist for given paths
pub struct ResourceTreeSynchronizer {
    resources: Arc<dyn ResourceDirectory>,
}

impl ResourceTreeSynchronizer {
    pub fn new(resources: Arc<dyn ResourceDirectory>) -> Self {
        Self { resources }
    }

    /// Return the id of the resource at `path`, creating missing segments.
    ///
    /// The resource list is re-read on every call. `/` yields the root id and
    /// segments like `{id}` are plain literals here.
    pub async fn ensure_resource(&self, api_id: &str, path: &str) -> Result<String, SyncError> {
        let index = ResourceIndex::new(self.resources.list_resources(api_id).await?);
        let (resource_id, _) = self.ensure_in(api_id, index, path).await?;
        Ok(resource_id)
    }

    /// Walk `path` against `index`, creating what is missing.
    ///
    /// Returns the leaf id together with the index grown by the created
    /// resources, so several paths can be ensured against one listing.
    pub async fn ensure_in(
        &self,
        api_id: &str,
        index: ResourceIndex,
        path: &str,
    ) -> Result<(String, ResourceIndex), SyncError> {
        let mut cursor = index
            .root()
            .map(|root| root.id.clone())
            .ok_or_else(|| SyncError::MissingRoot {
                api_id: api_id.to_string(),
            })?;
        let mut index = index;

        for segment in path_segments(path) {
            (cursor, index) = self.step(api_id, index, &cursor, segment).await?;
        }

        Ok((cursor, index))
    }

    async fn step(
        &self,
        api_id: &str,
        index: ResourceIndex,
        parent_id: &str,
        segment: &str,
    ) -> Result<(String, ResourceIndex), SyncError> {
        if let Some(existing) = index.child(parent_id, segment) {
            return Ok((existing.id.clone(), index));
        }

        let created = self
            .resources
            .create_resource(api_id, parent_id, segment)
            .await?;
        debug!(
            "Created resource {} for segment '{segment}' under {parent_id}",
            created.id
        );
        Ok((created.id.clone(), index.with(created)))
    }
}
