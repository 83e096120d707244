//! Method creation and request parameter reconciliation

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use crate::gateway::{
    HttpVerb, MethodConfig, MethodDirectory, OptionalExt, PatchOperation, RequestParameter,
    parameter_patch_path, required_value,
};
use crate::sync::SyncError;

/// Minimal set of parameter changes between two declarations.
///
/// Keys present on both sides are left alone even when their required flag
/// differs; only additions and removals are computed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterDiff {
    /// Encoded key to required flag
    pub to_add: BTreeMap<String, bool>,
    pub to_remove: BTreeSet<String>,
}

impl ParameterDiff {
    /// Compare existing encoded keys with the desired parameters
    pub fn plan<'a, I>(existing: I, desired: &[RequestParameter]) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let existing: BTreeSet<&String> = existing.into_iter().collect();
        let desired: BTreeMap<String, bool> = desired
            .iter()
            .map(|param| (param.key(), param.required))
            .collect();

        let to_add = desired
            .iter()
            .filter(|(key, _)| !existing.contains(key))
            .map(|(key, required)| (key.clone(), *required))
            .collect();
        let to_remove = existing
            .into_iter()
            .filter(|key| !desired.contains_key(*key))
            .cloned()
            .collect();

        Self { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Patch operations, additions first
    pub fn operations(&self) -> Vec<PatchOperation> {
        let adds = self.to_add.iter().map(|(key, required)| {
            PatchOperation::add(parameter_patch_path(key), required_value(*required))
        });
        let removes = self
            .to_remove
            .iter()
            .map(|key| PatchOperation::remove(parameter_patch_path(key)));
        adds.chain(removes).collect()
    }
}

/// Creates methods and keeps their declared request parameters in line
#[derive(Clone)]
pub struct MethodReconciler {
    methods: Arc<dyn MethodDirectory>,
}

impl MethodReconciler {
    pub fn new(methods: Arc<dyn MethodDirectory>) -> Self {
        Self { methods }
    }

    /// Put the method with authorization `NONE`.
    ///
    /// Idempotence is the directory's concern: putting an existing method
    /// leaves it as it is.
    pub async fn ensure_method(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> Result<MethodConfig, SyncError> {
        let method = self
            .methods
            .put_method(api_id, resource_id, &MethodConfig::new(verb))
            .await?;
        Ok(method)
    }

    /// Existing method, or `None` when it is not declared
    pub async fn find_method(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> Result<Option<MethodConfig>, SyncError> {
        Ok(self
            .methods
            .get_method(api_id, resource_id, verb)
            .await
            .optional()?)
    }

    /// Reconcile declared parameters with `desired`, patching in one batch.
    ///
    /// No call is made when nothing differs.
    pub async fn sync_parameters(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        desired: &[RequestParameter],
    ) -> Result<ParameterDiff, SyncError> {
        let existing = self
            .methods
            .get_method(api_id, resource_id, verb)
            .await?
            .request_parameters;
        let diff = ParameterDiff::plan(existing.keys(), desired);

        if diff.is_empty() {
            debug!("Parameters of {verb} {resource_id} already in sync");
            return Ok(diff);
        }

        debug!(
            "Patching {verb} {resource_id}: {} to add, {} to remove",
            diff.to_add.len(),
            diff.to_remove.len()
        );
        self.methods
            .update_method(api_id, resource_id, verb, &diff.operations())
            .await?;
        Ok(diff)
    }

    /// Declare `parameter` unless a parameter with the same key exists.
    ///
    /// Returns whether a patch was sent.
    pub async fn ensure_parameter(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        parameter: &RequestParameter,
    ) -> Result<bool, SyncError> {
        let key = parameter.key();
        let method = self.methods.get_method(api_id, resource_id, verb).await?;
        if method.request_parameters.contains_key(&key) {
            return Ok(false);
        }

        let operation =
            PatchOperation::add(parameter_patch_path(&key), required_value(parameter.required));
        self.methods
            .update_method(api_id, resource_id, verb, &[operation])
            .await?;
        Ok(true)
    }

    /// Remove the parameter with encoded `key`, treating an absent parameter
    /// as success. The method itself must exist.
    ///
    /// Returns whether the key was removed by this call.
    pub async fn remove_parameter(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        key: &str,
    ) -> Result<bool, SyncError> {
        self.methods.get_method(api_id, resource_id, verb).await?;

        let operation = PatchOperation::remove(parameter_patch_path(key));
        let removed = self
            .methods
            .update_method(api_id, resource_id, verb, &[operation])
            .await
            .optional()?;
        if removed.is_none() {
            debug!("Parameter {key} was not declared on {verb} {resource_id}");
        }
        Ok(removed.is_some())
    }

    pub async fn delete_method(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> Result<(), SyncError> {
        self.methods.delete_method(api_id, resource_id, verb).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ApiDirectory, DirectoryError, ParameterLocation, PatchOp};
    use crate::infrastructure::memory::{InMemoryGateway, RecordedCall};
    use crate::sync::ResourceTreeSynchronizer;

    fn query(name: &str) -> RequestParameter {
        RequestParameter::new(ParameterLocation::Query, name, false)
    }

    fn header(name: &str) -> RequestParameter {
        RequestParameter::new(ParameterLocation::Header, name, true)
    }

    #[test]
    fn test_diff_only_adds_missing_keys() {
        let existing = vec!["method.request.querystring.page".to_string()];
        let diff = ParameterDiff::plan(&existing, &[query("page"), header("auth")]);

        assert_eq!(
            diff.to_add,
            BTreeMap::from([("method.request.header.auth".to_string(), true)])
        );
        assert!(diff.to_remove.is_empty());
    }

    #[test]
    fn test_diff_only_removes_stale_keys() {
        let existing = vec![
            "method.request.querystring.page".to_string(),
            "method.request.querystring.legacy".to_string(),
        ];
        let diff = ParameterDiff::plan(&existing, &[query("page")]);

        assert!(diff.to_add.is_empty());
        assert_eq!(
            diff.to_remove,
            BTreeSet::from(["method.request.querystring.legacy".to_string()])
        );
    }

    #[test]
    fn test_diff_ignores_required_flag_changes() {
        let existing = vec!["method.request.header.auth".to_string()];
        let diff = ParameterDiff::plan(
            &existing,
            &[RequestParameter::new(ParameterLocation::Header, "auth", false)],
        );
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_operations_encode_values() {
        let existing = vec!["method.request.path.old".to_string()];
        let ops = ParameterDiff::plan(&existing, &[query("q")]).operations();

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].op, PatchOp::Add);
        assert_eq!(ops[0].path, "/requestParameters/method.request.querystring.q");
        assert_eq!(ops[0].value.as_deref(), Some("false"));
        assert_eq!(ops[1].op, PatchOp::Remove);
        assert_eq!(ops[1].path, "/requestParameters/method.request.path.old");
        assert_eq!(ops[1].value, None);
    }

    async fn method_on_new_api() -> (Arc<InMemoryGateway>, String, String) {
        let gateway = Arc::new(InMemoryGateway::new());
        let api = gateway.create_api("shop", None).await.unwrap();
        let resource_id = ResourceTreeSynchronizer::new(gateway.clone())
            .ensure_resource(&api.id, "/items")
            .await
            .unwrap();
        MethodReconciler::new(gateway.clone())
            .ensure_method(&api.id, &resource_id, HttpVerb::Get)
            .await
            .unwrap();
        (gateway, api.id, resource_id)
    }

    fn update_calls(gateway: &InMemoryGateway) -> Vec<Vec<PatchOperation>> {
        gateway
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::UpdateMethod { operations, .. } => Some(operations),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_sync_parameters_batches_changes() {
        let (gateway, api_id, resource_id) = method_on_new_api().await;
        let reconciler = MethodReconciler::new(gateway.clone());

        reconciler
            .sync_parameters(
                &api_id,
                &resource_id,
                HttpVerb::Get,
                &[query("page"), query("legacy")],
            )
            .await
            .unwrap();
        let diff = reconciler
            .sync_parameters(&api_id, &resource_id, HttpVerb::Get, &[query("page"), header("auth")])
            .await
            .unwrap();

        assert_eq!(diff.to_add.len(), 1);
        assert_eq!(diff.to_remove.len(), 1);
        let updates = update_calls(&gateway);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].len(), 2);

        let method = gateway
            .get_method(&api_id, &resource_id, HttpVerb::Get)
            .await
            .unwrap();
        assert_eq!(
            method.request_parameters,
            BTreeMap::from([
                ("method.request.header.auth".to_string(), true),
                ("method.request.querystring.page".to_string(), false),
            ])
        );
    }

    #[tokio::test]
    async fn test_sync_parameters_without_changes_makes_no_update() {
        let (gateway, api_id, resource_id) = method_on_new_api().await;
        let reconciler = MethodReconciler::new(gateway.clone());

        let diff = reconciler
            .sync_parameters(&api_id, &resource_id, HttpVerb::Get, &[])
            .await
            .unwrap();

        assert!(diff.is_empty());
        assert!(update_calls(&gateway).is_empty());
    }

    #[tokio::test]
    async fn test_remove_parameter_tolerates_absence() {
        let (gateway, api_id, resource_id) = method_on_new_api().await;
        let reconciler = MethodReconciler::new(gateway.clone());

        let removed = reconciler
            .remove_parameter(&api_id, &resource_id, HttpVerb::Get, "method.request.path.nope")
            .await
            .unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_remove_parameter_requires_the_method() {
        let (gateway, api_id, resource_id) = method_on_new_api().await;
        let reconciler = MethodReconciler::new(gateway.clone());

        let error = reconciler
            .remove_parameter(&api_id, &resource_id, HttpVerb::Delete, "method.request.path.proxy")
            .await
            .unwrap_err();

        assert!(
            error
                .directory_error()
                .is_some_and(DirectoryError::is_not_found)
        );
        assert!(update_calls(&gateway).is_empty());
    }

    #[tokio::test]
    async fn test_find_method_maps_absence_to_none() {
        let (gateway, api_id, resource_id) = method_on_new_api().await;
        let reconciler = MethodReconciler::new(gateway);

        assert!(
            reconciler
                .find_method(&api_id, &resource_id, HttpVerb::Post)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            reconciler
                .find_method(&api_id, &resource_id, HttpVerb::Get)
                .await
                .unwrap()
                .is_some()
        );
    }
}
