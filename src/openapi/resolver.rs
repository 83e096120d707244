//! Recursive `$ref` resolution across files
//!
//! The resolver inlines every reference node of a document. Local references
//! (`#/a/b`) are looked up in the root document; external references
//! (`other.yaml#/a/b` or `other.yaml`) are loaded relative to the directory of
//! the file that contains them, and the loaded target is itself resolved with
//! that file's directory as context, so chains of external references compose.
//! After resolution every null map value and null sequence element is pruned.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::openapi::{DocumentLoader, ResolutionError, pointer};

/// Key marking a reference node
pub const REF_KEY: &str = "$ref";

/// How resolution failures are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Unresolvable references become null and are pruned
    #[default]
    Lenient,
    /// Unresolvable references abort the load
    Strict,
}

/// Tuning for a [`ReferenceResolver`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    pub mode: ResolutionMode,
    /// Maximum number of references followed along one branch
    pub max_depth: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            mode: ResolutionMode::Lenient,
            max_depth: 64,
        }
    }
}

/// Root document and its directory, fixed for one resolution run
#[derive(Clone, Copy)]
struct Root<'a> {
    document: &'a Value,
    dir: &'a Path,
}

/// Inlines `$ref` nodes of OpenAPI/Swagger documents
pub struct ReferenceResolver {
    loader: Arc<dyn DocumentLoader>,
    options: ResolverOptions,
}

impl ReferenceResolver {
    pub fn new(loader: Arc<dyn DocumentLoader>, options: ResolverOptions) -> Self {
        Self { loader, options }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Load the file at `path` and return it fully resolved and pruned.
    ///
    /// Failing to read or parse the root file is always an error; failures
    /// inside references follow the configured [`ResolutionMode`].
    pub async fn load(&self, path: &Path) -> Result<Value, ResolutionError> {
        let document = self.loader.load(path).await?;
        let dir = parent_dir(path);
        debug!("Resolving references of {}", path.display());
        self.resolve_value(&document, &dir).await
    }

    /// Resolve an already parsed document whose relative references are
    /// anchored at `base_dir`
    pub async fn resolve_value(
        &self,
        document: &Value,
        base_dir: &Path,
    ) -> Result<Value, ResolutionError> {
        let root = Root {
            document,
            dir: base_dir,
        };
        let resolved = self.resolve_node(root, document, base_dir, 0).await?;
        Ok(prune_nulls(resolved))
    }

    fn resolve_node<'a>(
        &'a self,
        root: Root<'a>,
        node: &'a Value,
        base: &'a Path,
        depth: usize,
    ) -> BoxFuture<'a, Result<Value, ResolutionError>> {
        async move {
            match node {
                Value::Object(map) => {
                    if let Some(reference) = map.get(REF_KEY).and_then(Value::as_str) {
                        return self.follow(root, reference, base, depth).await;
                    }
                    let mut resolved = Map::with_capacity(map.len());
                    for (key, value) in map {
                        let value = self.resolve_node(root, value, base, depth).await?;
                        resolved.insert(key.clone(), value);
                    }
                    Ok(Value::Object(resolved))
                }
                Value::Array(items) => {
                    let mut resolved = Vec::with_capacity(items.len());
                    for item in items {
                        resolved.push(self.resolve_node(root, item, base, depth).await?);
                    }
                    Ok(Value::Array(resolved))
                }
                scalar => Ok(scalar.clone()),
            }
        }
        .boxed()
    }

    async fn follow(
        &self,
        root: Root<'_>,
        reference: &str,
        base: &Path,
        depth: usize,
    ) -> Result<Value, ResolutionError> {
        if depth >= self.options.max_depth {
            return self.degrade(ResolutionError::DepthExceeded {
                reference: reference.to_string(),
                max_depth: self.options.max_depth,
            });
        }

        let (file, fragment) = split_reference(reference);
        match file {
            Some(file) => {
                let path = base.join(file);
                let external = match self.loader.load(&path).await {
                    Ok(document) => document,
                    Err(error) => return self.degrade(error),
                };
                let Some(target) = pointer::resolve(&external, fragment) else {
                    return self.degrade(ResolutionError::UnresolvedPointer {
                        reference: reference.to_string(),
                        base: base.to_path_buf(),
                    });
                };
                let dir = parent_dir(&path);
                debug!("Following {reference} into {}", path.display());
                self.resolve_node(root, target, &dir, depth + 1).await
            }
            None => {
                let Some(target) = pointer::resolve(root.document, fragment) else {
                    return self.degrade(ResolutionError::UnresolvedPointer {
                        reference: reference.to_string(),
                        base: root.dir.to_path_buf(),
                    });
                };
                self.resolve_node(root, target, root.dir, depth + 1).await
            }
        }
    }

    fn degrade(&self, error: ResolutionError) -> Result<Value, ResolutionError> {
        match self.options.mode {
            ResolutionMode::Strict => Err(error),
            ResolutionMode::Lenient => {
                warn!("Reference degraded to null: {error}");
                Ok(Value::Null)
            }
        }
    }
}

/// Split a `$ref` string into its file part (if any) and pointer part.
///
/// Only the first `#` separates the two; a reference without `#` names a
/// whole external document.
pub fn split_reference(reference: &str) -> (Option<&str>, &str) {
    let (file, fragment) = reference.split_once('#').unwrap_or((reference, ""));
    if file.is_empty() {
        (None, fragment)
    } else {
        (Some(file), fragment)
    }
}

/// Recursively drop null map values and null sequence elements
pub fn prune_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, prune_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(prune_nulls)
                .collect(),
        ),
        scalar => scalar,
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}
