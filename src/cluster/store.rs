//! Read-only object stores
//!
//! `KubeStore` reads from the API server using discovery to resolve any
//! group/version/kind; `MemoryStore` serves objects parsed from manifests.

use async_trait::async_trait;
use kube::api::ListParams;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind, TypeMeta};
use kube::discovery::{ApiCapabilities, Scope, pinned_kind};
use kube::{Api, Client, ResourceExt};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::models::{GroupKind, ObjectExt, api_group, api_version_number, object_from_value};

/// Store lookup errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    #[error("unable to discover {api_version} {kind}: {source}")]
    Discovery {
        api_version: String,
        kind: String,
        #[source]
        source: kube::Error,
    },

    #[error("invalid manifest: {0}")]
    Manifest(#[from] serde_yaml::Error),

    #[error("manifest document {index} is not a Kubernetes object: {source}")]
    InvalidObject {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lookup of {kind} requires a name")]
    MissingName { kind: String },
}

/// Identifies an object, or a set of objects when `name` is empty
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub api_version: String,
    pub kind: String,
    pub name: Option<String>,
    /// Equality-based label selector applied to lists
    pub selector: Option<BTreeMap<String, String>>,
}

impl ObjectKey {
    /// Key for a single named object
    pub fn new(namespace: Option<&str>, api_version: &str, kind: &str, name: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: Some(name.to_string()),
            selector: None,
        }
    }

    /// Key for every object of one kind in a namespace
    pub fn list(namespace: Option<&str>, api_version: &str, kind: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    /// Restrict a list key to objects carrying all of `labels`
    pub fn with_selector(mut self, labels: BTreeMap<String, String>) -> Self {
        self.selector = Some(labels);
        self
    }

    fn label_selector(&self) -> Option<String> {
        let selector = self.selector.as_ref()?;
        Some(
            selector
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    fn require_name(&self) -> Result<&str, StoreError> {
        self.name.as_deref().ok_or_else(|| StoreError::MissingName {
            kind: self.kind.clone(),
        })
    }
}

/// Read access to cluster objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one object; `Ok(None)` when it does not exist
    async fn get(&self, key: &ObjectKey) -> Result<Option<DynamicObject>, StoreError>;

    /// List objects matching the key's namespace, type and selector
    async fn list(&self, key: &ObjectKey) -> Result<Vec<DynamicObject>, StoreError>;
}

/// Store backed by the Kubernetes API server
pub struct KubeStore {
    client: Client,
    resources: RwLock<HashMap<String, (ApiResource, ApiCapabilities)>>,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resources: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the API resource for a type, caching discovery results
    async fn resource(
        &self,
        api_version: &str,
        kind: &str,
    ) -> Result<(ApiResource, ApiCapabilities), StoreError> {
        let cache_key = format!("{}/{}", api_version, kind);
        if let Some(found) = self.resources.read().await.get(&cache_key) {
            return Ok(found.clone());
        }

        let gvk = GroupVersionKind::gvk(
            api_group(api_version),
            api_version_number(api_version),
            kind,
        );
        let found = pinned_kind(&self.client, &gvk)
            .await
            .map_err(|source| StoreError::Discovery {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
                source,
            })?;

        tracing::debug!("Discovered {} as plural {}", cache_key, found.0.plural);
        self.resources
            .write()
            .await
            .insert(cache_key, found.clone());
        Ok(found)
    }

    async fn api(&self, key: &ObjectKey) -> Result<(Api<DynamicObject>, ApiResource), StoreError> {
        let (resource, capabilities) = self.resource(&key.api_version, &key.kind).await?;
        let api = match (&capabilities.scope, key.namespace.as_deref()) {
            (Scope::Namespaced, Some(namespace)) => {
                Api::namespaced_with(self.client.clone(), namespace, &resource)
            }
            _ => Api::all_with(self.client.clone(), &resource),
        };
        Ok((api, resource))
    }
}

/// List items come back without apiVersion and kind; fill them in
fn with_types(mut object: DynamicObject, resource: &ApiResource) -> DynamicObject {
    if object.types.is_none() {
        object.types = Some(TypeMeta {
            api_version: resource.api_version.clone(),
            kind: resource.kind.clone(),
        });
    }
    object
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<DynamicObject>, StoreError> {
        let name = key.require_name()?;
        let (api, resource) = self.api(key).await?;
        let object = api.get_opt(name).await?;
        Ok(object.map(|object| with_types(object, &resource)))
    }

    async fn list(&self, key: &ObjectKey) -> Result<Vec<DynamicObject>, StoreError> {
        let (api, resource) = self.api(key).await?;
        let mut params = ListParams::default();
        if let Some(selector) = key.label_selector() {
            params = params.labels(&selector);
        }
        let list = api.list(&params).await?;
        Ok(list
            .items
            .into_iter()
            .map(|object| with_types(object, &resource))
            .collect())
    }
}

/// Store serving a fixed set of objects
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Vec<DynamicObject>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_objects(objects: Vec<DynamicObject>) -> Self {
        Self { objects }
    }

    /// Parse a multi-document YAML manifest. `kind: List` documents are
    /// flattened, empty documents ignored. Objects without a namespace are
    /// placed in `default_namespace` when one is given.
    pub fn from_manifests(
        content: &str,
        default_namespace: Option<&str>,
    ) -> Result<Self, StoreError> {
        let mut objects = Vec::new();

        for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
            let value = serde_yaml::Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }
            let json: serde_json::Value = serde_yaml::from_value(value)?;

            let items = match json.get("items").and_then(|items| items.as_array()) {
                Some(items) if json.get("kind").and_then(|k| k.as_str()) == Some("List") => {
                    items.clone()
                }
                _ => vec![json],
            };

            for item in items {
                let mut object = object_from_value(item)
                    .map_err(|source| StoreError::InvalidObject { index, source })?;
                if object.metadata.namespace.is_none() {
                    object.metadata.namespace = default_namespace.map(str::to_string);
                }
                objects.push(object);
            }
        }

        tracing::debug!("Loaded {} objects from manifests", objects.len());
        Ok(Self { objects })
    }

    /// Read and parse a manifest file
    pub fn from_file(path: &Path, default_namespace: Option<&str>) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_manifests(&content, default_namespace)
    }

    pub fn objects(&self) -> &[DynamicObject] {
        &self.objects
    }

    /// Find an object by group, kind, namespace and name
    pub fn find(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<&DynamicObject> {
        let key = ObjectKey::new(namespace, api_version, kind, name);
        self.objects.iter().find(|object| Self::matches(object, &key))
    }

    fn matches(object: &DynamicObject, key: &ObjectKey) -> bool {
        // Versions are not compared so manifests written against another
        // served version still resolve.
        if object.group_kind() != GroupKind::from_api_version(&key.api_version, &key.kind) {
            return false;
        }
        if let Some(namespace) = &key.namespace {
            if object.namespace().as_ref() != Some(namespace) {
                return false;
            }
        }
        if let Some(name) = &key.name {
            if &object.name_any() != name {
                return false;
            }
        }
        if let Some(selector) = &key.selector {
            let labels = object.labels();
            if !selector.iter().all(|(k, v)| labels.get(k) == Some(v)) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<DynamicObject>, StoreError> {
        key.require_name()?;
        Ok(self
            .objects
            .iter()
            .find(|object| Self::matches(object, key))
            .cloned())
    }

    async fn list(&self, key: &ObjectKey) -> Result<Vec<DynamicObject>, StoreError> {
        Ok(self
            .objects
            .iter()
            .filter(|object| Self::matches(object, key))
            .cloned()
            .collect())
    }
}
