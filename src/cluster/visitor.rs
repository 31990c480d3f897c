//! Relationship traversal
//!
//! Starting from one object, `OwnerVisitor` discovers the connected objects
//! and reports them to an `ObjectHandler` as `process` and `add_edge` calls:
//! - owners upward through owner references
//! - owned children downward (ReplicaSets, Pods, Jobs)
//! - services and the pods their selectors match, from both sides
//! - ingresses and their backend services
//! - pods and the ConfigMaps, Secrets and ServiceAccount they use
//!
//! Children are visited concurrently; a shared visited set stops cycles.

use futures::future::{BoxFuture, FutureExt, try_join_all};
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use kube::core::DynamicObject;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

use super::store::{ObjectKey, ObjectStore, StoreError};
use crate::graph::GraphError;
use crate::graph::identity::identify;
use crate::models::{ObjectExt, ResourceKind, is_owned_by, typed};

/// Receiver of traversal facts
pub trait ObjectHandler: Send + Sync {
    fn process(&self, object: &DynamicObject) -> Result<(), GraphError>;
    fn add_edge(&self, parent: &DynamicObject, child: &DynamicObject) -> Result<(), GraphError>;
}

/// Traversal errors
#[derive(Debug, thiserror::Error)]
pub enum VisitError {
    #[error("unable to load objects related to {kind} {name}: {source}")]
    Store {
        kind: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("unable to read {kind} {name}: {source}")]
    Conversion {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("traversal cancelled")]
    Cancelled,
}

/// Direction of a discovered relation relative to the visited object
enum Relation {
    /// Edge from the related object to the visited one
    From(DynamicObject),
    /// Edge from the visited object to the related one
    To(DynamicObject),
}

impl Relation {
    fn object(&self) -> &DynamicObject {
        match self {
            Relation::From(object) | Relation::To(object) => object,
        }
    }
}

/// Traversal over ownership and usage relationships
pub struct OwnerVisitor {
    store: Arc<dyn ObjectStore>,
    visited: Mutex<HashSet<String>>,
    cancel: CancellationToken,
}

impl OwnerVisitor {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            visited: Mutex::new(HashSet::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the traversal when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Visit `object` and everything reachable from it
    pub async fn visit(
        &self,
        object: &DynamicObject,
        handler: &dyn ObjectHandler,
    ) -> Result<(), VisitError> {
        self.visit_boxed(object.clone(), handler).await
    }

    fn visit_boxed<'a>(
        &'a self,
        object: DynamicObject,
        handler: &'a dyn ObjectHandler,
    ) -> BoxFuture<'a, Result<(), VisitError>> {
        async move {
            if self.cancel.is_cancelled() {
                return Err(VisitError::Cancelled);
            }
            if !self.mark_visited(&object) {
                return Ok(());
            }

            tracing::debug!("Visiting {} {}", object.object_kind(), object.name_any());
            handler.process(&object)?;

            let relations = tokio::select! {
                _ = self.cancel.cancelled() => return Err(VisitError::Cancelled),
                relations = self.relations(&object) => relations?,
            };

            for relation in &relations {
                match relation {
                    Relation::From(related) => handler.add_edge(related, &object)?,
                    Relation::To(related) => handler.add_edge(&object, related)?,
                }
            }

            try_join_all(
                relations
                    .iter()
                    .map(|relation| self.visit_boxed(relation.object().clone(), handler)),
            )
            .await?;
            Ok(())
        }
        .boxed()
    }

    fn mark_visited(&self, object: &DynamicObject) -> bool {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identify(object))
    }

    async fn relations(&self, object: &DynamicObject) -> Result<Vec<Relation>, VisitError> {
        let mut relations = Vec::new();

        for owner in self.owners(object).await? {
            relations.push(Relation::From(owner));
        }
        for child in self.owned_children(object).await? {
            relations.push(Relation::To(child));
        }

        if object.is_kind(ResourceKind::Service) {
            for pod in self.selected_pods(object).await? {
                relations.push(Relation::To(pod));
            }
            for ingress in self.ingresses_for_service(object).await? {
                relations.push(Relation::From(ingress));
            }
        } else if object.is_kind(ResourceKind::Ingress) {
            for service in self.backend_services(object).await? {
                relations.push(Relation::To(service));
            }
        } else if object.is_kind(ResourceKind::Pod) {
            for service in self.selecting_services(object).await? {
                relations.push(Relation::From(service));
            }
            for used in self.pod_dependencies(object).await? {
                relations.push(Relation::To(used));
            }
        }

        Ok(relations)
    }

    fn store_error(object: &DynamicObject) -> impl FnOnce(StoreError) -> VisitError + '_ {
        move |source| VisitError::Store {
            kind: object.object_kind().to_string(),
            name: object.name_any(),
            source,
        }
    }

    fn typed<K: serde::de::DeserializeOwned>(object: &DynamicObject) -> Result<K, VisitError> {
        typed(object).map_err(|source| VisitError::Conversion {
            kind: object.object_kind().to_string(),
            name: object.name_any(),
            source,
        })
    }

    async fn get(
        &self,
        object: &DynamicObject,
        key: ObjectKey,
    ) -> Result<Option<DynamicObject>, VisitError> {
        self.store.get(&key).await.map_err(Self::store_error(object))
    }

    async fn list(
        &self,
        object: &DynamicObject,
        key: ObjectKey,
    ) -> Result<Vec<DynamicObject>, VisitError> {
        self.store.list(&key).await.map_err(Self::store_error(object))
    }

    async fn owners(&self, object: &DynamicObject) -> Result<Vec<DynamicObject>, VisitError> {
        let namespace = object.namespace();
        let mut owners = Vec::new();
        for reference in object.owner_references() {
            let key = ObjectKey::new(
                namespace.as_deref(),
                &reference.api_version,
                &reference.kind,
                &reference.name,
            );
            if let Some(owner) = self.get(object, key).await? {
                owners.push(owner);
            }
        }
        Ok(owners)
    }

    async fn owned_children(
        &self,
        object: &DynamicObject,
    ) -> Result<Vec<DynamicObject>, VisitError> {
        let child_kind = match ResourceKind::from_group_kind(&object.group_kind()) {
            Some(ResourceKind::Deployment) => ResourceKind::ReplicaSet,
            Some(ResourceKind::CronJob) => ResourceKind::Job,
            Some(
                ResourceKind::ReplicaSet
                | ResourceKind::ReplicationController
                | ResourceKind::StatefulSet
                | ResourceKind::DaemonSet
                | ResourceKind::Job,
            ) => ResourceKind::Pod,
            _ => return Ok(Vec::new()),
        };

        let namespace = object.namespace();
        let key = ObjectKey::list(
            namespace.as_deref(),
            child_kind.api_version(),
            child_kind.as_str(),
        );
        let candidates = self.list(object, key).await?;
        Ok(candidates
            .into_iter()
            .filter(|candidate| is_owned_by(candidate, object))
            .collect())
    }

    async fn selected_pods(
        &self,
        service: &DynamicObject,
    ) -> Result<Vec<DynamicObject>, VisitError> {
        let spec: Service = Self::typed(service)?;
        let selector = spec.spec.and_then(|s| s.selector).unwrap_or_default();
        if selector.is_empty() {
            return Ok(Vec::new());
        }

        let namespace = service.namespace();
        let key = ObjectKey::list(namespace.as_deref(), "v1", "Pod").with_selector(selector);
        self.list(service, key).await
    }

    async fn selecting_services(
        &self,
        pod: &DynamicObject,
    ) -> Result<Vec<DynamicObject>, VisitError> {
        let namespace = pod.namespace();
        let labels = pod.labels();
        let services = self
            .list(pod, ObjectKey::list(namespace.as_deref(), "v1", "Service"))
            .await?;

        let mut matching = Vec::new();
        for service in services {
            let typed_service: Service = Self::typed(&service)?;
            let selector = typed_service.spec.and_then(|s| s.selector).unwrap_or_default();
            if selects(&selector, labels) {
                matching.push(service);
            }
        }
        Ok(matching)
    }

    async fn backend_services(
        &self,
        ingress: &DynamicObject,
    ) -> Result<Vec<DynamicObject>, VisitError> {
        let typed_ingress: Ingress = Self::typed(ingress)?;
        let namespace = ingress.namespace();

        let mut services = Vec::new();
        for name in backend_service_names(&typed_ingress) {
            let key = ObjectKey::new(namespace.as_deref(), "v1", "Service", &name);
            if let Some(service) = self.get(ingress, key).await? {
                services.push(service);
            }
        }
        Ok(services)
    }

    async fn ingresses_for_service(
        &self,
        service: &DynamicObject,
    ) -> Result<Vec<DynamicObject>, VisitError> {
        let namespace = service.namespace();
        let name = service.name_any();
        let ingress_kind = ResourceKind::Ingress;
        let key = ObjectKey::list(
            namespace.as_deref(),
            ingress_kind.api_version(),
            ingress_kind.as_str(),
        );

        let mut matching = Vec::new();
        for ingress in self.list(service, key).await? {
            let typed_ingress: Ingress = Self::typed(&ingress)?;
            if backend_service_names(&typed_ingress).contains(&name) {
                matching.push(ingress);
            }
        }
        Ok(matching)
    }

    async fn pod_dependencies(
        &self,
        pod: &DynamicObject,
    ) -> Result<Vec<DynamicObject>, VisitError> {
        let typed_pod: Pod = Self::typed(pod)?;
        let namespace = pod.namespace();

        let mut used = Vec::new();
        for (kind, name) in pod_references(&typed_pod) {
            let key = ObjectKey::new(namespace.as_deref(), "v1", kind, &name);
            if let Some(object) = self.get(pod, key).await? {
                used.push(object);
            }
        }
        Ok(used)
    }
}

/// True when a non-empty selector matches all of its labels
fn selects(selector: &BTreeMap<String, String>, labels: &BTreeMap<String, String>) -> bool {
    !selector.is_empty() && selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

fn backend_service_names(ingress: &Ingress) -> BTreeSet<String> {
    let Some(spec) = &ingress.spec else {
        return BTreeSet::new();
    };

    let rule_backends = spec
        .rules
        .iter()
        .flatten()
        .filter_map(|rule| rule.http.as_ref())
        .flat_map(|http| http.paths.iter().map(|path| &path.backend));

    spec.default_backend
        .iter()
        .chain(rule_backends)
        .filter_map(|backend| backend.service.as_ref())
        .map(|service| service.name.clone())
        .collect()
}

/// ConfigMaps, Secrets and the ServiceAccount a pod refers to, as (kind, name)
fn pod_references(pod: &Pod) -> BTreeSet<(&'static str, String)> {
    let mut references = BTreeSet::new();
    let Some(spec) = &pod.spec else {
        return references;
    };

    if let Some(account) = spec.service_account_name.as_ref().filter(|a| !a.is_empty()) {
        references.insert(("ServiceAccount", account.clone()));
    }

    for volume in spec.volumes.iter().flatten() {
        if let Some(name) = volume.config_map.as_ref().map(|c| c.name.clone()) {
            references.insert(("ConfigMap", name));
        }
        if let Some(name) = volume.secret.as_ref().and_then(|s| s.secret_name.clone()) {
            references.insert(("Secret", name));
        }
    }

    let containers = spec
        .init_containers
        .iter()
        .flatten()
        .chain(spec.containers.iter());
    for container in containers {
        for source in container.env_from.iter().flatten() {
            if let Some(name) = source.config_map_ref.as_ref().map(|r| r.name.clone()) {
                references.insert(("ConfigMap", name));
            }
            if let Some(name) = source.secret_ref.as_ref().map(|r| r.name.clone()) {
                references.insert(("Secret", name));
            }
        }
        for var in container.env.iter().flatten() {
            let Some(from) = &var.value_from else {
                continue;
            };
            if let Some(name) = from.config_map_key_ref.as_ref().map(|r| r.name.clone()) {
                references.insert(("ConfigMap", name));
            }
            if let Some(name) = from.secret_key_ref.as_ref().map(|r| r.name.clone()) {
                references.insert(("Secret", name));
            }
        }
    }

    references.retain(|(_, name)| !name.is_empty());
    references
}
