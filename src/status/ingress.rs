//! Ingress status: validates backends and TLS secrets against the store

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::{Ingress, IngressBackend, ServiceBackendPort};
use kube::ResourceExt;
use kube::core::DynamicObject;

use super::{KindStatus, ObjectStatus, StatusError, convert, parse_as};
use crate::cluster::{ObjectKey, ObjectStore};
use crate::graph::{Component, NodeStatus};
use crate::models::ResourceKind;

pub struct IngressChecker;

#[async_trait]
impl KindStatus for IngressChecker {
    async fn status(
        &self,
        object: &DynamicObject,
        store: &dyn ObjectStore,
    ) -> Result<ObjectStatus, StatusError> {
        let ingress: Ingress = parse_as(object, ResourceKind::Ingress)?;
        let namespace = object.namespace();
        let spec = ingress.spec.unwrap_or_default();

        let mut backends: Vec<IngressBackend> = spec.default_backend.into_iter().collect();
        for rule in spec.rules.iter().flatten() {
            for path in rule.http.iter().flat_map(|http| http.paths.iter()) {
                backends.push(path.backend.clone());
            }
        }

        if backends.is_empty() {
            return Ok(ObjectStatus::error(
                "Ingress does not define any rules or a default backend",
            ));
        }

        let mut problems = Vec::new();

        for backend in &backends {
            let Some(service_backend) = &backend.service else {
                continue;
            };
            let key = ObjectKey::new(
                namespace.as_deref(),
                "v1",
                "Service",
                &service_backend.name,
            );
            let service = store.get(&key).await.map_err(|source| {
                StatusError::lookup(object, format!("service {}", service_backend.name), source)
            })?;

            match service {
                None => problems.push(format!(
                    "Backend refers to service \"{}\" which does not exist",
                    service_backend.name
                )),
                Some(service) => {
                    let service: Service = convert(&service)?;
                    if let Some(port) = &service_backend.port {
                        if !service_exposes(&service, port) {
                            problems.push(format!(
                                "Backend for service \"{}\" specifies an invalid port",
                                service_backend.name
                            ));
                        }
                    }
                }
            }
        }

        for tls in spec.tls.iter().flatten() {
            let Some(secret_name) = &tls.secret_name else {
                continue;
            };
            let key = ObjectKey::new(namespace.as_deref(), "v1", "Secret", secret_name);
            let secret = store.get(&key).await.map_err(|source| {
                StatusError::lookup(object, format!("secret {}", secret_name), source)
            })?;
            if secret.is_none() {
                problems.push(format!("Secret \"{}\" does not exist", secret_name));
            }
        }

        if problems.is_empty() {
            return Ok(ObjectStatus::ok("Ingress is OK"));
        }

        problems.dedup();
        Ok(ObjectStatus::new(
            NodeStatus::Error,
            problems.into_iter().map(Component::text).collect(),
        ))
    }
}

fn service_exposes(service: &Service, port: &ServiceBackendPort) -> bool {
    let ports = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .map(Vec::as_slice)
        .unwrap_or_default();

    match (&port.name, port.number) {
        (Some(name), _) => ports.iter().any(|p| p.name.as_deref() == Some(name.as_str())),
        (None, Some(number)) => ports.iter().any(|p| p.port == number),
        (None, None) => true,
    }
}
