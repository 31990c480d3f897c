//! Service status: healthy when at least one endpoint address backs it

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Endpoints, Service};
use kube::ResourceExt;
use kube::core::DynamicObject;

use super::{KindStatus, ObjectStatus, StatusError, convert, parse_as};
use crate::cluster::{ObjectKey, ObjectStore};
use crate::models::ResourceKind;

pub struct ServiceChecker;

#[async_trait]
impl KindStatus for ServiceChecker {
    async fn status(
        &self,
        object: &DynamicObject,
        store: &dyn ObjectStore,
    ) -> Result<ObjectStatus, StatusError> {
        let service: Service = parse_as(object, ResourceKind::Service)?;

        let external_name = service
            .spec
            .as_ref()
            .and_then(|spec| spec.type_.as_deref())
            == Some("ExternalName");
        if external_name {
            return Ok(ObjectStatus::ok("Service is OK"));
        }

        let namespace = object.namespace();
        let name = object.name_any();
        let key = ObjectKey::new(namespace.as_deref(), "v1", "Endpoints", &name);
        let endpoints = store
            .get(&key)
            .await
            .map_err(|source| StatusError::lookup(object, format!("endpoints {}", name), source))?;

        let addresses = match endpoints {
            Some(endpoints) => count_addresses(&convert::<Endpoints>(&endpoints)?),
            None => 0,
        };

        if addresses == 0 {
            Ok(ObjectStatus::warning("Service has no endpoints"))
        } else {
            Ok(ObjectStatus::ok("Service is OK"))
        }
    }
}

fn count_addresses(endpoints: &Endpoints) -> usize {
    endpoints
        .subsets
        .iter()
        .flatten()
        .map(|subset| subset.addresses.as_ref().map(Vec::len).unwrap_or(0))
        .sum()
}
