//! Provisioning of composed bridge resources
//!
//! The [`Provisioner`] trait is the create/track/read contract between the
//! composer and the cluster: apply a manifest and get back its identifier,
//! read the resolved address of a materialized Service. [`KubeProvisioner`]
//! implements it with kube server-side apply over dynamic objects, so the
//! Traefik custom resources need no generated client types.
//!
//! [`provision_bridge`] walks a [`BridgeResourceSet`] in dependency order and
//! assembles the [`BridgeResult`]. Failures propagate verbatim: no retry, no
//! partial rollback - cleanup of partially created resources belongs to the
//! cluster's garbage collection, not this crate.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::discovery::ApiResource;
use kube::Client;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use tracing::info;

use crate::composer::BridgeResourceSet;
use crate::workload::ObjectMeta;
use crate::{Error, Result, FIELD_MANAGER};

// =============================================================================
// Manifest
// =============================================================================

/// A resource description ready for the provisioning engine
///
/// Carries the addressing fields (group/version/kind/plural, name, namespace)
/// next to the fully serialized object, so the engine can apply it without
/// API discovery.
#[derive(Clone, Debug)]
pub struct Manifest {
    /// apiVersion, e.g. `apps/v1` or `traefik.io/v1alpha1`
    pub api_version: String,
    /// Resource kind
    pub kind: String,
    /// Plural resource name used in API paths
    pub plural: String,
    /// Object name
    pub name: String,
    /// Object namespace
    pub namespace: String,
    /// The full serialized object
    pub value: serde_json::Value,
}

impl Manifest {
    /// Serialize a typed resource into an engine-ready manifest
    pub fn from_resource<T: Serialize>(
        plural: &str,
        metadata: &ObjectMeta,
        resource: &T,
    ) -> Result<Self> {
        let value = serde_json::to_value(resource).map_err(|e| Error::serialization(e.to_string()))?;
        let api_version = value["apiVersion"]
            .as_str()
            .ok_or_else(|| Error::serialization("manifest has no apiVersion"))?
            .to_string();
        let kind = value["kind"]
            .as_str()
            .ok_or_else(|| Error::serialization("manifest has no kind"))?
            .to_string();
        Ok(Self {
            api_version,
            kind,
            plural: plural.to_string(),
            name: metadata.name.clone(),
            namespace: metadata.namespace.clone(),
            value,
        })
    }

    fn api_resource(&self) -> ApiResource {
        let (group, version) = match self.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.api_version.as_str()),
        };
        ApiResource {
            group: group.to_string(),
            version: version.to_string(),
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            plural: self.plural.clone(),
        }
    }
}

// =============================================================================
// Provisioner
// =============================================================================

/// Create/track/read contract with the provisioning engine
///
/// Abstracts the cluster so composition results can be provisioned against a
/// mock in tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Apply a manifest, returning the identifier the engine knows it by
    async fn apply(&self, manifest: &Manifest) -> Result<String>;

    /// Resolved internal address of a materialized Service
    async fn service_address(&self, namespace: &str, name: &str) -> Result<String>;
}

/// Provisioner backed by the Kubernetes API (server-side apply)
pub struct KubeProvisioner {
    client: Client,
}

impl KubeProvisioner {
    /// Create a provisioner over the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Provisioner for KubeProvisioner {
    async fn apply(&self, manifest: &Manifest) -> Result<String> {
        let ar = manifest.api_resource();
        let obj: DynamicObject = serde_json::from_value(manifest.value.clone())
            .map_err(|e| Error::serialization(e.to_string()))?;

        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &manifest.namespace, &ar);
        let applied = api
            .patch(
                &manifest.name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(&obj),
            )
            .await?;

        info!(
            kind = %manifest.kind,
            name = %manifest.name,
            namespace = %manifest.namespace,
            "Applied bridge manifest"
        );

        Ok(applied.metadata.name.unwrap_or_else(|| manifest.name.clone()))
    }

    async fn service_address(&self, namespace: &str, name: &str) -> Result<String> {
        use k8s_openapi::api::core::v1::Service;

        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let service = services.get(name).await?;

        service
            .spec
            .and_then(|spec| spec.cluster_ip)
            .ok_or_else(|| {
                Error::provisioning(format!("service '{}' has no cluster IP yet", name))
            })
    }
}

// =============================================================================
// Bridge Provisioning
// =============================================================================

/// Identifiers and addresses produced by provisioning one bridge
///
/// `route` and `policies` are present exactly when the configuration carried
/// an external URL; `policies` is non-empty only when a path was set too.
#[derive(Clone, Debug, PartialEq)]
pub struct BridgeResult {
    /// Resolved in-cluster address of the bridge Service
    pub endpoint_address: String,
    /// Deployment identifier
    pub workload: String,
    /// Service identifier
    pub endpoint: String,
    /// IngressRoute identifier, when externally published
    pub route: Option<String>,
    /// Middleware identifiers, in build order
    pub policies: Vec<String>,
}

/// Apply a composed resource set in dependency order and collect the result
///
/// Order matters: the Service references the Deployment's labels, the route
/// references the Service and the middlewares, so each resource is applied
/// only after everything it references. The first failure aborts this bridge
/// and propagates; other bridges in a batch are unaffected.
pub async fn provision_bridge<P: Provisioner + ?Sized>(
    provisioner: &P,
    set: &BridgeResourceSet,
) -> Result<BridgeResult> {
    let workload = provisioner
        .apply(&Manifest::from_resource(
            "deployments",
            &set.deployment.metadata,
            &set.deployment,
        )?)
        .await?;

    let endpoint = provisioner
        .apply(&Manifest::from_resource(
            "services",
            &set.service.metadata,
            &set.service,
        )?)
        .await?;

    let mut policies = Vec::with_capacity(set.middlewares.len());
    for middleware in &set.middlewares {
        let id = provisioner
            .apply(&Manifest::from_resource(
                "middlewares",
                &middleware.metadata,
                middleware,
            )?)
            .await?;
        policies.push(id);
    }

    let mut route = None;
    if let Some(ingress_route) = &set.route {
        let id = provisioner
            .apply(&Manifest::from_resource(
                "ingressroutes",
                &ingress_route.metadata,
                ingress_route,
            )?)
            .await?;
        route = Some(id);
    }

    let endpoint_address = provisioner
        .service_address(&set.service.metadata.namespace, &endpoint)
        .await?;

    Ok(BridgeResult {
        endpoint_address,
        workload,
        endpoint,
        route,
        policies,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::BridgeComposer;
    use crate::config::{BackendSpec, BridgeConfig, ExternalUrl};
    use std::collections::BTreeMap;

    fn make_config(external_url: Option<ExternalUrl>) -> BridgeConfig {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "s3bridge".to_string());
        BridgeConfig {
            name: "s3bridge-compdes".to_string(),
            namespace: "s3bridge-app".to_string(),
            labels,
            backend: BackendSpec {
                endpoint: "http://ceph:8100".to_string(),
                bucket: "teaching-compdes-video".to_string(),
                access_key: "A".to_string(),
                secret_key: "B".to_string(),
            },
            external_url,
            allowed_origins: vec![],
        }
    }

    fn mock_echoing_applies() -> MockProvisioner {
        let mut provisioner = MockProvisioner::new();
        provisioner
            .expect_apply()
            .returning(|manifest| Ok(manifest.name.clone()));
        provisioner
            .expect_service_address()
            .returning(|_, _| Ok("10.96.0.17".to_string()));
        provisioner
    }

    // =========================================================================
    // Story: Manifest Serialization
    // =========================================================================

    #[test]
    fn story_manifest_carries_addressing_fields() {
        let config = make_config(None);
        let set = BridgeComposer::compose(&config).unwrap();

        let manifest =
            Manifest::from_resource("deployments", &set.deployment.metadata, &set.deployment)
                .unwrap();

        assert_eq!(manifest.api_version, "apps/v1");
        assert_eq!(manifest.kind, "Deployment");
        assert_eq!(manifest.plural, "deployments");
        assert_eq!(manifest.name, "s3bridge-compdes");
        assert_eq!(manifest.namespace, "s3bridge-app");
        assert_eq!(manifest.value["spec"]["replicas"], 1);
    }

    #[test]
    fn story_api_resource_splits_group_and_version() {
        let config = make_config(Some(ExternalUrl {
            host: "assets.kramer.science".to_string(),
            path: None,
        }));
        let set = BridgeComposer::compose(&config).unwrap();
        let route = set.route.as_ref().unwrap();

        let manifest = Manifest::from_resource("ingressroutes", &route.metadata, route).unwrap();
        let ar = manifest.api_resource();
        assert_eq!(ar.group, "traefik.io");
        assert_eq!(ar.version, "v1alpha1");
        assert_eq!(ar.plural, "ingressroutes");

        let service_manifest =
            Manifest::from_resource("services", &set.service.metadata, &set.service).unwrap();
        let ar = service_manifest.api_resource();
        assert_eq!(ar.group, "");
        assert_eq!(ar.version, "v1");
    }

    // =========================================================================
    // Story: Internal Bridge Result Has No Route Identifiers
    // =========================================================================

    #[tokio::test]
    async fn story_internal_bridge_result() {
        let set = BridgeComposer::compose(&make_config(None)).unwrap();
        let provisioner = mock_echoing_applies();

        let result = provision_bridge(&provisioner, &set).await.unwrap();

        assert_eq!(result.endpoint_address, "10.96.0.17");
        assert_eq!(result.workload, "s3bridge-compdes");
        assert_eq!(result.endpoint, "s3bridge-compdes");
        assert!(result.route.is_none());
        assert!(result.policies.is_empty());
    }

    // =========================================================================
    // Story: External Bridge Result Carries Route and Policy Identifiers
    // =========================================================================

    #[tokio::test]
    async fn story_external_bridge_result() {
        let config = make_config(Some(ExternalUrl {
            host: "assets.kramer.science".to_string(),
            path: Some("/compdes/video".to_string()),
        }));
        let set = BridgeComposer::compose(&config).unwrap();
        let provisioner = mock_echoing_applies();

        let result = provision_bridge(&provisioner, &set).await.unwrap();

        assert_eq!(result.route.as_deref(), Some("s3bridge-compdes"));
        assert_eq!(
            result.policies,
            vec![
                "s3bridge-compdes-strip-prefix".to_string(),
                "s3bridge-compdes-cors".to_string()
            ]
        );
    }

    // =========================================================================
    // Story: Resources Are Applied in Dependency Order
    // =========================================================================

    #[tokio::test]
    async fn story_applies_in_dependency_order() {
        use std::sync::{Arc, Mutex};

        let config = make_config(Some(ExternalUrl {
            host: "assets.kramer.science".to_string(),
            path: Some("/compdes/video".to_string()),
        }));
        let set = BridgeComposer::compose(&config).unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&order);

        let mut provisioner = MockProvisioner::new();
        provisioner.expect_apply().returning(move |manifest| {
            seen.lock().unwrap().push(manifest.kind.clone());
            Ok(manifest.name.clone())
        });
        provisioner
            .expect_service_address()
            .returning(|_, _| Ok("10.96.0.17".to_string()));

        provision_bridge(&provisioner, &set).await.unwrap();

        assert_eq!(
            *order.lock().unwrap(),
            vec![
                "Deployment".to_string(),
                "Service".to_string(),
                "Middleware".to_string(),
                "Middleware".to_string(),
                "IngressRoute".to_string()
            ]
        );
    }

    // =========================================================================
    // Story: Engine Failures Propagate Verbatim
    // =========================================================================

    #[tokio::test]
    async fn story_apply_failure_aborts_this_bridge() {
        let set = BridgeComposer::compose(&make_config(None)).unwrap();

        let mut provisioner = MockProvisioner::new();
        provisioner
            .expect_apply()
            .returning(|_| Err(Error::provisioning("admission webhook denied the request")));

        let err = provision_bridge(&provisioner, &set).await.unwrap_err();
        assert!(matches!(err, Error::Provisioning(_)));
    }
}
