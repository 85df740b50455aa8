//! Workload types for S3 bridges
//!
//! This module defines the Kubernetes Deployment resource types used by the
//! BridgeComposer, plus [`WorkloadBuilder`] which derives the single-replica
//! bridge workload from backend connection parameters.
//!
//! For full composition, use [`crate::composer::BridgeComposer`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;
use crate::{Result, BRIDGE_IMAGE, BRIDGE_PORT};

// =============================================================================
// Kubernetes Resource Types
// =============================================================================

/// Standard Kubernetes ObjectMeta
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Resource name
    pub name: String,
    /// Resource namespace
    pub namespace: String,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Create new metadata with no labels
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Replace the label set
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }
}

/// Kubernetes Deployment
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: DeploymentSpec,
}

/// Deployment spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// Number of replicas
    pub replicas: u32,
    /// Label selector
    pub selector: LabelSelector,
    /// Pod template
    pub template: PodTemplateSpec,
}

/// Label selector
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Match labels
    pub match_labels: BTreeMap<String, String>,
}

/// Pod template spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplateSpec {
    /// Pod metadata
    pub metadata: PodMeta,
    /// Pod spec
    pub spec: PodSpec,
}

/// Pod metadata (subset of ObjectMeta)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodMeta {
    /// Labels
    pub labels: BTreeMap<String, String>,
}

/// Pod spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Containers
    pub containers: Vec<Container>,
}

/// Container spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name
    pub name: String,
    /// Image
    pub image: String,
    /// Ports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
    /// Environment variables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

/// Environment variable
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Variable name
    pub name: String,
    /// Variable value
    pub value: String,
}

/// Container port
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Port number
    pub container_port: u16,
}

// =============================================================================
// Workload Builder
// =============================================================================

/// Builder deriving the bridge Deployment from a [`BridgeConfig`]
///
/// Produces a single-replica workload running the bridge container with the
/// four backend environment entries. The selector and the template labels are
/// both set from `config.labels` - the binding contract the EndpointBuilder
/// relies on.
pub struct WorkloadBuilder;

impl WorkloadBuilder {
    /// Build the Deployment for one bridge instance
    pub fn build(config: &BridgeConfig) -> Result<Deployment> {
        config.validate()?;

        let env = vec![
            EnvVar {
                name: "ENDPOINT".to_string(),
                value: config.backend.endpoint.clone(),
            },
            EnvVar {
                name: "BUCKET".to_string(),
                value: config.backend.bucket.clone(),
            },
            EnvVar {
                name: "AWS_ACCESS_KEY_ID".to_string(),
                value: config.backend.access_key.clone(),
            },
            EnvVar {
                name: "AWS_SECRET_ACCESS_KEY".to_string(),
                value: config.backend.secret_key.clone(),
            },
        ];

        Ok(Deployment {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            metadata: ObjectMeta::new(&config.name, &config.namespace)
                .with_labels(config.labels.clone()),
            spec: DeploymentSpec {
                replicas: 1,
                selector: LabelSelector {
                    match_labels: config.labels.clone(),
                },
                template: PodTemplateSpec {
                    metadata: PodMeta {
                        labels: config.labels.clone(),
                    },
                    spec: PodSpec {
                        containers: vec![Container {
                            name: "s3bridge".to_string(),
                            image: BRIDGE_IMAGE.to_string(),
                            ports: vec![ContainerPort {
                                name: Some("http".to_string()),
                                container_port: BRIDGE_PORT,
                            }],
                            env,
                        }],
                    },
                },
            },
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendSpec;

    fn make_config(name: &str) -> BridgeConfig {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "s3bridge".to_string());
        labels.insert("module".to_string(), "compdes".to_string());
        BridgeConfig {
            name: name.to_string(),
            namespace: "s3bridge-app".to_string(),
            labels,
            backend: BackendSpec {
                endpoint: "http://ceph:8100".to_string(),
                bucket: "teaching-compdes-video".to_string(),
                access_key: "A".to_string(),
                secret_key: "B".to_string(),
            },
            external_url: None,
            allowed_origins: vec![],
        }
    }

    // =========================================================================
    // Story: Single-Replica Bridge Workload
    // =========================================================================

    #[test]
    fn story_builds_single_replica_deployment() {
        let config = make_config("s3bridge-compdes");
        let deployment = WorkloadBuilder::build(&config).unwrap();

        assert_eq!(deployment.api_version, "apps/v1");
        assert_eq!(deployment.kind, "Deployment");
        assert_eq!(deployment.metadata.name, "s3bridge-compdes");
        assert_eq!(deployment.metadata.namespace, "s3bridge-app");
        assert_eq!(deployment.spec.replicas, 1);
    }

    #[test]
    fn story_container_runs_bridge_image_on_http_port() {
        let config = make_config("s3bridge-compdes");
        let deployment = WorkloadBuilder::build(&config).unwrap();

        let container = &deployment.spec.template.spec.containers[0];
        assert_eq!(container.name, "s3bridge");
        assert_eq!(container.image, BRIDGE_IMAGE);
        assert_eq!(container.ports.len(), 1);
        assert_eq!(container.ports[0].name.as_deref(), Some("http"));
        assert_eq!(container.ports[0].container_port, 80);
    }

    // =========================================================================
    // Story: Backend Passthrough as Environment
    // =========================================================================

    #[test]
    fn story_backend_maps_verbatim_to_env() {
        let config = make_config("s3bridge-compdes");
        let deployment = WorkloadBuilder::build(&config).unwrap();

        let env = &deployment.spec.template.spec.containers[0].env;
        let get = |name: &str| {
            env.iter()
                .find(|e| e.name == name)
                .map(|e| e.value.as_str())
        };
        assert_eq!(get("ENDPOINT"), Some("http://ceph:8100"));
        assert_eq!(get("BUCKET"), Some("teaching-compdes-video"));
        assert_eq!(get("AWS_ACCESS_KEY_ID"), Some("A"));
        assert_eq!(get("AWS_SECRET_ACCESS_KEY"), Some("B"));
    }

    // =========================================================================
    // Story: Selector and Template Share the Config Labels
    // =========================================================================

    #[test]
    fn story_selector_equals_template_labels() {
        let config = make_config("s3bridge-compdes");
        let deployment = WorkloadBuilder::build(&config).unwrap();

        assert_eq!(deployment.spec.selector.match_labels, config.labels);
        assert_eq!(deployment.spec.template.metadata.labels, config.labels);
    }

    // =========================================================================
    // Story: Invalid Config Fails Before Construction
    // =========================================================================

    #[test]
    fn story_missing_name_fails_fast() {
        let config = make_config("");
        assert!(WorkloadBuilder::build(&config).is_err());
    }
}
