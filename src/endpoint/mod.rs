//! Endpoint types for S3 bridges
//!
//! Defines the Kubernetes Service resource types and [`EndpointBuilder`],
//! which derives the stable in-cluster address for a bridge workload. The
//! Service is always created, with no conditional logic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;
use crate::workload::ObjectMeta;
use crate::BRIDGE_PORT;

// =============================================================================
// Kubernetes Resource Types
// =============================================================================

/// Kubernetes Service
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: ServiceSpec,
}

/// Service spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Service type
    #[serde(rename = "type")]
    pub type_: String,
    /// Selector
    pub selector: BTreeMap<String, String>,
    /// Ports
    pub ports: Vec<ServicePort>,
}

/// Service port
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    /// Port name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Port number
    pub port: u16,
    /// Target port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u16>,
    /// Protocol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

// =============================================================================
// Endpoint Builder
// =============================================================================

/// Builder deriving the bridge's ClusterIP Service from a [`BridgeConfig`]
///
/// Selects `config.labels` - the same set the WorkloadBuilder stamps on the
/// pod template. The resolved ClusterIP becomes the bridge's endpoint address
/// once the provisioning engine materializes the Service.
pub struct EndpointBuilder;

impl EndpointBuilder {
    /// Build the Service for one bridge instance
    pub fn build(config: &BridgeConfig) -> Service {
        Service {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            metadata: ObjectMeta::new(&config.name, &config.namespace)
                .with_labels(config.labels.clone()),
            spec: ServiceSpec {
                type_: "ClusterIP".to_string(),
                selector: config.labels.clone(),
                ports: vec![ServicePort {
                    name: Some("http".to_string()),
                    port: BRIDGE_PORT,
                    target_port: Some(BRIDGE_PORT),
                    protocol: Some("TCP".to_string()),
                }],
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
