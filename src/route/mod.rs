//! Route types for S3 bridges
//!
//! Defines the Traefik IngressRoute custom-resource types, the match-rule
//! formatter, and [`RouteBuilder`], which publishes a bridge endpoint on an
//! external host. Only built when the configuration carries an external URL.

use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;
use crate::endpoint::Service;
use crate::routing::Middleware;
use crate::workload::ObjectMeta;
use crate::{BRIDGE_PORT, CERT_RESOLVER, ENTRY_POINT};

// =============================================================================
// Traefik IngressRoute Types
// =============================================================================

/// Traefik IngressRoute custom resource
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngressRoute {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: IngressRouteSpec,
}

/// IngressRoute spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngressRouteSpec {
    /// Entry points the route registers on
    pub entry_points: Vec<String>,
    /// Match rules
    pub routes: Vec<RouteRule>,
    /// TLS terms
    pub tls: RouteTls,
}

/// One match rule forwarding to backend services
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteRule {
    /// Rule kind (always "Rule")
    pub kind: String,
    /// Match predicate, passed to Traefik verbatim
    #[serde(rename = "match")]
    pub match_: String,
    /// Backend services
    pub services: Vec<RouteService>,
    /// Attached middlewares
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middlewares: Vec<MiddlewareRef>,
}

/// Backend service reference
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteService {
    /// Referenced kind (always "Service")
    pub kind: String,
    /// Service name
    pub name: String,
    /// Service port
    pub port: u16,
}

/// Middleware reference by name
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareRef {
    /// Middleware name
    pub name: String,
}

/// TLS terms for the route
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTls {
    /// Named certificate resolver issuing the certificate
    pub cert_resolver: String,
}

// =============================================================================
// Match Rule
// =============================================================================

/// Format the Traefik match predicate for a host and optional path prefix
///
/// Produces ``Host(`host`)`` or ``Host(`host`) && PathPrefix(`path`)`` with
/// Traefik's backtick-delimited literal syntax. Values are inserted as-is:
/// the configuration is trusted operator input, and embedded backticks are
/// not escaped.
pub fn match_rule(host: &str, path: Option<&str>) -> String {
    match path {
        Some(path) => format!("Host(`{}`) && PathPrefix(`{}`)", host, path),
        None => format!("Host(`{}`)", host),
    }
}

// =============================================================================
// Route Builder
// =============================================================================

/// Builder deriving the IngressRoute for an externally published bridge
///
/// Forwards matched traffic to the bridge Service on port 80, attaches the
/// given middlewares in build order, requests a certificate from the fixed
/// resolver, and registers on the single TLS entry point.
pub struct RouteBuilder;

impl RouteBuilder {
    /// Build the IngressRoute, or `None` when the bridge is internal only
    pub fn build(
        config: &BridgeConfig,
        endpoint: &Service,
        policies: &[Middleware],
    ) -> Option<IngressRoute> {
        let external = config.external_url.as_ref()?;

        let middlewares = policies
            .iter()
            .map(|m| MiddlewareRef {
                name: m.metadata.name.clone(),
            })
            .collect();

        Some(IngressRoute {
            api_version: "traefik.io/v1alpha1".to_string(),
            kind: "IngressRoute".to_string(),
            metadata: ObjectMeta::new(&config.name, &config.namespace)
                .with_labels(config.labels.clone()),
            spec: IngressRouteSpec {
                entry_points: vec![ENTRY_POINT.to_string()],
                routes: vec![RouteRule {
                    kind: "Rule".to_string(),
                    match_: match_rule(&external.host, external.path.as_deref()),
                    services: vec![RouteService {
                        kind: "Service".to_string(),
                        name: endpoint.metadata.name.clone(),
                        port: BRIDGE_PORT,
                    }],
                    middlewares,
                }],
                tls: RouteTls {
                    cert_resolver: CERT_RESOLVER.to_string(),
                },
            },
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
