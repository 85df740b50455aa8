//! Routing policy types for S3 bridges
//!
//! Defines the Traefik Middleware custom-resource types and
//! [`RoutingPolicyBuilder`], which derives the request-transformation policies
//! for an externally published bridge:
//!
//! - **strip-prefix**: removes the configured path prefix before forwarding
//! - **cors**: allows `GET` from the configured origins (wildcard by default)
//!
//! The zero/one/two-policy rule is a pure function over the configuration and
//! is testable in isolation from object construction.

use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;
use crate::workload::ObjectMeta;

// =============================================================================
// Traefik Middleware Types
// =============================================================================

/// Traefik Middleware custom resource
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Middleware {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: MiddlewareSpec,
}

/// Middleware spec, one variant per Traefik middleware type
///
/// Externally tagged so each variant serializes to the single-key spec shape
/// Traefik expects (`{"stripPrefix": ...}` / `{"headers": ...}`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum MiddlewareSpec {
    /// Path-prefix stripping
    StripPrefix(StripPrefixSpec),
    /// Header manipulation (CORS)
    Headers(HeadersSpec),
}

/// stripPrefix middleware spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StripPrefixSpec {
    /// Prefixes to strip from incoming requests
    pub prefixes: Vec<String>,
    /// Whether to force a trailing slash after stripping
    pub force_slash: bool,
}

/// headers middleware spec (CORS subset)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeadersSpec {
    /// Allowed CORS methods
    pub access_control_allow_methods: Vec<String>,
    /// Allowed CORS origins
    pub access_control_allow_origin_list: Vec<String>,
}

// =============================================================================
// Routing Policy Builder
// =============================================================================

/// Builder deriving the Traefik Middlewares for a [`BridgeConfig`]
///
/// Returns zero, one, or two policies:
/// - no external URL: empty (the route is not built either)
/// - external URL without a path: empty (host-only exposure needs neither
///   prefix stripping nor CORS headers)
/// - external URL with a path: `<name>-strip-prefix` then `<name>-cors`
///
/// The order only determines the generated names' readability; policy
/// application order belongs to the routing layer.
pub struct RoutingPolicyBuilder;

impl RoutingPolicyBuilder {
    /// Build the Middlewares for one bridge instance
    pub fn build(config: &BridgeConfig) -> Vec<Middleware> {
        let path = match config.external_url.as_ref().and_then(|u| u.path.as_ref()) {
            Some(path) => path,
            None => return vec![],
        };

        let strip_prefix = Middleware {
            api_version: "traefik.io/v1alpha1".to_string(),
            kind: "Middleware".to_string(),
            metadata: ObjectMeta::new(
                format!("{}-strip-prefix", config.name),
                &config.namespace,
            )
            .with_labels(config.labels.clone()),
            spec: MiddlewareSpec::StripPrefix(StripPrefixSpec {
                prefixes: vec![path.clone()],
                force_slash: false,
            }),
        };

        let origins = if config.allowed_origins.is_empty() {
            vec!["*".to_string()]
        } else {
            config.allowed_origins.clone()
        };

        let cors = Middleware {
            api_version: "traefik.io/v1alpha1".to_string(),
            kind: "Middleware".to_string(),
            metadata: ObjectMeta::new(format!("{}-cors", config.name), &config.namespace)
                .with_labels(config.labels.clone()),
            spec: MiddlewareSpec::Headers(HeadersSpec {
                access_control_allow_methods: vec!["GET".to_string()],
                access_control_allow_origin_list: origins,
            }),
        };

        vec![strip_prefix, cors]
    }
}

// =============================================================================
// Tests
// =============================================================================
