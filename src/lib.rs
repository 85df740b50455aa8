//! S3 Bridge operator - exposes S3-compatible buckets as in-cluster HTTP services
//!
//! An S3 bridge is a small single-replica workload that proxies HTTP requests to
//! an object-storage bucket. This crate derives the Kubernetes resources for one
//! bridge instance from a [`config::BridgeConfig`] record:
//!
//! - a Deployment running the bridge container (always)
//! - a ClusterIP Service selecting it (always)
//! - Traefik Middlewares for prefix stripping and CORS (only with an external path)
//! - a Traefik IngressRoute publishing it (only with an external URL)
//!
//! # Architecture
//!
//! The [`composer::BridgeComposer`] runs the specialized builders in dependency
//! order and returns a [`composer::BridgeResourceSet`] - a plain value aggregate
//! with no live handle to the cluster. The [`provision`] module then applies the
//! set through the [`provision::Provisioner`] trait and assembles a
//! [`provision::BridgeResult`] from the resulting identifiers. Composition is
//! synchronous, deterministic, and performs no I/O; all cluster interaction
//! lives behind the provisioner seam.
//!
//! # Modules
//!
//! - [`config`] - Bridge configuration records and the deployment file model
//! - [`workload`] - Deployment manifest types and the WorkloadBuilder
//! - [`endpoint`] - Service manifest types and the EndpointBuilder
//! - [`routing`] - Traefik Middleware types and the RoutingPolicyBuilder
//! - [`route`] - Traefik IngressRoute types and the RouteBuilder
//! - [`composer`] - Composition of all builders into a BridgeResourceSet
//! - [`provision`] - Provisioner trait, kube-backed implementation, result assembly
//! - [`secrets`] - Backend credential lookup from a Kubernetes Secret
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod composer;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod provision;
pub mod route;
pub mod routing;
pub mod secrets;
pub mod workload;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Container image run by every bridge workload
pub const BRIDGE_IMAGE: &str = "kramergroup/s3bridge";

/// Port the bridge container listens on, and the Service port
pub const BRIDGE_PORT: u16 = 80;

/// Traefik certificate resolver requested for external routes
pub const CERT_RESOLVER: &str = "prod";

/// Traefik entry point external routes register on
pub const ENTRY_POINT: &str = "websecure";

/// Field manager name used for server-side apply
pub const FIELD_MANAGER: &str = "s3bridge-operator";
