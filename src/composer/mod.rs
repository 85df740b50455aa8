//! Bridge composition
//!
//! [`BridgeComposer`] turns one [`BridgeConfig`] into a [`BridgeResourceSet`]
//! by running the specialized builders in dependency order:
//!
//! 1. [`WorkloadBuilder`](crate::workload::WorkloadBuilder) - the Deployment
//! 2. [`EndpointBuilder`](crate::endpoint::EndpointBuilder) - the Service selecting it
//! 3. [`RoutingPolicyBuilder`](crate::routing::RoutingPolicyBuilder) - zero, one, or two Middlewares
//! 4. [`RouteBuilder`](crate::route::RouteBuilder) - the optional IngressRoute
//!
//! Composition is a pure, synchronous derivation: no I/O, no shared state, no
//! randomness. Composing twice from the same configuration yields structurally
//! identical resources. The resource set holds no live handle to the cluster;
//! applying it is the [`crate::provision`] module's job.

use crate::config::BridgeConfig;
use crate::endpoint::{EndpointBuilder, Service};
use crate::route::{IngressRoute, RouteBuilder};
use crate::routing::{Middleware, RoutingPolicyBuilder};
use crate::workload::{Deployment, WorkloadBuilder};
use crate::{Error, Result};

/// All resources derived for one bridge instance
///
/// A plain value aggregate. The provisioning engine consumes it to establish
/// ownership and materialize the resources; the composer never touches it
/// again after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct BridgeResourceSet {
    /// The bridge Deployment
    pub deployment: Deployment,
    /// The ClusterIP Service
    pub service: Service,
    /// Traefik Middlewares, in build order (strip-prefix, then cors)
    pub middlewares: Vec<Middleware>,
    /// The IngressRoute, when external exposure was requested
    pub route: Option<IngressRoute>,
}

impl BridgeResourceSet {
    /// Total count of resources in the set
    pub fn resource_count(&self) -> usize {
        // Deployment + Service are always present
        2 + self.middlewares.len() + usize::from(self.route.is_some())
    }

    /// Whether the bridge is published externally
    pub fn is_external(&self) -> bool {
        self.route.is_some()
    }
}

/// Composer deriving the full resource set for a bridge instance
pub struct BridgeComposer;

impl BridgeComposer {
    /// Compose the resource set for one bridge configuration
    ///
    /// Validates the configuration, runs the four builders in dependency
    /// order, and checks the label-binding invariant between the workload and
    /// the endpoint before returning. A failure here is fatal to this bridge
    /// instance only; callers composing a batch keep going with the rest.
    pub fn compose(config: &BridgeConfig) -> Result<BridgeResourceSet> {
        let deployment = WorkloadBuilder::build(config)?;
        let service = EndpointBuilder::build(config);

        Self::check_label_binding(&deployment, &service)?;

        let middlewares = RoutingPolicyBuilder::build(config);
        let route = RouteBuilder::build(config, &service, &middlewares);

        Ok(BridgeResourceSet {
            deployment,
            service,
            middlewares,
            route,
        })
    }

    /// Verify the workload selector, pod template labels, and Service
    /// selector are one and the same set
    ///
    /// A mismatch means the Service would select nothing and traffic would be
    /// dropped silently, so it is rejected as a configuration error here
    /// rather than surfacing as a provisioning failure later. Both builders
    /// draw from the same `config.labels` value, which makes this structurally
    /// true today; the check keeps it true through refactors.
    fn check_label_binding(deployment: &Deployment, service: &Service) -> Result<()> {
        let selector = &deployment.spec.selector.match_labels;
        let template = &deployment.spec.template.metadata.labels;
        if selector != template {
            return Err(Error::configuration(
                "workload selector does not match pod template labels",
            ));
        }
        if selector != &service.spec.selector {
            return Err(Error::configuration(
                "endpoint selector does not match workload labels",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
