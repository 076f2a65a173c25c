//! # Tenant Router
//!
//! Every routable request is classified by hostname and rewritten onto one of
//! the internal route trees. Branches are tried in order and the first match
//! wins:
//!
//! 1. Custom domain: look up the verified tenant, rewrite to `/{slug}{path}`
//! 2. Dashboard host: gate on session, rewrite to `/dash{path}`
//! 3. Root host: reserved first segments go to `/home{path}`, the rest are tenant paths
//! 4. API host: rewrite to `/api{path}`
//! 5. Anything else: see [`FallbackPolicy`]
//!
//! The router never fails a request because of the tenant store. A lookup error
//! is logged and the request passes through untouched, which downstream shows
//! as a not-found page.
use std::sync::Arc;

use tracing::warn;

use crate::{
    config::{FallbackPolicy, RouterConfig},
    decision::{RouteAction, RouteHeaders, RoutingDecision},
    host::{HostClass, normalize_host},
    request::{RequestContext, SetCookie},
    session::SessionGate,
    tenant::TenantStore,
};

const RESERVED_ROOT_SEGMENTS: [&str; 4] = ["home", "dash", "api", "auth"];
const AUTH_CALLBACK: &str = "/auth/callback";
const LOGIN: &str = "/login";

#[derive(Clone)]
pub struct TenantRouter {
    config: Arc<RouterConfig>,
    tenants: Arc<dyn TenantStore>,
}

impl TenantRouter {
    pub fn new(config: RouterConfig, tenants: Arc<dyn TenantStore>) -> Self {
        Self {
            config: Arc::new(config),
            tenants,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn tenants(&self) -> &Arc<dyn TenantStore> {
        &self.tenants
    }

    /// Computes the routing decision for one request. `cookies` are the
    /// session store's changes and end up on every outcome.
    pub async fn route(
        &self,
        ctx: &RequestContext,
        gate: &SessionGate,
        cookies: Vec<SetCookie>,
    ) -> RoutingDecision {
        let host = normalize_host(&ctx.hostname, &self.config);

        let decision = match HostClass::classify(&host, &self.config) {
            HostClass::CustomDomain => self.custom_domain(&host, ctx).await,
            HostClass::Dashboard => self.dashboard(ctx, gate),
            HostClass::Root => self.root(ctx),
            HostClass::Api => Self::api(ctx),
            HostClass::Subdomain(label) => self.fallback(&label, ctx),
        };

        decision.with_cookies(cookies)
    }

    async fn custom_domain(&self, host: &str, ctx: &RequestContext) -> RoutingDecision {
        let branch = HostClass::CustomDomain.name();

        let tenant = match self.tenants.find_by_verified_custom_domain(host).await {
            Ok(Some(tenant)) => tenant,
            Ok(None) => return RoutingDecision::pass_through(branch),
            Err(e) => {
                warn!("Tenant lookup for {host} failed: {e}");
                return RoutingDecision::pass_through(branch);
            }
        };

        RoutingDecision::new(
            branch,
            RouteAction::Rewrite(format!("/{}{}", tenant.slug, ctx.path_and_query())),
            RouteHeaders::tenant(ctx, &tenant.slug).powered_by(&self.config.powered_by),
        )
    }

    fn dashboard(&self, ctx: &RequestContext, gate: &SessionGate) -> RoutingDecision {
        let branch = HostClass::Dashboard.name();
        let path = ctx.path.as_str();

        let public = path == LOGIN || path == "/signup" || path.starts_with("/invite/");
        if !gate.is_authenticated() && !public {
            return RoutingDecision::new(
                branch,
                RouteAction::Redirect(LOGIN.to_string()),
                RouteHeaders::default(),
            );
        }

        RoutingDecision::new(
            branch,
            RouteAction::Rewrite(prefixed("/dash", ctx)),
            RouteHeaders::tenant(ctx, ctx.first_segment()),
        )
    }

    fn root(&self, ctx: &RequestContext) -> RoutingDecision {
        let branch = HostClass::Root.name();

        // The callback owns a fixed route and must never be rewritten.
        if ctx.path.starts_with(AUTH_CALLBACK) {
            return RoutingDecision::pass_through(branch);
        }

        let first = ctx.first_named_segment();
        if first.is_some_and(|s| RESERVED_ROOT_SEGMENTS.contains(&s)) {
            return RoutingDecision::new(
                branch,
                RouteAction::Rewrite(prefixed("/home", ctx)),
                RouteHeaders::tenant(ctx, ctx.first_segment()),
            );
        }

        RoutingDecision::new(
            branch,
            RouteAction::PassThrough,
            RouteHeaders::tenant(ctx, first.unwrap_or("")),
        )
    }

    fn api(ctx: &RequestContext) -> RoutingDecision {
        RoutingDecision::new(
            HostClass::Api.name(),
            RouteAction::Rewrite(format!("/api{}", ctx.path_and_query())),
            RouteHeaders::tenant(ctx, ctx.first_segment()),
        )
    }

    fn fallback(&self, label: &str, ctx: &RequestContext) -> RoutingDecision {
        let branch = HostClass::Subdomain(String::new()).name();

        match self.config.fallback {
            FallbackPolicy::PassThrough => RoutingDecision::pass_through(branch),
            FallbackPolicy::Subdomain => RoutingDecision::new(
                branch,
                RouteAction::Rewrite(format!("/{label}{}", ctx.path_and_query())),
                RouteHeaders::tenant(ctx, label).powered_by(&self.config.powered_by),
            ),
        }
    }
}

/// `/` maps onto the bare prefix, anything else is appended.
fn prefixed(prefix: &str, ctx: &RequestContext) -> String {
    let path = if ctx.path == "/" { "" } else { ctx.path.as_str() };

    format!("{prefix}{path}{}", ctx.query_string())
}
