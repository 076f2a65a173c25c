//! Hostname normalization and classification.
//!
//! Classification is pure: it only looks at the hostname and the router
//! configuration. Whether a custom domain actually belongs to a tenant is
//! decided later against the tenant store.
use crate::config::RouterConfig;

/// Which branch of the tenant router a hostname falls into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostClass {
    CustomDomain,
    Dashboard,
    Root,
    Api,
    Subdomain(String),
}

impl HostClass {
    pub fn classify(host: &str, config: &RouterConfig) -> Self {
        let is_dev_host = host == config.dev_host;

        if !is_dev_host
            && (root_domain_of(host) != Some(config.root_domain.as_str())
                || config.is_whitelisted(host))
        {
            return Self::CustomDomain;
        }

        if host == config.dashboard_host()
            || config.alt_dashboard_host().is_some_and(|alt| host == alt)
        {
            return Self::Dashboard;
        }

        if is_dev_host || host == config.root_domain {
            return Self::Root;
        }

        if host == config.api_host() {
            return Self::Api;
        }

        Self::Subdomain(host.split('.').next().unwrap_or(host).to_string())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CustomDomain => "custom_domain",
            Self::Dashboard => "dashboard",
            Self::Root => "root",
            Self::Api => "api",
            Self::Subdomain(_) => "subdomain",
        }
    }
}

/// Maps `acme.localhost:3000` onto `acme.{root_domain}` so local testing sees
/// production-shaped hostnames.
pub fn normalize_host(raw: &str, config: &RouterConfig) -> String {
    let dev_suffix = format!(".{}", config.dev_host);

    match raw.strip_suffix(&dev_suffix) {
        Some(label) => format!("{label}.{}", config.root_domain),
        None => raw.to_string(),
    }
}

pub fn root_domain_of(host: &str) -> Option<&str> {
    if host.contains("localhost") {
        return host.rsplit('.').next();
    }

    let mut labels = host.rmatch_indices('.');
    let _last_dot = labels.next()?;

    match labels.next() {
        Some((second_dot, _)) => Some(&host[second_dot + 1..]),
        None => Some(host),
    }
}
