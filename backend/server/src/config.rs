use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::ConfigError;

const SECRETS_DIR: &str = "/run/secrets";

pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub redis_prefix: String,
    pub router: RouterConfig,
    pub session: SessionConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            redis_url: read_secret("REDIS_URL")
                .or_else(|| var("REDIS_URL").ok())
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            redis_prefix: try_load("REDIS_PREFIX", "feedbase")?,
            router: RouterConfig::load()?,
            session: SessionConfig::load()?,
        })
    }
}

/// What to do with a host that is neither the root, dashboard, nor API host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Treat the first host label as an implicit tenant slug.
    Subdomain,
    /// Leave the request untouched.
    PassThrough,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "subdomain" => Ok(Self::Subdomain),
            "pass-through" | "passthrough" | "pass_through" => Ok(Self::PassThrough),
            other => Err(format!("unknown fallback policy `{other}`")),
        }
    }
}

/// Hostnames and flags the tenant router classifies requests against.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    pub root_domain: String,
    pub dev_host: String,
    pub dashboard_subdomain: String,
    pub alt_dashboard_subdomain: Option<String>,
    pub subdomain_hosting: bool,
    pub api_subdomain: String,
    pub custom_domain_whitelist: Vec<String>,
    pub powered_by: String,
    pub fallback: FallbackPolicy,
}

impl RouterConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            root_domain: try_load("ROOT_DOMAIN", "localhost:3000")?,
            dev_host: try_load("DEV_HOST", "localhost:3000")?,
            dashboard_subdomain: "dash".to_string(),
            alt_dashboard_subdomain: var("DASHBOARD_SUBDOMAIN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            subdomain_hosting: is_enabled(var("SUBDOMAIN_HOSTING").ok().as_deref()),
            api_subdomain: try_load("API_SUBDOMAIN", "api")?,
            custom_domain_whitelist: split_list(&var("CUSTOM_DOMAIN_WHITELIST").unwrap_or_default()),
            powered_by: try_load("POWERED_BY", "Feedbase")?,
            fallback: try_load("FALLBACK_POLICY", "subdomain")?,
        })
    }

    pub fn dashboard_host(&self) -> String {
        format!("{}.{}", self.dashboard_subdomain, self.root_domain)
    }

    pub fn alt_dashboard_host(&self) -> Option<String> {
        if !self.subdomain_hosting {
            return None;
        }

        self.alt_dashboard_subdomain
            .as_ref()
            .map(|sub| format!("{sub}.{}", self.root_domain))
    }

    pub fn api_host(&self) -> String {
        format!("{}.{}", self.api_subdomain, self.root_domain)
    }

    pub fn is_whitelisted(&self, host: &str) -> bool {
        self.custom_domain_whitelist.iter().any(|d| d == host)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            root_domain: "localhost:3000".to_string(),
            dev_host: "localhost:3000".to_string(),
            dashboard_subdomain: "dash".to_string(),
            alt_dashboard_subdomain: None,
            subdomain_hosting: false,
            api_subdomain: "api".to_string(),
            custom_domain_whitelist: Vec::new(),
            powered_by: "Feedbase".to_string(),
            fallback: FallbackPolicy::Subdomain,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl: Duration,
    /// Sessions with less than this much lifetime left are extended.
    pub refresh_window: Duration,
    pub secure_cookies: bool,
}

impl SessionConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            cookie_name: try_load("SESSION_COOKIE", "fb-session")?,
            ttl: Duration::from_secs(try_load("SESSION_TTL_SECS", "604800")?),
            refresh_window: Duration::from_secs(try_load("SESSION_REFRESH_SECS", "86400")?),
            secure_cookies: try_load("SECURE_COOKIES", "true")?,
        })
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "fb-session".to_string(),
            ttl: Duration::from_secs(7 * 24 * 60 * 60),
            refresh_window: Duration::from_secs(24 * 60 * 60),
            secure_cookies: true,
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");

            ConfigError::Invalid {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
}

/// Feature switches are on only for `true`, anything else leaves them off.
fn is_enabled(raw: Option<&str>) -> bool {
    raw.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("{SECRETS_DIR}/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("No {secret_name} secret mounted ({e}), falling back to environment");
        })
        .ok()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_policy_parse() {
        assert_eq!("subdomain".parse(), Ok(FallbackPolicy::Subdomain));
        assert_eq!("Pass-Through".parse(), Ok(FallbackPolicy::PassThrough));
        assert!("rewrite".parse::<FallbackPolicy>().is_err());
    }

    #[test]
    fn test_feature_switch_values() {
        assert!(is_enabled(Some("true")));
        assert!(is_enabled(Some(" TRUE ")));

        assert!(!is_enabled(None));
        assert!(!is_enabled(Some("1")));
        assert!(!is_enabled(Some("yes")));
        assert!(!is_enabled(Some("")));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" feedback.acme.com, ,roadmap.example.org "),
            vec!["feedback.acme.com", "roadmap.example.org"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_alt_dashboard_host_requires_subdomain_hosting() {
        let mut config = RouterConfig {
            root_domain: "feedbase.app".to_string(),
            alt_dashboard_subdomain: Some("app".to_string()),
            ..RouterConfig::default()
        };
        assert_eq!(config.alt_dashboard_host(), None);

        config.subdomain_hosting = true;
        assert_eq!(config.alt_dashboard_host().as_deref(), Some("app.feedbase.app"));
        assert_eq!(config.dashboard_host(), "dash.feedbase.app");
        assert_eq!(config.api_host(), "api.feedbase.app");
    }
}
