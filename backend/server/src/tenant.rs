//! # Tenants
//!
//! Projects live in Redis, written by the `seed` tool and read by the router.
//!
//! ## Keys
//!
//! - `{prefix}:project:{slug}` hash with `slug`, `custom_domain`, `custom_domain_verified`
//! - `{prefix}:domain:{host}` string holding the slug bound to that host
//!
//! A domain key alone is not enough to route: the project hash must also say
//! the domain is verified, so unbinding a domain only needs the flag flipped.
use std::collections::HashMap;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StoreError;

const SLUG: &str = "slug";
const CUSTOM_DOMAIN: &str = "custom_domain";
const CUSTOM_DOMAIN_VERIFIED: &str = "custom_domain_verified";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub slug: String,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub custom_domain_verified: bool,
}

impl Tenant {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            custom_domain: None,
            custom_domain_verified: false,
        }
    }

    pub fn with_domain(mut self, domain: &str, verified: bool) -> Self {
        self.custom_domain = Some(domain.to_string());
        self.custom_domain_verified = verified;
        self
    }

    fn serves(&self, host: &str) -> bool {
        self.custom_domain_verified && self.custom_domain.as_deref() == Some(host)
    }
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_by_verified_custom_domain(&self, host: &str)
    -> Result<Option<Tenant>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError>;
}

#[derive(Clone)]
pub struct RedisTenantStore {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisTenantStore {
    pub fn new(connection: ConnectionManager, prefix: &str) -> Self {
        Self {
            connection,
            prefix: prefix.to_string(),
        }
    }

    fn project_key(&self, slug: &str) -> String {
        format!("{}:project:{slug}", self.prefix)
    }

    fn domain_key(&self, host: &str) -> String {
        format!("{}:domain:{host}", self.prefix)
    }

    pub async fn upsert(&self, tenant: &Tenant) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let project_key = self.project_key(&tenant.slug);

        let fields = [
            (SLUG, tenant.slug.clone()),
            (CUSTOM_DOMAIN, tenant.custom_domain.clone().unwrap_or_default()),
            (CUSTOM_DOMAIN_VERIFIED, tenant.custom_domain_verified.to_string()),
        ];

        let mut pipe = redis::pipe();
        pipe.atomic().hset_multiple(&project_key, &fields).ignore();

        if let Some(domain) = &tenant.custom_domain {
            pipe.set(self.domain_key(domain), &tenant.slug).ignore();
        }

        let _: () = pipe.query_async(&mut connection).await?;

        Ok(())
    }

    async fn load(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        let mut connection = self.connection.clone();
        let key = self.project_key(slug);

        let fields: HashMap<String, String> = connection.hgetall(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }

        tenant_from_fields(&key, fields).map(Some)
    }
}

#[async_trait]
impl TenantStore for RedisTenantStore {
    async fn find_by_verified_custom_domain(
        &self,
        host: &str,
    ) -> Result<Option<Tenant>, StoreError> {
        let mut connection = self.connection.clone();

        let slug: Option<String> = connection.get(self.domain_key(host)).await?;
        let Some(slug) = slug else {
            return Ok(None);
        };

        Ok(self.load(&slug).await?.filter(|tenant| tenant.serves(host)))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        self.load(slug).await
    }
}

fn tenant_from_fields(key: &str, mut fields: HashMap<String, String>) -> Result<Tenant, StoreError> {
    let slug = fields
        .remove(SLUG)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StoreError::Malformed {
            key: key.to_string(),
            reason: "missing slug".to_string(),
        })?;

    let custom_domain_verified = match fields.get(CUSTOM_DOMAIN_VERIFIED).map(String::as_str) {
        None | Some("") | Some("false") | Some("0") => false,
        Some("true") | Some("1") => true,
        Some(other) => {
            return Err(StoreError::Malformed {
                key: key.to_string(),
                reason: format!("bad {CUSTOM_DOMAIN_VERIFIED} `{other}`"),
            });
        }
    };

    Ok(Tenant {
        slug,
        custom_domain: fields.remove(CUSTOM_DOMAIN).filter(|d| !d.is_empty()),
        custom_domain_verified,
    })
}

/// Tenant store backed by a map, for tests and local runs without Redis.
#[derive(Default)]
pub struct MemoryTenantStore {
    tenants: RwLock<HashMap<String, Tenant>>,
}

impl MemoryTenantStore {
    pub fn new(tenants: impl IntoIterator<Item = Tenant>) -> Self {
        Self {
            tenants: RwLock::new(tenants.into_iter().map(|t| (t.slug.clone(), t)).collect()),
        }
    }

    pub async fn insert(&self, tenant: Tenant) {
        self.tenants.write().await.insert(tenant.slug.clone(), tenant);
    }
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn find_by_verified_custom_domain(
        &self,
        host: &str,
    ) -> Result<Option<Tenant>, StoreError> {
        Ok(self
            .tenants
            .read()
            .await
            .values()
            .find(|tenant| tenant.serves(host))
            .cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        Ok(self.tenants.read().await.get(slug).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_tenant_from_fields() {
        let tenant = tenant_from_fields(
            "fb:project:acme",
            fields(&[
                (SLUG, "acme"),
                (CUSTOM_DOMAIN, "feedback.acme.com"),
                (CUSTOM_DOMAIN_VERIFIED, "true"),
            ]),
        )
        .expect("tenant");

        assert_eq!(tenant, Tenant::new("acme").with_domain("feedback.acme.com", true));
    }

    #[test]
    fn test_tenant_without_domain() {
        let tenant = tenant_from_fields(
            "fb:project:acme",
            fields(&[(SLUG, "acme"), (CUSTOM_DOMAIN, ""), (CUSTOM_DOMAIN_VERIFIED, "false")]),
        )
        .expect("tenant");

        assert_eq!(tenant, Tenant::new("acme"));
    }

    #[test]
    fn test_malformed_records() {
        assert!(tenant_from_fields("k", fields(&[(CUSTOM_DOMAIN, "x.com")])).is_err());
        assert!(
            tenant_from_fields("k", fields(&[(SLUG, "acme"), (CUSTOM_DOMAIN_VERIFIED, "maybe")]))
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_memory_store_requires_verification() {
        let store = MemoryTenantStore::new([
            Tenant::new("acme").with_domain("feedback.acme.com", true),
            Tenant::new("globex").with_domain("ideas.globex.com", false),
        ]);

        let found = store
            .find_by_verified_custom_domain("feedback.acme.com")
            .await
            .expect("lookup");
        assert_eq!(found.map(|t| t.slug), Some("acme".to_string()));

        let unverified = store
            .find_by_verified_custom_domain("ideas.globex.com")
            .await
            .expect("lookup");
        assert!(unverified.is_none());

        assert!(store.find_by_slug("globex").await.expect("lookup").is_some());
        assert!(store.find_by_slug("initech").await.expect("lookup").is_none());
    }
}
