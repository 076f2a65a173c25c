//! # Seed
//!
//! Loads projects into Redis so the edge can route them.
//!
//! ```sh
//! cargo run -p seed -- projects.json --redis-url redis://127.0.0.1:6379
//! ```
//!
//! ```json
//! [
//!     { "slug": "acme", "custom_domain": "feedback.acme.com", "custom_domain_verified": true },
//!     { "slug": "globex" }
//! ]
//! ```
//!
//! Slugs are sanitized before writing. A record whose slug sanitizes to nothing
//! is skipped. Re-running with the same file is safe, records are upserted.
use std::{fs, path::Path};

use anyhow::Context;
use feedbase::{
    database::init_redis,
    tenant::{RedisTenantStore, Tenant},
};

pub mod utils;

use utils::{normalize_domain, sanitize_slug};

pub async fn load_tenants(file: &Path, redis_url: &str, prefix: &str) -> anyhow::Result<()> {
    let raw = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let records: Vec<Tenant> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;

    println!("Loaded Records: {}", records.len());

    let (tenants, skipped) = prepare(records);

    let store = RedisTenantStore::new(init_redis(redis_url).await?, prefix);

    for tenant in &tenants {
        store
            .upsert(tenant)
            .await
            .with_context(|| format!("writing project {}", tenant.slug))?;

        #[cfg(feature = "verbose")]
        println!("Upserted {}", tenant.slug);
    }

    println!("Total Upserted: {}", tenants.len());
    println!("Total Skipped: {skipped}");

    Ok(())
}

/// Sanitizes every record, dropping the ones left without a slug.
pub fn prepare(records: Vec<Tenant>) -> (Vec<Tenant>, usize) {
    let total = records.len();

    let tenants: Vec<Tenant> = records
        .into_iter()
        .filter_map(|record| {
            let slug = sanitize_slug(&record.slug);
            if slug.is_empty() {
                #[cfg(feature = "verbose")]
                println!("Skipping record with slug {:?}", record.slug);
                return None;
            }

            let custom_domain = normalize_domain(record.custom_domain.as_deref());

            Some(Tenant {
                slug,
                custom_domain_verified: record.custom_domain_verified && custom_domain.is_some(),
                custom_domain,
            })
        })
        .collect();

    let skipped = total - tenants.len();
    (tenants, skipped)
}
