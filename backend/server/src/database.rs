//! # Redis
//!
//! Backing store for the edge.
//!
//! ## Requirements
//!
//! - One read per custom-domain request, one or two per session check
//! - Small dataset: a hash per project, a string per bound domain, a string per session
//! - Sessions and auth codes expire on their own through key TTLs
//!
//! ## Keys
//!
//! - `{prefix}:project:{slug}` see [`crate::tenant`]
//! - `{prefix}:domain:{host}` see [`crate::tenant`]
//! - `{prefix}:session:{token}` user id, TTL = session lifetime
//! - `{prefix}:auth_code:{code}` user id, consumed once by `/auth/callback`
use std::time::Duration;

use redis::{
    Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::info;

use crate::error::StoreError;

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, StoreError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    info!("Connected to Redis");

    Ok(connection_manager)
}
