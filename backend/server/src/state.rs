use std::sync::Arc;

use crate::{
    config::Config,
    database::init_redis,
    error::AppError,
    router::TenantRouter,
    session::{RedisSessionStore, SessionStore},
    tenant::{RedisTenantStore, TenantStore},
};

pub struct AppState {
    pub port: u16,
    pub router: TenantRouter,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>, AppError> {
        let redis_connection = init_redis(&config.redis_url).await?;

        let tenants = RedisTenantStore::new(redis_connection.clone(), &config.redis_prefix);
        let sessions = RedisSessionStore::new(redis_connection, &config.redis_prefix, config.session);

        Ok(Self::with_stores(
            config.port,
            TenantRouter::new(config.router, Arc::new(tenants)),
            Arc::new(sessions),
        ))
    }

    pub fn with_stores(
        port: u16,
        router: TenantRouter,
        sessions: Arc<dyn SessionStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            port,
            router,
            sessions,
        })
    }

    pub fn tenants(&self) -> &Arc<dyn TenantStore> {
        self.router.tenants()
    }
}
