use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_fs::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub relationship_service: Arc<dyn RelationshipService>,
    pub request_timeout: Duration,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        relationship_service: Arc<dyn RelationshipService>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            auth_service,
            relationship_service,
            request_timeout,
            pool: None,
        }
    }

    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let mut pool = None;

        let store: Arc<dyn RelationshipStore> = match settings.store.backend.as_str() {
            "fs" => {
                let path = settings
                    .store
                    .path
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("store.path is required for the fs backend"))?;
                Arc::new(FsRelationshipStore::open(path).await?)
            }
            "memory" => Arc::new(MemoryRelationshipStore::new()),
            "redis" => {
                let url = store_url(settings)?;
                let redis_client = redis::Client::open(url)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisRelationshipStore::new(
                    redis_manager,
                    settings.store.prefix.clone(),
                ))
            }
            "mysql" => {
                let url = store_url(settings)?;
                let mysql_pool = Pool::<MySql>::connect(url).await?;
                pool = Some(mysql_pool.clone());
                Arc::new(MySqlRelationshipStore::new(mysql_pool))
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let auth_service: Arc<dyn AuthService> = match settings.auth.backend.as_str() {
            "fake" => {
                warn!("fake auth backend enabled, bearer tokens are not verified");
                Arc::new(FakeAuthService::new())
            }
            "gateway" => Arc::new(GatewayAuthService::new()),
            other => return Err(anyhow::anyhow!("Unknown auth backend: {}", other)),
        };

        let relationship_service: Arc<dyn RelationshipService> =
            Arc::new(RealRelationshipService::new(store));

        info!(
            store = %settings.store.backend,
            auth = %settings.auth.backend,
            "server started"
        );

        let mut server = Self::new(
            auth_service,
            relationship_service,
            Duration::from_secs(settings.http.request_timeout_secs),
        );
        server.pool = pool;
        Ok(server)
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

fn store_url(settings: &Settings) -> anyhow::Result<&str> {
    settings.store.url.as_deref().ok_or_else(|| {
        anyhow::anyhow!(
            "store.url is required for the {} backend",
            settings.store.backend
        )
    })
}
