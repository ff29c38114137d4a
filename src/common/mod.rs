/*
 * Copyright (C) 2026 the project contributors.
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::sync::Arc;

use crate::common::authz::pipeline::AuthPipeline;
use crate::common::authz::rate_limit::RateLimiter;
use crate::common::authz::{permission_cache::PermissionCache, tenant_resolver::TenantResolver};
use crate::common::error::RepositoryResult;
use crate::common::session::SessionPool;
use crate::manager::app::config::AppConfig;
use crate::manager::app::database::{
    ConnectionTester, DatabaseMigrator, PgConnectionTester, PgDatabaseMigrator,
};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    transport::smtp::{Error, authentication::Credentials, response::Response},
};
use sqlx::PgPool;

pub(crate) mod authz;
pub(crate) mod cache;
pub(crate) mod dto;
pub(crate) mod error;
pub(crate) mod extractors;
pub(crate) mod macros;
pub(crate) mod session;
pub(crate) mod types;

pub trait ConfigProvider: Send + Sync {
    fn config(&self) -> Arc<AppConfig>;
}

#[async_trait]
pub trait MailTransporter: ConfigProvider + Send + Sync {
    async fn send(&self, message: Message) -> Result<Response, Error>;
}

pub type DefaultSmtpTransport = AsyncSmtpTransport<Tokio1Executor>;

/// The single process-wide application state. Unlike the teacher's
/// `AppState<PoolManager, Transport>` (a pool per tenant database), this
/// carries exactly one `SessionPool` — tenancy is row-level, enforced by
/// the session variables it sets (see `session`) — plus the three
/// authorization-pipeline services every protected route passes through:
/// `authz::permission_cache`, `authz::tenant_resolver`, `authz::rate_limit`.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub default_smtp_transport: Arc<DefaultSmtpTransport>,
    pub session_pool: Arc<SessionPool>,
    pub migrator: Arc<dyn DatabaseMigrator>,
    pub connection_tester: Arc<dyn ConnectionTester>,
    pub permission_cache: Arc<PermissionCache>,
    pub tenant_resolver: Arc<TenantResolver>,
    pub rate_limiter: Arc<RateLimiter>,
    pub auth_pipeline: Arc<AuthPipeline>,
}

impl AppState {
    fn init_config() -> anyhow::Result<AppConfig> {
        Ok(AppConfig::from_env()?)
    }

    fn init_smtp_transport(config: &AppConfig) -> anyhow::Result<DefaultSmtpTransport> {
        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(config.mail().smtp_host())?
                .credentials(Credentials::new(
                    config.mail().smtp_user().to_owned(),
                    config.mail().smtp_passwd().to_owned(),
                ))
                .build(),
        )
    }

    pub async fn new() -> anyhow::Result<AppState> {
        let config = Arc::new(Self::init_config()?);
        let session_pool = Arc::new(SessionPool::connect(config.database()).await?);
        let permission_cache = Arc::new(PermissionCache::new(std::time::Duration::from_secs(
            config.cache().permission_cache_ttl_secs(),
        )));
        let tenant_resolver = Arc::new(TenantResolver::new(
            session_pool.clone(),
            std::time::Duration::from_secs(config.cache().tenant_resolver_cache_ttl_secs()),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit()).await);
        let auth_pipeline = Arc::new(AuthPipeline::new(
            config.clone(),
            session_pool.clone(),
            permission_cache.clone(),
            tenant_resolver.clone(),
        ));
        Ok(Self {
            default_smtp_transport: Arc::new(Self::init_smtp_transport(&config)?),
            session_pool,
            migrator: Arc::new(PgDatabaseMigrator),
            connection_tester: Arc::new(PgConnectionTester),
            permission_cache,
            tenant_resolver,
            rate_limiter,
            auth_pipeline,
            config,
        })
    }
}

impl ConfigProvider for AppState {
    fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }
}

#[async_trait]
impl MailTransporter for AppState {
    async fn send(&self, message: Message) -> Result<Response, Error> {
        self.default_smtp_transport.send(message).await
    }
}

#[async_trait]
impl DatabaseMigrator for AppState {
    async fn migrate(&self, pool: &PgPool) -> RepositoryResult<()> {
        self.migrator.migrate(pool).await
    }
}
