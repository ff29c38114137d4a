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

use serde::Deserialize;
use std::collections::HashMap;

/// Central application configuration, deserialized from `config/default` via
/// the `config` crate. One shared database backs every tenant; isolation is
/// enforced at the session level (see `common::session`), not by handing out
/// a pool per tenant.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    server: ServerConfig,
    database: DatabaseConfig,
    auth: AuthConfig,
    mail: MailConfig,
    cache: CacheConfig,
    rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    host: String,
    port: u16,
    #[serde(default)]
    public_hostname: Option<String>,
}

impl ServerConfig {
    pub fn host(&self) -> &str {
        &self.host
    }
    pub fn port(&self) -> u16 {
        self.port
    }
    /// The hostname used to build links sent over e-mail (verification,
    /// password reset). Falls back to `host` when unset, since a bare
    /// single-host deployment has no separate public name.
    pub fn public_hostname(&self) -> &str {
        self.public_hostname.as_deref().unwrap_or(&self.host)
    }
}

pub trait DatabaseUrlProvider {
    fn url(&self) -> String;
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_pool_size: Option<u32>,
}

impl DatabaseConfig {
    pub fn max_pool_size(&self) -> u32 {
        self.max_pool_size.unwrap_or(10)
    }
}

impl DatabaseUrlProvider for DatabaseConfig {
    fn url(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    jwt_secret: String,
    jwt_issuer: String,
    jwt_audience: String,
    jwt_expiration_mins: u64,
}

impl AuthConfig {
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }
    pub fn jwt_issuer(&self) -> &str {
        &self.jwt_issuer
    }
    pub fn jwt_audience(&self) -> &str {
        &self.jwt_audience
    }
    pub fn jwt_expiration_mins(&self) -> u64 {
        self.jwt_expiration_mins
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    smtp_host: String,
    smtp_user: String,
    smtp_passwd: String,
    default_from: String,
    default_from_name: String,
    default_notification_email: String,
}

impl MailConfig {
    pub fn smtp_host(&self) -> &str {
        &self.smtp_host
    }
    pub fn smtp_user(&self) -> &str {
        &self.smtp_user
    }
    pub fn smtp_passwd(&self) -> &str {
        &self.smtp_passwd
    }
    pub fn default_from(&self) -> &str {
        &self.default_from
    }
    pub fn default_from_name(&self) -> &str {
        &self.default_from_name
    }
    pub fn default_notification_email(&self) -> &str {
        &self.default_notification_email
    }
}

/// TTLs for the two `common::cache::TtlCache` instances the authorization
/// pipeline relies on.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    permission_cache_ttl_secs: u64,
    tenant_resolver_cache_ttl_secs: u64,
}

impl CacheConfig {
    pub fn permission_cache_ttl_secs(&self) -> u64 {
        self.permission_cache_ttl_secs
    }
    pub fn tenant_resolver_cache_ttl_secs(&self) -> u64 {
        self.tenant_resolver_cache_ttl_secs
    }
}

/// Window/max/block settings for a single named rate limiter, matching the
/// defaults tabulated in the external interfaces section.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimiterConfig {
    pub window_secs: u64,
    pub max: u32,
    pub block_after: u32,
    pub block_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    redis_url: Option<String>,
    limiters: HashMap<String, LimiterConfig>,
}

impl RateLimitConfig {
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url.as_deref()
    }
    pub fn limiter(&self, name: &str) -> Option<LimiterConfig> {
        self.limiters.get(name).copied()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(true));
        builder.build()?.try_deserialize()
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }
    pub fn database(&self) -> &DatabaseConfig {
        &self.database
    }
    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }
    pub fn mail(&self) -> &MailConfig {
        &self.mail
    }
    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }
    pub fn rate_limit(&self) -> &RateLimitConfig {
        &self.rate_limit
    }
}

#[cfg(test)]
pub mod test_defaults {
    use super::*;

    pub fn default_limiters() -> HashMap<String, LimiterConfig> {
        let mut m = HashMap::new();
        m.insert(
            "auth".to_string(),
            LimiterConfig {
                window_secs: 15 * 60,
                max: 10,
                block_after: 3,
                block_secs: 30 * 60,
            },
        );
        m.insert(
            "passwordReset".to_string(),
            LimiterConfig {
                window_secs: 60 * 60,
                max: 3,
                block_after: 0,
                block_secs: 0,
            },
        );
        m.insert(
            "registration".to_string(),
            LimiterConfig {
                window_secs: 60 * 60,
                max: 5,
                block_after: 0,
                block_secs: 0,
            },
        );
        m.insert(
            "import".to_string(),
            LimiterConfig {
                window_secs: 60 * 60,
                max: 10,
                block_after: 0,
                block_secs: 0,
            },
        );
        m.insert(
            "payment".to_string(),
            LimiterConfig {
                window_secs: 60,
                max: 30,
                block_after: 0,
                block_secs: 0,
            },
        );
        m.insert(
            "api".to_string(),
            LimiterConfig {
                window_secs: 60,
                max: 100,
                block_after: 0,
                block_secs: 0,
            },
        );
        m.insert(
            "tenant".to_string(),
            LimiterConfig {
                window_secs: 60,
                max: 1000,
                block_after: 0,
                block_secs: 0,
            },
        );
        m.insert(
            "document".to_string(),
            LimiterConfig {
                window_secs: 60 * 60,
                max: 50,
                block_after: 0,
                block_secs: 0,
            },
        );
        m.insert(
            "export".to_string(),
            LimiterConfig {
                window_secs: 60 * 60,
                max: 30,
                block_after: 0,
                block_secs: 0,
            },
        );
        m
    }

    pub fn default_app_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                public_hostname: None,
            },
            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 5432,
                username: "user".to_string(),
                password: "password".to_string(),
                database: "classwise".to_string(),
                max_pool_size: Some(5),
            },
            auth: AuthConfig {
                jwt_secret: "test_jwt_secret".to_string(),
                jwt_issuer: "http://localhost".to_string(),
                jwt_audience: "http://localhost".to_string(),
                jwt_expiration_mins: 60,
            },
            mail: MailConfig {
                smtp_host: "localhost".to_string(),
                smtp_user: "noreply@example.com".to_string(),
                smtp_passwd: "secret".to_string(),
                default_from: "noreply@example.com".to_string(),
                default_from_name: "Example".to_string(),
                default_notification_email: "admin@example.com".to_string(),
            },
            cache: CacheConfig {
                permission_cache_ttl_secs: 60,
                tenant_resolver_cache_ttl_secs: 60,
            },
            rate_limit: RateLimitConfig {
                redis_url: None,
                limiters: default_limiters(),
            },
        }
    }
}
