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

//! §4.4: derives the active tenant for a request, first hit wins:
//! (1) the verified access token's `tenantId`, (2) the `X-Tenant-Id`
//! header, (3) the leftmost subdomain of the request host mapped to
//! `tenant.slug`. Platform owners may override with `X-Impersonate-Tenant`.

use crate::common::authz::model::{Tenant, TenantStatus};
use crate::common::cache::TtlCache;
use crate::common::error::{CoreErrorKind, CoreResult};
use crate::common::session::SessionPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Where a resolved tenant id came from, kept only for diagnostics/audit —
/// the authorization decision itself doesn't branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantSource {
    Token,
    Header,
    Subdomain,
    Impersonation,
}

pub struct TenantResolver {
    session_pool: Arc<SessionPool>,
    by_id: TtlCache<Uuid, Tenant>,
    by_slug: TtlCache<String, Tenant>,
}

impl TenantResolver {
    pub fn new(session_pool: Arc<SessionPool>, ttl: Duration) -> Self {
        Self {
            session_pool,
            by_id: TtlCache::new(ttl),
            by_slug: TtlCache::new(ttl),
        }
    }

    /// Picks the tenant identifier by derivation order, then validates it.
    /// `impersonate` is only honored when `is_platform_owner` is true;
    /// otherwise it is silently ignored (a non-owner can't widen their own
    /// scope by sending the header).
    pub async fn resolve(
        &self,
        token_tenant_id: Option<Uuid>,
        header_tenant_id: Option<Uuid>,
        host_subdomain_slug: Option<&str>,
        impersonate_tenant_id: Option<Uuid>,
        is_platform_owner: bool,
    ) -> CoreResult<(Tenant, TenantSource)> {
        if is_platform_owner
            && let Some(id) = impersonate_tenant_id
        {
            return Ok((self.get_by_id(id).await?, TenantSource::Impersonation));
        }
        if let Some(id) = token_tenant_id {
            return Ok((self.get_by_id(id).await?, TenantSource::Token));
        }
        if let Some(id) = header_tenant_id {
            return Ok((self.get_by_id(id).await?, TenantSource::Header));
        }
        if let Some(slug) = host_subdomain_slug {
            return Ok((self.get_by_slug(slug).await?, TenantSource::Subdomain));
        }
        Err(CoreErrorKind::TenantRequired)
    }

    async fn get_by_id(&self, id: Uuid) -> CoreResult<Tenant> {
        if let Some(t) = self.by_id.get(&id) {
            return Self::validate(t);
        }
        let tenant = self.load_by_id(id).await?;
        self.by_id.insert(id, tenant.clone());
        self.by_slug.insert(tenant.slug.clone(), tenant.clone());
        Self::validate(tenant)
    }

    async fn get_by_slug(&self, slug: &str) -> CoreResult<Tenant> {
        if let Some(t) = self.by_slug.get(&slug.to_string()) {
            return Self::validate(t);
        }
        let tenant = self.load_by_slug(slug).await?;
        self.by_id.insert(tenant.id, tenant.clone());
        self.by_slug.insert(tenant.slug.clone(), tenant.clone());
        Self::validate(tenant)
    }

    /// Evicts both cache entries for a tenant after its row changes (e.g.
    /// a status flip), so the new state is visible on the next resolve
    /// instead of waiting out the TTL.
    pub fn invalidate(&self, id: Uuid, slug: &str) {
        self.by_id.invalidate(&id);
        self.by_slug.invalidate(&slug.to_string());
    }

    fn validate(tenant: Tenant) -> CoreResult<Tenant> {
        if tenant.status.is_active() {
            Ok(tenant)
        } else {
            Err(CoreErrorKind::TenantInactive)
        }
    }

    async fn load_by_id(&self, id: Uuid) -> CoreResult<Tenant> {
        self.session_pool
            .unscoped_query(|conn| async move {
                sqlx::query_as::<_, Tenant>(
                    "SELECT id, slug, status FROM tenants WHERE id = $1 AND deleted_at IS NULL",
                )
                .bind(id)
                .fetch_optional(conn)
                .await
                .map_err(|e| CoreErrorKind::Internal(e.to_string()))?
                .ok_or_else(|| CoreErrorKind::NotFound("tenant".to_string()))
            })
            .await
    }

    async fn load_by_slug(&self, slug: &str) -> CoreResult<Tenant> {
        let slug = slug.to_string();
        self.session_pool
            .unscoped_query(|conn| async move {
                sqlx::query_as::<_, Tenant>(
                    "SELECT id, slug, status FROM tenants WHERE slug = $1 AND deleted_at IS NULL",
                )
                .bind(&slug)
                .fetch_optional(conn)
                .await
                .map_err(|e| CoreErrorKind::Internal(e.to_string()))?
                .ok_or_else(|| CoreErrorKind::NotFound("tenant".to_string()))
            })
            .await
    }
}

/// Extracts the leftmost label of a `Host` header value as a candidate
/// tenant slug, e.g. `acme.classwise.app` -> `Some("acme")`. Bare hosts
/// with no subdomain (`classwise.app`, `localhost`) yield `None`.
pub fn subdomain_slug(host: &str, base_domain: &str) -> Option<String> {
    let host = host.split(':').next().unwrap_or(host);
    let suffix = format!(".{base_domain}");
    host.strip_suffix(&suffix)
        .filter(|prefix| !prefix.is_empty())
        .map(|prefix| prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdomain_extraction() {
        assert_eq!(
            subdomain_slug("acme.classwise.app", "classwise.app"),
            Some("acme".to_string())
        );
        assert_eq!(subdomain_slug("classwise.app", "classwise.app"), None);
        assert_eq!(
            subdomain_slug("acme.classwise.app:8080", "classwise.app"),
            Some("acme".to_string())
        );
        assert_eq!(subdomain_slug("localhost", "classwise.app"), None);
    }

    #[test]
    fn tenant_status_gate() {
        assert!(TenantStatus::Active.is_active());
        assert!(!TenantStatus::Suspended.is_active());
        assert!(!TenantStatus::Deleted.is_active());
    }
}
