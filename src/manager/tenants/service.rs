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

//! Tenant CRUD is a platform-owner operation spanning every tenant, so it
//! runs through `SessionPool::unscoped_query`/`unscoped_tx` rather than the
//! tenant-scoped facade, after checking `Role::PlatformOwner` directly
//! (there is no tenant-local permission code for "manage other tenants").

use std::sync::Arc;
use uuid::Uuid;

use crate::common::authz::model::{Role, TenantStatus};
use crate::common::authz::pipeline::AuthContext;
use crate::common::authz::tenant_resolver::TenantResolver;
use crate::common::error::{CoreErrorKind, CoreResult};
use crate::common::session::SessionPool;
use crate::common::types::value_object::ValueObjectable;

use super::dto::{CreateTenantRequest, ListTenantsQuery};
use super::model::Tenant;
use super::repository;

pub struct TenantsService {
    session_pool: Arc<SessionPool>,
    tenant_resolver: Arc<TenantResolver>,
}

impl TenantsService {
    pub fn new(session_pool: Arc<SessionPool>, tenant_resolver: Arc<TenantResolver>) -> Self {
        Self {
            session_pool,
            tenant_resolver,
        }
    }

    fn require_platform_owner(ctx: &AuthContext) -> CoreResult<()> {
        ctx.require_role(&[Role::PlatformOwner])
            .map_err(|d| CoreErrorKind::PermissionDenied(d.requirement))
    }

    pub async fn create(&self, ctx: &AuthContext, payload: CreateTenantRequest) -> CoreResult<Tenant> {
        Self::require_platform_owner(ctx)?;
        let slug = payload.slug.extract().get_value().clone();
        self.session_pool
            .unscoped_query(|conn| async move {
                repository::insert_tenant(conn, &payload.name, &slug).await
            })
            .await
    }

    pub async fn get(&self, ctx: &AuthContext, tenant_id: Uuid) -> CoreResult<Tenant> {
        Self::require_platform_owner(ctx)?;
        self.session_pool
            .unscoped_query(|conn| async move { repository::get_tenant(conn, tenant_id).await })
            .await
    }

    pub async fn list(
        &self,
        ctx: &AuthContext,
        query: ListTenantsQuery,
    ) -> CoreResult<(Vec<Tenant>, i64)> {
        Self::require_platform_owner(ctx)?;
        let paginator = query.paginator();
        let ordering = query.ordering();
        self.session_pool
            .unscoped_query(|conn| async move {
                repository::list_tenants(conn, &paginator, &ordering).await
            })
            .await
    }

    pub async fn set_status(
        &self,
        ctx: &AuthContext,
        tenant_id: Uuid,
        status: TenantStatus,
    ) -> CoreResult<Tenant> {
        Self::require_platform_owner(ctx)?;
        let tenant = self
            .session_pool
            .unscoped_query(|conn| async move {
                repository::update_status(conn, tenant_id, status).await
            })
            .await?;
        self.tenant_resolver.invalidate(tenant.id, &tenant.slug);
        Ok(tenant)
    }
}
