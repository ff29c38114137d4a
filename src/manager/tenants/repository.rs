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

//! Plain query functions over the `tenants` table. Tenant CRUD is a
//! platform-owner operation spanning every tenant, so every call here runs
//! through `SessionPool::unscoped_query`/`unscoped_tx` rather than the
//! tenant-scoped facade `manager::timetable::repository` uses.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::common::authz::model::TenantStatus;
use crate::common::error::{CoreErrorKind, CoreResult};
use crate::common::dto::{OrderingParams, PaginatorParams};

use super::model::Tenant;
use super::types::TenantsOrderBy;

pub async fn insert_tenant(conn: &mut PgConnection, name: &str, slug: &str) -> CoreResult<Tenant> {
    sqlx::query_as::<_, Tenant>(
        "INSERT INTO tenants (name, slug, status) VALUES ($1, $2, 'active') RETURNING *",
    )
    .bind(name)
    .bind(slug)
    .fetch_one(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

pub async fn get_tenant(conn: &mut PgConnection, tenant_id: Uuid) -> CoreResult<Tenant> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1 AND deleted_at IS NULL")
        .bind(tenant_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| CoreErrorKind::Internal(e.to_string()))?
        .ok_or_else(|| CoreErrorKind::NotFound(format!("tenant {tenant_id}")))
}

pub async fn list_tenants(
    conn: &mut PgConnection,
    paginator: &PaginatorParams,
    ordering: &OrderingParams<TenantsOrderBy>,
) -> CoreResult<(Vec<Tenant>, i64)> {
    let order_column = ordering
        .order_by
        .unwrap_or(TenantsOrderBy::CreatedAt)
        .column();
    let direction = if ordering.descending { "DESC" } else { "ASC" };
    let query = format!(
        "SELECT * FROM tenants WHERE deleted_at IS NULL \
         ORDER BY {order_column} {direction} LIMIT $1 OFFSET $2"
    );

    let tenants = sqlx::query_as::<_, Tenant>(&query)
        .bind(paginator.limit())
        .bind(paginator.offset())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenants WHERE deleted_at IS NULL")
        .fetch_one(conn)
        .await
        .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;

    Ok((tenants, total))
}

pub async fn update_status(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    status: TenantStatus,
) -> CoreResult<Tenant> {
    sqlx::query_as::<_, Tenant>(
        "UPDATE tenants SET status = $2, updated_at = now() \
         WHERE id = $1 AND deleted_at IS NULL RETURNING *",
    )
    .bind(tenant_id)
    .bind(status)
    .fetch_optional(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?
    .ok_or_else(|| CoreErrorKind::NotFound(format!("tenant {tenant_id}")))
}
