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

//! The connection pool and tenant-scoped query facade.
//!
//! Unlike the per-tenant-database pool manager this crate's ancestor used,
//! tenancy here is row-level: every tenant shares one `PgPool`, and isolation
//! is enforced by two Postgres session variables (`app.current_tenant_id`,
//! `app.current_user_id`) that row-level-security policies key off of.
//! Session variables set with `set_config(..., true)` ("true" = local) only
//! survive for the lifetime of the enclosing transaction, so every scoped
//! operation runs inside one. `TenantSession` is the strongly-typed handle
//! that carries that transaction and guarantees the variables were set
//! before the caller gets to run a query.

use crate::common::error::{CoreErrorKind, CoreResult};
use crate::manager::app::config::{DatabaseConfig, DatabaseUrlProvider};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

pub struct SessionPool {
    pool: PgPool,
}

impl SessionPool {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_pool_size())
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.url())
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Acquires a transaction and binds the tenant/actor session variables
    /// for its lifetime. Every tenant-scoped read or write goes through the
    /// returned handle; there is no way to get a bare connection out of a
    /// tenant-scoped path.
    pub async fn begin_tenant(
        &self,
        tenant_id: Uuid,
        actor_id: Option<Uuid>,
    ) -> CoreResult<TenantSession<'_>> {
        let mut tx = self.begin_raw().await?;

        if let Err(e) = set_local(&mut tx, "app.current_tenant_id", &tenant_id.to_string()).await
        {
            // the connection saw a failed statement inside the transaction;
            // drop it instead of returning it to the pool in a suspect state.
            drop(tx);
            return Err(CoreErrorKind::Internal(format!(
                "failed to set tenant session variable: {e}"
            )));
        }

        if let Some(actor) = actor_id
            && let Err(e) = set_local(&mut tx, "app.current_user_id", &actor.to_string()).await
        {
            drop(tx);
            return Err(CoreErrorKind::Internal(format!(
                "failed to set actor session variable: {e}"
            )));
        }

        Ok(TenantSession { tx })
    }

    /// Begins a transaction with no tenant scoping at all. Only reachable
    /// from code paths that have already established the caller is a
    /// platform owner — see `authz::load::load_principal`.
    pub async fn begin_unscoped(&self) -> CoreResult<Transaction<'_, Postgres>> {
        self.begin_raw().await
    }

    async fn begin_raw(&self) -> CoreResult<Transaction<'_, Postgres>> {
        self.pool.begin().await.map_err(|e| match e {
            sqlx::Error::PoolTimedOut => CoreErrorKind::BackpressureError,
            e => CoreErrorKind::Internal(e.to_string()),
        })
    }

    /// The tenant-scoped query facade (§4.2): runs `f` against a connection
    /// that already has `app.current_tenant_id`/`app.current_user_id` bound,
    /// committing on success and rolling back on any error `f` returns. This
    /// is the only sanctioned way for service code to reach tenant-owned
    /// rows — there is no path that hands out a bare, unscoped connection.
    pub async fn query<F, Fut, T>(
        &self,
        tenant_id: Uuid,
        actor_id: Option<Uuid>,
        f: F,
    ) -> CoreResult<T>
    where
        F: for<'a> FnOnce(&'a mut PgConnection) -> Fut,
        Fut: std::future::Future<Output = CoreResult<T>>,
    {
        let mut session = self.begin_tenant(tenant_id, actor_id).await?;
        match f(session.conn()).await {
            Ok(value) => {
                session.commit().await?;
                Ok(value)
            }
            Err(e) => {
                let _ = session.rollback().await;
                Err(e)
            }
        }
    }

    /// Same contract as `query`, named separately because the facade
    /// (§4.2) distinguishes a single statement from a caller-driven
    /// multi-statement transaction — both run on one already-scoped
    /// connection under this implementation, since `SET LOCAL` only
    /// survives for the lifetime of the enclosing transaction either way.
    pub async fn tx<F, Fut, T>(&self, tenant_id: Uuid, actor_id: Option<Uuid>, f: F) -> CoreResult<T>
    where
        F: for<'a> FnOnce(&'a mut PgConnection) -> Fut,
        Fut: std::future::Future<Output = CoreResult<T>>,
    {
        self.query(tenant_id, actor_id, f).await
    }

    /// Platform-owner-only path: runs `f` with no tenant scoping at all.
    /// Callers must have already established the caller is a platform
    /// owner; nothing here re-checks that.
    pub async fn unscoped_query<F, Fut, T>(&self, f: F) -> CoreResult<T>
    where
        F: for<'a> FnOnce(&'a mut PgConnection) -> Fut,
        Fut: std::future::Future<Output = CoreResult<T>>,
    {
        let mut tx = self.begin_unscoped().await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;
                Ok(value)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    pub async fn unscoped_tx<F, Fut, T>(&self, f: F) -> CoreResult<T>
    where
        F: for<'a> FnOnce(&'a mut PgConnection) -> Fut,
        Fut: std::future::Future<Output = CoreResult<T>>,
    {
        self.unscoped_query(f).await
    }
}

async fn set_local(
    conn: &mut PgConnection,
    key: &str,
    value: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT set_config($1, $2, true)")
        .bind(key)
        .bind(value)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// A transaction with `app.current_tenant_id` (and, when known,
/// `app.current_user_id`) already bound for its whole lifetime. Dropping it
/// without calling `commit` rolls the transaction back, same as a bare
/// `sqlx::Transaction`.
pub struct TenantSession<'c> {
    tx: Transaction<'c, Postgres>,
}

impl<'c> TenantSession<'c> {
    /// The scoped connection handle. Every query run through this connection
    /// sees the bound tenant/actor, so row-level-security policies on the
    /// tenant tables can key off `current_setting('app.current_tenant_id')`.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> CoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| CoreErrorKind::Internal(e.to_string()))
    }

    pub async fn rollback(self) -> CoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| CoreErrorKind::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backpressure_maps_pool_timeout() {
        let err = CoreErrorKind::BackpressureError;
        assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
