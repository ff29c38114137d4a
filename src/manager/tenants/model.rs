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

//! The richer, CRUD-facing `Tenant` record. Built from the same `tenants`
//! row as `common::authz::model::Tenant`, which only carries the three
//! columns the resolver and the permission-load step need.

use chrono::{DateTime, Local};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::common::authz::model::TenantStatus;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub status: TenantStatus,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
    pub deleted_at: Option<DateTime<Local>>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
