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

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::authz::model::TenantStatus;
use crate::common::dto::{OrderingParams, PaginatorMeta, PaginatorParams};
use crate::common::types::ValueObject;

use super::model::Tenant;
use super::types::{TenantSlug, TenantsOrderBy};

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub slug: ValueObject<TenantSlug>,
}

#[derive(Debug, Deserialize)]
pub struct TenantActivateRequest {
    pub status: TenantStatus,
}

/// Flattened rather than nesting `PaginatorParams`/`OrderingParams` directly,
/// since `serde_urlencoded` (what axum's `Query` extractor uses) does not
/// support `#[serde(flatten)]`.
#[derive(Debug, Deserialize)]
pub struct ListTenantsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub order_by: Option<TenantsOrderBy>,
    #[serde(default)]
    pub descending: bool,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    25
}

impl ListTenantsQuery {
    pub fn paginator(&self) -> PaginatorParams {
        PaginatorParams {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn ordering(&self) -> OrderingParams<TenantsOrderBy> {
        OrderingParams {
            order_by: self.order_by,
            descending: self.descending,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub status: TenantStatus,
}

impl From<Tenant> for TenantResponse {
    fn from(value: Tenant) -> Self {
        Self {
            id: value.id,
            name: value.name,
            slug: value.slug,
            status: value.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TenantListResponse {
    pub items: Vec<TenantResponse>,
    pub meta: PaginatorMeta,
}
