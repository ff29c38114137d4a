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

use axum::debug_handler;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::common::authz::pipeline::AuthContext;
use crate::common::dto::{HandlerResult, PaginatorMeta, SuccessResponse};
use crate::common::extractors::ValidJson;
use crate::common::AppState;

use super::dto::{
    CreateTenantRequest, ListTenantsQuery, TenantActivateRequest, TenantListResponse,
    TenantResponse,
};
use super::service::TenantsService;

#[debug_handler]
pub async fn create(
    State(app_state): State<Arc<AppState>>,
    ctx: AuthContext,
    ValidJson(body): ValidJson<CreateTenantRequest>,
) -> HandlerResult {
    let service = TenantsService::new(
        app_state.session_pool.clone(),
        app_state.tenant_resolver.clone(),
    );
    let tenant = service
        .create(&ctx, body)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;
    Ok((StatusCode::CREATED, SuccessResponse::new(TenantResponse::from(tenant))).into_response())
}

#[debug_handler]
pub async fn get(
    State(app_state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(tenant_id): Path<Uuid>,
) -> HandlerResult {
    let service = TenantsService::new(
        app_state.session_pool.clone(),
        app_state.tenant_resolver.clone(),
    );
    let tenant = service
        .get(&ctx, tenant_id)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;
    Ok((StatusCode::OK, SuccessResponse::new(TenantResponse::from(tenant))).into_response())
}

#[debug_handler]
pub async fn list(
    State(app_state): State<Arc<AppState>>,
    ctx: AuthContext,
    Query(query): Query<ListTenantsQuery>,
) -> HandlerResult {
    let service = TenantsService::new(
        app_state.session_pool.clone(),
        app_state.tenant_resolver.clone(),
    );
    let page = query.page;
    let per_page = query.per_page;
    let (tenants, total) = service
        .list(&ctx, query)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;
    let response = TenantListResponse {
        items: tenants.into_iter().map(TenantResponse::from).collect(),
        meta: PaginatorMeta {
            page,
            per_page,
            total,
        },
    };
    Ok((StatusCode::OK, SuccessResponse::new(response)).into_response())
}

#[debug_handler]
pub async fn set_status(
    State(app_state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(tenant_id): Path<Uuid>,
    ValidJson(body): ValidJson<TenantActivateRequest>,
) -> HandlerResult {
    let service = TenantsService::new(
        app_state.session_pool.clone(),
        app_state.tenant_resolver.clone(),
    );
    let tenant = service
        .set_status(&ctx, tenant_id, body.status)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;
    Ok((StatusCode::OK, SuccessResponse::new(TenantResponse::from(tenant))).into_response())
}
