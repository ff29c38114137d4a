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

use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::common::authz::pipeline::AuthContext;
use crate::common::dto::{HandlerResult, SuccessResponse};
use crate::common::AppState;

use super::dto::{
    FinalizeRequest, GenerateRequest, GenerateResponse, MoveRequest, StatusQuery, StatusResponse,
};
use super::service;

#[debug_handler]
pub async fn generate(
    State(app_state): State<Arc<AppState>>,
    ctx: AuthContext,
    axum::Json(body): axum::Json<GenerateRequest>,
) -> HandlerResult {
    let timetable = service::TimetableService::new(app_state.session_pool.clone());
    let (draft, entries, failed, skipped) = timetable
        .generate(&ctx, body.academic_year_id, body.preserve_locked)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    let response = GenerateResponse {
        academic_year_id: body.academic_year_id,
        placed_count: draft.placed_count,
        failed_count: draft.failed_count,
        skipped_count: draft.skipped_count,
        failed,
        skipped,
        entries,
    };
    Ok((StatusCode::OK, SuccessResponse::new(response)).into_response())
}

#[debug_handler]
pub async fn status(
    State(app_state): State<Arc<AppState>>,
    ctx: AuthContext,
    Query(query): Query<StatusQuery>,
) -> HandlerResult {
    let timetable = service::TimetableService::new(app_state.session_pool.clone());
    let (draft, entries) = timetable
        .status(&ctx, query.academic_year_id)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    let response = StatusResponse {
        academic_year_id: query.academic_year_id,
        status: service::status_label(&draft),
        placed_count: draft.as_ref().map(|d| d.placed_count).unwrap_or(0),
        failed_count: draft.as_ref().map(|d| d.failed_count).unwrap_or(0),
        skipped_count: draft.as_ref().map(|d| d.skipped_count).unwrap_or(0),
        entries,
    };
    Ok((StatusCode::OK, SuccessResponse::new(response)).into_response())
}

#[debug_handler]
pub async fn move_entry(
    State(app_state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(entry_id): Path<Uuid>,
    axum::Json(body): axum::Json<MoveRequest>,
) -> HandlerResult {
    let timetable = service::TimetableService::new(app_state.session_pool.clone());
    let entry = timetable
        .move_entry(
            &ctx,
            entry_id,
            body.room_id,
            body.time_slot_id,
            body.teacher_id,
            body.expected_version,
        )
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;
    Ok((StatusCode::OK, SuccessResponse::new(entry)).into_response())
}

#[debug_handler]
pub async fn lock(
    State(app_state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(entry_id): Path<Uuid>,
) -> HandlerResult {
    let timetable = service::TimetableService::new(app_state.session_pool.clone());
    let entry = timetable
        .set_lock(&ctx, entry_id, true)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;
    Ok((StatusCode::OK, SuccessResponse::new(entry)).into_response())
}

#[debug_handler]
pub async fn unlock(
    State(app_state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(entry_id): Path<Uuid>,
) -> HandlerResult {
    let timetable = service::TimetableService::new(app_state.session_pool.clone());
    let entry = timetable
        .set_lock(&ctx, entry_id, false)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;
    Ok((StatusCode::OK, SuccessResponse::new(entry)).into_response())
}

#[debug_handler]
pub async fn finalize(
    State(app_state): State<Arc<AppState>>,
    ctx: AuthContext,
    axum::Json(body): axum::Json<FinalizeRequest>,
) -> HandlerResult {
    let timetable = service::TimetableService::new(app_state.session_pool.clone());
    let draft = timetable
        .finalize(&ctx, body.academic_year_id)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;
    Ok((StatusCode::OK, SuccessResponse::new(draft)).into_response())
}
