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
    Router,
    routing::{get, patch, post},
};

use crate::common::AppState;

use super::handler;

pub fn routes(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timetable/generate", post(handler::generate))
        .route("/timetable/status", get(handler::status))
        .route("/timetable/entries/{id}/move", patch(handler::move_entry))
        .route("/timetable/entries/{id}/lock", post(handler::lock))
        .route("/timetable/entries/{id}/unlock", post(handler::unlock))
        .route("/timetable/finalize", post(handler::finalize))
        .with_state(app_state)
}
