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

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralError {
    pub message: String,
}

impl Display for GeneralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Serialize)]
pub struct FormError<'a, T>
where
    T: Serialize,
{
    pub message: String,
    pub fields: &'a T,
}

pub struct ErrorResponse<T>
where
    T: Serialize,
{
    pub status_code: StatusCode,
    pub error: T,
}

impl<T> IntoResponse for ErrorResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        (self.status_code, Json(self.error)).into_response()
    }
}

/// Pagination parameters shared across the thin CRUD surface. `page` is
/// 1-indexed to match how query strings read in practice.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatorParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    25
}

impl PaginatorParams {
    pub fn offset(&self) -> i64 {
        ((self.page.max(1) - 1) * self.per_page) as i64
    }
    pub fn limit(&self) -> i64 {
        self.per_page.clamp(1, 200) as i64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatorMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderingParams<T> {
    pub order_by: Option<T>,
    #[serde(default)]
    pub descending: bool,
}

/// The envelope every successful handler response is wrapped in, the
/// row-level-tenancy counterpart to the teacher's `OkResponse<T>`.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for SuccessResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct SimpleMessageResponse {
    pub message: String,
}

impl SimpleMessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type HandlerResult = Result<Response, Response>;
