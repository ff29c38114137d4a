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

use axum::{debug_handler, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::common::AppState;
use crate::common::dto::{HandlerResult, SimpleMessageResponse, SuccessResponse};
use crate::common::extractors::UserInput;
use crate::common::extractors::client_context::ClientContext;
use crate::manager::auth::dto::login::{OtpUserInput, OtpUserInputHelper};
use crate::manager::auth::middleware::AuthenticatedUser;
use crate::manager::users::service::UsersService;

fn users_service(app_state: &Arc<AppState>) -> UsersService {
    UsersService::new(app_state.session_pool.clone())
}

#[derive(Serialize)]
struct OtpSecretResponse {
    secret: String,
}

#[debug_handler]
pub async fn otp_enable(
    State(app_state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    client: ClientContext,
) -> HandlerResult {
    let secret = users_service(&app_state)
        .otp_enable(&claims, Some(client.ip), client.user_agent)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    Ok((
        StatusCode::OK,
        SuccessResponse::new(OtpSecretResponse { secret }),
    )
        .into_response())
}

#[debug_handler]
pub async fn otp_verify(
    State(app_state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    client: ClientContext,
    UserInput(payload, _): UserInput<OtpUserInput, OtpUserInputHelper>,
) -> HandlerResult {
    users_service(&app_state)
        .otp_verify(&claims, &payload, Some(client.ip), client.user_agent)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    Ok((
        StatusCode::OK,
        SuccessResponse::new(SimpleMessageResponse::new(
            "A kétlépcsős azonosítás aktiválása megtörtént!",
        )),
    )
        .into_response())
}

#[debug_handler]
pub async fn otp_disable(
    State(app_state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    client: ClientContext,
    UserInput(payload, _): UserInput<OtpUserInput, OtpUserInputHelper>,
) -> HandlerResult {
    users_service(&app_state)
        .otp_disable(&claims, &payload, Some(client.ip), client.user_agent)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    Ok((
        StatusCode::OK,
        SuccessResponse::new(SimpleMessageResponse::new(
            "A kétlépcsős azonosítás kikapcsolása megtörtént!",
        )),
    )
        .into_response())
}
