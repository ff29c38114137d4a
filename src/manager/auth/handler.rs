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

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, debug_handler};
use serde::Deserialize;
use uuid::Uuid;

use crate::common::AppState;
use crate::common::dto::{SimpleMessageResponse, SuccessResponse};
use crate::common::error::CoreErrorKind;
use crate::common::extractors::ValidJson;
use crate::common::extractors::client_context::ClientContext;

use super::dto::login::{LoginRequest, LoginResponse};
use super::dto::register::{
    ForgottenPasswordRequest, NewPasswordRequest, RegisterRequest, ResendEmailValidationRequest,
};
use super::service::AuthService;

async fn enforce_rate_limit(
    app_state: &AppState,
    name: &'static str,
    key: &str,
) -> Result<(), Response> {
    let decision = app_state
        .rate_limiter
        .check(name, key)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;
    if !decision.allowed {
        let retry_after = decision.retry_after_secs.unwrap_or(decision.reset_secs);
        let kind = if decision.blocked {
            CoreErrorKind::Blocked(retry_after)
        } else {
            CoreErrorKind::RateLimited(name, retry_after)
        };
        return Err(kind.into_friendly(file!()).into_response());
    }
    Ok(())
}

fn auth_service(app_state: &Arc<AppState>) -> AuthService {
    AuthService::new(
        app_state.session_pool.clone(),
        app_state.config.clone(),
        app_state.clone(),
    )
}

#[debug_handler]
pub async fn register(
    State(app_state): State<Arc<AppState>>,
    client: ClientContext,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<Response, Response> {
    enforce_rate_limit(&app_state, "registration", &client.ip.to_string()).await?;

    auth_service(&app_state)
        .register(payload)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    Ok((
        StatusCode::CREATED,
        SuccessResponse::new(SimpleMessageResponse::new(
            "Sikeres regisztráció! Kérjük, erősítsd meg az e-mail címedet!",
        )),
    )
        .into_response())
}

#[debug_handler]
pub async fn login(
    State(app_state): State<Arc<AppState>>,
    client: ClientContext,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Response, Response> {
    enforce_rate_limit(&app_state, "auth", &format!("{}:{}", client.ip, payload.email)).await?;

    let response: LoginResponse = auth_service(&app_state)
        .login(payload, Some(client.ip), client.user_agent)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    Ok((StatusCode::OK, SuccessResponse::new(response)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Uuid,
}

#[debug_handler]
pub async fn verify_email(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Response, Response> {
    auth_service(&app_state)
        .verify_email(query.token)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    Ok((
        StatusCode::OK,
        SuccessResponse::new(SimpleMessageResponse::new(
            "Az e-mail címed megerősítve!",
        )),
    )
        .into_response())
}

#[debug_handler]
pub async fn resend_email_verification(
    State(app_state): State<Arc<AppState>>,
    client: ClientContext,
    Query(payload): Query<ResendEmailValidationRequest>,
) -> Result<Response, Response> {
    enforce_rate_limit(&app_state, "registration", &client.ip.to_string()).await?;

    auth_service(&app_state)
        .resend_email_verification(payload)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    Ok((
        StatusCode::OK,
        SuccessResponse::new(SimpleMessageResponse::new(
            "Megerősítő e-mail újraküldve!",
        )),
    )
        .into_response())
}

#[debug_handler]
pub async fn forgotten_password(
    State(app_state): State<Arc<AppState>>,
    client: ClientContext,
    ValidJson(payload): ValidJson<ForgottenPasswordRequest>,
) -> Result<Response, Response> {
    enforce_rate_limit(&app_state, "passwordReset", &client.ip.to_string()).await?;

    auth_service(&app_state)
        .forgotten_password(payload)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    Ok((
        StatusCode::OK,
        SuccessResponse::new(SimpleMessageResponse::new(
            "Ha az e-mail cím szerepel a rendszerünkben, hamarosan kapsz egy levelet a jelszó visszaállításához!",
        )),
    )
        .into_response())
}

#[debug_handler]
pub async fn new_password(
    State(app_state): State<Arc<AppState>>,
    client: ClientContext,
    ValidJson(payload): ValidJson<NewPasswordRequest>,
) -> Result<Response, Response> {
    enforce_rate_limit(&app_state, "passwordReset", &client.ip.to_string()).await?;

    auth_service(&app_state)
        .new_password(payload)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    Ok((
        StatusCode::OK,
        SuccessResponse::new(SimpleMessageResponse::new("Jelszó sikeresen megváltoztatva!")),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[debug_handler]
pub async fn refresh(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Response, Response> {
    let response = auth_service(&app_state)
        .refresh(&body.refresh_token)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    Ok((StatusCode::OK, SuccessResponse::new(response)).into_response())
}

#[debug_handler]
pub async fn logout(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Response, Response> {
    auth_service(&app_state)
        .logout(&body.refresh_token)
        .await
        .map_err(|e| e.into_friendly(file!()).into_response())?;

    Ok((
        StatusCode::OK,
        SuccessResponse::new(SimpleMessageResponse::new("Sikeres kijelentkezés!")),
    )
        .into_response())
}
