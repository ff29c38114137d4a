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

//! Identity-only counterpart to `common::authz::pipeline::AuthContext`: a
//! route that only needs "who is calling" (the personal OTP/MFA settings)
//! shouldn't have to pay for tenant resolution and role/permission loading.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::IntoResponse;

use crate::common::AppState;
use crate::common::error::CoreErrorKind;
use crate::manager::auth::dto::claims::Claims;

pub struct AuthenticatedUser(pub Claims);

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = axum::response::Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(CoreErrorKind::AuthMissing)
            .map_err(|e| e.into_friendly(file!()).into_response())?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| CoreErrorKind::AuthInvalid("missing Bearer prefix".to_string()))
            .map_err(|e| e.into_friendly(file!()).into_response())?;

        let claims = Claims::from_token(
            token,
            state.config.auth().jwt_secret().as_bytes(),
            state.config.auth().jwt_issuer(),
            state.config.auth().jwt_audience(),
        )
        .map_err(CoreErrorKind::from)
        .map_err(|e| e.into_friendly(file!()).into_response())?;

        Ok(AuthenticatedUser(claims))
    }
}
