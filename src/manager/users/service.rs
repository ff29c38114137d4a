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

//! The personal-settings counterpart to `auth::service`: enabling/verifying/
//! disabling a user's own MFA. Unlike the teacher's `Arc<dyn UsersModule>`
//! indirection, this is a plain struct over the same `Arc<SessionPool>`
//! every other service in this crate takes.

use std::net::IpAddr;
use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::common::error::{CoreErrorKind, CoreResult};
use crate::common::session::SessionPool;
use crate::common::types::value_object::ValueObjectable;
use crate::manager::auth::dto::claims::Claims;
use crate::manager::auth::dto::login::OtpUserInput;
use crate::manager::auth::model::{AccountEventStatus, AccountEventType};
use crate::manager::auth::repository;
use crate::manager::users::model::User;

/// MFA enable/disable attempts are rate-limited per-user against the audit
/// log itself rather than through `authz::rate_limit::RateLimiter`, since
/// the limiter is keyed by IP and this needs to be keyed by the account.
const MFA_ATTEMPT_WINDOW_MINS: i64 = 120;
const MFA_ATTEMPT_MAX: i64 = 5;

pub struct UsersService {
    session_pool: Arc<SessionPool>,
}

impl UsersService {
    pub fn new(session_pool: Arc<SessionPool>) -> Self {
        Self { session_pool }
    }

    async fn log_event(
        &self,
        user_id: Option<Uuid>,
        identifier: Option<String>,
        event_type: AccountEventType,
        status: AccountEventStatus,
        ip: Option<IpAddr>,
        user_agent: Option<String>,
        error: Option<String>,
    ) {
        let metadata = error.map(|e| json!({ "error": e }));
        let result = self
            .session_pool
            .unscoped_query(move |conn| async move {
                repository::insert_account_event_log(
                    conn, user_id, identifier, event_type, status, ip, user_agent, metadata,
                )
                .await
            })
            .await;
        if let Err(e) = result {
            tracing::warn!("failed to write account event log: {e}");
        }
    }

    async fn rate_limit_mfa_attempts(
        &self,
        user_id: Uuid,
        event_type: AccountEventType,
        ip: Option<IpAddr>,
        user_agent: Option<String>,
    ) -> CoreResult<()> {
        let identifier = user_id.to_string();
        let count_identifier = identifier.clone();
        let count_event_type = event_type.clone();
        let count = self
            .session_pool
            .unscoped_query(move |conn| async move {
                repository::count_recent_events_for_identifier(
                    conn,
                    &count_identifier,
                    count_event_type,
                    MFA_ATTEMPT_WINDOW_MINS,
                )
                .await
            })
            .await?;

        if count >= MFA_ATTEMPT_MAX {
            self.log_event(
                Some(user_id),
                Some(identifier),
                event_type,
                AccountEventStatus::Blocked,
                ip,
                user_agent,
                None,
            )
            .await;
            return Err(CoreErrorKind::RateLimited(
                "mfa",
                (MFA_ATTEMPT_WINDOW_MINS * 60) as u64,
            ));
        }
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> CoreResult<User> {
        self.session_pool
            .unscoped_query(move |conn| async move { repository::get_user_by_id(conn, user_id).await })
            .await
    }

    async fn save_user(&self, user: User) -> CoreResult<User> {
        self.session_pool
            .unscoped_tx(move |conn| async move { repository::update_user(conn, &user).await })
            .await
    }

    /// Generates and stores a new MFA secret, returning the value to render
    /// as a QR code. MFA is not considered enabled until `otp_verify`
    /// confirms the user can actually produce a valid code from it.
    pub async fn otp_enable(
        &self,
        claims: &Claims,
        ip: Option<IpAddr>,
        user_agent: Option<String>,
    ) -> CoreResult<String> {
        let user = self.get_user(claims.sub()).await?;

        if user.is_mfa_enabled() {
            self.log_event(
                Some(user.id),
                Some(user.email.clone()),
                AccountEventType::MfaEnable,
                AccountEventStatus::Failure,
                ip,
                user_agent,
                Some("MFA already active".to_string()),
            )
            .await;
            return Err(CoreErrorKind::Validation(
                "a kétlépcsős azonosítás már aktív".to_string(),
            ));
        }

        let user = user.init_mfa_secret();
        let new_mfa_secret = user
            .mfa_secret
            .clone()
            .ok_or_else(|| CoreErrorKind::Internal("missing mfa secret after init".to_string()))?;

        self.save_user(user).await?;

        Ok(new_mfa_secret)
    }

    pub async fn otp_verify(
        &self,
        claims: &Claims,
        payload: &OtpUserInput,
        ip: Option<IpAddr>,
        user_agent: Option<String>,
    ) -> CoreResult<()> {
        let mut user = self.get_user(claims.sub()).await?;

        if user.is_mfa_enabled() {
            return Err(CoreErrorKind::Validation(
                "a kétlépcsős azonosítás már aktív".to_string(),
            ));
        }

        if user
            .check_mfa_token(payload.otp.extract().get_value())
            .is_err()
        {
            self.log_event(
                Some(user.id),
                Some(user.email.clone()),
                AccountEventType::MfaEnable,
                AccountEventStatus::Failure,
                ip,
                user_agent,
                Some("invalid one-time code".to_string()),
            )
            .await;
            return Err(CoreErrorKind::AuthInvalid(
                "invalid one-time code".to_string(),
            ));
        }

        user.is_mfa_enabled = true;
        let email = user.email.clone();
        self.save_user(user).await?;

        self.log_event(
            Some(claims.sub()),
            Some(email),
            AccountEventType::MfaEnable,
            AccountEventStatus::Success,
            ip,
            user_agent,
            None,
        )
        .await;

        Ok(())
    }

    pub async fn otp_disable(
        &self,
        claims: &Claims,
        payload: &OtpUserInput,
        ip: Option<IpAddr>,
        user_agent: Option<String>,
    ) -> CoreResult<()> {
        self.rate_limit_mfa_attempts(
            claims.sub(),
            AccountEventType::MfaDisable,
            ip,
            user_agent.clone(),
        )
        .await?;

        let mut user = self.get_user(claims.sub()).await?;

        if user
            .check_mfa_token(payload.otp.extract().get_value())
            .is_err()
        {
            self.log_event(
                Some(user.id),
                Some(user.email.clone()),
                AccountEventType::MfaDisable,
                AccountEventStatus::Failure,
                ip,
                user_agent,
                Some("invalid one-time code".to_string()),
            )
            .await;
            return Err(CoreErrorKind::AuthInvalid(
                "invalid one-time code".to_string(),
            ));
        }

        user.is_mfa_enabled = false;
        user.mfa_secret = None;
        let email = user.email.clone();
        self.save_user(user).await?;

        self.log_event(
            Some(claims.sub()),
            Some(email),
            AccountEventType::MfaDisable,
            AccountEventStatus::Success,
            ip,
            user_agent,
            None,
        )
        .await;

        Ok(())
    }
}
