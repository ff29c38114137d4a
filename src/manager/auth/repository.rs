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

//! Plain query functions over the `users`/`email_verifications`/
//! `forgotten_passwords`/`refresh_tokens`/`account_event_log` tables.
//! Every call here runs through `SessionPool::unscoped_query`/`unscoped_tx`
//! rather than the tenant-scoped facade: registration and login both run
//! before a tenant session can be established (the caller doesn't carry a
//! JWT yet), and a user's `tenant_id` is assigned directly on the row
//! rather than looked up through a membership table.

use std::net::IpAddr;

use sqlx::PgConnection;
use sqlx::types::JsonValue;
use uuid::Uuid;

use crate::common::error::{CoreErrorKind, CoreResult};
use crate::common::types::value_object::ValueObjectable;
use crate::manager::auth::dto::register::RegisterRequest;
use crate::manager::auth::model::{
    AccountEventLogEntry, AccountEventStatus, AccountEventType, EmailVerification,
    ForgottenPassword, RefreshToken,
};
use crate::manager::users::model::User;

fn not_found(what: &str) -> CoreErrorKind {
    CoreErrorKind::NotFound(what.to_string())
}

pub async fn insert_user(
    conn: &mut PgConnection,
    payload: &RegisterRequest,
    password_hash: &str,
) -> CoreResult<User> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (
                id, tenant_id, email, password_hash, first_name, last_name, status
        ) VALUES ($1, $2, $3, $4, $5, $6, 'unchecked_email') RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(payload.tenant_id)
    .bind(payload.email.extract().get_value())
    .bind(password_hash)
    .bind(payload.first_name.extract().get_value())
    .bind(payload.last_name.extract().get_value())
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .map(|d| d.is_unique_violation())
            .unwrap_or(false)
        {
            CoreErrorKind::Validation("email already registered".to_string())
        } else {
            CoreErrorKind::Internal(e.to_string())
        }
    })
}

pub async fn get_user_by_email(conn: &mut PgConnection, email: &str) -> CoreResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL")
        .bind(email)
        .fetch_optional(conn)
        .await
        .map_err(|e| CoreErrorKind::Internal(e.to_string()))?
        .ok_or_else(|| not_found("user"))
}

pub async fn get_user_by_id(conn: &mut PgConnection, user_id: Uuid) -> CoreResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| CoreErrorKind::Internal(e.to_string()))?
        .ok_or_else(|| not_found("user"))
}

pub async fn update_user(conn: &mut PgConnection, user: &User) -> CoreResult<User> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET email = $1,
            password_hash = $2,
            first_name = $3,
            last_name = $4,
            phone = $5,
            status = $6,
            last_login_at = $7,
            profile_picture_url = $8,
            locale = $9,
            invited_by = $10,
            email_verified_at = $11,
            is_mfa_enabled = $12,
            mfa_secret = $13,
            updated_at = now()
        WHERE id = $14
            AND deleted_at IS NULL
        RETURNING *
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.phone)
    .bind(&user.status)
    .bind(user.last_login_at)
    .bind(&user.profile_picture_url)
    .bind(&user.locale)
    .bind(user.invited_by)
    .bind(user.email_verified_at)
    .bind(user.is_mfa_enabled)
    .bind(&user.mfa_secret)
    .bind(user.id)
    .fetch_optional(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?
    .ok_or_else(|| not_found("user"))
}

pub async fn update_user_last_login_at(conn: &mut PgConnection, user_id: Uuid) -> CoreResult<()> {
    sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;
    Ok(())
}

pub async fn insert_email_verification(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> CoreResult<EmailVerification> {
    sqlx::query_as::<_, EmailVerification>(
        "INSERT INTO email_verifications (
                user_id, valid_until
        ) VALUES ($1, NOW() + '1 day'::interval) RETURNING *",
    )
    .bind(user_id)
    .fetch_one(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

pub async fn get_email_verification(
    conn: &mut PgConnection,
    email_verification_id: Uuid,
) -> CoreResult<EmailVerification> {
    sqlx::query_as::<_, EmailVerification>(
        "SELECT * FROM email_verifications \
         WHERE id = $1 AND valid_until > NOW() AND deleted_at IS NULL",
    )
    .bind(email_verification_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?
    .ok_or_else(|| not_found("email verification token"))
}

pub async fn invalidate_email_verification(
    conn: &mut PgConnection,
    email_verification_id: Uuid,
) -> CoreResult<()> {
    sqlx::query("UPDATE email_verifications SET deleted_at = NOW() WHERE id = $1")
        .bind(email_verification_id)
        .execute(conn)
        .await
        .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;
    Ok(())
}

pub async fn insert_forgotten_password(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> CoreResult<ForgottenPassword> {
    sqlx::query_as::<_, ForgottenPassword>(
        "INSERT INTO forgotten_passwords (
                user_id, valid_until
        ) VALUES ($1, NOW() + '1 hour'::interval) RETURNING *",
    )
    .bind(user_id)
    .fetch_one(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

pub async fn get_forgotten_password(
    conn: &mut PgConnection,
    forgotten_password_id: Uuid,
) -> CoreResult<ForgottenPassword> {
    sqlx::query_as::<_, ForgottenPassword>(
        "SELECT * FROM forgotten_passwords \
         WHERE id = $1 AND valid_until > NOW() AND deleted_at IS NULL",
    )
    .bind(forgotten_password_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?
    .ok_or_else(|| not_found("password reset token"))
}

pub async fn invalidate_forgotten_password(
    conn: &mut PgConnection,
    forgotten_password_id: Uuid,
) -> CoreResult<()> {
    sqlx::query("UPDATE forgotten_passwords SET deleted_at = NOW() WHERE id = $1")
        .bind(forgotten_password_id)
        .execute(conn)
        .await
        .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;
    Ok(())
}

/// §8 audit trail: every login attempt, MFA change and password-reset
/// request writes one row here regardless of outcome, so a failed login
/// still leaves a `Failure` entry tied to the identifier it was tried
/// against even when no matching user exists.
#[allow(clippy::too_many_arguments)]
pub async fn insert_account_event_log(
    conn: &mut PgConnection,
    user_id: Option<Uuid>,
    identifier: Option<String>,
    event_type: AccountEventType,
    status: AccountEventStatus,
    ip: Option<IpAddr>,
    user_agent: Option<String>,
    metadata: Option<JsonValue>,
) -> CoreResult<AccountEventLogEntry> {
    sqlx::query_as::<_, AccountEventLogEntry>(
        "INSERT INTO account_event_log (
                user_id, identifier, event_type, status, ip, user_agent, metadata
        ) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(user_id)
    .bind(identifier)
    .bind(sqlx::types::Json(event_type))
    .bind(sqlx::types::Json(status))
    .bind(ip.map(|ip| ip.to_string()))
    .bind(user_agent)
    .bind(metadata)
    .fetch_one(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

/// Counts account events of `event_type` for `identifier` within the last
/// `window_mins` minutes. Used by the MFA enable/disable rate limit; the
/// auth/registration/password-reset limiters go through
/// `authz::rate_limit::RateLimiter` instead, which doesn't need this table.
pub async fn count_recent_events_for_identifier(
    conn: &mut PgConnection,
    identifier: &str,
    event_type: AccountEventType,
    window_mins: i64,
) -> CoreResult<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM account_event_log \
         WHERE identifier = $1 AND event_type = $2 \
         AND created_at > NOW() - ($3 || ' minutes')::interval",
    )
    .bind(identifier)
    .bind(sqlx::types::Json(event_type))
    .bind(window_mins.to_string())
    .fetch_one(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

pub async fn insert_refresh_token(
    conn: &mut PgConnection,
    user_id: Uuid,
    family_id: Uuid,
    jti: Uuid,
    ttl_days: i64,
) -> CoreResult<RefreshToken> {
    sqlx::query_as::<_, RefreshToken>(
        "INSERT INTO refresh_tokens (
                id, user_id, family_id, jti, iat, exp
        ) VALUES ($1, $2, $3, $4, NOW(), NOW() + ($5 || ' days')::interval) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(family_id)
    .bind(jti)
    .bind(ttl_days.to_string())
    .fetch_one(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

pub async fn get_refresh_token_by_jti(
    conn: &mut PgConnection,
    jti: Uuid,
) -> CoreResult<RefreshToken> {
    sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE jti = $1")
        .bind(jti)
        .fetch_optional(conn)
        .await
        .map_err(|e| CoreErrorKind::Internal(e.to_string()))?
        .ok_or_else(|| not_found("refresh token"))
}

/// Marks `id` consumed and records the token that replaced it, the
/// rotate-on-use half of refresh-token rotation.
pub async fn consume_refresh_token(
    conn: &mut PgConnection,
    id: Uuid,
    replaced_by: Uuid,
) -> CoreResult<()> {
    sqlx::query("UPDATE refresh_tokens SET consumed_at = NOW(), replaced_by = $2 WHERE id = $1")
        .bind(id)
        .bind(replaced_by)
        .execute(conn)
        .await
        .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;
    Ok(())
}

/// Revokes every token in `family_id`. Used both for logout and as the
/// reuse-detection response: presenting an already-consumed refresh token
/// again means the family may be compromised, so the whole family is
/// burned rather than just the one token.
pub async fn revoke_refresh_token_family(
    conn: &mut PgConnection,
    family_id: Uuid,
) -> CoreResult<()> {
    sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = NOW() \
         WHERE family_id = $1 AND revoked_at IS NULL",
    )
    .bind(family_id)
    .execute(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;
    Ok(())
}
