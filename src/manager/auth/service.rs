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

//! §4.5's authentication step needs somewhere to mint and verify the tokens
//! it checks, and the school-management surface needs registration/email
//! verification/password reset around it — this is that surface. Unlike the
//! teacher's `AuthModule`-trait indirection, this is a plain struct over the
//! same `Arc<SessionPool>`/`Arc<AppConfig>` every other service in this
//! crate takes, since `AppState` is the crate's sole state type.

use std::net::IpAddr;
use std::sync::Arc;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use handlebars::Handlebars;
use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::Message;
use serde_json::json;
use uuid::Uuid;

use crate::common::MailTransporter;
use crate::common::error::{CoreErrorKind, CoreResult};
use crate::common::session::SessionPool;
use crate::common::types::value_object::ValueObjectable;
use crate::manager::app::config::AppConfig;
use crate::manager::auth::dto::claims::Claims;
use crate::manager::auth::dto::login::{LoginRequest, LoginResponse, UserPublic};
use crate::manager::auth::dto::register::{
    ForgottenPasswordRequest, NewPasswordRequest, RegisterRequest, ResendEmailValidationRequest,
};
use crate::manager::auth::model::{AccountEventStatus, AccountEventType};
use crate::manager::auth::repository;
use crate::manager::users::model::User;

/// Refresh tokens live much longer than access tokens and aren't configured
/// per-deployment like `jwt_expiration_mins` — nothing in this crate's
/// external interface needs to tune it independently.
const REFRESH_TOKEN_TTL_DAYS: i64 = 30;

pub struct AuthService {
    session_pool: Arc<SessionPool>,
    config: Arc<AppConfig>,
    mailer: Arc<dyn MailTransporter>,
}

impl AuthService {
    pub fn new(
        session_pool: Arc<SessionPool>,
        config: Arc<AppConfig>,
        mailer: Arc<dyn MailTransporter>,
    ) -> Self {
        Self {
            session_pool,
            config,
            mailer,
        }
    }

    fn issue_access_token(&self, user: &User, family_id: Uuid) -> CoreResult<(Claims, String)> {
        let now = Utc::now().timestamp() as usize;
        let exp = (Utc::now() + Duration::minutes(self.config.auth().jwt_expiration_mins() as i64))
            .timestamp() as usize;
        let claims = Claims::new(
            user.id,
            exp,
            now,
            now,
            self.config.auth().jwt_issuer().to_string(),
            self.config.auth().jwt_audience().to_string(),
            Uuid::new_v4(),
            Some(family_id),
            Some(user.tenant_id),
        );
        let token = claims
            .to_token(self.config.auth().jwt_secret().as_bytes())
            .map_err(CoreErrorKind::Internal)?;
        Ok((claims, token))
    }

    /// Refresh tokens carry `family_id` but no `active_tenant` — they are
    /// never accepted by `AuthContext`/`AuthenticatedUser`, only by
    /// `refresh`/`logout` below, which decode them directly.
    fn issue_refresh_token(&self, user_id: Uuid, family_id: Uuid, jti: Uuid) -> CoreResult<String> {
        let now = Utc::now().timestamp() as usize;
        let exp = (Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS)).timestamp() as usize;
        let claims = Claims::new(
            user_id,
            exp,
            now,
            now,
            self.config.auth().jwt_issuer().to_string(),
            self.config.auth().jwt_audience().to_string(),
            jti,
            Some(family_id),
            None,
        );
        claims
            .to_token(self.config.auth().jwt_secret().as_bytes())
            .map_err(CoreErrorKind::Internal)
    }

    fn decode_refresh_claims(&self, token: &str) -> CoreResult<Claims> {
        Claims::from_token(
            token,
            self.config.auth().jwt_secret().as_bytes(),
            self.config.auth().jwt_issuer(),
            self.config.auth().jwt_audience(),
        )
        .map_err(CoreErrorKind::from)
    }

    /// §8 audit trail: every login attempt, MFA change and password-reset
    /// request leaves a row here regardless of outcome. A failed write must
    /// never mask the outcome of the action it records, so this only logs.
    async fn log_event(
        &self,
        user_id: Option<Uuid>,
        identifier: Option<String>,
        event_type: AccountEventType,
        status: AccountEventStatus,
        ip: Option<IpAddr>,
        user_agent: Option<String>,
    ) {
        let result = self
            .session_pool
            .unscoped_query(move |conn| async move {
                repository::insert_account_event_log(
                    conn, user_id, identifier, event_type, status, ip, user_agent, None,
                )
                .await
            })
            .await;
        if let Err(e) = result {
            tracing::warn!("failed to write account event log: {e}");
        }
    }

    pub async fn login(
        &self,
        payload: LoginRequest,
        ip: Option<IpAddr>,
        user_agent: Option<String>,
    ) -> CoreResult<LoginResponse> {
        let email = payload.email.clone();
        let user = self
            .session_pool
            .unscoped_query(move |conn| async move { repository::get_user_by_email(conn, &email).await })
            .await;

        let user = match user {
            Ok(u) => u,
            Err(_) => {
                self.log_event(
                    None,
                    Some(payload.email.clone()),
                    AccountEventType::Login,
                    AccountEventStatus::Failure,
                    ip,
                    user_agent,
                )
                .await;
                return Err(CoreErrorKind::AuthInvalid(
                    "invalid email or password".to_string(),
                ));
            }
        };

        if !user.is_active() {
            self.log_event(
                Some(user.id),
                Some(user.email.clone()),
                AccountEventType::Login,
                AccountEventStatus::Blocked,
                ip,
                user_agent,
            )
            .await;
            return Err(CoreErrorKind::AuthInvalid(
                "account is not active".to_string(),
            ));
        }

        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;
        if Argon2::default()
            .verify_password(payload.password.as_bytes(), &parsed_hash)
            .is_err()
        {
            self.log_event(
                Some(user.id),
                Some(user.email.clone()),
                AccountEventType::Login,
                AccountEventStatus::Failure,
                ip,
                user_agent,
            )
            .await;
            return Err(CoreErrorKind::AuthInvalid(
                "invalid email or password".to_string(),
            ));
        }

        if user.is_mfa_enabled() {
            let otp = payload.otp.as_deref().unwrap_or("");
            if user.check_mfa_token(otp).is_err() {
                self.log_event(
                    Some(user.id),
                    Some(user.email.clone()),
                    AccountEventType::Login,
                    AccountEventStatus::Failure,
                    ip,
                    user_agent,
                )
                .await;
                return Err(CoreErrorKind::AuthInvalid(
                    "invalid one-time code".to_string(),
                ));
            }
        }

        let family_id = Uuid::new_v4();
        let (access_claims, access_token) = self.issue_access_token(&user, family_id)?;
        let refresh_jti = Uuid::new_v4();
        let refresh_token = self.issue_refresh_token(user.id, family_id, refresh_jti)?;

        let user_id = user.id;
        self.session_pool
            .unscoped_tx(move |conn| async move {
                repository::insert_refresh_token(
                    conn,
                    user_id,
                    family_id,
                    refresh_jti,
                    REFRESH_TOKEN_TTL_DAYS,
                )
                .await?;
                repository::update_user_last_login_at(conn, user_id).await
            })
            .await?;

        self.log_event(
            Some(user.id),
            Some(user.email.clone()),
            AccountEventType::Login,
            AccountEventStatus::Success,
            ip,
            user_agent,
        )
        .await;

        Ok(LoginResponse::new(
            access_claims,
            UserPublic::from(user),
            access_token,
            refresh_token,
        ))
    }

    pub async fn register(&self, payload: RegisterRequest) -> CoreResult<()> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(payload.password.extract().get_value().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;

        let (user, verification_id) = self
            .session_pool
            .unscoped_tx(move |conn| {
                let password_hash = password_hash.clone();
                async move {
                    let user = repository::insert_user(conn, &payload, &password_hash).await?;
                    let verification = repository::insert_email_verification(conn, user.id).await?;
                    Ok((user, verification.id))
                }
            })
            .await?;

        self.send_email_verification(&user, verification_id).await
    }

    pub async fn verify_email(&self, token: Uuid) -> CoreResult<()> {
        self.session_pool
            .unscoped_tx(move |conn| async move {
                let verification = repository::get_email_verification(conn, token).await?;
                let mut user = repository::get_user_by_id(conn, verification.user_id).await?;
                user.status = "active".to_string();
                repository::update_user(conn, &user).await?;
                repository::invalidate_email_verification(conn, verification.id).await
            })
            .await
    }

    pub async fn resend_email_verification(
        &self,
        payload: ResendEmailValidationRequest,
    ) -> CoreResult<()> {
        let email = payload.email.extract().get_value().clone();
        let user = self
            .session_pool
            .unscoped_query(move |conn| async move { repository::get_user_by_email(conn, &email).await })
            .await?;

        if !user.need_email_verification() {
            return Err(CoreErrorKind::Validation(
                "e-mail address is already verified".to_string(),
            ));
        }

        let verification_id = self
            .session_pool
            .unscoped_tx(move |conn| {
                let user_id = user.id;
                async move { repository::insert_email_verification(conn, user_id).await }
            })
            .await?
            .id;

        self.send_email_verification(&user, verification_id).await
    }

    async fn send_email_verification(&self, user: &User, verification_id: Uuid) -> CoreResult<()> {
        let handlebars = Handlebars::new();
        let hostname = self.config.server().public_hostname().to_owned();
        let verification_link = format!("https://{hostname}/email_megerosites/{verification_id}");
        let email = Message::builder()
            .from(Mailbox::new(
                Some(self.config.mail().default_from_name().to_owned()),
                self.config
                    .mail()
                    .default_from()
                    .parse()
                    .map_err(|e: AddressError| CoreErrorKind::Internal(e.to_string()))?,
            ))
            .to(Mailbox::new(
                None,
                user.email
                    .parse()
                    .map_err(|e: AddressError| CoreErrorKind::Internal(e.to_string()))?,
            ))
            .subject("Kérlek, erősítsd meg az e-mail címedet!")
            .header(ContentType::TEXT_HTML)
            .body(
                handlebars
                    .render_template(
                        r##"
                <p style="font-weight: bold; margin-bottom: 25px;">
                    Kedves {{last_name}} {{first_name}}!
                </p>
                <p>
                    Kérlek a következő hivatkozásra kattintva erősítsd meg az e-mail címedet!<br>
                    <a href="{{verification_link}}">{{verification_link}}</a>
                </p>
                "##,
                        &json!({
                            "last_name": user.last_name,
                            "first_name": user.first_name,
                            "verification_link": verification_link,
                        }),
                    )
                    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?,
            )
            .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| CoreErrorKind::Internal(e.to_string()))
    }

    /// Silently succeeds on an unknown e-mail so the response shape can't be
    /// used to enumerate registered accounts.
    pub async fn forgotten_password(&self, payload: ForgottenPasswordRequest) -> CoreResult<()> {
        let email = payload.email.extract().get_value().clone();
        let user = self
            .session_pool
            .unscoped_query(move |conn| async move { repository::get_user_by_email(conn, &email).await })
            .await;

        let user = match user {
            Ok(u) => u,
            Err(_) => return Ok(()),
        };

        let reset_id = self
            .session_pool
            .unscoped_tx(move |conn| {
                let user_id = user.id;
                async move { repository::insert_forgotten_password(conn, user_id).await }
            })
            .await?
            .id;

        self.log_event(
            Some(user.id),
            Some(user.email.clone()),
            AccountEventType::PasswordResetRequest,
            AccountEventStatus::Success,
            None,
            None,
        )
        .await;

        self.send_password_reset_email(&user, reset_id).await
    }

    async fn send_password_reset_email(&self, user: &User, token_id: Uuid) -> CoreResult<()> {
        let handlebars = Handlebars::new();
        let hostname = self.config.server().public_hostname().to_owned();
        let reset_link = format!("https://{hostname}/uj_jelszo/{token_id}");
        let email = Message::builder()
            .from(Mailbox::new(
                Some(self.config.mail().default_from_name().to_owned()),
                self.config
                    .mail()
                    .default_from()
                    .parse()
                    .map_err(|e: AddressError| CoreErrorKind::Internal(e.to_string()))?,
            ))
            .to(Mailbox::new(
                None,
                user.email
                    .parse()
                    .map_err(|e: AddressError| CoreErrorKind::Internal(e.to_string()))?,
            ))
            .subject("Jelszó visszaállítása")
            .header(ContentType::TEXT_HTML)
            .body(
                handlebars
                    .render_template(
                        r##"
                <p style="font-weight: bold; margin-bottom: 25px;">
                    Kedves {{last_name}} {{first_name}}!
                </p>
                <p>
                    Az új jelszó beállításához kattints a következő hivatkozásra!<br>
                    <a href="{{reset_link}}">{{reset_link}}</a>
                </p>
                "##,
                        &json!({
                            "last_name": user.last_name,
                            "first_name": user.first_name,
                            "reset_link": reset_link,
                        }),
                    )
                    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?,
            )
            .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| CoreErrorKind::Internal(e.to_string()))
    }

    pub async fn new_password(&self, payload: NewPasswordRequest) -> CoreResult<()> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(payload.password.extract().get_value().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;

        let user_id = self
            .session_pool
            .unscoped_tx(move |conn| async move {
                let reset = repository::get_forgotten_password(conn, payload.token).await?;
                let mut user = repository::get_user_by_id(conn, reset.user_id).await?;
                user.password_hash = password_hash;
                repository::update_user(conn, &user).await?;
                repository::invalidate_forgotten_password(conn, reset.id).await?;
                Ok(user.id)
            })
            .await?;

        self.log_event(
            Some(user_id),
            None,
            AccountEventType::PasswordChange,
            AccountEventStatus::Success,
            None,
            None,
        )
        .await;

        Ok(())
    }

    /// Rotates the refresh token (§8 reuse detection): presenting an
    /// already-consumed token burns the whole family rather than just
    /// rejecting the one request, since reuse of a consumed token means the
    /// family may be compromised.
    pub async fn refresh(&self, refresh_token: &str) -> CoreResult<LoginResponse> {
        let claims = self.decode_refresh_claims(refresh_token)?;
        let family_id = claims
            .family_id()
            .ok_or_else(|| CoreErrorKind::AuthInvalid("not a refresh token".to_string()))?;

        let stored = self
            .session_pool
            .unscoped_query(move |conn| async move {
                repository::get_refresh_token_by_jti(conn, claims.jti()).await
            })
            .await
            .map_err(|_| CoreErrorKind::AuthInvalid("unknown refresh token".to_string()))?;

        if stored.revoked_at.is_some() {
            return Err(CoreErrorKind::AuthInvalid(
                "refresh token has been revoked".to_string(),
            ));
        }

        if stored.consumed_at.is_some() {
            self.session_pool
                .unscoped_tx(move |conn| async move {
                    repository::revoke_refresh_token_family(conn, family_id).await
                })
                .await?;
            return Err(CoreErrorKind::AuthInvalid(
                "refresh token reuse detected, session revoked".to_string(),
            ));
        }

        let old_id = stored.id;
        let stored_user_id = stored.user_id;
        let user = self
            .session_pool
            .unscoped_query(move |conn| async move { repository::get_user_by_id(conn, stored_user_id).await })
            .await?;

        if !user.is_active() {
            return Err(CoreErrorKind::AuthInvalid(
                "account is not active".to_string(),
            ));
        }

        let (access_claims, access_token) = self.issue_access_token(&user, family_id)?;
        let new_jti = Uuid::new_v4();
        let new_refresh_token = self.issue_refresh_token(user.id, family_id, new_jti)?;

        let user_id = user.id;
        self.session_pool
            .unscoped_tx(move |conn| async move {
                let new_row =
                    repository::insert_refresh_token(conn, user_id, family_id, new_jti, REFRESH_TOKEN_TTL_DAYS)
                        .await?;
                repository::consume_refresh_token(conn, old_id, new_row.id).await
            })
            .await?;

        Ok(LoginResponse::new(
            access_claims,
            UserPublic::from(user),
            access_token,
            new_refresh_token,
        ))
    }

    pub async fn logout(&self, refresh_token: &str) -> CoreResult<()> {
        let claims = self.decode_refresh_claims(refresh_token)?;
        let family_id = claims
            .family_id()
            .ok_or_else(|| CoreErrorKind::AuthInvalid("not a refresh token".to_string()))?;

        self.session_pool
            .unscoped_tx(move |conn| async move {
                repository::revoke_refresh_token_family(conn, family_id).await
            })
            .await?;

        self.log_event(
            Some(claims.sub()),
            None,
            AccountEventType::Logout,
            AccountEventStatus::Success,
            None,
            None,
        )
        .await;

        Ok(())
    }
}
