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

//! §4.5-4.7: authenticate -> resolve tenant -> load roles/permissions,
//! wired together as an axum extractor. Every protected handler takes
//! `AuthContext` as an argument and the three steps run before the handler
//! body is ever reached; `require_permission`/`require_role`/
//! `require_ownership` are then plain predicates the handler calls itself,
//! since what counts as the "owner" of a resource is handler-specific.

use crate::common::authz::model::{Denial, PermissionMode, Role, WILDCARD};
use crate::common::authz::permission_cache::PermissionCache;
use crate::common::authz::tenant_resolver::TenantResolver;
use crate::common::error::{CoreErrorKind, CoreResult};
use crate::common::session::SessionPool;
use crate::manager::app::config::AppConfig;
use crate::manager::auth::dto::claims::Claims;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use std::sync::Arc;
use uuid::Uuid;

pub struct AuthPipeline {
    config: Arc<AppConfig>,
    session_pool: Arc<SessionPool>,
    permission_cache: Arc<PermissionCache>,
    tenant_resolver: Arc<TenantResolver>,
}

impl AuthPipeline {
    pub fn new(
        config: Arc<AppConfig>,
        session_pool: Arc<SessionPool>,
        permission_cache: Arc<PermissionCache>,
        tenant_resolver: Arc<TenantResolver>,
    ) -> Self {
        Self {
            config,
            session_pool,
            permission_cache,
            tenant_resolver,
        }
    }

    /// Verifies the bearer token and returns its claims. Maps a missing
    /// header to `AuthMissing`, a token whose only defect is `exp` in the
    /// past to `AuthExpired`, and every other decode/validation failure
    /// (signature, issuer, audience, `nbf`) to `AuthInvalid`; see
    /// `authenticate_optional` for the variant used by routes that behave
    /// differently for authenticated vs. anonymous callers without
    /// rejecting the anonymous case outright.
    fn authenticate(&self, parts: &Parts) -> CoreResult<Claims> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(CoreErrorKind::AuthMissing)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| CoreErrorKind::AuthInvalid("missing Bearer prefix".to_string()))?;

        Claims::from_token(
            token,
            self.config.auth().jwt_secret().as_bytes(),
            self.config.auth().jwt_issuer(),
            self.config.auth().jwt_audience(),
        )
        .map_err(CoreErrorKind::from)
    }

    /// §4.5's "optional" variant: attempts the same bearer-token
    /// verification as `authenticate` but folds every failure (missing
    /// header, bad signature, expired) into `None` instead of propagating
    /// an error.
    fn authenticate_optional(&self, parts: &Parts) -> Option<Claims> {
        self.authenticate(parts).ok()
    }

    /// Runs the full pipeline like `authenticate_and_authorize`, but for
    /// routes that accept both authenticated and anonymous callers: any
    /// failure anywhere in the chain (missing/invalid/expired token, no
    /// resolvable tenant, no role in tenant) silently yields `None` rather
    /// than rejecting the request.
    pub async fn authenticate_and_authorize_optional(&self, parts: &Parts) -> Option<AuthContext> {
        if self.authenticate_optional(parts).is_none() {
            return None;
        }
        self.authenticate_and_authorize(parts).await.ok()
    }

    /// Resolves the tenant for this request using token -> header ->
    /// subdomain, honoring `X-Impersonate-Tenant` for platform owners.
    async fn resolve_tenant(
        &self,
        parts: &Parts,
        claims: &Claims,
        is_platform_owner: bool,
    ) -> CoreResult<(Uuid, crate::common::authz::tenant_resolver::TenantSource)> {
        let header_tenant_id = parts
            .headers
            .get("x-tenant-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());
        let impersonate_tenant_id = parts
            .headers
            .get("x-impersonate-tenant")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());
        let host_subdomain_slug = parts
            .headers
            .get(axum::http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(|h| {
                crate::common::authz::tenant_resolver::subdomain_slug(
                    h,
                    self.config.auth().jwt_audience(),
                )
            });

        let (tenant, source) = self
            .tenant_resolver
            .resolve(
                claims.active_tenant(),
                header_tenant_id,
                host_subdomain_slug.as_deref(),
                impersonate_tenant_id,
                is_platform_owner,
            )
            .await?;
        Ok((tenant.id, source))
    }

    /// Loads the effective roles and permission codes for `(user, tenant)`,
    /// checking the cache first. Platform owners and holders of
    /// `Role::Principal` collapse to the `*` wildcard rather than an
    /// enumerated permission list — see `common::authz::model`.
    async fn load_roles_and_permissions(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> CoreResult<(Vec<Role>, Vec<String>)> {
        if let (Some(roles), Some(perms)) = (
            self.permission_cache.get_roles(user_id, tenant_id),
            self.permission_cache.get_permissions(user_id, tenant_id),
        ) {
            return Ok((roles, perms));
        }

        let roles = self
            .session_pool
            .query(tenant_id, Some(user_id), |conn| async move {
                sqlx::query_scalar::<_, String>(
                    "SELECT role FROM user_roles WHERE user_id = $1 AND tenant_id = $2",
                )
                .bind(user_id)
                .bind(tenant_id)
                .fetch_all(conn)
                .await
                .map_err(|e| CoreErrorKind::Internal(e.to_string()))
            })
            .await?
            .into_iter()
            .filter_map(|r| r.parse::<Role>().ok())
            .collect::<Vec<_>>();

        if roles.is_empty() {
            return Err(CoreErrorKind::NoTenantAccess);
        }

        let perms = if roles.iter().any(|r| matches!(r, Role::PlatformOwner | Role::Principal)) {
            vec![WILDCARD.to_string()]
        } else {
            self.session_pool
                .query(tenant_id, Some(user_id), |conn| async move {
                    sqlx::query_scalar::<_, String>(
                        "SELECT DISTINCT rp.permission_code \
                         FROM role_permissions rp \
                         JOIN user_roles ur ON ur.role = rp.role \
                         WHERE ur.user_id = $1 AND ur.tenant_id = $2",
                    )
                    .bind(user_id)
                    .bind(tenant_id)
                    .fetch_all(conn)
                    .await
                    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
                })
                .await?
        };

        self.permission_cache
            .put_roles(user_id, tenant_id, roles.clone());
        self.permission_cache
            .put_permissions(user_id, tenant_id, perms.clone());

        Ok((roles, perms))
    }

    /// Runs the full pipeline, producing the `AuthContext` a handler sees.
    pub async fn authenticate_and_authorize(&self, parts: &Parts) -> CoreResult<AuthContext> {
        let claims = self.authenticate(parts)?;
        let user_id = claims.sub();

        // A platform-owner check needs to happen before tenant resolution
        // can honor impersonation, but role membership itself is only known
        // once a tenant is resolved — so a user presenting
        // `X-Impersonate-Tenant` must already carry `platform_owner` in
        // their own home tenant's roles. We treat `active_tenant` (the
        // tenant the token was minted for) as that home tenant for this
        // check.
        let is_platform_owner = match claims.active_tenant() {
            Some(home_tenant) => self
                .load_roles_and_permissions(user_id, home_tenant)
                .await
                .map(|(roles, _)| roles.contains(&Role::PlatformOwner))
                .unwrap_or(false),
            None => false,
        };

        let (tenant_id, _source) = self.resolve_tenant(parts, &claims, is_platform_owner).await?;
        let (roles, permissions) = self.load_roles_and_permissions(user_id, tenant_id).await?;

        Ok(AuthContext {
            user_id,
            tenant_id,
            roles,
            permissions,
        })
    }
}

/// The authenticated, tenant-scoped, role-loaded identity a protected
/// handler operates as. Constructing one always means authentication,
/// tenant resolution and role/permission loading all succeeded.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub roles: Vec<Role>,
    pub permissions: Vec<String>,
}

impl AuthContext {
    fn has_wildcard(&self) -> bool {
        self.permissions.iter().any(|p| p == WILDCARD)
    }

    /// §4.7: passes if the wildcard is held, or if `mode` is satisfied
    /// against the held permission codes.
    pub fn require_permission(&self, codes: &[&str], mode: PermissionMode) -> Result<(), Denial> {
        if self.has_wildcard() {
            return Ok(());
        }
        let held = |code: &str| self.permissions.iter().any(|p| p == code);
        let satisfied = match mode {
            PermissionMode::Any => codes.iter().any(|c| held(c)),
            PermissionMode::All => codes.iter().all(|c| held(c)),
        };
        if satisfied {
            Ok(())
        } else {
            Err(Denial::permission(codes, mode))
        }
    }

    /// §4.7: a platform owner or principal always passes, regardless of
    /// whether either role appears in `roles` — they outrank any
    /// individually named role requirement.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), Denial> {
        let bypasses = |r: &Role| matches!(r, Role::PlatformOwner | Role::Principal);
        if self.roles.iter().any(bypasses) || roles.iter().any(|r| self.roles.contains(r)) {
            Ok(())
        } else {
            Err(Denial::role(roles))
        }
    }

    /// §4.7: an elevated role (see `Role::is_elevated`) bypasses the
    /// ownership comparison outright; everyone else must be the resource's
    /// own owner, determined by the caller via `owner_id`.
    pub fn require_ownership(&self, owner_id: Uuid) -> Result<(), Denial> {
        if self.roles.iter().any(Role::is_elevated) || owner_id == self.user_id {
            Ok(())
        } else {
            Err(Denial::ownership())
        }
    }
}

/// Wired concretely against `Arc<AppState>` rather than generically over
/// `FromRef`, since every router in this crate shares the one state type.
impl FromRequestParts<Arc<crate::common::AppState>> for AuthContext {
    type Rejection = axum::response::Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::common::AppState>,
    ) -> Result<Self, Self::Rejection> {
        state
            .auth_pipeline
            .authenticate_and_authorize(parts)
            .await
            .map_err(|e| e.into_friendly(file!()).into_response())
    }
}

/// §4.5's optional authentication step as an extractor: routes that behave
/// differently for authenticated vs. anonymous callers take this instead of
/// `AuthContext`, so an anonymous caller reaches the handler with `None`
/// rather than a 401.
pub struct OptionalAuthContext(pub Option<AuthContext>);

impl FromRequestParts<Arc<crate::common::AppState>> for OptionalAuthContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::common::AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuthContext(
            state
                .auth_pipeline
                .authenticate_and_authorize_optional(parts)
                .await,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(roles: Vec<Role>, permissions: Vec<String>) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            roles,
            permissions,
        }
    }

    #[test]
    fn wildcard_satisfies_any_permission() {
        let context = ctx(vec![Role::Principal], vec![WILDCARD.to_string()]);
        assert!(
            context
                .require_permission(&["grades:write"], PermissionMode::Any)
                .is_ok()
        );
    }

    #[test]
    fn permission_mode_all_requires_every_code() {
        let context = ctx(
            vec![Role::Teacher],
            vec!["attendance:write".to_string(), "grades:read".to_string()],
        );
        assert!(
            context
                .require_permission(
                    &["attendance:write", "grades:read"],
                    PermissionMode::All
                )
                .is_ok()
        );
        assert!(
            context
                .require_permission(
                    &["attendance:write", "grades:write"],
                    PermissionMode::All
                )
                .is_err()
        );
    }

    #[test]
    fn ownership_bypassed_by_elevated_role() {
        let context = ctx(vec![Role::Teacher], vec![]);
        assert!(context.require_ownership(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn ownership_enforced_for_non_elevated_role() {
        let context = ctx(vec![Role::Student], vec![]);
        assert!(context.require_ownership(Uuid::new_v4()).is_err());
        assert!(context.require_ownership(context.user_id).is_ok());
    }

    #[test]
    fn role_requirement_checks_membership() {
        let context = ctx(vec![Role::Registrar], vec![]);
        assert!(context.require_role(&[Role::Registrar, Role::Principal]).is_ok());
        assert!(context.require_role(&[Role::Teacher]).is_err());
    }

    #[test]
    fn platform_owner_and_principal_bypass_role_requirement() {
        let owner = ctx(vec![Role::PlatformOwner], vec![WILDCARD.to_string()]);
        assert!(owner.require_role(&[Role::Teacher]).is_ok());
        let principal = ctx(vec![Role::Principal], vec![WILDCARD.to_string()]);
        assert!(principal.require_role(&[Role::Student]).is_ok());
    }
}
