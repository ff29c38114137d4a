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

//! Flat role/permission enumeration. Per the design notes this is modeled
//! as an enumeration plus a wildcard sentinel rather than a class
//! hierarchy — `Role::Principal` and a platform owner both collapse to the
//! `*` permission sentinel in the role-load step (`authz::pipeline`), not
//! scattered across individual predicates.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The sentinel permission code meaning "every permission in the current
/// tenant". Never stored in `role_permissions`; only ever produced by the
/// role-load step for `principal`/platform-owner.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    PlatformOwner,
    Principal,
    Registrar,
    Accountant,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::PlatformOwner => "platform_owner",
            Role::Principal => "principal",
            Role::Registrar => "registrar",
            Role::Accountant => "accountant",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    /// Roles that §4.7's `requireOwnership` treats as "elevated" — they
    /// pass an ownership check unconditionally, without comparing against
    /// `ownerIdFn(request)`.
    pub fn is_elevated(&self) -> bool {
        matches!(
            self,
            Role::Principal | Role::Registrar | Role::Accountant | Role::Teacher
        )
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "platform_owner" => Ok(Role::PlatformOwner),
            "principal" => Ok(Role::Principal),
            "registrar" => Ok(Role::Registrar),
            "accountant" => Ok(Role::Accountant),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Either "pass any one of these codes" or "must hold every one of these
/// codes", matching `requirePermission`'s `mode` parameter. Default is
/// `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionMode {
    #[default]
    Any,
    All,
}

/// What `requirePermission`/`requireRole`/`requireOwnership` emit on
/// failure: the requirement that wasn't met, so the HTTP layer can surface
/// a structured `PermissionDenied`.
#[derive(Debug, Clone)]
pub struct Denial {
    pub requirement: String,
}

impl Denial {
    pub fn permission(codes: &[&str], mode: PermissionMode) -> Self {
        let mode_tag = match mode {
            PermissionMode::Any => "any",
            PermissionMode::All => "all",
        };
        Self {
            requirement: format!("permission({mode_tag}): {}", codes.join(",")),
        }
    }
    pub fn role(roles: &[Role]) -> Self {
        Self {
            requirement: format!(
                "role: {}",
                roles.iter().map(Role::as_str).collect::<Vec<_>>().join(",")
            ),
        }
    }
    pub fn ownership() -> Self {
        Self {
            requirement: "ownership".to_string(),
        }
    }
}

/// `Tenant.status` (§3). Any status other than `Active` makes the tenant
/// unusable by the resolver, which maps it to `TenantInactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
    Deleted,
}

impl TenantStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, TenantStatus::Active)
    }
}

/// The minimal tenant record the resolver and the permission-load step
/// need. The richer CRUD-facing `Tenant` DTO lives in
/// `manager::tenants::model` and is built from the same row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Tenant {
    pub id: uuid::Uuid,
    pub slug: String,
    pub status: TenantStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [
            Role::PlatformOwner,
            Role::Principal,
            Role::Registrar,
            Role::Accountant,
            Role::Teacher,
            Role::Student,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn only_elevated_roles_bypass_ownership() {
        assert!(Role::Principal.is_elevated());
        assert!(Role::Registrar.is_elevated());
        assert!(Role::Accountant.is_elevated());
        assert!(Role::Teacher.is_elevated());
        assert!(!Role::Student.is_elevated());
        assert!(!Role::PlatformOwner.is_elevated());
    }
}
