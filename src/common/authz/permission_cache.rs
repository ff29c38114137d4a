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

//! §4.3: a TTL map from `(userId, tenantId)` to roles/permission codes,
//! backed by two `TtlCache` instances (see `common::cache`) rather than one
//! map of an enum-of-two-shapes, since the two key spaces
//! (`roles:userId:tenantId`, `perms:userId:tenantId`) are never looked up
//! together. A concurrent miss may issue duplicate loads from the facade;
//! that's fine, both loads are idempotent reads.

use crate::common::authz::model::Role;
use crate::common::cache::TtlCache;
use std::time::Duration;
use uuid::Uuid;

pub struct PermissionCache {
    roles: TtlCache<(Uuid, Uuid), Vec<Role>>,
    perms: TtlCache<(Uuid, Uuid), Vec<String>>,
}

impl PermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            roles: TtlCache::new(ttl),
            perms: TtlCache::new(ttl),
        }
    }

    pub fn get_roles(&self, user_id: Uuid, tenant_id: Uuid) -> Option<Vec<Role>> {
        self.roles.get(&(user_id, tenant_id))
    }

    pub fn put_roles(&self, user_id: Uuid, tenant_id: Uuid, roles: Vec<Role>) {
        self.roles.insert((user_id, tenant_id), roles);
    }

    pub fn get_permissions(&self, user_id: Uuid, tenant_id: Uuid) -> Option<Vec<String>> {
        self.perms.get(&(user_id, tenant_id))
    }

    pub fn put_permissions(&self, user_id: Uuid, tenant_id: Uuid, perms: Vec<String>) {
        self.perms.insert((user_id, tenant_id), perms);
    }

    /// Drops every cached entry. Called after a role/permission mutation;
    /// the cache has no way to know which `(user, tenant)` pairs a role
    /// change touches (a `RolePermissionMap` edit affects every user
    /// holding that role across every tenant), so a full flush is the only
    /// sound option — the alternative would be a stale-permission window
    /// after every admin edit.
    pub fn invalidate(&self) {
        self.roles.invalidate_matching(|_| true);
        self.perms.invalidate_matching(|_| true);
    }

    /// Drops every entry scoped to one tenant, used when only that
    /// tenant's role assignments changed (e.g. a single `UserRole` edit).
    pub fn invalidate_tenant(&self, tenant_id: Uuid) {
        self.roles.invalidate_matching(|(_, t)| *t == tenant_id);
        self.perms.invalidate_matching(|(_, t)| *t == tenant_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_then_invalidate_drops_everything() {
        let cache = PermissionCache::new(Duration::from_secs(60));
        let user = Uuid::new_v4();
        let tenant = Uuid::new_v4();
        cache.put_roles(user, tenant, vec![Role::Teacher]);
        cache.put_permissions(user, tenant, vec!["attendance:create".to_string()]);
        assert_eq!(cache.get_roles(user, tenant), Some(vec![Role::Teacher]));
        cache.invalidate();
        assert_eq!(cache.get_roles(user, tenant), None);
        assert_eq!(cache.get_permissions(user, tenant), None);
    }

    #[test]
    fn invalidate_tenant_is_scoped() {
        let cache = PermissionCache::new(Duration::from_secs(60));
        let user = Uuid::new_v4();
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        cache.put_roles(user, t1, vec![Role::Teacher]);
        cache.put_roles(user, t2, vec![Role::Student]);
        cache.invalidate_tenant(t1);
        assert_eq!(cache.get_roles(user, t1), None);
        assert_eq!(cache.get_roles(user, t2), Some(vec![Role::Student]));
    }
}
