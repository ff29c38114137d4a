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

//! A lock-free, per-key TTL cache backing both the permission cache (§4.3)
//! and the tenant resolver's short-TTL cache (§4.4). Built on `dashmap`
//! instead of the `Arc<RwLock<HashMap<_, _>>>` pattern the pool manager
//! uses for its tenant registry, because this structure is read on every
//! authorized request while the pool manager's map is only written at
//! tenant-creation time and read rarely by comparison.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

pub struct TtlCache<K, V> {
    map: DashMap<K, Entry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            map: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.map.get(key) {
            if entry.expires_at > Instant::now() {
                return Some(entry.value.clone());
            }
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.map.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.map.remove(key);
    }

    /// Used by the permission cache when a role assignment changes: every
    /// key scoped to the given tenant (regardless of user) is dropped.
    pub fn invalidate_matching(&self, predicate: impl Fn(&K) -> bool) {
        self.map.retain(|k, _| !predicate(k));
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_after_ttl() {
        let cache: TtlCache<String, i32> = TtlCache::new(Duration::from_millis(1));
        cache.insert("k".to_string(), 1);
        assert_eq!(cache.get(&"k".to_string()), Some(1));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"k".to_string()), None);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache: TtlCache<String, i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("k".to_string(), 1);
        cache.invalidate(&"k".to_string());
        assert_eq!(cache.get(&"k".to_string()), None);
    }

    #[test]
    fn invalidate_matching_scopes_by_predicate() {
        let cache: TtlCache<String, i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("roles:u1:t1".to_string(), 1);
        cache.insert("roles:u2:t1".to_string(), 2);
        cache.insert("roles:u1:t2".to_string(), 3);
        cache.invalidate_matching(|k| k.ends_with(":t1"));
        assert_eq!(cache.get(&"roles:u1:t1".to_string()), None);
        assert_eq!(cache.get(&"roles:u1:t2".to_string()), Some(3));
    }
}
