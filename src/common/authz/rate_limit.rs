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

//! §4.8: fixed-window counters per `(limiter name, key)`, backed by redis
//! when `rate_limit.redis_url` is configured and by an in-process
//! `dashmap` otherwise. The escalating "block after N window breaches"
//! latch only exists on the in-process path — see `Open Questions` in the
//! grounding ledger for why the redis path doesn't generalize it.

use crate::common::error::CoreErrorKind;
use crate::manager::app::config::{LimiterConfig, RateLimitConfig};
use dashmap::DashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Outcome of a single rate-limit check, carrying the header values the
/// handler layer surfaces on both allowed and rejected responses.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: u64,
    pub retry_after_secs: Option<u64>,
    /// Set when this denial is the durable escalation block (§4.8: `count >
    /// max` repeated `block_after` times), as opposed to an ordinary
    /// window-exceeded denial. Memory-path only — see the module doc
    /// comment.
    pub blocked: bool,
}

struct Window {
    count: u32,
    window_start: u64,
    breaches: u32,
    blocked_until: Option<u64>,
}

/// In-process fallback store, one `Window` per `(limiter, key)`.
#[derive(Default)]
struct MemoryStore {
    windows: DashMap<(String, String), Mutex<Window>>,
}

impl MemoryStore {
    fn check(&self, limiter: &str, key: &str, cfg: LimiterConfig) -> RateLimitDecision {
        let entry = self
            .windows
            .entry((limiter.to_string(), key.to_string()))
            .or_insert_with(|| {
                Mutex::new(Window {
                    count: 0,
                    window_start: now_secs(),
                    breaches: 0,
                    blocked_until: None,
                })
            });
        let mut w = entry.lock().unwrap_or_else(|e| e.into_inner());
        let now = now_secs();

        if let Some(until) = w.blocked_until
            && now < until
        {
            return RateLimitDecision {
                allowed: false,
                limit: cfg.max,
                remaining: 0,
                reset_secs: until,
                retry_after_secs: Some(until - now),
                blocked: true,
            };
        }
        w.blocked_until = None;

        if now.saturating_sub(w.window_start) >= cfg.window_secs {
            w.window_start = now;
            w.count = 0;
        }

        if w.count >= cfg.max {
            w.breaches += 1;
            let reset = w.window_start + cfg.window_secs;
            if cfg.block_after > 0 && w.breaches >= cfg.block_after {
                let until = now + cfg.block_secs;
                w.blocked_until = Some(until);
                w.breaches = 0;
                return RateLimitDecision {
                    allowed: false,
                    limit: cfg.max,
                    remaining: 0,
                    reset_secs: until,
                    retry_after_secs: Some(cfg.block_secs),
                    blocked: true,
                };
            }
            return RateLimitDecision {
                allowed: false,
                limit: cfg.max,
                remaining: 0,
                reset_secs: reset,
                retry_after_secs: Some(reset.saturating_sub(now)),
                blocked: false,
            };
        }

        w.count += 1;
        RateLimitDecision {
            allowed: true,
            limit: cfg.max,
            remaining: cfg.max - w.count,
            reset_secs: w.window_start + cfg.window_secs,
            retry_after_secs: None,
            blocked: false,
        }
    }
}

/// Durable fixed-window counter over redis: `INCR` + `EXPIRE` on first hit,
/// `GET` on the TTL to compute `reset_secs`. The escalating block latch is
/// deliberately not mirrored here — see the module doc comment.
struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    async fn check(
        &self,
        limiter: &str,
        key: &str,
        cfg: LimiterConfig,
    ) -> Result<RateLimitDecision, CoreErrorKind> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;
        let redis_key = format!("ratelimit:{limiter}:{key}");
        let count: u64 = redis::cmd("INCR")
            .arg(&redis_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;
        if count == 1 {
            let _: Result<(), redis::RedisError> = redis::cmd("EXPIRE")
                .arg(&redis_key)
                .arg(cfg.window_secs)
                .query_async(&mut conn)
                .await;
        }
        let ttl: i64 = redis::cmd("TTL")
            .arg(&redis_key)
            .query_async(&mut conn)
            .await
            .unwrap_or(cfg.window_secs as i64);
        let ttl = if ttl < 0 { cfg.window_secs as i64 } else { ttl };
        let reset_secs = now_secs() + ttl as u64;

        if count as u32 > cfg.max {
            Ok(RateLimitDecision {
                allowed: false,
                limit: cfg.max,
                remaining: 0,
                reset_secs,
                retry_after_secs: Some(ttl as u64),
                blocked: false,
            })
        } else {
            Ok(RateLimitDecision {
                allowed: true,
                limit: cfg.max,
                remaining: cfg.max - count as u32,
                reset_secs,
                retry_after_secs: None,
                blocked: false,
            })
        }
    }
}

enum Backend {
    Memory(MemoryStore),
    Redis(RedisStore),
}

pub struct RateLimiter {
    backend: Backend,
    limiters: std::collections::HashMap<String, LimiterConfig>,
}

impl RateLimiter {
    /// Connects to redis eagerly when `redis_url` is configured; falls back
    /// to the in-process store (with a warning) if the connection can't be
    /// established, so a misconfigured redis URL never takes the whole
    /// service down.
    pub async fn new(config: &RateLimitConfig) -> Self {
        let limiters_map = Self::collect_limiters(config);

        let backend = match config.redis_url() {
            Some(url) => match redis::Client::open(url) {
                Ok(client) => Backend::Redis(RedisStore { client }),
                Err(e) => {
                    tracing::warn!("rate limiter: failed to open redis client ({e}), falling back to in-process store");
                    Backend::Memory(MemoryStore::default())
                }
            },
            None => Backend::Memory(MemoryStore::default()),
        };

        Self {
            backend,
            limiters: limiters_map,
        }
    }

    fn collect_limiters(config: &RateLimitConfig) -> std::collections::HashMap<String, LimiterConfig> {
        const NAMES: &[&str] = &[
            "auth",
            "passwordReset",
            "registration",
            "import",
            "payment",
            "api",
            "tenant",
            "document",
            "export",
        ];
        NAMES
            .iter()
            .filter_map(|name| config.limiter(name).map(|c| (name.to_string(), c)))
            .collect()
    }

    /// Checks and consumes one unit of the named limiter's budget for `key`.
    /// Returns `CoreErrorKind::RateLimited`/`Blocked` packaged as `Ok(decision)`
    /// with `allowed: false` rather than as an `Err`, so the caller can still
    /// read `limit`/`remaining`/`reset_secs` to set response headers before
    /// deciding whether to reject.
    pub async fn check(
        &self,
        limiter_name: &'static str,
        key: &str,
    ) -> Result<RateLimitDecision, CoreErrorKind> {
        let cfg = match self.limiters.get(limiter_name) {
            Some(c) => *c,
            None => {
                return Ok(RateLimitDecision {
                    allowed: true,
                    limit: u32::MAX,
                    remaining: u32::MAX,
                    reset_secs: now_secs(),
                    retry_after_secs: None,
                    blocked: false,
                });
            }
        };

        match &self.backend {
            Backend::Memory(store) => Ok(store.check(limiter_name, key, cfg)),
            Backend::Redis(store) => store.check(limiter_name, key, cfg).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(max: u32, block_after: u32) -> LimiterConfig {
        LimiterConfig {
            window_secs: 3600,
            max,
            block_after,
            block_secs: 1800,
        }
    }

    #[test]
    fn memory_store_allows_then_rejects() {
        let store = MemoryStore::default();
        let limiter_cfg = cfg(2, 0);
        assert!(store.check("auth", "ip:1.2.3.4", limiter_cfg).allowed);
        assert!(store.check("auth", "ip:1.2.3.4", limiter_cfg).allowed);
        let third = store.check("auth", "ip:1.2.3.4", limiter_cfg);
        assert!(!third.allowed);
        assert!(third.retry_after_secs.is_some());
        assert!(!third.blocked, "block_after=0 disables escalation entirely");
    }

    #[test]
    fn memory_store_blocks_after_repeated_breaches() {
        let store = MemoryStore::default();
        let limiter_cfg = cfg(1, 2);
        assert!(store.check("auth", "ip:9.9.9.9", limiter_cfg).allowed);
        let breach1 = store.check("auth", "ip:9.9.9.9", limiter_cfg);
        assert!(!breach1.allowed);
        assert!(!breach1.blocked, "first breach is an ordinary denial, not yet escalated");
        let breach2 = store.check("auth", "ip:9.9.9.9", limiter_cfg);
        assert!(!breach2.allowed);
        assert!(breach2.blocked, "second breach reaches block_after and escalates");
        assert_eq!(breach2.retry_after_secs, Some(limiter_cfg.block_secs));
    }

    #[test]
    fn distinct_keys_have_independent_budgets() {
        let store = MemoryStore::default();
        let limiter_cfg = cfg(1, 0);
        assert!(store.check("auth", "ip:1.1.1.1", limiter_cfg).allowed);
        assert!(store.check("auth", "ip:2.2.2.2", limiter_cfg).allowed);
    }
}
