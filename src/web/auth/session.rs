//! In-memory cache of resolved bearer tokens.
//!
//! Avoids a round-trip to the auth provider (and two queries) on every
//! request. Entries expire after a fixed TTL and are evicted eagerly when a
//! user's roles or profile change.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use ts_rs::TS;
use uuid::Uuid;

use crate::data::models::{AppRole, Profile};

/// The authenticated caller as seen by handlers.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    /// Highest assigned role, if any.
    pub role: Option<AppRole>,
    pub profile_complete: bool,
}

impl SessionUser {
    pub fn from_profile(profile: &Profile, role: Option<AppRole>) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            name: profile.name.clone(),
            role,
            profile_complete: profile.completed_profile,
        }
    }

    pub fn has_role(&self, required: AppRole) -> bool {
        self.role.is_some_and(|role| role.grants(required))
    }

    /// The dashboard route this user should land on.
    pub fn home(&self) -> &'static str {
        home_path(self.role, self.profile_complete)
    }
}

/// Landing route: incomplete profiles first, then the most privileged dashboard.
pub fn home_path(role: Option<AppRole>, profile_complete: bool) -> &'static str {
    if !profile_complete {
        return "/complete-profile";
    }
    match role {
        Some(AppRole::Admin) => "/admin/members",
        Some(AppRole::Coordinator) => "/coordinator",
        Some(AppRole::Analyst) | None => "/analyst",
    }
}

struct CachedSession {
    user: SessionUser,
    cached_at: Instant,
}

#[derive(Clone)]
pub struct SessionCache {
    entries: Arc<DashMap<String, CachedSession>>,
    ttl: Duration,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Cached user for `token`, dropping the entry if it has expired.
    pub fn get(&self, token: &str) -> Option<SessionUser> {
        {
            // The read guard must be released before `remove` below.
            let entry = self.entries.get(token)?;
            if entry.cached_at.elapsed() < self.ttl {
                return Some(entry.user.clone());
            }
        }
        self.entries.remove(token);
        None
    }

    pub fn insert(&self, token: &str, user: SessionUser) {
        self.entries.insert(
            token.to_owned(),
            CachedSession {
                user,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn evict_token(&self, token: &str) {
        self.entries.remove(token);
    }

    /// Drop every cached token belonging to `user_id`.
    pub fn evict_user(&self, user_id: Uuid) {
        self.entries.retain(|_, session| session.user.id != user_id);
    }

    /// Remove expired entries. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, session| session.cached_at.elapsed() < ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Periodically purge expired entries until the process exits.
    pub fn spawn_purge(&self, interval: Duration) {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = cache.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, remaining = cache.len(), "Purged expired sessions");
                }
            }
        });
    }
}
