//! In-memory share link store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_entity::share::ShareLink;

use crate::store::ShareLinkStore;

/// Share links keyed by token.
#[derive(Debug, Default)]
pub struct MemoryShareLinkStore {
    links: DashMap<String, ShareLink>,
}

impl MemoryShareLinkStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShareLinkStore for MemoryShareLinkStore {
    async fn insert(&self, link: &ShareLink) -> AppResult<()> {
        match self.links.entry(link.token.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict(
                "unique constraint 'share_links_token_key' violated",
            )),
            Entry::Vacant(slot) => {
                slot.insert(link.clone());
                Ok(())
            }
        }
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<ShareLink>> {
        Ok(self.links.get(token).map(|l| l.value().clone()))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<ShareLink>> {
        let mut links: Vec<ShareLink> = self
            .links
            .iter()
            .filter(|l| l.owner_id == owner_id)
            .map(|l| l.value().clone())
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(links)
    }

    async fn record_access(&self, token: &str, now: DateTime<Utc>) -> AppResult<Option<ShareLink>> {
        Ok(self
            .links
            .get_mut(token)
            .filter(|link| link.grants_access_at(now))
            .map(|mut link| {
                link.access_count += 1;
                link.value().clone()
            }))
    }

    async fn deactivate(&self, token: &str) -> AppResult<bool> {
        Ok(match self.links.get_mut(token) {
            Some(mut link) if link.is_active => {
                link.is_active = false;
                true
            }
            _ => false,
        })
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut changed = 0;
        for mut link in self.links.iter_mut() {
            if link.is_active && link.is_expired_at(now) {
                link.is_active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn link(token: &str, expires_at: DateTime<Utc>) -> ShareLink {
        ShareLink {
            id: Uuid::new_v4(),
            token: token.into(),
            file_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            created_at: Utc::now(),
            expires_at,
            is_active: true,
            access_count: 0,
        }
    }

    #[tokio::test]
    async fn test_duplicate_token_is_conflict() {
        let store = MemoryShareLinkStore::new();
        let exp = Utc::now() + Duration::hours(1);
        store.insert(&link("abc", exp)).await.unwrap();
        assert!(store.insert(&link("abc", exp)).await.is_err());
    }

    #[tokio::test]
    async fn test_deactivate_expired_only_touches_lapsed_links() {
        let store = MemoryShareLinkStore::new();
        let now = Utc::now();
        store.insert(&link("old", now - Duration::seconds(1))).await.unwrap();
        store.insert(&link("new", now + Duration::hours(1))).await.unwrap();

        assert_eq!(store.deactivate_expired(now).await.unwrap(), 1);
        assert!(!store.find_by_token("old").await.unwrap().unwrap().is_active);
        assert!(store.find_by_token("new").await.unwrap().unwrap().is_active);
        assert_eq!(store.deactivate_expired(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_access_never_reactivates_a_deactivated_link() {
        let store = MemoryShareLinkStore::new();
        let now = Utc::now();
        store.insert(&link("abc", now + Duration::hours(1))).await.unwrap();

        let counted = store.record_access("abc", now).await.unwrap().unwrap();
        assert_eq!(counted.access_count, 1);

        assert!(store.deactivate("abc").await.unwrap());
        assert!(!store.deactivate("abc").await.unwrap());
        assert!(store.record_access("abc", now).await.unwrap().is_none());

        let stored = store.find_by_token("abc").await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.access_count, 1);
    }

    #[tokio::test]
    async fn test_access_refused_at_expiry() {
        let store = MemoryShareLinkStore::new();
        let now = Utc::now();
        store.insert(&link("abc", now)).await.unwrap();
        assert!(store.record_access("abc", now).await.unwrap().is_none());
        assert!(store.record_access("missing", now).await.unwrap().is_none());
    }
}
