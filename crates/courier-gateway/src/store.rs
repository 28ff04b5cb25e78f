//! Notification store seam.
//!
//! The persistent store is owned by another service; the gateway only
//! appends, queries and marks notifications read through this trait.

use crate::error::StoreError;
use async_trait::async_trait;
use courier_core::Notification;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

/// A notification with its read state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNotification {
    #[serde(flatten)]
    pub notification: Notification,
    pub read: bool,
}

/// Query filter for [`NotificationStore::query`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    /// Only unread notifications.
    pub unread_only: bool,

    /// Maximum number of results, newest first.
    pub limit: Option<usize>,
}

/// External notification persistence.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Append a notification for a user.
    async fn append(&self, user_id: &str, notification: Notification) -> Result<(), StoreError>;

    /// Query a user's notifications, newest first.
    async fn query(
        &self,
        user_id: &str,
        filter: NotificationFilter,
    ) -> Result<Vec<StoredNotification>, StoreError>;

    /// Mark one notification read.
    async fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<(), StoreError>;
}

/// In-process store for local runs and tests.
#[derive(Default)]
pub struct MemoryNotificationStore {
    by_user: Mutex<HashMap<String, Vec<StoredNotification>>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unread notifications for a user.
    pub fn unread_count(&self, user_id: &str) -> usize {
        self.by_user
            .lock()
            .get(user_id)
            .map_or(0, |list| list.iter().filter(|n| !n.read).count())
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn append(&self, user_id: &str, notification: Notification) -> Result<(), StoreError> {
        self.by_user
            .lock()
            .entry(user_id.to_string())
            .or_default()
            .push(StoredNotification {
                notification,
                read: false,
            });
        Ok(())
    }

    async fn query(
        &self,
        user_id: &str,
        filter: NotificationFilter,
    ) -> Result<Vec<StoredNotification>, StoreError> {
        let by_user = self.by_user.lock();
        let mut results: Vec<StoredNotification> = by_user
            .get(user_id)
            .map(|list| {
                list.iter()
                    .filter(|n| !filter.unread_only || !n.read)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        results.sort_by(|a, b| b.notification.created_at.cmp(&a.notification.created_at));
        if let Some(limit) = filter.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<(), StoreError> {
        let mut by_user = self.by_user.lock();
        let entry = by_user
            .get_mut(user_id)
            .and_then(|list| list.iter_mut().find(|n| n.notification.id == notification_id))
            .ok_or_else(|| StoreError::NotFound(notification_id.to_string()))?;
        entry.read = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_query_mark_read() {
        let store = MemoryNotificationStore::new();
        store
            .append("u1", Notification::new("n1", "Order shipped", "On its way", "order"))
            .await
            .unwrap();
        store
            .append("u1", Notification::new("n2", "Welcome", "Hello", "system"))
            .await
            .unwrap();
        assert_eq!(store.unread_count("u1"), 2);

        store.mark_read("u1", "n1").await.unwrap();
        assert_eq!(store.unread_count("u1"), 1);

        let unread = store
            .query(
                "u1",
                NotificationFilter {
                    unread_only: true,
                    limit: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].notification.id, "n2");

        let all = store.query("u1", NotificationFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_mark_read_is_scoped_to_user() {
        let store = MemoryNotificationStore::new();
        store
            .append("u1", Notification::new("n1", "t", "m", "system"))
            .await
            .unwrap();
        assert!(matches!(
            store.mark_read("u2", "n1").await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.unread_count("u1"), 1);
    }

    #[tokio::test]
    async fn test_query_limit() {
        let store = MemoryNotificationStore::new();
        for i in 0..5 {
            store
                .append("u1", Notification::new(format!("n{}", i), "t", "m", "system"))
                .await
                .unwrap();
        }
        let page = store
            .query(
                "u1",
                NotificationFilter {
                    unread_only: false,
                    limit: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_stored_notification_serializes_flat() {
        let stored = StoredNotification {
            notification: Notification::new("n1", "t", "m", "order"),
            read: true,
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], "n1");
        assert_eq!(json["type"], "order");
        assert_eq!(json["read"], true);
    }
}
