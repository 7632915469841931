//! src/services/mailbox_store.rs
//!
//! MailboxStore — CRUD over the shared-mailbox collection, backed by a
//! single JSON snapshot that is read in full and rewritten in full on every
//! mutation. There is deliberately no cache and no lock here: the snapshot
//! is the single source of truth, and the deployment assumption is a single
//! writer (two racing writers are last-write-wins).

use crate::models::{
    mailbox::Mailbox,
    usage::{UsageRecord, UsageTag},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mailbox `{0}` not found")]
    MailboxNotFound(Uuid),
    #[error("usage record `{usage_id}` not found in mailbox `{mailbox_id}`")]
    UsageNotFound { mailbox_id: Uuid, usage_id: Uuid },
    #[error("mailbox `{0}` has reached its maximum number of uses")]
    QuotaExceeded(Uuid),
    #[error("snapshot at `{path}` is corrupt: {reason}")]
    SnapshotCorrupt { path: String, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The entire persisted collection: one document, each mailbox embedding
/// its usage records inline.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Snapshot {
    pub mailboxes: Vec<Mailbox>,
}

/// Counters returned by a bulk add.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkAddOutcome {
    pub added: usize,
    pub skipped: usize,
}

/// Fields for a manual usage-record addition.
#[derive(Debug, Clone)]
pub struct NewUsage {
    pub user_name: String,
    pub verify_code: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
    pub tag: UsageTag,
}

/// Partial edit of an existing usage record. `user_name` and `verify_code`
/// always overwrite; `used_at` and `tag` apply only when supplied.
#[derive(Debug, Clone)]
pub struct UsageUpdate {
    pub user_name: String,
    pub verify_code: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
    pub tag: Option<UsageTag>,
}

/// Storage backend for the snapshot. Swapping the backend (file, in-memory,
/// a real database) changes durability without touching callers.
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    async fn load(&self) -> StoreResult<Snapshot>;
    async fn persist(&self, snapshot: &Snapshot) -> StoreResult<()>;
}

/// Snapshot stored as one pretty-printed JSON file.
pub struct JsonFileBackend {
    path: PathBuf,
    strict: bool,
}

impl JsonFileBackend {
    /// `strict` decides what an unparsable snapshot does on load: surface
    /// `StoreError::SnapshotCorrupt`, or log and start from an empty
    /// collection.
    pub fn new(path: impl Into<PathBuf>, strict: bool) -> Self {
        Self {
            path: path.into(),
            strict,
        }
    }
}

#[async_trait]
impl SnapshotBackend for JsonFileBackend {
    async fn load(&self) -> StoreResult<Snapshot> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Snapshot::default());
            }
            Err(err) => return Err(StoreError::Io(err)),
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok(snapshot),
            Err(err) if self.strict => Err(StoreError::SnapshotCorrupt {
                path: self.path.display().to_string(),
                reason: err.to_string(),
            }),
            Err(err) => {
                warn!(
                    "snapshot {} is unreadable ({}), starting from an empty collection",
                    self.path.display(),
                    err
                );
                Ok(Snapshot::default())
            }
        }
    }

    async fn persist(&self, snapshot: &Snapshot) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, raw).await?;
        Ok(())
    }
}

/// In-memory snapshot. Used by tests, and usable as a throwaway backend.
#[derive(Default)]
pub struct MemoryBackend {
    snapshot: Mutex<Snapshot>,
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn load(&self) -> StoreResult<Snapshot> {
        Ok(self.snapshot.lock().expect("snapshot mutex poisoned").clone())
    }

    async fn persist(&self, snapshot: &Snapshot) -> StoreResult<()> {
        *self.snapshot.lock().expect("snapshot mutex poisoned") = snapshot.clone();
        Ok(())
    }
}

/// MailboxStore provides the CRUD surface over the pool:
/// - bulk-add addresses (normalized, deduplicated)
/// - list / point-lookup / delete mailboxes
/// - record usage automatically (quota-checked) or manually (administrative)
/// - edit and delete individual usage records
///
/// Every mutation is a full read-modify-write cycle: load the collection,
/// locate the target, apply the change, write the collection back. No
/// partial writes, no per-entity files.
#[derive(Clone)]
pub struct MailboxStore {
    backend: Arc<dyn SnapshotBackend>,
}

impl MailboxStore {
    pub fn new(backend: Arc<dyn SnapshotBackend>) -> Self {
        Self { backend }
    }

    /// All mailboxes, newest first.
    pub async fn list_mailboxes(&self) -> StoreResult<Vec<Mailbox>> {
        let mut snapshot = self.backend.load().await?;
        snapshot
            .mailboxes
            .sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(snapshot.mailboxes)
    }

    /// Normalize and insert a batch of addresses.
    ///
    /// Entries that are empty or lack an `@` after trimming are dropped
    /// without counting toward either bucket. Addresses already present,
    /// case-insensitively, in the store or earlier in the same batch count
    /// as skipped.
    pub async fn bulk_add(&self, addresses: &[String]) -> StoreResult<BulkAddOutcome> {
        let mut snapshot = self.backend.load().await?;
        let mut seen: HashSet<String> = snapshot
            .mailboxes
            .iter()
            .map(|m| m.address.to_lowercase())
            .collect();

        let mut outcome = BulkAddOutcome::default();
        for raw in addresses {
            let address = raw.trim().to_lowercase();
            if address.is_empty() || !address.contains('@') {
                continue;
            }
            if !seen.insert(address.clone()) {
                outcome.skipped += 1;
                continue;
            }
            snapshot.mailboxes.push(Mailbox::new(address));
            outcome.added += 1;
        }

        self.backend.persist(&snapshot).await?;
        Ok(outcome)
    }

    /// Point lookup. Absence is `None`, never an error.
    pub async fn get_mailbox(&self, id: Uuid) -> StoreResult<Option<Mailbox>> {
        let snapshot = self.backend.load().await?;
        Ok(snapshot.mailboxes.into_iter().find(|m| m.id == id))
    }

    /// Remove a mailbox and, with it, its entire usage history.
    /// Returns `false` when the id is unknown.
    pub async fn delete_mailbox(&self, id: Uuid) -> StoreResult<bool> {
        let mut snapshot = self.backend.load().await?;
        let before = snapshot.mailboxes.len();
        snapshot.mailboxes.retain(|m| m.id != id);
        if snapshot.mailboxes.len() == before {
            return Ok(false);
        }
        self.backend.persist(&snapshot).await?;
        Ok(true)
    }

    /// Quota-checked usage recording: the path the "hand out this mailbox"
    /// action goes through. The record carries no tag and the quota is left
    /// as-is.
    pub async fn record_automatic_usage(
        &self,
        id: Uuid,
        user_name: &str,
        verify_code: Option<String>,
    ) -> StoreResult<()> {
        let mut snapshot = self.backend.load().await?;
        let mailbox = find_mailbox(&mut snapshot, id)?;
        if mailbox.quota_exhausted() {
            return Err(StoreError::QuotaExceeded(id));
        }

        let now = Utc::now();
        mailbox.usages.push(UsageRecord {
            id: Uuid::new_v4(),
            user_name: user_name.trim().to_string(),
            used_at: now,
            verify_code,
            tag: None,
        });
        mailbox.used_count += 1;
        mailbox.updated_at = now;

        self.backend.persist(&snapshot).await?;
        Ok(())
    }

    /// Administrative usage addition: no quota check, and the tag re-derives
    /// the mailbox quota. A manual addition may leave `used_count` above
    /// `max_uses`; that state is kept visible, not rejected.
    pub async fn add_usage(&self, id: Uuid, usage: NewUsage) -> StoreResult<()> {
        let mut snapshot = self.backend.load().await?;
        let mailbox = find_mailbox(&mut snapshot, id)?;

        mailbox.max_uses = usage.tag.max_uses();
        mailbox.usages.push(UsageRecord {
            id: Uuid::new_v4(),
            user_name: usage.user_name.trim().to_string(),
            used_at: usage.used_at.unwrap_or_else(Utc::now),
            verify_code: usage.verify_code,
            tag: Some(usage.tag),
        });
        mailbox.used_count = mailbox.usages.len() as i64;
        mailbox.updated_at = Utc::now();

        self.backend.persist(&snapshot).await?;
        Ok(())
    }

    /// Partial edit of an existing record. Editing never changes
    /// `used_count`; a supplied tag re-derives the quota.
    pub async fn update_usage(
        &self,
        id: Uuid,
        usage_id: Uuid,
        update: UsageUpdate,
    ) -> StoreResult<()> {
        let mut snapshot = self.backend.load().await?;
        let mailbox = find_mailbox(&mut snapshot, id)?;

        let Some(record) = mailbox.usages.iter_mut().find(|u| u.id == usage_id) else {
            return Err(StoreError::UsageNotFound {
                mailbox_id: id,
                usage_id,
            });
        };

        record.user_name = update.user_name.trim().to_string();
        record.verify_code = update.verify_code;
        if let Some(used_at) = update.used_at {
            record.used_at = used_at;
        }
        if let Some(tag) = update.tag {
            record.tag = Some(tag);
            mailbox.max_uses = tag.max_uses();
        }
        mailbox.updated_at = Utc::now();

        self.backend.persist(&snapshot).await?;
        Ok(())
    }

    /// Remove one usage record and recompute the count.
    pub async fn delete_usage(&self, id: Uuid, usage_id: Uuid) -> StoreResult<()> {
        let mut snapshot = self.backend.load().await?;
        let mailbox = find_mailbox(&mut snapshot, id)?;

        let before = mailbox.usages.len();
        mailbox.usages.retain(|u| u.id != usage_id);
        if mailbox.usages.len() == before {
            return Err(StoreError::UsageNotFound {
                mailbox_id: id,
                usage_id,
            });
        }
        mailbox.used_count = mailbox.usages.len() as i64;
        mailbox.updated_at = Utc::now();

        self.backend.persist(&snapshot).await?;
        Ok(())
    }
}

fn find_mailbox(snapshot: &mut Snapshot, id: Uuid) -> StoreResult<&mut Mailbox> {
    snapshot
        .mailboxes
        .iter_mut()
        .find(|m| m.id == id)
        .ok_or(StoreError::MailboxNotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn memory_store() -> MailboxStore {
        MailboxStore::new(Arc::new(MemoryBackend::default()))
    }

    async fn single_mailbox_id(store: &MailboxStore) -> Uuid {
        let mailboxes = store.list_mailboxes().await.unwrap();
        assert_eq!(mailboxes.len(), 1);
        mailboxes[0].id
    }

    fn manual(user_name: &str, tag: UsageTag) -> NewUsage {
        NewUsage {
            user_name: user_name.into(),
            verify_code: None,
            used_at: None,
            tag,
        }
    }

    #[tokio::test]
    async fn bulk_add_normalizes_and_dedupes() {
        let store = memory_store();
        let outcome = store
            .bulk_add(&[
                "A@x.com".to_string(),
                "a@x.com ".to_string(),
                "b@x.com".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(outcome, BulkAddOutcome { added: 2, skipped: 1 });

        let addresses: Vec<String> = store
            .list_mailboxes()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.address)
            .collect();
        assert_eq!(addresses.len(), 2);
        assert!(addresses.contains(&"a@x.com".to_string()));
        assert!(addresses.contains(&"b@x.com".to_string()));
    }

    #[tokio::test]
    async fn bulk_add_drops_invalid_entries_uncounted() {
        let store = memory_store();
        let outcome = store
            .bulk_add(&[
                "not-an-address".to_string(),
                "   ".to_string(),
                "c@x.com".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(outcome, BulkAddOutcome { added: 1, skipped: 0 });
    }

    #[tokio::test]
    async fn bulk_add_skips_across_calls() {
        let store = memory_store();
        store.bulk_add(&["a@x.com".to_string()]).await.unwrap();
        let outcome = store
            .bulk_add(&[" A@X.COM".to_string(), "d@x.com".to_string()])
            .await
            .unwrap();
        assert_eq!(outcome, BulkAddOutcome { added: 1, skipped: 1 });
        assert_eq!(store.list_mailboxes().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let backend = Arc::new(MemoryBackend::default());
        let mut older = Mailbox::new("old@x.com".into());
        older.created_at = Utc::now() - Duration::days(1);
        let newer = Mailbox::new("new@x.com".into());
        backend
            .persist(&Snapshot {
                mailboxes: vec![older, newer],
            })
            .await
            .unwrap();

        let store = MailboxStore::new(backend);
        let mailboxes = store.list_mailboxes().await.unwrap();
        assert_eq!(mailboxes[0].address, "new@x.com");
        assert_eq!(mailboxes[1].address, "old@x.com");
    }

    #[tokio::test]
    async fn automatic_usage_increments_until_quota() {
        let store = memory_store();
        store.bulk_add(&["a@x.com".to_string()]).await.unwrap();
        let id = single_mailbox_id(&store).await;

        for n in 1..=3 {
            store
                .record_automatic_usage(id, &format!("user-{n}"), Some("123456".into()))
                .await
                .unwrap();
        }
        let mailbox = store.get_mailbox(id).await.unwrap().unwrap();
        assert_eq!(mailbox.used_count, 3);
        assert_eq!(mailbox.usages.len(), 3);
        assert!(mailbox.usages.iter().all(|u| u.tag.is_none()));

        let err = store
            .record_automatic_usage(id, "late", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded(_)));

        // refused call left the mailbox untouched
        let after = store.get_mailbox(id).await.unwrap().unwrap();
        assert_eq!(after.used_count, 3);
        assert_eq!(after.usages.len(), 3);
        assert_eq!(after.updated_at, mailbox.updated_at);
    }

    #[tokio::test]
    async fn automatic_usage_on_unknown_mailbox() {
        let store = memory_store();
        let err = store
            .record_automatic_usage(Uuid::new_v4(), "alice", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MailboxNotFound(_)));
    }

    #[tokio::test]
    async fn manual_add_skips_quota_and_rederives_capacity() {
        let store = memory_store();
        store.bulk_add(&["a@x.com".to_string()]).await.unwrap();
        let id = single_mailbox_id(&store).await;

        for n in 1..=3 {
            store
                .add_usage(id, manual(&format!("user-{n}"), UsageTag::PooledUnwarranted))
                .await
                .unwrap();
        }
        // full under the pooled quota, the manual path still appends
        store
            .add_usage(id, manual("late", UsageTag::ExclusiveWarranted))
            .await
            .unwrap();

        let mailbox = store.get_mailbox(id).await.unwrap().unwrap();
        assert_eq!(mailbox.used_count, 4);
        assert_eq!(mailbox.max_uses, 1);
        assert!(mailbox.used_count > mailbox.max_uses);
    }

    #[tokio::test]
    async fn tag_derivation_is_idempotent() {
        let store = memory_store();
        store.bulk_add(&["a@x.com".to_string()]).await.unwrap();
        let id = single_mailbox_id(&store).await;

        store
            .add_usage(id, manual("a", UsageTag::ExclusiveUnwarranted))
            .await
            .unwrap();
        store
            .add_usage(id, manual("b", UsageTag::ExclusiveUnwarranted))
            .await
            .unwrap();
        assert_eq!(store.get_mailbox(id).await.unwrap().unwrap().max_uses, 1);

        store
            .add_usage(id, manual("c", UsageTag::PooledWarranted))
            .await
            .unwrap();
        assert_eq!(store.get_mailbox(id).await.unwrap().unwrap().max_uses, 3);
    }

    #[tokio::test]
    async fn used_count_tracks_usage_list() {
        let store = memory_store();
        store.bulk_add(&["a@x.com".to_string()]).await.unwrap();
        let id = single_mailbox_id(&store).await;

        store
            .add_usage(id, manual("a", UsageTag::PooledUnwarranted))
            .await
            .unwrap();
        store
            .add_usage(id, manual("b", UsageTag::PooledUnwarranted))
            .await
            .unwrap();

        let mailbox = store.get_mailbox(id).await.unwrap().unwrap();
        assert_eq!(mailbox.used_count, mailbox.usages.len() as i64);

        store.delete_usage(id, mailbox.usages[0].id).await.unwrap();
        let mailbox = store.get_mailbox(id).await.unwrap().unwrap();
        assert_eq!(mailbox.used_count, 1);
        assert_eq!(mailbox.used_count, mailbox.usages.len() as i64);
    }

    #[tokio::test]
    async fn update_usage_applies_partial_fields() {
        let store = memory_store();
        store.bulk_add(&["a@x.com".to_string()]).await.unwrap();
        let id = single_mailbox_id(&store).await;

        let backdated = Utc::now() - Duration::days(2);
        store
            .add_usage(
                id,
                NewUsage {
                    user_name: "alice".into(),
                    verify_code: Some("111111".into()),
                    used_at: Some(backdated),
                    tag: UsageTag::PooledUnwarranted,
                },
            )
            .await
            .unwrap();
        let usage_id = store.get_mailbox(id).await.unwrap().unwrap().usages[0].id;

        store
            .update_usage(
                id,
                usage_id,
                UsageUpdate {
                    user_name: "  bob  ".into(),
                    verify_code: None,
                    used_at: None,
                    tag: Some(UsageTag::ExclusiveUnwarranted),
                },
            )
            .await
            .unwrap();

        let mailbox = store.get_mailbox(id).await.unwrap().unwrap();
        let record = &mailbox.usages[0];
        assert_eq!(record.user_name, "bob");
        assert_eq!(record.verify_code, None);
        assert_eq!(record.used_at, backdated);
        assert_eq!(record.tag, Some(UsageTag::ExclusiveUnwarranted));
        assert_eq!(mailbox.max_uses, 1);
        assert_eq!(mailbox.used_count, 1);
    }

    #[tokio::test]
    async fn update_unknown_usage() {
        let store = memory_store();
        store.bulk_add(&["a@x.com".to_string()]).await.unwrap();
        let id = single_mailbox_id(&store).await;

        let err = store
            .update_usage(
                id,
                Uuid::new_v4(),
                UsageUpdate {
                    user_name: "bob".into(),
                    verify_code: None,
                    used_at: None,
                    tag: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UsageNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_mailbox_cascades() {
        let store = memory_store();
        store.bulk_add(&["a@x.com".to_string()]).await.unwrap();
        let id = single_mailbox_id(&store).await;
        store
            .add_usage(id, manual("alice", UsageTag::PooledUnwarranted))
            .await
            .unwrap();

        assert!(store.delete_mailbox(id).await.unwrap());
        assert!(store.get_mailbox(id).await.unwrap().is_none());
        assert!(!store.delete_mailbox(id).await.unwrap());

        let err = store
            .record_automatic_usage(id, "alice", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MailboxNotFound(_)));
    }

    #[tokio::test]
    async fn delete_unknown_usage() {
        let store = memory_store();
        store.bulk_add(&["a@x.com".to_string()]).await.unwrap();
        let id = single_mailbox_id(&store).await;

        let err = store.delete_usage(id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::UsageNotFound { .. }));
    }

    #[tokio::test]
    async fn file_backend_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailboxes.json");

        let store = MailboxStore::new(Arc::new(JsonFileBackend::new(&path, false)));
        store.bulk_add(&["a@x.com".to_string()]).await.unwrap();
        let id = single_mailbox_id(&store).await;
        store
            .record_automatic_usage(id, "alice", Some("482913".into()))
            .await
            .unwrap();

        // a fresh store over the same file sees the same collection
        let reopened = MailboxStore::new(Arc::new(JsonFileBackend::new(&path, false)));
        let mailbox = reopened.get_mailbox(id).await.unwrap().unwrap();
        assert_eq!(mailbox.address, "a@x.com");
        assert_eq!(mailbox.used_count, 1);
        assert_eq!(mailbox.usages[0].verify_code.as_deref(), Some("482913"));
    }

    #[tokio::test]
    async fn file_backend_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MailboxStore::new(Arc::new(JsonFileBackend::new(
            dir.path().join("absent.json"),
            true,
        )));
        assert!(store.list_mailboxes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_recovers_as_empty_when_lenient() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailboxes.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = MailboxStore::new(Arc::new(JsonFileBackend::new(&path, false)));
        assert!(store.list_mailboxes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_errors_when_strict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailboxes.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = MailboxStore::new(Arc::new(JsonFileBackend::new(&path, true)));
        let err = store.list_mailboxes().await.unwrap_err();
        assert!(matches!(err, StoreError::SnapshotCorrupt { .. }));
    }
}
