//! Represents a shared mailbox tracked for reuse under a usage quota.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::usage::{POOLED_MAX_USES, UsageRecord};

/// A shared email address handed out to users until its quota is exhausted.
///
/// The mailbox embeds its full usage history inline; `used_count` equals
/// `usages.len()` after any store operation completes.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Mailbox {
    /// Unique identifier, assigned at creation, immutable.
    pub id: Uuid,

    /// Normalized (trimmed, lowercased) address, unique case-insensitively
    /// across the pool.
    pub address: String,

    /// Count of associated usage records.
    pub used_count: i64,

    /// Capacity before the mailbox counts as exhausted. Re-derived from the
    /// tag of the most recently written usage record: exclusive tags force 1,
    /// pooled tags force 3.
    pub max_uses: i64,

    /// When this mailbox was added to the pool.
    pub created_at: DateTime<Utc>,

    /// Refreshed on any mutation of the mailbox or its usages.
    pub updated_at: DateTime<Utc>,

    /// Usage history in insertion order (not necessarily sorted by `used_at`).
    pub usages: Vec<UsageRecord>,
}

impl Mailbox {
    /// Create a fresh mailbox for an already-normalized address, with the
    /// default pooled quota and no usage history.
    pub fn new(address: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            address,
            used_count: 0,
            max_uses: POOLED_MAX_USES,
            created_at: now,
            updated_at: now,
            usages: Vec::new(),
        }
    }

    /// Whether the quota is used up and the automatic path must refuse.
    pub fn quota_exhausted(&self) -> bool {
        self.used_count >= self.max_uses
    }
}
