//! Represents one logged instance of a mailbox being consumed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mailbox capacity granted by pooled tags.
pub const POOLED_MAX_USES: i64 = 3;
/// Mailbox capacity granted by exclusive tags.
pub const EXCLUSIVE_MAX_USES: i64 = 1;

/// Sharing class of a usage record.
///
/// Writing a tagged record re-derives the parent mailbox's `max_uses`:
/// exclusive tags collapse the quota to a single use, pooled tags restore
/// the shared quota of three.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UsageTag {
    #[default]
    PooledUnwarranted,
    PooledWarranted,
    ExclusiveUnwarranted,
    ExclusiveWarranted,
}

impl UsageTag {
    pub fn is_exclusive(self) -> bool {
        matches!(
            self,
            UsageTag::ExclusiveUnwarranted | UsageTag::ExclusiveWarranted
        )
    }

    /// Mailbox capacity implied by this tag.
    pub fn max_uses(self) -> i64 {
        if self.is_exclusive() {
            EXCLUSIVE_MAX_USES
        } else {
            POOLED_MAX_USES
        }
    }
}

/// One instance of a mailbox being handed to a user.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    /// Unique within the parent mailbox's usage list.
    pub id: Uuid,

    /// Who used the mailbox. Non-empty, trimmed.
    pub user_name: String,

    /// When the mailbox was used. Manual entries may backdate this.
    pub used_at: DateTime<Utc>,

    /// Verification code retrieved or recorded for this use, if any.
    pub verify_code: Option<String>,

    /// Sharing class. Records written by the automatic path carry no tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<UsageTag>,
}
