//! Shared state handed to every handler.

use crate::services::{mail_client::MailClient, mailbox_store::MailboxStore};
use std::path::PathBuf;

/// Cloneable bundle of the service layer: the record store, the upstream
/// mail client, and the directory the snapshot lives in (used by the
/// readiness probe's disk check).
#[derive(Clone)]
pub struct AppState {
    pub store: MailboxStore,
    pub mail: MailClient,
    pub data_dir: PathBuf,
}
