//! Defines routes for the mailbox pool REST surface.
//!
//! ## Structure
//! - **Mailbox endpoints**
//!   - `GET    /mailboxes` — list the pool, newest first
//!   - `POST   /mailboxes` — bulk-add addresses
//!   - `GET    /mailboxes/{id}` — one mailbox with its usage history
//!   - `DELETE /mailboxes/{id}` — remove a mailbox and its usages
//!
//! - **Usage-record endpoints**
//!   - `POST   /mailboxes/{id}/use` — quota-checked usage recording
//!   - `POST   /mailboxes/{id}/usages` — manual (administrative) addition
//!   - `PUT    /mailboxes/{id}/usages/{usage_id}` — edit one record
//!   - `DELETE /mailboxes/{id}/usages/{usage_id}` — delete one record
//!
//! - **Verification codes**
//!   - `GET    /verify-code?email=…` — pull the latest code from upstream

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        mailbox_handlers::{bulk_add_mailboxes, delete_mailbox, get_mailbox, list_mailboxes},
        usage_handlers::{add_usage, delete_usage, record_usage, update_usage},
        verify_code_handlers::get_verify_code,
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Build and return the router for the whole REST surface.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // mailbox collection
        .route("/mailboxes", get(list_mailboxes).post(bulk_add_mailboxes))
        .route("/mailboxes/{id}", get(get_mailbox).delete(delete_mailbox))
        // usage records
        .route("/mailboxes/{id}/use", post(record_usage))
        .route("/mailboxes/{id}/usages", post(add_usage))
        .route(
            "/mailboxes/{id}/usages/{usage_id}",
            put(update_usage).delete(delete_usage),
        )
        // verification codes
        .route("/verify-code", get(get_verify_code))
}
