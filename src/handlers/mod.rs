//! HTTP handlers, one module per resource.

pub mod health_handlers;
pub mod mailbox_handlers;
pub mod usage_handlers;
pub mod verify_code_handlers;

use serde::Serialize;

/// Body returned by mutations that have nothing else to report.
#[derive(Debug, Serialize)]
pub struct Acknowledged {
    pub success: bool,
}

impl Acknowledged {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
