//! Core data models for the mailbox pool service.
//!
//! These entities represent the logical structure of shared mailboxes and
//! their usage history. They serialize naturally as JSON via `serde`, both
//! on the REST surface and inside the persisted snapshot.

pub mod mailbox;
pub mod usage;
