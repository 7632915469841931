//! Service layer: the record store, the verification-code extractor, and
//! the upstream mail-retrieval client.

pub mod code_extractor;
pub mod mail_client;
pub mod mailbox_store;
