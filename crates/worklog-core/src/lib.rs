//! worklog-core - Core library for WorkLog
//!
//! This crate contains the models, the local `SQLite` store, and the
//! last-write-wins reconciliation with a DynamoDB remote used by the
//! `worklog` CLI.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod sync;
pub mod util;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use models::{CloudId, OwnerId, Session, SessionId, Tag, TagId};
pub use sync::{Reconciler, SyncResult};
