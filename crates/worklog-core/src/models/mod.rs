//! Data models for WorkLog

mod ids;
mod session;
mod tag;

pub use ids::{CloudId, OwnerId, SessionId, TagId};
pub use session::{round_hours, NewSession, Session, SessionInput};
pub use tag::{normalize_tag_name, NewTag, Tag};
