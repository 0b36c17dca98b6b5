pub mod common;
pub mod completions;
pub mod config;
pub mod session;
pub mod sync;
pub mod tag;
