//! Vantage storage - SQLite persistence for dispatched-snapshot history
//! and the icon-URL cache.
//!
//! All storage access is serialized through [`Database`]; callers never
//! hold a connection. History records are immutable once written.

pub mod db;
pub mod history;
pub mod icons;
mod migrations;

pub use db::Database;
pub use history::{HistoryQuery, HistoryStore};
pub use icons::{IconRecord, IconStore};
