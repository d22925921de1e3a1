//! Domain entities served by the built-in routes
//!
//! Every entity maps itself onto storage records explicitly through
//! [`crate::storage::Model`].

mod author;
mod book;
mod log_entry;

pub use author::Author;
pub use book::Book;
pub use log_entry::{LogEntry, TIMESTAMP_FORMAT};
