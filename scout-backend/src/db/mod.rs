mod sqlite;
mod tables;

pub use sqlite::Database;
pub(crate) use sqlite::{format_timestamp, new_id, now_timestamp, parse_enum, parse_timestamp};
