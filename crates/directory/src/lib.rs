//! Historical record datasets served by the directory.
//!
//! The server reads records through the [`Directory`] trait. The bundled
//! [`InMemoryDirectory`] loads JSON exports of the two tables at startup and
//! answers queries from memory.

pub mod query;
pub mod records;
pub mod source;

pub use query::{Dataset, RecordQuery, MAX_LIMIT, MAX_OFFSET, MAX_SEARCH_LENGTH};
pub use records::{CivilWarOrphan, Student};
pub use source::{Directory, InMemoryDirectory};
