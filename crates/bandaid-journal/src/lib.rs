mod error;
mod journal;
mod query;
mod stats;

pub use error::JournalError;
pub use journal::{EventJournal, JournalConfig};
pub use query::{EventPage, EventQuery};
pub use stats::JournalStats;
