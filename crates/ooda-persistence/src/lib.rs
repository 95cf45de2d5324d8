//! Local persistence for the OODA trading agent.
//!
//! - [`JsonLinesWriter`]: append-only, daily-rotated `.jsonl` files
//! - [`OutcomeJournal`]: `PortfolioMemory` backed by a JSON Lines writer
//! - [`SnapshotStore`]: whole-value JSON snapshots written atomically

pub mod error;
pub mod journal;
pub mod snapshot;
pub mod writer;

pub use error::{PersistenceError, PersistenceResult};
pub use journal::OutcomeJournal;
pub use snapshot::SnapshotStore;
pub use writer::{read_records, JsonLinesWriter};
