//! Adapter contracts for the out-of-scope collaborators
//!
//! The pipeline reads raw rows through these traits; where the rows come
//! from (a relational device backup, an HTML chat export, a test fixture) is
//! the adapter's concern. All reads are synchronous: the pipeline performs
//! one full pass per run and materializes its output.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::models::{ContactRecord, RawMessage};

/// Supplies the raw message rows for a run.
///
/// The sequence is finite and carries no ordering guarantee; the pipeline
/// sorts its output by timestamp itself. Re-invoking yields the rows again.
pub trait MessageSource {
    /// All structurally valid message rows in the source.
    fn messages(&self) -> Result<Vec<RawMessage>>;
}

/// Supplies, per chat/thread, the set of raw participant identifiers.
pub trait ParticipantResolver {
    /// Raw identifiers of everyone in the thread, deduplicated. May include
    /// the backup owner's own identifier; the pipeline excludes it.
    fn participants_for_thread(&self, thread_id: &str) -> Result<BTreeSet<String>>;
}

/// Supplies the raw contact records to be indexed by normalized identifier.
pub trait ContactDirectory {
    /// All phone/email contact records in the directory.
    fn contacts(&self) -> Result<Vec<ContactRecord>>;
}
