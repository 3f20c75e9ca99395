//! Data models for the merge pipeline
//!
//! This module contains all data structures that flow through the pipeline:
//! raw source rows, contact directory records, and the flattened output rows.

use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::MergeError;
use crate::identity::collapse_name_fragments;

/// A message as supplied by a message source adapter.
///
/// Rows are immutable once read. The adapter is responsible for filtering
/// structurally invalid rows (null ids, null timestamps); the pipeline only
/// applies content-level filtering such as skipping blank bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    /// Source-assigned message identifier
    pub message_id: i64,
    /// Message body, absent for attachment-only rows
    pub text: Option<String>,
    /// Timestamp when the message was sent
    pub date: NaiveDateTime,
    /// True if the message was sent by the backup owner
    pub is_from_me: bool,
    /// Identifier of the chat/thread the message belongs to
    pub thread_id: String,
    /// Raw sender identifier (phone, email or platform id); absent on
    /// outbound rows in the relational backup format
    pub sender: Option<String>,
}

/// A contact directory record prior to indexing.
///
/// Name fragments are ordered first, last, organization; the remaining
/// fields are passthrough metadata carried onto the address book table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Raw identifier (phone number or email) this record is filed under
    pub identifier: String,
    /// First name fragment
    pub first: Option<String>,
    /// Last name fragment
    pub last: Option<String>,
    /// Organization name fragment
    pub organization: Option<String>,
    /// Contact's birthday
    pub birthday: Option<NaiveDateTime>,
    /// When the record was created in the address book
    pub created: Option<NaiveDateTime>,
    /// When the record was last modified in the address book
    pub modified: Option<NaiveDateTime>,
}

impl ContactRecord {
    /// Collapse the ordered name fragments into a single display name.
    ///
    /// May be empty when the record carries no fragments at all; the empty
    /// string is preserved downstream rather than replaced by a placeholder.
    #[must_use]
    pub fn full_name(&self) -> String {
        collapse_name_fragments([
            self.first.as_deref(),
            self.last.as_deref(),
            self.organization.as_deref(),
        ])
    }
}

/// One flattened output row: a message paired with the display name of its
/// effective sender or recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMessage {
    /// Message body
    pub text: String,
    /// Timestamp when the message was sent
    pub date: NaiveDateTime,
    /// True if the message was sent by the backup owner
    pub is_from_me: bool,
    /// Display name of the counterparty this row is about
    pub full_name: String,
}

/// One row of the output address book table.
///
/// Carries the collapsed display name plus whatever metadata the contact
/// directory supplied. Identifiers with no directory match appear with the
/// identifier as the name and no metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressBookEntry {
    /// Collapsed display name
    pub full_name: String,
    /// Contact's birthday, if the directory supplied one
    pub birthday: Option<NaiveDateTime>,
    /// Record creation timestamp, if the directory supplied one
    pub created: Option<NaiveDateTime>,
    /// Record modification timestamp, if the directory supplied one
    pub modified: Option<NaiveDateTime>,
}

impl AddressBookEntry {
    /// Entry for an identifier that matched no directory record.
    #[must_use]
    pub const fn unresolved(identifier: String) -> Self {
        Self {
            full_name: identifier,
            birthday: None,
            created: None,
            modified: None,
        }
    }
}

impl From<&ContactRecord> for AddressBookEntry {
    fn from(record: &ContactRecord) -> Self {
        Self {
            full_name: record.full_name(),
            birthday: record.birthday,
            created: record.created,
            modified: record.modified,
        }
    }
}

/// How the contact index resolves two records whose identifiers normalize
/// to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Keep the record indexed first, ignore later collisions
    KeepFirst,
    /// Keep the record indexed last (the source's historical behavior)
    KeepLast,
    /// Fail the run on the first collision
    Reject,
}

impl DuplicatePolicy {
    /// Stable name used in configuration files and on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::KeepFirst => "keep-first",
            Self::KeepLast => "keep-last",
            Self::Reject => "reject",
        }
    }
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        Self::KeepLast
    }
}

impl FromStr for DuplicatePolicy {
    type Err = MergeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "keep-first" => Ok(Self::KeepFirst),
            "keep-last" => Ok(Self::KeepLast),
            "reject" => Ok(Self::Reject),
            other => Err(MergeError::InvalidConfig(format!(
                "unknown duplicate policy: {other}. Must be one of: keep-first, keep-last, reject"
            ))),
        }
    }
}

/// Caller-owned context for one pipeline run.
///
/// There is no process-wide data source; every run receives its own options
/// and adapters, so independent runs can coexist.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Identifier of the backup owner, excluded from participant sets
    pub owner: String,
    /// Duplicate handling for the contact index
    pub policy: DuplicatePolicy,
}

/// Data-quality counters accumulated during a run.
///
/// These are normal, countable outcomes rather than failures; a caller can
/// audit source quality without the run aborting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Rows dropped because their (message, thread, identifier) key was
    /// already emitted
    pub duplicate_rows_dropped: usize,
    /// Emitted rows whose identifier matched no directory record
    pub unresolved_identifiers: usize,
    /// Directory records whose normalized identifier collided with an
    /// earlier record
    pub index_collisions: usize,
    /// Messages excluded because their body was absent or all-whitespace
    pub empty_messages_skipped: usize,
}

/// The two fully materialized output tables plus the audit report.
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutput {
    /// One row per (message, effective recipient), sorted by timestamp
    pub messages: Vec<ResolvedMessage>,
    /// Address book: directory records plus unmatched identifiers
    pub contacts: Vec<AddressBookEntry>,
    /// Data-quality counters for this run
    pub report: MergeReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_policy_round_trips_through_names() {
        for policy in [
            DuplicatePolicy::KeepFirst,
            DuplicatePolicy::KeepLast,
            DuplicatePolicy::Reject,
        ] {
            assert_eq!(policy.name().parse::<DuplicatePolicy>().ok(), Some(policy));
        }
    }

    #[test]
    fn unknown_policy_name_is_rejected() {
        assert!("merge".parse::<DuplicatePolicy>().is_err());
    }

    #[test]
    fn unresolved_entry_has_no_metadata() {
        let entry = AddressBookEntry::unresolved("4155550100".to_string());
        assert_eq!(entry.full_name, "4155550100");
        assert!(entry.birthday.is_none());
        assert!(entry.created.is_none());
        assert!(entry.modified.is_none());
    }
}
