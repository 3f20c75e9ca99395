//! The merge engine
//!
//! Joins messages to chat participants, participants to address book
//! identities, and flattens the result into one row per (message, effective
//! recipient). Join ambiguity is detected and resolved by explicit policy;
//! data-quality incidents are counted on the report instead of failing the
//! run.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{MergeError, Result};
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::{
    AddressBookEntry, ContactRecord, DuplicatePolicy, MergeOptions, MergeOutput, MergeReport,
    RawMessage, ResolvedMessage,
};
use crate::normalize::IdentifierNormalizer;
use crate::resolve::{IdentityLookup, LookupOutcome};
use crate::sources::{ContactDirectory, MessageSource, ParticipantResolver};

/// Contact records indexed by normalized identifier.
///
/// Two raw identifiers may normalize to the same key; the duplicate policy
/// decides which record the key resolves to, and every collision is counted
/// so the ambiguity stays visible.
pub struct ContactIndex {
    entries: HashMap<String, ContactRecord>,
    collisions: usize,
}

impl ContactIndex {
    /// Index directory records under their normalized identifiers.
    ///
    /// Records whose identifier normalizes to a blank key are skipped.
    /// Returns [`MergeError::DuplicateIdentifier`] on the first collision
    /// under [`DuplicatePolicy::Reject`].
    pub fn build(
        records: Vec<ContactRecord>,
        normalizer: &IdentifierNormalizer,
        policy: DuplicatePolicy,
    ) -> Result<Self> {
        let mut entries: HashMap<String, ContactRecord> = HashMap::new();
        let mut collisions = 0;

        for record in records {
            let key = normalizer.normalize(&record.identifier);
            if key.trim().is_empty() {
                continue;
            }

            match entries.entry(key) {
                Entry::Occupied(mut occupied) => {
                    collisions += 1;
                    warn!(
                        identifier = %occupied.key(),
                        policy = policy.name(),
                        "contact directory maps two records to one normalized identifier"
                    );
                    match policy {
                        DuplicatePolicy::KeepFirst => {}
                        DuplicatePolicy::KeepLast => {
                            occupied.insert(record);
                        }
                        DuplicatePolicy::Reject => {
                            return Err(MergeError::DuplicateIdentifier(occupied.key().clone()));
                        }
                    }
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(record);
                }
            }
        }

        Ok(Self {
            entries,
            collisions,
        })
    }

    /// Look up the record filed under a normalized identifier.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&ContactRecord> {
        self.entries.get(identifier)
    }

    /// All indexed records, in no particular order.
    pub fn records(&self) -> impl Iterator<Item = &ContactRecord> {
        self.entries.values()
    }

    /// Number of indexed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the directory supplied no usable records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many records collided with an earlier key during the build.
    #[must_use]
    pub const fn collisions(&self) -> usize {
        self.collisions
    }
}

/// Runs the contact-resolution and message-merge pipeline.
///
/// The engine owns no data source: adapters and options are supplied by the
/// caller per run, so independent runs can coexist in one process. A run
/// performs one pass over the messages and returns both output tables fully
/// materialized, or fails fast; there is no partial output.
pub struct MergeEngine {
    normalizer: IdentifierNormalizer,
    options: MergeOptions,
    lookup: Option<Box<dyn IdentityLookup>>,
    metrics: MetricsCollector,
}

impl MergeEngine {
    /// Create an engine for the given caller-owned options.
    pub fn new(options: MergeOptions) -> Result<Self> {
        Ok(Self {
            normalizer: IdentifierNormalizer::new()?,
            options,
            lookup: None,
            metrics: MetricsCollector::default(),
        })
    }

    /// Attach a best-effort identity lookup applied to participant and
    /// sender identifiers before they reach the join.
    #[must_use]
    pub fn with_lookup(mut self, lookup: Box<dyn IdentityLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Run the pipeline: index contacts, join messages to participants and
    /// identities, and return the flattened tables plus the audit report.
    ///
    /// Outbound messages fan out into one row per non-self thread
    /// participant; inbound messages produce exactly one row naming the
    /// sender. Rows violating the (message, thread, identifier) composite
    /// key are dropped after the first and counted, never double-counted.
    pub fn run(
        &self,
        source: &dyn MessageSource,
        resolver: &dyn ParticipantResolver,
        directory: &dyn ContactDirectory,
    ) -> Result<MergeOutput> {
        if self.options.owner.trim().is_empty() {
            return Err(MergeError::Precondition(
                "merge options carry no owner identifier".to_string(),
            ));
        }

        let timer = OperationTimer::new("merge");
        let owner = self.normalizer.normalize(&self.options.owner);

        let index = ContactIndex::build(directory.contacts()?, &self.normalizer, self.options.policy)?;
        let mut report = MergeReport {
            index_collisions: index.collisions(),
            ..MergeReport::default()
        };

        let mut participants_by_thread: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut emitted_keys: HashSet<(i64, String, String)> = HashSet::new();
        let mut unmatched: BTreeSet<String> = BTreeSet::new();
        let mut rows: Vec<ResolvedMessage> = Vec::new();

        for message in source.messages()? {
            let Some(text) = message.text.as_deref().filter(|text| !text.trim().is_empty())
            else {
                report.empty_messages_skipped += 1;
                continue;
            };

            let sender = self.effective_sender(&message, &owner)?;
            let is_from_me = sender == owner;

            // Outbound rows fan out: a group message to K people becomes K
            // rows, one naming each recipient.
            let recipients: Vec<String> = if is_from_me {
                if !participants_by_thread.contains_key(&message.thread_id) {
                    let resolved =
                        self.resolved_participants(resolver, &message.thread_id, &owner)?;
                    participants_by_thread.insert(message.thread_id.clone(), resolved);
                }
                participants_by_thread
                    .get(&message.thread_id)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default()
            } else {
                vec![sender]
            };

            for identifier in recipients {
                let key = (message.message_id, message.thread_id.clone(), identifier.clone());
                if !emitted_keys.insert(key) {
                    report.duplicate_rows_dropped += 1;
                    continue;
                }

                let full_name = match index.get(&identifier) {
                    Some(record) => record.full_name(),
                    None => {
                        report.unresolved_identifiers += 1;
                        unmatched.insert(identifier.clone());
                        identifier
                    }
                };

                rows.push(ResolvedMessage {
                    text: text.to_string(),
                    date: message.date,
                    is_from_me,
                    full_name,
                });
            }
        }

        if report.duplicate_rows_dropped > 0 {
            warn!(
                duplicates = report.duplicate_rows_dropped,
                "(message_id, thread_id, identifier) did not form a composite key; \
                 dropped the duplicates so downstream counts stay valid"
            );
        }

        // Sources carry no ordering guarantee.
        rows.sort_by_key(|row| row.date);

        let mut contacts: Vec<AddressBookEntry> =
            index.records().map(AddressBookEntry::from).collect();
        contacts.extend(unmatched.into_iter().map(AddressBookEntry::unresolved));
        contacts.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        self.metrics.record_merge(&report, rows.len(), timer.finish());

        Ok(MergeOutput {
            messages: rows,
            contacts,
            report,
        })
    }

    /// The normalized participant set for one thread: blank identifiers
    /// dropped, lookup enrichment applied, the owner excluded.
    fn resolved_participants(
        &self,
        resolver: &dyn ParticipantResolver,
        thread_id: &str,
        owner: &str,
    ) -> Result<BTreeSet<String>> {
        let mut resolved = BTreeSet::new();
        for raw in resolver.participants_for_thread(thread_id)? {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let identifier = self.resolve_identifier(raw);
            if identifier == owner {
                continue;
            }
            resolved.insert(identifier);
        }
        Ok(resolved)
    }

    /// Sender identifier a message is attributed to. Outbound rows belong to
    /// the owner even when the source recorded no handle for them; an
    /// inbound row without a sender is a fatal precondition.
    fn effective_sender(&self, message: &RawMessage, owner: &str) -> Result<String> {
        if message.is_from_me {
            return Ok(owner.to_string());
        }

        let raw = message
            .sender
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| {
                MergeError::Precondition(format!(
                    "inbound message {} carries no sender identifier",
                    message.message_id
                ))
            })?;

        Ok(self.resolve_identifier(raw))
    }

    /// Enrich one identifier through the optional lookup, falling back to
    /// plain normalization. A resolved display name is used verbatim; it is
    /// no longer an identifier and must not be phone-normalized.
    fn resolve_identifier(&self, raw: &str) -> String {
        if let Some(lookup) = &self.lookup {
            match lookup.resolve(raw) {
                LookupOutcome::Resolved(name) => return name,
                LookupOutcome::Unresolved(reason) => {
                    debug!(
                        identifier = raw,
                        reason = ?reason,
                        "identity lookup left identifier unchanged"
                    );
                }
            }
        }
        self.normalizer.normalize(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(identifier: &str, first: &str) -> ContactRecord {
        ContactRecord {
            identifier: identifier.to_string(),
            first: Some(first.to_string()),
            last: None,
            organization: None,
            birthday: None,
            created: None,
            modified: None,
        }
    }

    fn normalizer() -> IdentifierNormalizer {
        IdentifierNormalizer::new().expect("patterns compile")
    }

    #[test]
    fn keep_last_overwrites_colliding_records() {
        let records = vec![record("14155550100", "Jane"), record("4155550100", "Janet")];
        let index = ContactIndex::build(records, &normalizer(), DuplicatePolicy::KeepLast)
            .expect("index builds");

        assert_eq!(index.len(), 1);
        assert_eq!(index.collisions(), 1);
        let winner = index.get("4155550100").expect("key present");
        assert_eq!(winner.first.as_deref(), Some("Janet"));
    }

    #[test]
    fn keep_first_retains_the_earlier_record() {
        let records = vec![record("14155550100", "Jane"), record("4155550100", "Janet")];
        let index = ContactIndex::build(records, &normalizer(), DuplicatePolicy::KeepFirst)
            .expect("index builds");

        assert_eq!(index.collisions(), 1);
        let winner = index.get("4155550100").expect("key present");
        assert_eq!(winner.first.as_deref(), Some("Jane"));
    }

    #[test]
    fn reject_fails_on_the_first_collision() {
        let records = vec![record("14155550100", "Jane"), record("4155550100", "Janet")];
        let result = ContactIndex::build(records, &normalizer(), DuplicatePolicy::Reject);

        assert!(matches!(result, Err(MergeError::DuplicateIdentifier(key)) if key == "4155550100"));
    }

    #[test]
    fn blank_identifiers_are_not_indexed() {
        let records = vec![record("  ", "Nobody"), record("a@b.com", "Ada")];
        let index = ContactIndex::build(records, &normalizer(), DuplicatePolicy::KeepLast)
            .expect("index builds");

        assert_eq!(index.len(), 1);
        assert_eq!(index.collisions(), 0);
    }
}
