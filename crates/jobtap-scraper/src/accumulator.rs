//! Cross-page deduplication keyed by listing identifier.

use jobtap_core::{JobRecord, RecordId};
use std::collections::HashMap;

/// What happened to a single record on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// First time this identifier was seen
    Added,
    /// Identifier already present; the newer record replaced it
    Replaced,
    /// Record had no usable identifier and was dropped
    Unidentified,
}

/// Counts from merging one batch of records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// New identifiers
    pub added: usize,
    /// Identifiers overwritten by a later capture
    pub replaced: usize,
    /// Records dropped for lack of an identifier
    pub unidentified: usize,
}

/// Identifier-keyed record map. Later captures replace earlier ones.
#[derive(Debug, Default, Clone)]
pub struct Accumulator {
    records: HashMap<RecordId, JobRecord>,
    unidentified: usize,
}

impl Accumulator {
    /// Create an empty accumulator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one record, replacing any record with the same identifier.
    pub fn insert(&mut self, record: JobRecord) -> Insertion {
        let Some(id) = record.id() else {
            self.unidentified += 1;
            return Insertion::Unidentified;
        };
        match self.records.insert(id, record) {
            Some(_) => Insertion::Replaced,
            None => Insertion::Added,
        }
    }

    /// Insert a batch in order.
    pub fn merge<I>(&mut self, records: I) -> MergeOutcome
    where
        I: IntoIterator<Item = JobRecord>,
    {
        let mut outcome = MergeOutcome::default();
        for record in records {
            match self.insert(record) {
                Insertion::Added => outcome.added += 1,
                Insertion::Replaced => outcome.replaced += 1,
                Insertion::Unidentified => outcome.unidentified += 1,
            }
        }
        outcome
    }

    /// Number of distinct identifiers held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been accumulated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total records dropped for lack of an identifier.
    #[must_use]
    pub fn unidentified(&self) -> usize {
        self.unidentified
    }

    /// Current record for an identifier.
    #[must_use]
    pub fn get(&self, id: &RecordId) -> Option<&JobRecord> {
        self.records.get(id)
    }

    /// Consume into the deduplicated records, in no particular order.
    #[must_use]
    pub fn finalize(self) -> Vec<JobRecord> {
        self.records.into_values().collect()
    }
}
