//! Append-only log of committed turns.
//!
//! The history is the single source of narrative truth. Records are only
//! appended by the turn scheduler (see [`crate::scheduler`]) and the whole
//! log is only ever cleared or replaced wholesale.

use socialsim_types::TurnRecord;

/// Ordered sequence of committed turn records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLog {
    records: Vec<TurnRecord>,
}

impl HistoryLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append a committed record.
    pub(crate) fn append(&mut self, record: TurnRecord) {
        self.records.push(record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no turn has been committed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in round order.
    pub fn records(&self) -> &[TurnRecord] {
        &self.records
    }

    /// The most recent record.
    pub fn last(&self) -> Option<&TurnRecord> {
        self.records.last()
    }

    /// Records from position `index` onward. Past the end yields nothing.
    pub fn since(&self, index: usize) -> Vec<TurnRecord> {
        self.records
            .get(index..)
            .map(<[TurnRecord]>::to_vec)
            .unwrap_or_default()
    }

    /// The trailing `count` records, oldest first.
    pub fn recent(&self, count: usize) -> &[TurnRecord] {
        let start = self.records.len().saturating_sub(count);
        self.records.get(start..).unwrap_or(&[])
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    pub(crate) fn replace(&mut self, records: Vec<TurnRecord>) {
        self.records = records;
    }
}
