//! Append-only log of retrain runs.

use mirror_types::{TrainingRunId, TrainingRunRecord};

/// Ordered training history.
///
/// Ids are assigned here, on append, so they are strictly increasing in
/// append order no matter how many callers race to retrain.
#[derive(Debug, Clone)]
pub struct TrainingHistory {
    /// Records in append order (oldest first).
    records: Vec<TrainingRunRecord>,
    next_id: TrainingRunId,
}

impl TrainingHistory {
    /// Create an empty history whose first id will be 1.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            next_id: TrainingRunId::FIRST,
        }
    }

    /// The id the next appended record will receive.
    #[cfg(test)]
    pub const fn next_id(&self) -> TrainingRunId {
        self.next_id
    }

    /// Append a record built for the next id and return a copy of it.
    pub fn append<F>(&mut self, build: F) -> TrainingRunRecord
    where
        F: FnOnce(TrainingRunId) -> TrainingRunRecord,
    {
        let id = self.next_id;
        let mut record = build(id);
        record.id = id;
        // u64 exhaustion cannot happen for an in-memory log.
        self.next_id = id.next().unwrap_or(TrainingRunId(u64::MAX));
        self.records.push(record.clone());
        record
    }

    /// All records, most recent first.
    pub fn recent_first(&self) -> Vec<TrainingRunRecord> {
        self.records.iter().rev().cloned().collect()
    }

    /// The most recently appended record.
    #[cfg(test)]
    pub fn latest(&self) -> Option<&TrainingRunRecord> {
        self.records.last()
    }

    /// Number of records.
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no run has been recorded yet.
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for TrainingHistory {
    fn default() -> Self {
        Self::new()
    }
}
