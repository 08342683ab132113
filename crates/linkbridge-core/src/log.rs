//! Hash-chained execution log
//!
//! Each entry commits to its predecessor's hash, so removing, reordering or
//! editing an entry breaks the chain and [`ExecutionLog::verify_integrity`]
//! names the first broken sequence number. The log is owned by a single
//! controller run and needs no locking.

use crate::error::PipelineError;
use crate::state::PipelineState;
use crate::types::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One audited transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the log, from 0
    pub sequence: u64,
    /// Job identifier
    pub job_id: JobId,
    /// When the transition was applied
    pub timestamp: DateTime<Utc>,
    /// State left
    pub from: PipelineState,
    /// State entered
    pub to: PipelineState,
    /// Snapshot of the data behind the decision
    pub decision: serde_json::Value,
    /// Hash of the previous entry, zeros for the first
    pub prev_hash: [u8; 32],
    /// Hash of this entry
    pub hash: [u8; 32],
}

impl LogEntry {
    /// Hex form of [`LogEntry::hash`]
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Append-only audit log for one job
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    /// Empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transition and return the new entry
    pub fn append(
        &mut self,
        job_id: JobId,
        from: PipelineState,
        to: PipelineState,
        decision: serde_json::Value,
    ) -> &LogEntry {
        let prev_hash = self.entries.last().map_or([0u8; 32], |e| e.hash);
        let mut entry = LogEntry {
            sequence: self.entries.len() as u64,
            job_id,
            timestamp: Utc::now(),
            from,
            to,
            decision,
            prev_hash,
            hash: [0u8; 32],
        };
        entry.hash = compute_hash(&entry);
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Entries in append order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hand the entries over to a job result
    #[must_use]
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }

    /// Check the chain
    ///
    /// # Errors
    /// Returns [`PipelineError::LogIntegrity`] at the first entry whose
    /// sequence, back-link or own hash does not match
    pub fn verify_integrity(&self) -> Result<(), PipelineError> {
        verify_entries(&self.entries)
    }
}

/// Check a chain that was handed out in a [`crate::JobResult`]
///
/// # Errors
/// Returns [`PipelineError::LogIntegrity`] at the first broken entry
pub fn verify_entries(entries: &[LogEntry]) -> Result<(), PipelineError> {
    let mut prev = [0u8; 32];
    for (index, entry) in entries.iter().enumerate() {
        if entry.sequence != index as u64
            || entry.prev_hash != prev
            || entry.hash != compute_hash(entry)
        {
            return Err(PipelineError::LogIntegrity {
                sequence: index as u64,
            });
        }
        prev = entry.hash;
    }
    Ok(())
}

fn compute_hash(entry: &LogEntry) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(entry.sequence.to_le_bytes());
    hasher.update(entry.job_id.0.to_bytes());
    hasher.update(entry.timestamp.timestamp_micros().to_le_bytes());
    hasher.update(entry.from.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(entry.to.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(entry.decision.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(entry.prev_hash);
    hasher.finalize().into()
}
