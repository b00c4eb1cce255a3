//! Append-only, hash-linked history ledger with bounded retention.
//!
//! Entries are never reordered or edited. When the ledger is full the
//! oldest entry is evicted and its hash becomes the anchor, so the retained
//! window still verifies as one unbroken chain.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::LedgerError;
use crate::integrity::certificate::canonical_magnitude;
use crate::telemetry;
use crate::telemetry::IntegrityEvent;
use crate::token::Token;

/// What produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Snapshot of a token produced by environmental noise.
    Noise,
    /// Collapse reading of a token.
    Measurement,
    /// Record appended by a caller.
    External,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Noise => write!(f, "NOISE"),
            EntryKind::Measurement => write!(f, "MEASUREMENT"),
            EntryKind::External => write!(f, "EXTERNAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sequence: u64,
    pub kind: EntryKind,
    pub recorded_at: DateTime<Utc>,
    /// Serialized snapshot (a magnitude or a reading).
    pub snapshot: String,
    /// Digest of the token this entry claims to snapshot.
    pub subject: Option<String>,
    /// Digest of the token the operation was applied to.
    pub source: Option<String>,
    pub previous_hash: Option<String>,
    pub entry_hash: String,
}

impl HistoryEntry {
    /// Convert to log-friendly string
    pub fn to_log_string(&self) -> String {
        format!(
            "[{}] #{} {} {} (subject={:?}, source={:?})",
            self.recorded_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.sequence,
            self.kind,
            self.snapshot,
            self.subject,
            self.source
        )
    }

    /// True if this entry asserts a state for `token` that the token does
    /// not have.
    pub fn contradicts(&self, token: &Token) -> bool {
        self.subject.as_deref() == Some(token.digest())
            && self.snapshot != canonical_magnitude(token.magnitude())
    }
}

/// Fields hashed into an entry, in hashing order.
#[derive(Serialize)]
struct EntryPreimage<'a> {
    sequence: u64,
    kind: EntryKind,
    recorded_at: &'a DateTime<Utc>,
    snapshot: &'a str,
    subject: Option<&'a str>,
    source: Option<&'a str>,
    previous_hash: Option<&'a str>,
}

fn entry_hash(preimage: &EntryPreimage<'_>) -> Result<String, LedgerError> {
    let bytes =
        serde_json::to_vec(preimage).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Unwrap a freshly computed entry hash. A failure is reported now and
/// leaves an empty hash, which `verify_chain` rejects later.
fn seal(hash: Result<String, LedgerError>, sequence: u64) -> String {
    match hash {
        Ok(hash) => hash,
        Err(e) => {
            crate::integrity_log!(
                IntegrityEvent::ChainBroken,
                "entry hash unavailable",
                "sequence" => sequence.to_string().as_str(),
                "error" => e.to_string().as_str()
            );
            String::new()
        }
    }
}

/// Bounded audit log of observed states.
#[derive(Debug, Clone)]
pub struct HistoryLedger {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    next_sequence: u64,
    evicted: u64,
    /// Hash of the most recently evicted entry.
    anchor: Option<String>,
}

impl HistoryLedger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            next_sequence: 0,
            evicted: 0,
            anchor: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries appended over the ledger's lifetime, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.next_sequence
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Snapshot a noised token.
    pub(crate) fn record_noise(&mut self, input: &Token, noised: &Token) -> &HistoryEntry {
        self.append(
            EntryKind::Noise,
            canonical_magnitude(noised.magnitude()),
            Some(noised.digest().to_string()),
            Some(input.digest().to_string()),
        )
    }

    /// Record a collapse reading of `token`.
    pub(crate) fn record_measurement(&mut self, token: &Token, reading: &str) -> &HistoryEntry {
        self.append(
            EntryKind::Measurement,
            reading.to_string(),
            None,
            Some(token.digest().to_string()),
        )
    }

    /// Append a caller-supplied record.
    ///
    /// Anything may be appended; nothing may be rewritten. A record that
    /// claims a token digest with a different snapshot is kept and later
    /// surfaces as a ledger conflict during validation.
    pub fn append_external(
        &mut self,
        snapshot: impl Into<String>,
        claimed_subject: Option<String>,
    ) -> &HistoryEntry {
        self.append(EntryKind::External, snapshot.into(), claimed_subject, None)
    }

    fn append(
        &mut self,
        kind: EntryKind,
        snapshot: String,
        subject: Option<String>,
        source: Option<String>,
    ) -> &HistoryEntry {
        if self.entries.len() == self.capacity {
            if let Some(oldest) = self.entries.pop_front() {
                self.anchor = Some(oldest.entry_hash);
                self.evicted += 1;
                telemetry::record_history_evicted();
            }
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let recorded_at = Utc::now();
        let previous_hash = self
            .entries
            .back()
            .map(|e| e.entry_hash.clone())
            .or_else(|| self.anchor.clone());

        let preimage = EntryPreimage {
            sequence,
            kind,
            recorded_at: &recorded_at,
            snapshot: &snapshot,
            subject: subject.as_deref(),
            source: source.as_deref(),
            previous_hash: previous_hash.as_deref(),
        };
        let entry_hash = seal(entry_hash(&preimage), sequence);

        tracing::trace!(sequence, kind = %kind, "history entry appended");
        self.entries.push_back(HistoryEntry {
            sequence,
            kind,
            recorded_at,
            snapshot,
            subject,
            source,
            previous_hash,
            entry_hash,
        });
        telemetry::record_history_len(self.entries.len());

        let last = self.entries.len() - 1;
        &self.entries[last]
    }

    /// First retained entry contradicting `token`, if any.
    pub fn conflicting_claim(&self, token: &Token) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.contradicts(token))
    }

    /// Recompute every retained hash and check the links.
    pub fn verify_chain(&self) -> Result<(), LedgerError> {
        let mut expected_prev = self.anchor.as_deref();
        for entry in &self.entries {
            if entry.previous_hash.as_deref() != expected_prev {
                return Err(LedgerError::ChainMismatch {
                    sequence: entry.sequence,
                });
            }
            let preimage = EntryPreimage {
                sequence: entry.sequence,
                kind: entry.kind,
                recorded_at: &entry.recorded_at,
                snapshot: &entry.snapshot,
                subject: entry.subject.as_deref(),
                source: entry.source.as_deref(),
                previous_hash: entry.previous_hash.as_deref(),
            };
            if entry_hash(&preimage)? != entry.entry_hash {
                return Err(LedgerError::EntryHashMismatch {
                    sequence: entry.sequence,
                });
            }
            expected_prev = Some(entry.entry_hash.as_str());
        }
        Ok(())
    }

    /// Export retained entries as JSON (for offline audit).
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }

    #[cfg(test)]
    pub(crate) fn entry_mut(&mut self, index: usize) -> Option<&mut HistoryEntry> {
        self.entries.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TransformKind;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn token(s: &str) -> Token {
        Token::mint(Decimal::from_str(s).unwrap(), 24, TransformKind::Admitted)
    }

    #[test]
    fn test_seal_keeps_hash_and_blanks_failures() {
        assert_eq!(seal(Ok("ab12".to_string()), 0), "ab12");
        let failed = seal(Err(LedgerError::Serialization("bad preimage".to_string())), 7);
        assert!(failed.is_empty());
    }

    #[test]
    fn test_append_links_entries() {
        let mut ledger = HistoryLedger::new(8);
        ledger.append_external("a", None);
        ledger.append_external("b", None);

        let entries: Vec<_> = ledger.entries().collect();
        assert_eq!(entries[0].previous_hash, None);
        assert_eq!(entries[1].previous_hash.as_deref(), Some(entries[0].entry_hash.as_str()));
        assert!(ledger.verify_chain().is_ok());
    }

    #[test]
    fn test_ring_eviction_keeps_chain_verifiable() {
        let mut ledger = HistoryLedger::new(5);
        for i in 0..12 {
            ledger.append_external(format!("entry {}", i), None);
        }
        assert_eq!(ledger.len(), 5);
        assert_eq!(ledger.evicted(), 7);
        assert_eq!(ledger.total_recorded(), 12);
        assert_eq!(ledger.entries().next().map(|e| e.sequence), Some(7));
        assert!(ledger.verify_chain().is_ok());
    }

    #[test]
    fn test_length_never_decreases() {
        let mut ledger = HistoryLedger::new(3);
        let mut last = 0;
        for i in 0..10 {
            ledger.append_external(i.to_string(), None);
            assert!(ledger.len() >= last);
            last = ledger.len();
        }
    }

    #[test]
    fn test_tamper_detection() {
        let mut ledger = HistoryLedger::new(8);
        ledger.append_external("honest", None);
        ledger.append_external("also honest", None);

        ledger.entry_mut(0).unwrap().snapshot = "rewritten".to_string();
        assert_eq!(
            ledger.verify_chain(),
            Err(LedgerError::EntryHashMismatch { sequence: 0 })
        );
    }

    #[test]
    fn test_broken_link_detection() {
        let mut ledger = HistoryLedger::new(8);
        ledger.append_external("one", None);
        ledger.append_external("two", None);

        ledger.entry_mut(1).unwrap().previous_hash = Some("00".repeat(32));
        assert_eq!(
            ledger.verify_chain(),
            Err(LedgerError::ChainMismatch { sequence: 1 })
        );
    }

    #[test]
    fn test_conflicting_claim() {
        let mut ledger = HistoryLedger::new(8);
        let t = token("1.6180339887");

        // Honest snapshot of the token itself is not a conflict.
        ledger.append_external(canonical_magnitude(t.magnitude()), Some(t.digest().to_string()));
        assert!(ledger.conflicting_claim(&t).is_none());

        ledger.append_external("2.0", Some(t.digest().to_string()));
        let conflict = ledger.conflicting_claim(&t).unwrap();
        assert_eq!(conflict.sequence, 1);
    }

    #[test]
    fn test_noise_and_measurement_records() {
        let mut ledger = HistoryLedger::new(8);
        let t = token("1.5");
        let n = token("1.5000000000000000000000001");
        ledger.record_noise(&t, &n);
        ledger.record_measurement(&t, "0.42");

        let entries: Vec<_> = ledger.entries().collect();
        assert_eq!(entries[0].kind, EntryKind::Noise);
        assert_eq!(entries[0].subject.as_deref(), Some(n.digest()));
        assert_eq!(entries[0].source.as_deref(), Some(t.digest()));
        assert_eq!(entries[1].kind, EntryKind::Measurement);
        assert_eq!(entries[1].subject, None);
        assert!(ledger.conflicting_claim(&t).is_none());
    }

    #[test]
    fn test_export_json() {
        let mut ledger = HistoryLedger::new(4);
        ledger.append_external("snapshot", None);
        let json = ledger.export_json().unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("External"));
        assert!(json.contains("snapshot"));
    }

    #[test]
    fn test_log_string() {
        let mut ledger = HistoryLedger::new(4);
        let entry = ledger.append_external("1.25", None).to_log_string();
        assert!(entry.contains("EXTERNAL"));
        assert!(entry.contains("1.25"));
    }
}
