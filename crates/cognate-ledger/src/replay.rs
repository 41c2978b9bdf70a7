//! JSON Lines import and export.
//!
//! The ledger itself keeps entries in memory; durable storage is whatever
//! holds the export. One entry per line, in sequence order, with the
//! annotation fields alongside the sealed ones.

use std::io::{BufRead, Write};

use cognate_types::LedgerEntry;
use tracing::info;

use crate::cancel::CancelToken;
use crate::error::LedgerError;
use crate::store::LedgerStore;
use crate::verify::{ChainVerifier, SequenceRange};

/// Write `entries` as JSON Lines. Returns the number of lines written.
pub fn export_jsonl<'a, W: Write>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
    mut writer: W,
) -> Result<u64, LedgerError> {
    let mut written = 0u64;
    for entry in entries {
        serde_json::to_writer(&mut writer, entry)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Parse a JSON Lines export. Blank lines are skipped; a bad line fails
/// with its 1-based line number.
pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Vec<LedgerEntry>, LedgerError> {
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line)
            .map_err(|e| LedgerError::Serialization(format!("line {}: {e}", index + 1)))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Rebuild a store from exported entries, re-verifying the whole chain and
/// rebuilding every index. A broken chain is refused with
/// [`LedgerError::ChainIntegrity`].
pub fn restore(first_sequence: u64, entries: Vec<LedgerEntry>) -> Result<LedgerStore, LedgerError> {
    let store = LedgerStore::from_entries(first_sequence, entries)?;
    let report = ChainVerifier::new(&store)
        .verify(SequenceRange::All, &CancelToken::new())?
        .into_result()?;
    info!(
        entries = report.checked,
        first = ?report.first,
        last = ?report.last,
        "restored ledger from export"
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use cognate_types::ReviewStatus;

    use super::*;
    use crate::annotate::AnnotationUpdate;
    use crate::recorder::EventRecorder;
    use crate::test_support::payload;
    use crate::traits::LedgerReader;

    fn exported(count: usize) -> (Arc<LedgerStore>, Vec<u8>) {
        let store = Arc::new(LedgerStore::new(1));
        let recorder = EventRecorder::new(Arc::clone(&store));
        for i in 0..count {
            recorder.append(payload(&format!("cog-{i}")).with_tag("export")).unwrap();
        }
        store
            .annotate(2, |a| AnnotationUpdate::review(ReviewStatus::Disputed).apply(a))
            .unwrap();
        let mut out = Vec::new();
        let all = store.read_range(1, u64::MAX).unwrap();
        assert_eq!(export_jsonl(&all, &mut out).unwrap(), count as u64);
        (store, out)
    }

    #[test]
    fn export_then_restore_preserves_entries_and_annotations() {
        let (original, bytes) = exported(4);
        let entries = read_jsonl(Cursor::new(bytes)).unwrap();
        let restored = restore(1, entries).unwrap();

        assert_eq!(restored.len().unwrap(), 4);
        for seq in 1..=4 {
            assert_eq!(
                restored.get(seq).unwrap().unwrap(),
                original.get(seq).unwrap().unwrap()
            );
        }
        let second = restored.get(2).unwrap().unwrap();
        assert_eq!(second.annotation().review_status, Some(ReviewStatus::Disputed));
    }

    #[test]
    fn bad_line_reports_line_number() {
        let (_, mut bytes) = exported(1);
        bytes.extend_from_slice(b"\n{not json}\n");
        let err = read_jsonl(Cursor::new(bytes)).unwrap_err();
        match err {
            LedgerError::Serialization(msg) => assert!(msg.starts_with("line 3:"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn tampered_export_is_refused() {
        let (_, bytes) = exported(3);
        let text = String::from_utf8(bytes).unwrap();
        let tampered = text.replacen("cog-1", "cog-X", 1);
        let entries = read_jsonl(Cursor::new(tampered)).unwrap();
        assert!(matches!(
            restore(1, entries),
            Err(LedgerError::ChainIntegrity { sequence: 2, .. })
        ));
    }
}
