use std::io::{BufRead, Write};
use std::sync::Arc;

use cognate_crypto::EntrySigner;
use cognate_types::{ActionCategory, ActorType, EntryId, LedgerEntry};
use tracing::{debug, info};

use crate::alert::{IntegrityAlertSink, TracingAlertSink};
use crate::annotate::AnnotationUpdate;
use crate::cancel::CancelToken;
use crate::checkpoint::Checkpoint;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::payload::EventPayload;
use crate::query::{LedgerFilter, Page, Pagination, QueryEngine, Sort};
use crate::recorder::EventRecorder;
use crate::replay::{export_jsonl, read_jsonl, restore};
use crate::stats::LedgerStats;
use crate::store::LedgerStore;
use crate::traits::{LedgerReader, LedgerWriter};
use crate::verify::{ChainVerifier, SequenceRange, VerificationReport};

/// The ledger service: one entry set, its indexes, and the single append
/// path, behind a cheaply cloneable handle.
///
/// Construct one per process and pass clones to every caller.
#[derive(Clone)]
pub struct Ledger {
    inner: Arc<LedgerInner>,
}

struct LedgerInner {
    config: LedgerConfig,
    store: Arc<LedgerStore>,
    recorder: EventRecorder,
    alerts: Arc<dyn IntegrityAlertSink>,
}

/// Builder for [`Ledger`].
#[derive(Default)]
pub struct LedgerBuilder {
    config: LedgerConfig,
    signer: Option<Arc<dyn EntrySigner>>,
    alerts: Option<Arc<dyn IntegrityAlertSink>>,
}

impl LedgerBuilder {
    pub fn config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    /// Install the signer used when `sign_entries` is set.
    pub fn signer(mut self, signer: Arc<dyn EntrySigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Where chain integrity failures are reported. Defaults to
    /// [`TracingAlertSink`].
    pub fn alert_sink(mut self, sink: Arc<dyn IntegrityAlertSink>) -> Self {
        self.alerts = Some(sink);
        self
    }

    /// An empty ledger.
    pub fn build(self) -> Result<Ledger, LedgerError> {
        self.config.validate()?;
        let store = LedgerStore::new(self.config.first_sequence);
        self.finish(store)
    }

    /// A ledger restored from an export, refusing a broken chain.
    pub fn restore(self, entries: Vec<LedgerEntry>) -> Result<Ledger, LedgerError> {
        self.config.validate()?;
        let store = restore(self.config.first_sequence, entries)?;
        self.finish(store)
    }

    /// [`restore`](Self::restore) from a JSON Lines reader.
    pub fn import_jsonl<R: BufRead>(self, reader: R) -> Result<Ledger, LedgerError> {
        let entries = read_jsonl(reader)?;
        self.restore(entries)
    }

    /// A ledger over exported entries whose chain has not been checked.
    /// Sequences must still be increasing and ids unique. Run
    /// [`Ledger::verify`] to audit it.
    pub fn load_unverified(self, entries: Vec<LedgerEntry>) -> Result<Ledger, LedgerError> {
        self.config.validate()?;
        let store = LedgerStore::from_entries(self.config.first_sequence, entries)?;
        self.finish(store)
    }

    fn finish(self, store: LedgerStore) -> Result<Ledger, LedgerError> {
        let store = Arc::new(store);
        let mut recorder = EventRecorder::new(Arc::clone(&store));
        match (self.config.sign_entries, self.signer) {
            (true, Some(signer)) => recorder = recorder.with_signer(signer),
            (true, None) => {
                return Err(LedgerError::Config(
                    "sign_entries is set but no signer was installed".into(),
                ))
            }
            (false, Some(signer)) => {
                debug!(key_id = signer.key_id(), "signer installed but sign_entries is off");
            }
            (false, None) => {}
        }

        Ok(Ledger {
            inner: Arc::new(LedgerInner {
                config: self.config,
                store,
                recorder,
                alerts: self.alerts.unwrap_or_else(|| Arc::new(TracingAlertSink)),
            }),
        })
    }
}

impl Ledger {
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }

    /// An empty ledger with default configuration.
    pub fn new() -> Self {
        let store = Arc::new(LedgerStore::new(LedgerConfig::default().first_sequence));
        Self {
            inner: Arc::new(LedgerInner {
                config: LedgerConfig::default(),
                recorder: EventRecorder::new(Arc::clone(&store)),
                store,
                alerts: Arc::new(TracingAlertSink),
            }),
        }
    }

    pub fn with_config(config: LedgerConfig) -> Result<Self, LedgerError> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.inner.config
    }

    fn read_token(&self) -> CancelToken {
        CancelToken::from_timeout(self.inner.config.read_timeout())
    }

    /// Validate and record an event.
    pub fn append(&self, payload: EventPayload) -> Result<LedgerEntry, LedgerError> {
        self.inner.recorder.append(payload)
    }

    /// Set the flag, review status, or notes of an entry. The sealed half
    /// and the chain are untouched.
    pub fn annotate(
        &self,
        sequence: u64,
        update: AnnotationUpdate,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = self
            .inner
            .store
            .annotate(sequence, |current| update.apply(current))?;
        debug!(sequence, flagged = entry.is_flagged(), "annotated ledger entry");
        Ok(entry)
    }

    /// Run a query under the configured read timeout.
    pub fn query(
        &self,
        filter: &LedgerFilter,
        sort: Sort,
        pagination: &Pagination,
    ) -> Result<Page, LedgerError> {
        self.query_with(filter, sort, pagination, &self.read_token())
    }

    pub fn query_with(
        &self,
        filter: &LedgerFilter,
        sort: Sort,
        pagination: &Pagination,
        cancel: &CancelToken,
    ) -> Result<Page, LedgerError> {
        QueryEngine::new(&self.inner.store, &self.inner.config).query(filter, sort, pagination, cancel)
    }

    /// Verify a range under the configured read timeout. A broken chain is
    /// returned in the report and also sent to the alert sink.
    pub fn verify(&self, range: SequenceRange) -> Result<VerificationReport, LedgerError> {
        self.verify_with(range, &self.read_token())
    }

    /// Verify from the first entry to the current tail.
    pub fn verify_all(&self) -> Result<VerificationReport, LedgerError> {
        self.verify(SequenceRange::All)
    }

    pub fn verify_with(
        &self,
        range: SequenceRange,
        cancel: &CancelToken,
    ) -> Result<VerificationReport, LedgerError> {
        let report = ChainVerifier::new(self.inner.store.as_ref()).verify(range, cancel)?;
        match report.broken_link() {
            Some(link) => self.inner.alerts.chain_broken(link),
            None => debug!(checked = report.checked, "ledger chain verified"),
        }
        Ok(report)
    }

    pub fn category_count(&self, category: ActionCategory) -> Result<u64, LedgerError> {
        Ok(self.inner.store.read()?.index.category_count(category))
    }

    pub fn actor_type_count(&self, actor_type: ActorType) -> Result<u64, LedgerError> {
        Ok(self.inner.store.read()?.index.actor_type_count(actor_type))
    }

    pub fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let state = self.inner.store.read()?;
        Ok(LedgerStats::collect(&state))
    }

    /// Commit to the entries in `range` with a Merkle root. `None` when the
    /// range holds no entries.
    pub fn checkpoint(&self, range: SequenceRange) -> Result<Option<Checkpoint>, LedgerError> {
        let Some((from, to)) = range.resolve(self.inner.store.bounds()?)? else {
            return Ok(None);
        };
        let entries = self.inner.store.read_range(from, to)?;
        let checkpoint = Checkpoint::from_entries(&entries);
        if let Some(cp) = &checkpoint {
            info!(
                from = cp.from,
                to = cp.to,
                entries = cp.entry_count,
                root = %cp.merkle_root.short_hex(),
                "ledger checkpoint"
            );
        }
        Ok(checkpoint)
    }

    /// Write every entry as JSON Lines. Returns the number written.
    pub fn export_jsonl<W: Write>(&self, writer: W) -> Result<u64, LedgerError> {
        let snapshot = self.inner.store.read()?.entries.clone();
        let written = export_jsonl(&snapshot, writer)?;
        info!(entries = written, "exported ledger");
        Ok(written)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl LedgerWriter for Ledger {
    fn append(&self, payload: EventPayload) -> Result<LedgerEntry, LedgerError> {
        Ledger::append(self, payload)
    }

    fn annotate(&self, sequence: u64, update: AnnotationUpdate) -> Result<LedgerEntry, LedgerError> {
        Ledger::annotate(self, sequence, update)
    }
}

impl LedgerReader for Ledger {
    fn first_sequence(&self) -> u64 {
        self.inner.store.first_sequence()
    }

    fn head(&self) -> Result<Option<LedgerEntry>, LedgerError> {
        self.inner.store.head()
    }

    fn get(&self, sequence: u64) -> Result<Option<LedgerEntry>, LedgerError> {
        self.inner.store.get(sequence)
    }

    fn get_by_id(&self, id: &EntryId) -> Result<Option<LedgerEntry>, LedgerError> {
        self.inner.store.get_by_id(id)
    }

    fn read_range(&self, from: u64, to: u64) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.inner.store.read_range(from, to)
    }

    fn bounds(&self) -> Result<Option<(u64, u64)>, LedgerError> {
        self.inner.store.bounds()
    }

    fn len(&self) -> Result<u64, LedgerError> {
        self.inner.store.len()
    }
}
