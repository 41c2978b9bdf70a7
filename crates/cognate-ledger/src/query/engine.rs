use cognate_types::LedgerEntry;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, QueryError};
use crate::index::{intersect_sorted, union_sorted, IndexKey};
use crate::query::filter::{LedgerFilter, Matcher};
use crate::query::page::{page_count, CursorToken, Page, Pagination, QueryPlan, QueryWarning};
use crate::query::sort::{Sort, SortKey};
use crate::store::{LedgerState, LedgerStore};

/// Answers filter/sort/paginate queries against a snapshot of the store.
///
/// The store's read lock is held only while candidates are chosen and their
/// handles cloned. Matching, sorting, and slicing run unlocked.
pub struct QueryEngine<'a> {
    store: &'a LedgerStore,
    config: &'a LedgerConfig,
}

enum Start {
    Page(u32),
    After(Option<CursorToken>),
}

struct Snapshot {
    candidates: Vec<LedgerEntry>,
    plan: QueryPlan,
    warnings: Vec<QueryWarning>,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a LedgerStore, config: &'a LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn query(
        &self,
        filter: &LedgerFilter,
        sort: Sort,
        pagination: &Pagination,
        cancel: &CancelToken,
    ) -> Result<Page, LedgerError> {
        filter.validate()?;
        let size = pagination.size(self.config.default_page_size, self.config.max_page_size)?;
        let start = match pagination {
            Pagination::Page { page: 0, .. } => return Err(QueryError::InvalidPage.into()),
            Pagination::Page { page, .. } => Start::Page(*page),
            Pagination::Cursor { after, .. } => Start::After(
                after
                    .as_deref()
                    .map(|raw| CursorToken::decode(raw, sort))
                    .transpose()?,
            ),
        };
        cancel.check()?;

        let Snapshot {
            candidates,
            plan,
            warnings,
        } = self.snapshot(filter)?;

        let matcher = Matcher::new(filter);
        let mut matched = Vec::new();
        for (processed, entry) in candidates.into_iter().enumerate() {
            cancel.checkpoint(processed)?;
            if matcher.matches(&entry) {
                matched.push(entry);
            }
        }
        cancel.check()?;
        matched.sort_by(|a, b| sort.compare(a, b));

        let total = matched.len();
        let (offset, page) = match start {
            Start::Page(page) => {
                let offset = (page as usize - 1).saturating_mul(size);
                (offset, Some(page))
            }
            Start::After(None) => (0, None),
            Start::After(Some(token)) => {
                let offset = matched.partition_point(|e| {
                    sort.compare_positions(
                        &SortKey::of(e, sort.field),
                        e.sequence,
                        &token.key,
                        token.sequence,
                    )
                    .is_le()
                });
                (offset, None)
            }
        };

        let end = offset.saturating_add(size).min(total);
        let entries = if offset < end {
            matched[offset..end].to_vec()
        } else {
            Vec::new()
        };
        let next_cursor = match entries.last() {
            Some(last) if end < total => Some(CursorToken::after(last, sort).encode()),
            _ => None,
        };

        debug!(
            ?plan,
            total,
            returned = entries.len(),
            field = %sort.field,
            direction = %sort.direction,
            "ledger query"
        );

        Ok(Page {
            entries,
            total_count: total as u64,
            page,
            page_size: size as u32,
            total_pages: page_count(total, size),
            next_cursor,
            plan,
            warnings,
        })
    }

    /// Choose candidates under the read lock.
    fn snapshot(&self, filter: &LedgerFilter) -> Result<Snapshot, LedgerError> {
        let state = self.store.read()?;

        let groups = filter.index_groups();
        if groups.is_empty() && !filter.flagged_only {
            return Ok(full_scan(&state, Vec::new()));
        }

        if self.config.index_spot_checks {
            let keys: Vec<IndexKey> = groups.iter().flatten().cloned().collect();
            if let Err(inconsistency) = state.index.check_consistency(&state.entries, &keys) {
                return Ok(degraded(&state, inconsistency.to_string()));
            }
        }

        let mut sequences: Option<Vec<u64>> = None;
        for group in &groups {
            let buckets: Vec<&[u64]> = group.iter().map(|key| state.index.lookup(key)).collect();
            let union = union_sorted(&buckets);
            sequences = Some(match sequences {
                None => union,
                Some(acc) => intersect_sorted(&acc, &union),
            });
        }
        if filter.flagged_only {
            let flagged = state.index.flagged();
            sequences = Some(match sequences {
                None => flagged,
                Some(acc) => intersect_sorted(&acc, &flagged),
            });
        }

        let sequences = sequences.unwrap_or_default();
        let mut candidates = Vec::with_capacity(sequences.len());
        for sequence in sequences {
            match state.get(sequence) {
                Some(entry) => candidates.push(entry.clone()),
                None => {
                    let reason = format!("index references missing sequence {sequence}");
                    return Ok(degraded(&state, reason));
                }
            }
        }

        Ok(Snapshot {
            plan: QueryPlan::Indexed {
                candidates: candidates.len(),
            },
            candidates,
            warnings: Vec::new(),
        })
    }
}

fn full_scan(state: &LedgerState, warnings: Vec<QueryWarning>) -> Snapshot {
    Snapshot {
        candidates: state.entries.clone(),
        plan: QueryPlan::FullScan {
            scanned: state.entries.len(),
        },
        warnings,
    }
}

fn degraded(state: &LedgerState, reason: String) -> Snapshot {
    warn!(%reason, "ledger index inconsistent; falling back to full scan");
    full_scan(state, vec![QueryWarning::IndexInconsistent { reason }])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cognate_types::{Action, ActionCategory, ActorType, Location, Severity};

    use super::*;
    use crate::annotate::AnnotationUpdate;
    use crate::query::sort::SortField;
    use crate::recorder::EventRecorder;
    use crate::test_support::payload;

    struct Fixture {
        store: Arc<LedgerStore>,
        config: LedgerConfig,
    }

    impl Fixture {
        /// Entry `i` (1-based) is a user event when `i` is even, a cognate
        /// event otherwise; every third entry is an error in space "ops".
        fn new(count: u64) -> Self {
            let store = Arc::new(LedgerStore::new(1));
            let recorder = EventRecorder::new(Arc::clone(&store));
            for i in 1..=count {
                let mut p = payload(&format!("actor-{i}"));
                if i % 2 == 0 {
                    p.who.actor_type = ActorType::User;
                }
                if i % 3 == 0 {
                    p.what = Action::new("fail", "Job failed", ActionCategory::Error, Severity::Error);
                    p = p.in_location(Location::space("ops")).with_tag("incident");
                }
                recorder.append(p).unwrap();
            }
            Self {
                store,
                config: LedgerConfig::default(),
            }
        }

        fn run(&self, filter: &LedgerFilter, sort: Sort, pagination: &Pagination) -> Page {
            QueryEngine::new(&self.store, &self.config)
                .query(filter, sort, pagination, &CancelToken::new())
                .unwrap()
        }

        fn all(&self, filter: &LedgerFilter) -> Vec<u64> {
            self.run(filter, Sort::asc(SortField::Sequence), &Pagination::page(1, 500))
                .sequences()
        }
    }

    #[test]
    fn indexed_and_residual_predicates_combine() {
        let fx = Fixture::new(12);
        let filter = LedgerFilter::new()
            .actor_type(ActorType::User)
            .category(ActionCategory::Error);
        let page = fx.run(&filter, Sort::asc(SortField::Sequence), &Pagination::first_page());
        assert_eq!(page.sequences(), vec![6, 12]);
        assert!(matches!(page.plan, QueryPlan::Indexed { .. }));
        assert!(!page.degraded());
    }

    #[test]
    fn unindexed_filter_scans() {
        let fx = Fixture::new(6);
        let page = fx.run(
            &LedgerFilter::new().search("job FAILED"),
            Sort::default(),
            &Pagination::first_page(),
        );
        assert_eq!(page.sequences(), vec![6, 3]);
        assert_eq!(page.plan, QueryPlan::FullScan { scanned: 6 });
    }

    #[test]
    fn flagged_only_uses_flag_index() {
        let fx = Fixture::new(5);
        fx.store
            .annotate(4, |a| AnnotationUpdate::flag().apply(a))
            .unwrap();
        let filter = LedgerFilter::new().flagged_only();
        assert_eq!(fx.all(&filter), vec![4]);
        assert_eq!(fx.all(&filter.actor_type(ActorType::Cognate)), Vec::<u64>::new());
    }

    #[test]
    fn page_numbers_slice_the_sorted_set() {
        let fx = Fixture::new(7);
        let sort = Sort::asc(SortField::Sequence);
        let filter = LedgerFilter::new();
        let second = fx.run(&filter, sort, &Pagination::page(2, 3));
        assert_eq!(second.sequences(), vec![4, 5, 6]);
        assert_eq!(second.total_count, 7);
        assert_eq!(second.total_pages, 3);
        assert_eq!(second.page, Some(2));
        assert!(second.has_more());

        let past_end = fx.run(&filter, sort, &Pagination::page(9, 3));
        assert!(past_end.entries.is_empty());
        assert!(past_end.next_cursor.is_none());
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let fx = Fixture::new(3);
        let page = fx.run(
            &LedgerFilter::new().space("nowhere"),
            Sort::default(),
            &Pagination::first_page(),
        );
        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.entries.is_empty());
    }

    #[test]
    fn cursors_walk_every_entry_once() {
        let fx = Fixture::new(11);
        let sort = Sort::desc(SortField::Severity);
        let mut seen = Vec::new();
        let mut after = None;
        loop {
            let page = fx.run(&LedgerFilter::new(), sort, &Pagination::cursor(after, 4));
            seen.extend(page.sequences());
            match page.next_cursor {
                Some(next) => after = Some(next),
                None => break,
            }
        }
        // Errors (3, 6, 9) first, then the info entries, each by sequence.
        assert_eq!(seen, vec![3, 6, 9, 1, 2, 4, 5, 7, 8, 10, 11]);
    }

    #[test]
    fn cursor_survives_appends() {
        let fx = Fixture::new(4);
        let sort = Sort::asc(SortField::Sequence);
        let first = fx.run(&LedgerFilter::new(), sort, &Pagination::cursor(None, 2));
        EventRecorder::new(Arc::clone(&fx.store))
            .append(payload("late"))
            .unwrap();
        let rest = fx.run(&LedgerFilter::new(), sort, &Pagination::cursor(first.next_cursor, 10));
        assert_eq!(rest.sequences(), vec![3, 4, 5]);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let fx = Fixture::new(1);
        let engine = QueryEngine::new(&fx.store, &fx.config);
        let token = CancelToken::new();
        let filter = LedgerFilter::new();
        assert_eq!(
            engine
                .query(&filter, Sort::default(), &Pagination::page(0, 10), &token)
                .unwrap_err(),
            LedgerError::Query(QueryError::InvalidPage)
        );
        assert!(matches!(
            engine.query(
                &filter,
                Sort::default(),
                &Pagination::cursor(Some("nope".into()), 10),
                &token
            ),
            Err(LedgerError::Query(QueryError::InvalidCursor(_)))
        ));
    }

    #[test]
    fn corrupt_index_degrades_to_full_scan() {
        let fx = Fixture::new(6);
        fx.store.with_index_mut(|index| {
            index.corrupt_remove(&IndexKey::ActorType(ActorType::User), 6);
        });
        let page = fx.run(
            &LedgerFilter::new().actor_type(ActorType::User),
            Sort::asc(SortField::Sequence),
            &Pagination::first_page(),
        );
        assert_eq!(page.sequences(), vec![2, 4, 6]);
        assert!(page.degraded());
        assert!(matches!(page.plan, QueryPlan::FullScan { .. }));
    }

    #[test]
    fn tag_bucket_missing_a_middle_member_degrades() {
        let fx = Fixture::new(9);
        fx.store.with_index_mut(|index| {
            index.corrupt_remove(&IndexKey::Tag("incident".into()), 6);
        });
        let page = fx.run(
            &LedgerFilter::new().tag("incident"),
            Sort::asc(SortField::Sequence),
            &Pagination::first_page(),
        );
        assert_eq!(page.sequences(), vec![3, 6, 9]);
        assert!(page.degraded());
    }

    #[test]
    fn space_bucket_missing_a_middle_member_degrades() {
        let fx = Fixture::new(9);
        fx.store.with_index_mut(|index| {
            index.corrupt_remove(&IndexKey::Space("ops".into()), 3);
        });
        let page = fx.run(
            &LedgerFilter::new().space("ops"),
            Sort::asc(SortField::Sequence),
            &Pagination::first_page(),
        );
        assert_eq!(page.sequences(), vec![3, 6, 9]);
        assert!(page.degraded());
    }

    #[test]
    fn cancelled_query_returns_error() {
        let fx = Fixture::new(2);
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            QueryEngine::new(&fx.store, &fx.config)
                .query(&LedgerFilter::new(), Sort::default(), &Pagination::first_page(), &token)
                .unwrap_err(),
            LedgerError::Cancelled
        );
    }
}
