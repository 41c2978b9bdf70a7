use std::sync::Mutex;

use tracing::error;

use crate::verify::BrokenLink;

/// Out-of-band notification for chain integrity failures.
///
/// A broken chain implies possible tampering, so the ledger reports it here
/// in addition to returning it to the caller.
pub trait IntegrityAlertSink: Send + Sync {
    fn chain_broken(&self, link: &BrokenLink);
}

/// Logs integrity failures at `error` level under the
/// `cognate_ledger::integrity` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAlertSink;

impl IntegrityAlertSink for TracingAlertSink {
    fn chain_broken(&self, link: &BrokenLink) {
        error!(
            target: "cognate_ledger::integrity",
            sequence = link.sequence,
            kind = ?link.kind,
            detail = %link.detail,
            "ledger chain integrity failure"
        );
    }
}

/// Keeps every alert it receives. Useful for wiring alerts into a UI or for
/// asserting on them in tests.
#[derive(Debug, Default)]
pub struct CollectingAlertSink {
    alerts: Mutex<Vec<BrokenLink>>,
}

impl CollectingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts received so far, oldest first.
    pub fn alerts(&self) -> Vec<BrokenLink> {
        match self.alerts.lock() {
            Ok(alerts) => alerts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl IntegrityAlertSink for CollectingAlertSink {
    fn chain_broken(&self, link: &BrokenLink) {
        let mut alerts = match self.alerts.lock() {
            Ok(alerts) => alerts,
            Err(poisoned) => poisoned.into_inner(),
        };
        alerts.push(link.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::BreakKind;

    #[test]
    fn collecting_sink_keeps_order() {
        let sink = CollectingAlertSink::new();
        for sequence in [4, 9] {
            sink.chain_broken(&BrokenLink {
                sequence,
                kind: BreakKind::PreviousHashMismatch,
                detail: "mismatch".into(),
            });
        }
        let seen: Vec<u64> = sink.alerts().iter().map(|l| l.sequence).collect();
        assert_eq!(seen, vec![4, 9]);
    }
}
