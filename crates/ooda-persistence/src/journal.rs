//! Trade outcome journal.
//!
//! Implements `PortfolioMemory` by appending each outcome to a daily JSON
//! Lines file and flushing immediately, so an outcome handed over in
//! LEARNING is on disk before the next cycle starts.

use std::path::{Path, PathBuf};

use ooda_core::{BoxFuture, CoreError, PortfolioMemory, TradeOutcome};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::PersistenceResult;
use crate::writer::{read_records, JsonLinesWriter};

const OUTCOME_PREFIX: &str = "outcomes";

/// Outcome journal backed by JSON Lines files.
pub struct OutcomeJournal {
    dir: PathBuf,
    writer: Mutex<JsonLinesWriter<TradeOutcome>>,
}

impl OutcomeJournal {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            writer: Mutex::new(JsonLinesWriter::new(&dir, OUTCOME_PREFIX, 1)),
            dir,
        }
    }

    /// Every outcome recorded so far, across days.
    pub fn load_all(&self) -> PersistenceResult<Vec<TradeOutcome>> {
        read_records(&self.dir, OUTCOME_PREFIX)
    }

    fn append(&self, outcome: TradeOutcome) -> PersistenceResult<()> {
        let mut writer = self.writer.lock();
        writer.add_record(outcome)?;
        writer.flush()
    }
}

impl PortfolioMemory for OutcomeJournal {
    fn record_outcome(&self, outcome: TradeOutcome) -> BoxFuture<'_, ooda_core::Result<()>> {
        Box::pin(async move {
            debug!(
                decision_id = %outcome.decision_id,
                asset_pair = %outcome.asset_pair,
                source = ?outcome.source,
                "Journaling trade outcome"
            );
            self.append(outcome)
                .map_err(|e| CoreError::Transient(format!("outcome journal: {e}")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ooda_core::{AssetPair, DecisionId, ExitReason, OutcomeSource, Price, Size, TradeAction};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn outcome(id: &str, source: OutcomeSource) -> TradeOutcome {
        TradeOutcome {
            decision_id: DecisionId::new(id),
            asset_pair: AssetPair::new("ETH-USD").unwrap(),
            action: TradeAction::Buy,
            position_size: Size::new(dec!(1.5)),
            entry_price: Price::new(dec!(3000)),
            source,
            opened_at: Utc::now(),
            exit_price: Some(Price::new(dec!(3100))),
            realized_pnl: Some(Price::new(dec!(150))),
            closed_at: Some(Utc::now()),
            exit_reason: Some(ExitReason::TakeProfit),
        }
    }

    #[tokio::test]
    async fn test_record_outcome_is_durable() {
        let dir = TempDir::new().unwrap();
        let journal = OutcomeJournal::new(dir.path());

        journal
            .record_outcome(outcome("d1", OutcomeSource::Live))
            .await
            .unwrap();
        journal
            .record_outcome(outcome("d2", OutcomeSource::Recovery))
            .await
            .unwrap();

        // A second journal on the same dir sees both without any close()
        let reopened = OutcomeJournal::new(dir.path());
        let all = reopened.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].decision_id, DecisionId::new("d1"));
        assert_eq!(all[1].source, OutcomeSource::Recovery);
        assert_eq!(all[0].exit_reason, Some(ExitReason::TakeProfit));
    }
}
