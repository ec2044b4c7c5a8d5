use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::event::classify;
use crate::hand::{HandStateMachine, Transition};
use crate::record::{LogRecord, read_log, read_records};
use crate::report::{DEFAULT_SEAT_COLUMNS, DetailTable, ReportBuilder};
use crate::summary::{SummaryAggregator, SummaryTable};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Name of the player whose `Your hand is` lines belong to them.
    pub observer: String,
    /// The detail table always has at least this many seat blocks.
    #[serde(default = "default_seat_columns")]
    pub seat_columns: u32,
}

fn default_seat_columns() -> u32 {
    DEFAULT_SEAT_COLUMNS
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            observer: String::new(),
            seat_columns: DEFAULT_SEAT_COLUMNS,
        }
    }
}

impl LedgerConfig {
    pub fn for_observer(observer: impl Into<String>) -> Self {
        Self {
            observer: observer.into(),
            ..Self::default()
        }
    }
}

/// Both tables of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ledger {
    pub hands: u32,
    pub summary: SummaryTable,
    pub detail: DetailTable,
}

impl Ledger {
    /// Replays `records`, which must already be oldest first. Stops at the
    /// first error.
    pub fn build(records: &[LogRecord], config: &LedgerConfig) -> Result<Self> {
        let mut machine = HandStateMachine::new(config.observer.clone());
        let mut builder = ReportBuilder::new(config.seat_columns);
        let mut winners = SummaryAggregator::new();

        for record in records {
            let Some(event) = classify(record)? else {
                continue;
            };
            let transition = machine.apply(&event)?;
            if let Transition::Won { player, pot, .. } = &transition {
                winners.record_win(player, *pot);
            }
            builder.push(&transition);
        }

        let ledger = Self {
            hands: machine.hands_started(),
            summary: winners.finish(),
            detail: builder.finish(),
        };
        info!(
            hands = ledger.hands,
            rows = ledger.detail.rows.len(),
            winners = ledger.summary.players.len(),
            "ledger built"
        );
        Ok(ledger)
    }

    /// Reads a newest-first log from `reader` and builds the ledger.
    pub fn from_reader<R: Read>(reader: R, config: &LedgerConfig) -> Result<Self> {
        Self::build(&read_records(reader)?, config)
    }

    pub fn from_path(path: &Path, config: &LedgerConfig) -> Result<Self> {
        Self::build(&read_log(path)?, config)
    }
}
