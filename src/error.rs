use std::path::PathBuf;

/// Everything that can abort a ledger run.
///
/// Interpretation errors carry the 1-based source line of the offending
/// record, and the hand number when a hand was open, so the user can find
/// it in the original log.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("line {line}: malformed event, missing or invalid {field} in {record:?}")]
    MalformedEvent {
        line: usize,
        field: &'static str,
        record: String,
    },

    #[error("line {line}: hand {hand} has no seated player named {player:?}")]
    UnknownPlayer {
        line: usize,
        hand: u32,
        player: String,
    },

    #[error("line {line}: hand {hand} has no recorded stack for seat {seat}")]
    MissingPriorStack { line: usize, hand: u32, seat: u32 },

    #[error("line {line}: {event} event arrived before any player stacks")]
    NoActiveHand { line: usize, event: &'static str },

    #[error("cannot read log {}", path.display())]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: unreadable log record")]
    UnreadableRecord {
        line: usize,
        #[source]
        source: csv::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
