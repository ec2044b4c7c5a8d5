use itertools::Itertools;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::report::Cell;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Csv => "text/csv; charset=utf-8",
            OutputFormat::Json => "application/json",
        }
    }
}

/// `<stem>-(<player>).<ext>`, the name the artifact is saved under.
pub fn artifact_name(source_stem: &str, player: &str, format: OutputFormat) -> String {
    format!("{source_stem}-({player}).{}", format.extension())
}

pub fn render(ledger: &Ledger, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Csv => to_csv(ledger),
        OutputFormat::Json => Ok(serde_json::to_vec_pretty(ledger)?),
    }
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Text(text) => text.clone(),
        Cell::Count(count) => count.to_string(),
        Cell::Chips(chips) => chips.to_string(),
        Cell::Forfeit(chips) => format!("({chips})"),
        Cell::Seconds(seconds) => format!("{seconds}s"),
    }
}

/// Summary section first, then the full hand trace.
pub fn to_csv(ledger: &Ledger) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    let players = &ledger.summary.players;
    writer.write_record(["Summary"])?;
    writer.write_record(
        std::iter::once("Player:".to_string()).chain(players.iter().map(|p| p.player.clone())),
    )?;
    writer.write_record(
        std::iter::once("Number of Wins:".to_string())
            .chain(players.iter().map(|p| p.wins.to_string())),
    )?;
    writer.write_record(
        std::iter::once("Average Win Size:".to_string())
            .chain(players.iter().map(|p| p.average_win.to_string())),
    )?;

    writer.write_record(["All Hands"])?;
    for row in &ledger.detail.rows {
        // Trailing empty cells are dropped; readers pad short rows.
        let end = row.cells.keys().next_back().map_or(1, |col| col + 1);
        writer.write_record((0..end).map(|col| row.cell(col).map(cell_text).unwrap_or_default()))?;
    }

    writer
        .into_inner()
        .map_err(|err| LedgerError::Csv(err.into_error().into()))
}

/// One-line run summary for the terminal.
pub fn summary_line(ledger: &Ledger, color: bool) -> String {
    let winners = ledger
        .summary
        .players
        .iter()
        .map(|p| format!("{} {}x avg {:.1}", p.player, p.wins, p.average_win))
        .join(", ");
    let winners = if winners.is_empty() {
        "no winners".to_string()
    } else {
        winners
    };

    if color {
        format!(
            "{} {} {} {}",
            "Summary".bold().magenta(),
            ledger.hands.bold().cyan(),
            "hands".bold().white(),
            winners.green()
        )
    } else {
        format!("Summary: hands={}, {}", ledger.hands, winners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_name_follows_source_and_player() {
        assert_eq!(
            artifact_name("poker_now_log", "Alice", OutputFormat::Csv),
            "poker_now_log-(Alice).csv"
        );
        assert_eq!(
            artifact_name("night", "Bob", OutputFormat::Json),
            "night-(Bob).json"
        );
    }

    #[test]
    fn cells_render_like_the_sheet() {
        assert_eq!(cell_text(&Cell::Forfeit(10)), "(10)");
        assert_eq!(cell_text(&Cell::Seconds(4)), "4s");
        assert_eq!(cell_text(&Cell::Chips(-5)), "-5");
    }
}
