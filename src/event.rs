use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::record::LogRecord;

pub type Chips = i64;

/// Seats are numbered from 1; tables seat at most this many players.
pub const MAX_SEAT: u32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Flop,
    Turn,
    River,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Flop => "Flop",
            Phase::Turn => "Turn",
            Phase::River => "River",
        }
    }
}

/// One entry of a `Player stacks:` line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatEntry {
    pub seat: u32,
    pub name: String,
    pub stack: Chips,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEvent {
    PlayerStacks { seats: Vec<SeatEntry> },
    YourHand { hand: String },
    ShowsHand { player: String, hand: String },
    SmallBlind { player: String, total: Chips },
    BigBlind { player: String, total: Chips },
    Bet { player: String, total: Chips },
    Raise { player: String, total: Chips },
    Call { player: String, total: Chips },
    Check { player: String },
    Fold { player: String },
    Phase { phase: Phase, text: String },
    Win { player: String },
}

impl LogEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LogEvent::PlayerStacks { .. } => "player stacks",
            LogEvent::YourHand { .. } => "your hand",
            LogEvent::ShowsHand { .. } => "shows hand",
            LogEvent::SmallBlind { .. } => "small blind",
            LogEvent::BigBlind { .. } => "big blind",
            LogEvent::Bet { .. } => "bet",
            LogEvent::Raise { .. } => "raise",
            LogEvent::Call { .. } => "call",
            LogEvent::Check { .. } => "check",
            LogEvent::Fold { .. } => "fold",
            LogEvent::Phase { .. } => "phase",
            LogEvent::Win { .. } => "win",
        }
    }
}

/// A classified event together with where and when it was logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedEvent {
    pub line: usize,
    pub at: DateTime<Utc>,
    pub event: LogEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    PlayerStacks,
    YourHand,
    SmallBlind,
    BigBlind,
    Raise,
    Check,
    Bet,
    Fold,
    Call,
    Phase,
    ShowsHand,
    Win,
}

/// Checked top to bottom, first hit wins. A chat line quoting "raises"
/// therefore still lands on the earliest matching anchor.
const PRECEDENCE: [(Anchor, &[&str]); 12] = [
    (Anchor::PlayerStacks, &["Player stacks:"]),
    (Anchor::YourHand, &["Your hand is"]),
    (Anchor::SmallBlind, &["posts a small blind"]),
    (Anchor::BigBlind, &["posts a big blind"]),
    (Anchor::Raise, &["raises"]),
    (Anchor::Check, &["checks"]),
    (Anchor::Bet, &["bets"]),
    (Anchor::Fold, &["folds"]),
    (Anchor::Call, &["calls"]),
    (Anchor::Phase, &["Flop:", "Turn:", "River:"]),
    (Anchor::ShowsHand, &["shows a"]),
    (Anchor::Win, &["collected"]),
];

/// Classifies one record. `Ok(None)` means the line is not about hand
/// state and should be skipped.
pub fn classify(record: &LogRecord) -> Result<Option<TimedEvent>> {
    let message = record.message.as_str();
    let Some(anchor) = PRECEDENCE
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|phrase| message.contains(phrase)))
        .map(|(anchor, _)| *anchor)
    else {
        return Ok(None);
    };

    let fields = Fields { record };
    let event = match anchor {
        Anchor::PlayerStacks => LogEvent::PlayerStacks {
            seats: fields.seats()?,
        },
        Anchor::YourHand => LogEvent::YourHand {
            hand: fields.text_after("Your hand is ", "hand")?,
        },
        Anchor::SmallBlind => LogEvent::SmallBlind {
            player: fields.player()?,
            total: fields.amount_after("posts a small blind of ")?,
        },
        Anchor::BigBlind => LogEvent::BigBlind {
            player: fields.player()?,
            total: fields.amount_after("posts a big blind of ")?,
        },
        Anchor::Raise => LogEvent::Raise {
            player: fields.player()?,
            total: fields.amount_after("raises to ")?,
        },
        Anchor::Check => LogEvent::Check {
            player: fields.player()?,
        },
        Anchor::Bet => LogEvent::Bet {
            player: fields.player()?,
            total: fields.amount_after("bets ")?,
        },
        Anchor::Fold => LogEvent::Fold {
            player: fields.player()?,
        },
        Anchor::Call => LogEvent::Call {
            player: fields.player()?,
            total: fields.amount_after("calls ")?,
        },
        Anchor::Phase => LogEvent::Phase {
            phase: phase_of(message),
            text: message.trim().to_string(),
        },
        Anchor::ShowsHand => LogEvent::ShowsHand {
            player: fields.player()?,
            hand: fields.text_after("shows a ", "hand")?,
        },
        Anchor::Win => LogEvent::Win {
            player: fields.player()?,
        },
    };

    Ok(Some(TimedEvent {
        line: record.line,
        at: record.parsed_timestamp()?,
        event,
    }))
}

fn phase_of(message: &str) -> Phase {
    if message.contains("Flop:") {
        Phase::Flop
    } else if message.contains("Turn:") {
        Phase::Turn
    } else {
        Phase::River
    }
}

struct Fields<'a> {
    record: &'a LogRecord,
}

impl Fields<'_> {
    fn malformed(&self, field: &'static str) -> LedgerError {
        LedgerError::MalformedEvent {
            line: self.record.line,
            field,
            record: self.record.message.clone(),
        }
    }

    fn player(&self) -> Result<String> {
        quoted_name(&self.record.message).ok_or_else(|| self.malformed("player"))
    }

    fn amount_after(&self, phrase: &str) -> Result<Chips> {
        let message = self.record.message.as_str();
        let start = message.find(phrase).ok_or_else(|| self.malformed("amount"))? + phrase.len();
        let token = message[start..]
            .split(char::is_whitespace)
            .next()
            .unwrap_or_default();
        parse_chips(token).ok_or_else(|| self.malformed("amount"))
    }

    fn text_after(&self, phrase: &str, field: &'static str) -> Result<String> {
        let message = self.record.message.as_str();
        message
            .find(phrase)
            .map(|idx| message[idx + phrase.len()..].trim())
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or_else(|| self.malformed(field))
    }

    fn seats(&self) -> Result<Vec<SeatEntry>> {
        let message = self.record.message.as_str();
        let (_, list) = message
            .split_once("Player stacks:")
            .ok_or_else(|| self.malformed("player stacks"))?;

        let mut seats: Vec<SeatEntry> = Vec::new();
        for entry in list.split('|') {
            let seat = entry
                .split_once('#')
                .and_then(|(_, rest)| rest.split_once(' '))
                .and_then(|(digits, _)| digits.parse::<u32>().ok())
                .filter(|seat| (1..=MAX_SEAT).contains(seat))
                .ok_or_else(|| self.malformed("seat"))?;
            if seats.iter().any(|known| known.seat == seat) {
                return Err(self.malformed("seat"));
            }
            let name = quoted_name(entry).ok_or_else(|| self.malformed("player"))?;
            let stack = entry
                .rfind('(')
                .zip(entry.rfind(')'))
                .filter(|(open, close)| open < close)
                .and_then(|(open, close)| parse_chips(&entry[open + 1..close]))
                .ok_or_else(|| self.malformed("stack"))?;
            seats.push(SeatEntry { seat, name, stack });
        }
        Ok(seats)
    }
}

/// Text between the first `"` and the last ` @` after it.
fn quoted_name(text: &str) -> Option<String> {
    let start = text.find('"')? + 1;
    let end = start + text[start..].rfind(" @")?;
    let name = &text[start..end];
    (!name.is_empty()).then(|| name.to_string())
}

fn parse_chips(token: &str) -> Option<Chips> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const AT: &str = "2024-03-01T20:00:00.000Z";

    fn event(message: &str) -> Option<LogEvent> {
        classify(&LogRecord::new(1, message, AT))
            .expect("classifies")
            .map(|timed| timed.event)
    }

    fn failure(message: &str) -> &'static str {
        match classify(&LogRecord::new(7, message, AT)) {
            Err(LedgerError::MalformedEvent { field, line, .. }) => {
                assert_eq!(line, 7);
                field
            }
            other => panic!("expected malformed event, got {other:?}"),
        }
    }

    #[test]
    fn player_stacks_keep_list_order_and_sparse_seats() {
        let parsed = event(
            "Player stacks: #1 \"Alice @ a1\" (1000) | #4 \"Bob @ b2\" (850) | #2 \"Cy @ c3\" (40)",
        );
        let Some(LogEvent::PlayerStacks { seats }) = parsed else {
            panic!("expected player stacks");
        };
        let summary: Vec<_> = seats
            .iter()
            .map(|s| (s.seat, s.name.as_str(), s.stack))
            .collect();
        assert_eq!(
            summary,
            vec![(1, "Alice", 1000), (4, "Bob", 850), (2, "Cy", 40)]
        );
    }

    #[test]
    fn actions_carry_their_totals() {
        assert_eq!(
            event("\"Alice @ a1\" posts a small blind of 10"),
            Some(LogEvent::SmallBlind {
                player: "Alice".into(),
                total: 10
            })
        );
        assert_eq!(
            event("\"Bob @ b2\" posts a big blind of 20"),
            Some(LogEvent::BigBlind {
                player: "Bob".into(),
                total: 20
            })
        );
        assert_eq!(
            event("\"Alice @ a1\" raises to 60"),
            Some(LogEvent::Raise {
                player: "Alice".into(),
                total: 60
            })
        );
        assert_eq!(
            event("\"Bob @ b2\" calls 60 and go all in"),
            Some(LogEvent::Call {
                player: "Bob".into(),
                total: 60
            })
        );
        assert_eq!(
            event("\"Bob @ b2\" bets 35"),
            Some(LogEvent::Bet {
                player: "Bob".into(),
                total: 35
            })
        );
    }

    #[test]
    fn precedence_prefers_raise_over_later_anchors() {
        // "calls" appears too, but raise is earlier in the table.
        assert_eq!(
            event("\"Alice @ a1\" raises to 80 after Bob calls"),
            Some(LogEvent::Raise {
                player: "Alice".into(),
                total: 80
            })
        );
    }

    #[test]
    fn phases_and_reveals() {
        assert_eq!(
            event("Turn: 5♣, 8♦, K♠ [2♥]"),
            Some(LogEvent::Phase {
                phase: Phase::Turn,
                text: "Turn: 5♣, 8♦, K♠ [2♥]".into()
            })
        );
        assert_eq!(
            event("Your hand is 10♥, A♠"),
            Some(LogEvent::YourHand {
                hand: "10♥, A♠".into()
            })
        );
        assert_eq!(
            event("\"Bob @ b2\" shows a K♣, K♦."),
            Some(LogEvent::ShowsHand {
                player: "Bob".into(),
                hand: "K♣, K♦.".into()
            })
        );
        assert_eq!(
            event("\"Bob @ b2\" collected 120 from pot"),
            Some(LogEvent::Win {
                player: "Bob".into()
            })
        );
    }

    #[test]
    fn unrelated_lines_are_skipped() {
        assert_eq!(event("The admin approved the player \"Dee @ d4\""), None);
        assert_eq!(event("entry"), None);
    }

    #[test]
    fn skipped_lines_never_parse_their_timestamp() {
        let record = LogRecord::new(1, "entry", "at");
        assert!(classify(&record).expect("no error").is_none());
    }

    #[test]
    fn missing_sub_fields_are_named() {
        assert_eq!(failure("\"Alice @ a1\" raises to lots"), "amount");
        assert_eq!(failure("\"Alice @ a1\" posts a big blind of 20.50"), "amount");
        assert_eq!(failure("someone folds"), "player");
        assert_eq!(failure("Player stacks: #x \"Alice @ a1\" (1000)"), "seat");
        assert_eq!(failure("Player stacks: #1 \"Alice @ a1\" (lots)"), "stack");
        assert_eq!(
            failure("Player stacks: #1 \"Alice @ a1\" (10) | #1 \"Bob @ b2\" (10)"),
            "seat"
        );
        assert_eq!(failure("Your hand is "), "hand");
    }

    #[test]
    fn seat_numbers_outside_the_table_are_rejected() {
        assert_eq!(
            failure("Player stacks: #4000000000 \"Far @ f1\" (500)"),
            "seat"
        );
        assert_eq!(failure("Player stacks: #11 \"Far @ f1\" (500)"), "seat");
        assert_eq!(
            failure("Player stacks: #0 \"Zero @ z0\" (500) | #1 \"One @ o1\" (1000)"),
            "seat"
        );
        assert!(event("Player stacks: #10 \"Last @ l1\" (500)").is_some());
    }
}
