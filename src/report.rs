use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::{Chips, MAX_SEAT, SeatEntry};
use crate::hand::{ActionFact, ActionKind, Transition};

/// Column holding the hand number.
pub const HAND_COLUMN: usize = 0;
/// Column holding phase text.
pub const PHASE_COLUMN: usize = 1;
/// Column where the block for seat 1 starts.
pub const SEAT_BASE: usize = 2;
/// Fields per seat block.
pub const BLOCK_WIDTH: usize = 5;
pub const DEFAULT_SEAT_COLUMNS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Action = 0,
    Amount = 1,
    Stack = 2,
    Pot = 3,
    Time = 4,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Action,
        Field::Amount,
        Field::Stack,
        Field::Pot,
        Field::Time,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Field::Action => "Action",
            Field::Amount => "Amount",
            Field::Stack => "Stack",
            Field::Pot => "Pot",
            Field::Time => "Time",
        }
    }
}

/// Header rows reuse the block: name over Action, starting stack over
/// Stack, hole cards over Pot.
const NAME_FIELD: Field = Field::Action;
const CARDS_FIELD: Field = Field::Pot;

/// Seats are 1-based; the parser never yields seat 0.
pub fn column(seat: u32, field: Field) -> usize {
    SEAT_BASE + BLOCK_WIDTH * (seat as usize - 1) + field as usize
}

/// Presentation hint for a row. Renderers pick their own styling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Highlight,
    Warn,
    Success,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Text(String),
    Count(u32),
    Chips(Chips),
    /// Chips a folding player declined to put in.
    Forfeit(Chips),
    Seconds(i64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Title,
    HandHeader,
    Labels,
    Action,
    Phase,
    Win,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Row {
    pub kind: RowKind,
    pub hand: Option<u32>,
    /// Seat whose block the row is about, for action and win rows.
    pub seat: Option<u32>,
    pub category: Option<Category>,
    pub cells: BTreeMap<usize, Cell>,
}

impl Row {
    fn new(kind: RowKind, hand: Option<u32>, category: Option<Category>) -> Self {
        Self {
            kind,
            hand,
            seat: None,
            category,
            cells: BTreeMap::new(),
        }
    }

    fn put(&mut self, column: usize, cell: Cell) {
        self.cells.insert(column, cell);
    }

    pub fn cell(&self, column: usize) -> Option<&Cell> {
        self.cells.get(&column)
    }

    pub fn seat_cell(&self, seat: u32, field: Field) -> Option<&Cell> {
        self.cell(column(seat, field))
    }
}

/// The hand-by-hand trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailTable {
    pub seat_columns: u32,
    pub rows: Vec<Row>,
}

impl DetailTable {
    pub fn width(&self) -> usize {
        SEAT_BASE + BLOCK_WIDTH * self.seat_columns as usize
    }
}

/// Turns state-machine transitions into table rows.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    seat_columns: u32,
    rows: Vec<Row>,
    header_row: Option<usize>,
}

impl ReportBuilder {
    pub fn new(min_seat_columns: u32) -> Self {
        Self {
            seat_columns: min_seat_columns.clamp(1, MAX_SEAT),
            rows: Vec::new(),
            header_row: None,
        }
    }

    pub fn push(&mut self, transition: &Transition) {
        match transition {
            Transition::HandStarted { hand, seats } => self.start_hand(*hand, seats),
            Transition::HandRevealed { seat, cards, .. } => {
                if let Some(index) = self.header_row {
                    self.rows[index].put(column(*seat, CARDS_FIELD), Cell::Text(cards.clone()));
                }
            }
            Transition::Action(fact) => self.action(fact),
            Transition::PhaseChanged { hand, text, .. } => {
                let mut row = Row::new(RowKind::Phase, Some(*hand), Some(Category::Info));
                row.put(PHASE_COLUMN, Cell::Text(text.clone()));
                self.rows.push(row);
            }
            Transition::Won {
                hand, seat, pot, ..
            } => {
                self.seat_columns = self.seat_columns.max(*seat);
                let mut row = Row::new(RowKind::Win, Some(*hand), Some(Category::Success));
                row.seat = Some(*seat);
                row.put(column(*seat, Field::Action), Cell::Text("Win".to_string()));
                row.put(column(*seat, Field::Pot), Cell::Chips(*pot));
                self.rows.push(row);
            }
            Transition::Ignored => {}
        }
    }

    fn start_hand(&mut self, hand: u32, seats: &[SeatEntry]) {
        let mut header = Row::new(RowKind::HandHeader, Some(hand), Some(Category::Highlight));
        let mut labels = Row::new(RowKind::Labels, Some(hand), None);
        header.put(HAND_COLUMN, Cell::Count(hand));
        for entry in seats {
            self.seat_columns = self.seat_columns.max(entry.seat);
            header.put(column(entry.seat, NAME_FIELD), Cell::Text(entry.name.clone()));
            header.put(column(entry.seat, Field::Stack), Cell::Chips(entry.stack));
            for field in Field::ALL {
                labels.put(column(entry.seat, field), Cell::Text(field.title().to_string()));
            }
        }
        self.header_row = Some(self.rows.len());
        self.rows.push(header);
        self.rows.push(labels);
    }

    fn action(&mut self, fact: &ActionFact) {
        let category = match fact.kind {
            ActionKind::SmallBlind | ActionKind::BigBlind | ActionKind::Bet | ActionKind::Raise => {
                Some(Category::Highlight)
            }
            ActionKind::Fold => Some(Category::Warn),
            ActionKind::Call | ActionKind::Check => None,
        };
        let amount = match fact.kind {
            ActionKind::Fold => Cell::Forfeit(fact.amount),
            _ => Cell::Chips(fact.amount),
        };

        self.seat_columns = self.seat_columns.max(fact.seat);
        let mut row = Row::new(RowKind::Action, Some(fact.hand), category);
        row.seat = Some(fact.seat);
        row.put(column(fact.seat, Field::Action), Cell::Text(fact.kind.label().to_string()));
        row.put(column(fact.seat, Field::Amount), amount);
        row.put(column(fact.seat, Field::Stack), Cell::Chips(fact.stack_after));
        row.put(column(fact.seat, Field::Pot), Cell::Chips(fact.pot_after));
        if let Some(seconds) = fact.think_time {
            row.put(column(fact.seat, Field::Time), Cell::Seconds(seconds));
        }
        self.rows.push(row);
    }

    /// Prepends the column-title row and hands over the table.
    pub fn finish(self) -> DetailTable {
        let mut title = Row::new(RowKind::Title, None, None);
        title.put(HAND_COLUMN, Cell::Text("Hands".to_string()));
        title.put(PHASE_COLUMN, Cell::Text("Phase".to_string()));
        for seat in 1..=self.seat_columns {
            title.put(column(seat, Field::Action), Cell::Text(format!("Player {seat}")));
        }

        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(title);
        rows.extend(self.rows);
        DetailTable {
            seat_columns: self.seat_columns,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Phase;

    fn fact(kind: ActionKind, seat: u32, amount: Chips) -> ActionFact {
        ActionFact {
            hand: 1,
            seat,
            player: format!("P{seat}"),
            kind,
            amount,
            stack_after: 100 - amount,
            pot_after: amount,
            think_time: Some(3),
        }
    }

    fn started() -> ReportBuilder {
        let mut builder = ReportBuilder::new(DEFAULT_SEAT_COLUMNS);
        builder.push(&Transition::HandStarted {
            hand: 1,
            seats: vec![
                SeatEntry {
                    seat: 1,
                    name: "Alice".into(),
                    stack: 100,
                },
                SeatEntry {
                    seat: 3,
                    name: "Bob".into(),
                    stack: 250,
                },
            ],
        });
        builder
    }

    #[test]
    fn seat_blocks_sit_at_fixed_offsets() {
        assert_eq!(column(1, Field::Action), 2);
        assert_eq!(column(1, Field::Time), 6);
        assert_eq!(column(3, Field::Action), 12);
        assert_eq!(column(3, Field::Pot), 15);
    }

    #[test]
    fn header_row_holds_names_stacks_and_revealed_cards() {
        let mut builder = started();
        builder.push(&Transition::HandRevealed {
            hand: 1,
            seat: 3,
            cards: "A♠, A♥".into(),
        });
        let table = builder.finish();

        let header = &table.rows[1];
        assert_eq!(header.kind, RowKind::HandHeader);
        assert_eq!(header.category, Some(Category::Highlight));
        assert_eq!(header.cell(HAND_COLUMN), Some(&Cell::Count(1)));
        assert_eq!(header.seat_cell(3, Field::Action), Some(&Cell::Text("Bob".into())));
        assert_eq!(header.seat_cell(3, Field::Stack), Some(&Cell::Chips(250)));
        assert_eq!(header.seat_cell(3, Field::Pot), Some(&Cell::Text("A♠, A♥".into())));
        assert_eq!(table.rows[2].kind, RowKind::Labels);
        assert_eq!(
            table.rows[2].seat_cell(1, Field::Time),
            Some(&Cell::Text("Time".into()))
        );
    }

    #[test]
    fn rows_are_tagged_by_action() {
        let mut builder = started();
        builder.push(&Transition::Action(fact(ActionKind::BigBlind, 1, 20)));
        builder.push(&Transition::Action(fact(ActionKind::Call, 3, 20)));
        builder.push(&Transition::Action(fact(ActionKind::Fold, 1, 40)));
        builder.push(&Transition::PhaseChanged {
            hand: 1,
            phase: Phase::Flop,
            text: "Flop: [2♣, 7♦, J♠]".into(),
            pot: 40,
        });
        builder.push(&Transition::Won {
            hand: 1,
            seat: 3,
            player: "Bob".into(),
            pot: 40,
        });
        builder.push(&Transition::Ignored);
        let table = builder.finish();

        let tags: Vec<_> = table.rows[3..].iter().map(|row| row.category).collect();
        assert_eq!(
            tags,
            vec![
                Some(Category::Highlight),
                None,
                Some(Category::Warn),
                Some(Category::Info),
                Some(Category::Success),
            ]
        );
        assert_eq!(
            table.rows[5].seat_cell(1, Field::Amount),
            Some(&Cell::Forfeit(40))
        );
        assert_eq!(table.rows[4].seat_cell(3, Field::Time), Some(&Cell::Seconds(3)));
        assert_eq!(table.rows[7].seat_cell(3, Field::Pot), Some(&Cell::Chips(40)));
    }

    #[test]
    fn table_widens_for_high_seat_numbers() {
        let mut builder = ReportBuilder::new(4);
        builder.push(&Transition::HandStarted {
            hand: 1,
            seats: vec![SeatEntry {
                seat: 9,
                name: "Far".into(),
                stack: 10,
            }],
        });
        let table = builder.finish();
        assert_eq!(table.seat_columns, 9);
        assert_eq!(table.width(), 47);
        assert_eq!(
            table.rows[0].cell(column(9, Field::Action)),
            Some(&Cell::Text("Player 9".into()))
        );
    }

    #[test]
    fn requested_columns_are_capped_at_a_full_table() {
        let table = ReportBuilder::new(u32::MAX).finish();
        assert_eq!(table.seat_columns, MAX_SEAT);
        assert_eq!(table.rows[0].cells.len(), 2 + MAX_SEAT as usize);
    }

    #[test]
    fn neighbouring_seats_never_share_cells() {
        let mut builder = ReportBuilder::new(DEFAULT_SEAT_COLUMNS);
        builder.push(&Transition::HandStarted {
            hand: 1,
            seats: vec![
                SeatEntry {
                    seat: 1,
                    name: "One".into(),
                    stack: 1000,
                },
                SeatEntry {
                    seat: 2,
                    name: "Two".into(),
                    stack: 500,
                },
            ],
        });
        let table = builder.finish();
        let header = &table.rows[1];
        assert_eq!(header.seat_cell(1, Field::Action), Some(&Cell::Text("One".into())));
        assert_eq!(header.seat_cell(2, Field::Action), Some(&Cell::Text("Two".into())));
        assert_eq!(header.seat_cell(2, Field::Stack), Some(&Cell::Chips(500)));
    }
}
