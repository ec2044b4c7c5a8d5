use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LedgerError, Result};
use crate::event::{Chips, LogEvent, Phase, SeatEntry, TimedEvent};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SmallBlind,
    BigBlind,
    Bet,
    Raise,
    Call,
    Check,
    Fold,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::SmallBlind => "SB",
            ActionKind::BigBlind => "BB",
            ActionKind::Bet => "Bet",
            ActionKind::Raise => "Raise",
            ActionKind::Call => "Call",
            ActionKind::Check => "Check",
            ActionKind::Fold => "Fold",
        }
    }
}

/// What one action did to the table, as reconstructed from the log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionFact {
    pub hand: u32,
    pub seat: u32,
    pub player: String,
    pub kind: ActionKind,
    /// Chips moved by this action. For a fold this is the amount the
    /// player declined to match; nothing leaves the stack.
    pub amount: Chips,
    pub stack_after: Chips,
    pub pot_after: Chips,
    /// Whole seconds since the previous recognized event.
    pub think_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    HandStarted {
        hand: u32,
        seats: Vec<SeatEntry>,
    },
    HandRevealed {
        hand: u32,
        seat: u32,
        cards: String,
    },
    Action(ActionFact),
    PhaseChanged {
        hand: u32,
        phase: Phase,
        text: String,
        pot: Chips,
    },
    Won {
        hand: u32,
        seat: u32,
        player: String,
        pot: Chips,
    },
    /// Recognized but irrelevant, e.g. the observer's cards in a hand they
    /// sat out.
    Ignored,
}

/// State scoped to the hand currently being dealt.
#[derive(Debug, Clone)]
struct Hand {
    number: u32,
    seats: HashMap<String, u32>,
    pot: Chips,
    contributions: BTreeMap<u32, Chips>,
    last_bet_or_raise: Chips,
    stacks: HashMap<u32, Chips>,
}

impl Hand {
    fn new(number: u32, entries: &[SeatEntry]) -> Self {
        Self {
            number,
            seats: entries
                .iter()
                .map(|entry| (entry.name.clone(), entry.seat))
                .collect(),
            pot: 0,
            contributions: BTreeMap::new(),
            last_bet_or_raise: 0,
            stacks: entries
                .iter()
                .map(|entry| (entry.seat, entry.stack))
                .collect(),
        }
    }

    fn pot_now(&self) -> Chips {
        self.pot + self.contributions.values().sum::<Chips>()
    }

    fn seat_of(&self, player: &str, line: usize) -> Result<u32> {
        self.seats
            .get(player)
            .copied()
            .ok_or_else(|| LedgerError::UnknownPlayer {
                line,
                hand: self.number,
                player: player.to_string(),
            })
    }

    fn prior(&self, seat: u32) -> Chips {
        self.contributions.get(&seat).copied().unwrap_or(0)
    }

    fn stack(&self, seat: u32, line: usize) -> Result<Chips> {
        self.stacks
            .get(&seat)
            .copied()
            .ok_or(LedgerError::MissingPriorStack {
                line,
                hand: self.number,
                seat,
            })
    }

    /// Raises the seat's street total to `total` and debits the difference.
    fn commit(&mut self, seat: u32, total: Chips, line: usize) -> Result<(Chips, Chips)> {
        let amount = total - self.prior(seat);
        let stack = self.stack(seat, line)? - amount;
        self.stacks.insert(seat, stack);
        self.contributions.insert(seat, total);
        Ok((amount, stack))
    }

    fn close_street(&mut self) {
        self.pot = self.pot_now();
        self.contributions.clear();
        self.last_bet_or_raise = 0;
    }

    fn action(
        &self,
        seat: u32,
        player: &str,
        kind: ActionKind,
        amount: Chips,
        stack_after: Chips,
        think_time: Option<i64>,
    ) -> Transition {
        Transition::Action(ActionFact {
            hand: self.number,
            seat,
            player: player.to_string(),
            kind,
            amount,
            stack_after,
            pot_after: self.pot_now(),
            think_time,
        })
    }
}

/// Replays chronological events and reconstructs pot, stacks and timing.
#[derive(Debug, Clone)]
pub struct HandStateMachine {
    observer: String,
    hands_started: u32,
    current: Option<Hand>,
    last_event_at: Option<DateTime<Utc>>,
}

impl HandStateMachine {
    pub fn new(observer: impl Into<String>) -> Self {
        Self {
            observer: observer.into(),
            hands_started: 0,
            current: None,
            last_event_at: None,
        }
    }

    pub fn hands_started(&self) -> u32 {
        self.hands_started
    }

    /// Pot of the open hand including the current street, if a hand is open.
    pub fn pot(&self) -> Option<Chips> {
        self.current.as_ref().map(Hand::pot_now)
    }

    /// Last reconstructed stack for `player` in the open hand.
    pub fn stack_of(&self, player: &str) -> Option<Chips> {
        let hand = self.current.as_ref()?;
        let seat = hand.seats.get(player)?;
        hand.stacks.get(seat).copied()
    }

    /// Chips `player` has put in on the current street.
    pub fn contribution_of(&self, player: &str) -> Option<Chips> {
        let hand = self.current.as_ref()?;
        let seat = hand.seats.get(player)?;
        Some(hand.prior(*seat))
    }

    pub fn last_bet_or_raise(&self) -> Option<Chips> {
        self.current.as_ref().map(|hand| hand.last_bet_or_raise)
    }

    pub fn apply(&mut self, timed: &TimedEvent) -> Result<Transition> {
        let think_time = self
            .last_event_at
            .map(|last| (timed.at - last).num_milliseconds().div_euclid(1000));
        let transition = self.transition(timed, think_time)?;
        self.last_event_at = Some(timed.at);
        Ok(transition)
    }

    fn transition(&mut self, timed: &TimedEvent, think_time: Option<i64>) -> Result<Transition> {
        let line = timed.line;
        match &timed.event {
            LogEvent::PlayerStacks { seats } => {
                self.hands_started += 1;
                let hand = Hand::new(self.hands_started, seats);
                debug!(hand = hand.number, seats = seats.len(), "hand started");
                self.current = Some(hand);
                Ok(Transition::HandStarted {
                    hand: self.hands_started,
                    seats: seats.clone(),
                })
            }
            LogEvent::YourHand { hand: cards } => {
                let seated = self
                    .current
                    .as_ref()
                    .and_then(|hand| hand.seats.get(&self.observer).map(|seat| (hand.number, *seat)));
                Ok(match seated {
                    Some((hand, seat)) => Transition::HandRevealed {
                        hand,
                        seat,
                        cards: cards.clone(),
                    },
                    None => Transition::Ignored,
                })
            }
            LogEvent::ShowsHand { player, hand: cards } => {
                let hand = open_hand(&mut self.current, timed)?;
                Ok(Transition::HandRevealed {
                    hand: hand.number,
                    seat: hand.seat_of(player, line)?,
                    cards: cards.clone(),
                })
            }
            LogEvent::Phase { phase, text } => {
                let hand = open_hand(&mut self.current, timed)?;
                hand.close_street();
                debug!(hand = hand.number, phase = phase.label(), pot = hand.pot, "street closed");
                Ok(Transition::PhaseChanged {
                    hand: hand.number,
                    phase: *phase,
                    text: text.clone(),
                    pot: hand.pot,
                })
            }
            LogEvent::Win { player } => {
                let hand = open_hand(&mut self.current, timed)?;
                Ok(Transition::Won {
                    hand: hand.number,
                    seat: hand.seat_of(player, line)?,
                    player: player.clone(),
                    pot: hand.pot_now(),
                })
            }
            LogEvent::SmallBlind { player, total }
            | LogEvent::BigBlind { player, total }
            | LogEvent::Bet { player, total }
            | LogEvent::Raise { player, total } => {
                let kind = match timed.event {
                    LogEvent::SmallBlind { .. } => ActionKind::SmallBlind,
                    LogEvent::BigBlind { .. } => ActionKind::BigBlind,
                    LogEvent::Bet { .. } => ActionKind::Bet,
                    _ => ActionKind::Raise,
                };
                let hand = open_hand(&mut self.current, timed)?;
                let seat = hand.seat_of(player, line)?;
                let (amount, stack) = hand.commit(seat, *total, line)?;
                hand.last_bet_or_raise = *total;
                Ok(hand.action(seat, player, kind, amount, stack, think_time))
            }
            LogEvent::Call { player, total } => {
                let hand = open_hand(&mut self.current, timed)?;
                let seat = hand.seat_of(player, line)?;
                let (amount, stack) = hand.commit(seat, *total, line)?;
                Ok(hand.action(seat, player, ActionKind::Call, amount, stack, think_time))
            }
            LogEvent::Check { player } => {
                let hand = open_hand(&mut self.current, timed)?;
                let seat = hand.seat_of(player, line)?;
                let owed = hand.last_bet_or_raise - hand.prior(seat);
                if owed > 0 {
                    warn!(hand = hand.number, line, player = %player, owed, "check while facing a bet");
                }
                let stack = hand.stack(seat, line)?;
                Ok(hand.action(seat, player, ActionKind::Check, 0, stack, think_time))
            }
            LogEvent::Fold { player } => {
                let hand = open_hand(&mut self.current, timed)?;
                let seat = hand.seat_of(player, line)?;
                let owed = hand.last_bet_or_raise - hand.prior(seat);
                let stack = hand.stack(seat, line)?;
                Ok(hand.action(seat, player, ActionKind::Fold, owed, stack, think_time))
            }
        }
    }
}

/// The open hand, or `NoActiveHand` when no stacks line has been seen yet.
fn open_hand<'a>(current: &'a mut Option<Hand>, timed: &TimedEvent) -> Result<&'a mut Hand> {
    current.as_mut().ok_or(LedgerError::NoActiveHand {
        line: timed.line,
        event: timed.event.name(),
    })
}
