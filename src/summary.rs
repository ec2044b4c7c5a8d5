use serde::{Deserialize, Serialize};

use crate::event::Chips;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSummary {
    pub player: String,
    pub wins: usize,
    pub average_win: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SummaryTable {
    /// One entry per winner, in the order they first won.
    pub players: Vec<PlayerSummary>,
}

/// Pots won per player, kept in first-win order.
#[derive(Debug, Clone, Default)]
pub struct SummaryAggregator {
    wins: Vec<(String, Vec<Chips>)>,
}

impl SummaryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_win(&mut self, player: &str, pot: Chips) {
        match self.wins.iter_mut().find(|(name, _)| name == player) {
            Some((_, pots)) => pots.push(pot),
            None => self.wins.push((player.to_string(), vec![pot])),
        }
    }

    pub fn pots_won(&self, player: &str) -> &[Chips] {
        self.wins
            .iter()
            .find(|(name, _)| name == player)
            .map(|(_, pots)| pots.as_slice())
            .unwrap_or_default()
    }

    pub fn finish(&self) -> SummaryTable {
        let players = self
            .wins
            .iter()
            .map(|(player, pots)| PlayerSummary {
                player: player.clone(),
                wins: pots.len(),
                average_win: pots.iter().sum::<Chips>() as f64 / pots.len() as f64,
            })
            .collect();
        SummaryTable { players }
    }
}
