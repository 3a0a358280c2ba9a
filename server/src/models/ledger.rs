use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One submitted result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub player: String,
    pub score: u64,
    pub submitted_at: DateTime<Utc>,
}

/// The open weekly window and everything submitted into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPeriod {
    pub scores: Vec<ScoreEntry>,
    pub period_start: DateTime<Utc>,
}

impl CurrentPeriod {
    pub fn empty(period_start: DateTime<Utc>) -> Self {
        Self {
            scores: Vec::new(),
            period_start,
        }
    }

    /// Entries by score, highest first; equal scores keep submission order.
    pub fn ranked(&self) -> Vec<ScoreEntry> {
        let mut ranked = self.scores.clone();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsEntry {
    pub player: String,
    pub total_points: u64,
    pub periods_won: u32,
}

/// Season totals keyed by player. Stored in first-award order, which is
/// also the tie-break order for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonStandings(Vec<StandingsEntry>);

impl SeasonStandings {
    /// Adds points and one period win to `player`, creating the entry on
    /// first award.
    pub fn award(&mut self, player: &str, points: u64) {
        match self.0.iter_mut().find(|e| e.player == player) {
            Some(entry) => {
                entry.total_points += points;
                entry.periods_won += 1;
            }
            None => self.0.push(StandingsEntry {
                player: player.to_string(),
                total_points: points,
                periods_won: 1,
            }),
        }
    }

    pub fn ranked(&self) -> Vec<StandingsEntry> {
        let mut ranked = self.0.clone();
        ranked.sort_by(|a, b| b.total_points.cmp(&a.total_points));
        ranked
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Points handed out for one finishing position at rollover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Award {
    pub rank: usize,
    pub player: String,
    pub points: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloverOutcome {
    pub rolled_over: bool,
    /// Awards that ended up in the ledger. Empty when another client's
    /// rollover was pulled in place of ours.
    pub awards: Vec<Award>,
    pub standings: Vec<StandingsEntry>,
}

/// The document shared through the remote mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSnapshot {
    #[serde(default)]
    pub revision: u64,
    pub current_period: CurrentPeriod,
    pub standings: SeasonStandings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScoreInput {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct ScoreSubmission {
    pub player: String,
    pub score: ScoreInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodView {
    pub game: String,
    pub period_start: DateTime<Utc>,
    pub next_reset: DateTime<Utc>,
    pub scores: Vec<ScoreEntry>,
}

#[derive(Debug, Serialize)]
pub struct PullResult {
    pub applied: bool,
}
