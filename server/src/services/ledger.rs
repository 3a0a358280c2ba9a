//! The score and season ledger.
//!
//! Submissions append to the open period. `check_and_roll` closes the period
//! once a weekly boundary has passed, awards season points to the top three
//! entries and starts an empty period. Every change is committed to the
//! local store before it is applied in memory; the remote mirror, when
//! present, is updated afterwards on a best-effort basis.

use crate::error::{LedgerError, RemoteError, StoreError};
use crate::models::ledger::*;
use crate::services::mirror::RemoteMirror;
use crate::services::schedule::ResetSchedule;
use crate::services::store::{LedgerStore, RecordKey};
use crate::validation;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Season points for first, second and third place.
pub const SEASON_POINTS: [u64; 3] = [100, 50, 25];

/// A local change that may have to be replayed on top of a newer remote.
enum PendingChange {
    Submission(ScoreEntry),
    Rollover(DateTime<Utc>),
}

pub struct LedgerEngine {
    store: Box<dyn LedgerStore>,
    mirror: Option<Box<dyn RemoteMirror>>,
    schedule: ResetSchedule,
    period: CurrentPeriod,
    standings: SeasonStandings,
    remote_revision: u64,
}

impl LedgerEngine {
    /// Loads the ledger from `store`.
    ///
    /// Without a stored period the ledger starts empty at the last recorded
    /// reset, or at the Unix epoch, so the first rollover check closes it.
    pub fn open(
        store: Box<dyn LedgerStore>,
        schedule: ResetSchedule,
        mirror: Option<Box<dyn RemoteMirror>>,
    ) -> Result<Self, LedgerError> {
        let last_reset = store
            .load(RecordKey::LastReset)?
            .map(|raw| parse_timestamp(RecordKey::LastReset, &raw))
            .transpose()?;

        let period = match store.load(RecordKey::CurrentPeriod)? {
            Some(raw) => serde_json::from_str(&raw).map_err(StoreError::from)?,
            None => CurrentPeriod::empty(last_reset.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)),
        };

        let standings = match store.load(RecordKey::SeasonStandings)? {
            Some(raw) => serde_json::from_str(&raw).map_err(StoreError::from)?,
            None => SeasonStandings::default(),
        };

        info!(
            period_start = %period.period_start,
            scores = period.scores.len(),
            players = standings.len(),
            mirror = mirror.is_some(),
            "ledger loaded"
        );

        Ok(Self {
            store,
            mirror,
            schedule,
            period,
            standings,
            remote_revision: 0,
        })
    }

    pub fn mirror_enabled(&self) -> bool {
        self.mirror.is_some()
    }

    pub fn period_start(&self) -> DateTime<Utc> {
        self.period.period_start
    }

    pub fn next_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.schedule.next_boundary(now)
    }

    /// Current period entries, highest score first.
    pub fn current_standings(&self) -> Vec<ScoreEntry> {
        self.period.ranked()
    }

    /// Season standings, most points first.
    pub fn season_standings(&self) -> Vec<StandingsEntry> {
        self.standings.ranked()
    }

    pub async fn submit_score(
        &mut self,
        player: &str,
        score: i64,
    ) -> Result<Vec<ScoreEntry>, LedgerError> {
        self.roll_and_submit_at(player, score, Utc::now()).await
    }

    /// Closes a finished period first so the entry lands in the week it was
    /// played in.
    pub async fn roll_and_submit_at(
        &mut self,
        player: &str,
        score: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoreEntry>, LedgerError> {
        self.check_and_roll(now).await?;
        self.submit_score_at(player, score, now).await
    }

    /// Appends a score stamped with `now`. Does not check for rollover.
    pub async fn submit_score_at(
        &mut self,
        player: &str,
        score: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoreEntry>, LedgerError> {
        let player = validation::validate_player_name(player)?;
        let score = validation::validate_score(score)?;
        let entry = ScoreEntry {
            player,
            score,
            submitted_at: now,
        };

        self.append(entry.clone())?;
        info!(player = %entry.player, score, "score submitted");

        self.publish(PendingChange::Submission(entry)).await;
        Ok(self.current_standings())
    }

    /// Closes the current period if a reset boundary has passed since it
    /// started. Calling it again before the next boundary does nothing.
    pub async fn check_and_roll(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<RolloverOutcome, LedgerError> {
        let Some(awards) = self.roll_if_due(now)? else {
            return Ok(RolloverOutcome {
                rolled_over: false,
                awards: Vec::new(),
                standings: self.season_standings(),
            });
        };

        let awards = self
            .publish(PendingChange::Rollover(now))
            .await
            .unwrap_or(awards);
        Ok(RolloverOutcome {
            rolled_over: true,
            awards,
            standings: self.season_standings(),
        })
    }

    /// Replaces local state with the remote snapshot. Returns `false` when
    /// the remote holds nothing yet, in which case local state is kept.
    pub async fn pull_remote(&mut self) -> Result<bool, LedgerError> {
        let mirror = self.mirror.as_deref().ok_or(RemoteError::Disabled)?;
        let remote = mirror.pull().await.inspect_err(|e| {
            warn!(error = %e, "remote pull failed; keeping local ledger");
        })?;

        let Some(remote) = remote else {
            info!("remote ledger is empty; keeping local state");
            self.remote_revision = 0;
            return Ok(false);
        };

        self.persist_all(&remote.current_period, &remote.standings)?;
        info!(revision = remote.revision, "pulled remote ledger");
        self.period = remote.current_period;
        self.standings = remote.standings;
        self.remote_revision = remote.revision;
        Ok(true)
    }

    fn append(&mut self, entry: ScoreEntry) -> Result<(), LedgerError> {
        let mut period = self.period.clone();
        period.scores.push(entry);
        let encoded = serde_json::to_string(&period).map_err(StoreError::from)?;
        self.store.save(RecordKey::CurrentPeriod, &encoded)?;
        self.period = period;
        Ok(())
    }

    fn roll_if_due(&mut self, now: DateTime<Utc>) -> Result<Option<Vec<Award>>, LedgerError> {
        let boundary = self.schedule.most_recent_boundary(now);
        if self.period.period_start >= boundary {
            return Ok(None);
        }

        // A player with several top entries collects each award.
        let awards: Vec<Award> = self
            .period
            .ranked()
            .into_iter()
            .zip(SEASON_POINTS)
            .enumerate()
            .map(|(i, (entry, points))| Award {
                rank: i + 1,
                player: entry.player,
                points,
            })
            .collect();

        let mut standings = self.standings.clone();
        for award in &awards {
            standings.award(&award.player, award.points);
        }
        let period = CurrentPeriod::empty(now);

        self.persist_all(&period, &standings)?;
        info!(
            closed_start = %self.period.period_start,
            %boundary,
            entries = self.period.scores.len(),
            awards = awards.len(),
            "period rolled over"
        );
        self.period = period;
        self.standings = standings;
        Ok(Some(awards))
    }

    fn persist_all(
        &self,
        period: &CurrentPeriod,
        standings: &SeasonStandings,
    ) -> Result<(), LedgerError> {
        let records = [
            (
                RecordKey::CurrentPeriod,
                serde_json::to_string(period).map_err(StoreError::from)?,
            ),
            (
                RecordKey::SeasonStandings,
                serde_json::to_string(standings).map_err(StoreError::from)?,
            ),
            (RecordKey::LastReset, period.period_start.to_rfc3339()),
        ];
        self.store.save_all(&records)?;
        Ok(())
    }

    fn snapshot(&self) -> RemoteSnapshot {
        RemoteSnapshot {
            revision: self.remote_revision,
            current_period: self.period.clone(),
            standings: self.standings.clone(),
        }
    }

    /// Pushes the post-change state. Failures are logged, never returned.
    ///
    /// Returns the awards of a rollover that had to be replayed on top of a
    /// newer remote; those replace the awards of the local attempt.
    async fn publish(&mut self, change: PendingChange) -> Option<Vec<Award>> {
        let mirror = self.mirror.as_deref()?;

        let pushed = mirror.push(&self.snapshot(), self.remote_revision).await;
        match pushed {
            Ok(revision) => {
                self.remote_revision = revision;
                None
            }
            Err(RemoteError::Conflict { expected, found }) => {
                warn!(expected, found, "remote ledger moved; replaying local change");
                self.replay(change).await
            }
            Err(e) => {
                warn!(error = %e, "remote push failed; local ledger stands");
                None
            }
        }
    }

    async fn replay(&mut self, change: PendingChange) -> Option<Vec<Award>> {
        let pulled = match self.pull_remote().await {
            Ok(pulled) => pulled,
            Err(e) => {
                warn!(error = %e, "remote replay failed; local ledger stands");
                return None;
            }
        };

        // An empty remote left local state in place, change included.
        let mut replayed = None;
        if pulled {
            match change {
                PendingChange::Submission(entry) => {
                    if let Err(e) = self.append(entry) {
                        warn!(error = %e, "replayed submission not saved");
                        return None;
                    }
                }
                PendingChange::Rollover(now) => match self.roll_if_due(now) {
                    Ok(Some(awards)) => replayed = Some(awards),
                    // Another client already rolled this period.
                    Ok(None) => return Some(Vec::new()),
                    Err(e) => {
                        warn!(error = %e, "replayed rollover not saved");
                        return Some(Vec::new());
                    }
                },
            }
        }

        let mirror = self.mirror.as_deref()?;
        let pushed = mirror.push(&self.snapshot(), self.remote_revision).await;
        match pushed {
            Ok(revision) => self.remote_revision = revision,
            Err(e) => warn!(error = %e, "remote push after replay failed; local ledger stands"),
        }
        replayed
    }
}

fn parse_timestamp(key: RecordKey, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Timestamp {
            key: key.as_str(),
            value: raw.to_string(),
        })
}
