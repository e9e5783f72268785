use std::collections::HashSet;

use itertools::Itertools;
use thiserror::Error;

use crate::{
    client::{MatchSource, RequestError},
    riot::{MatchId, PlayerRef},
    store::RawStore,
};

/// Largest page the match listing endpoint hands out.
pub const PAGE_SIZE: u8 = 100;

/// Inclusive window in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

#[derive(Error, Debug)]
pub enum CollectError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("storage failure: {0:#}")]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for CollectError {
    fn from(value: anyhow::Error) -> Self {
        Self::Store(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPair {
    pub player: PlayerRef,
    pub queue: Option<u16>,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct CollectSummary {
    pub players_done: usize,
    pub players_missing: Vec<PlayerRef>,
    pub saved: usize,
    pub skipped: usize,
    pub list_calls: usize,
    pub failed: Vec<FailedPair>,
}

impl CollectSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Collector<'a, S> {
    source: &'a S,
    store: &'a RawStore,
    range: TimeRange,
    queues: Vec<u16>,
    // shared by every player and queue of the run
    processed: HashSet<MatchId>,
    summary: CollectSummary,
}

impl<'a, S: MatchSource> Collector<'a, S> {
    /// Seeds the processed set from whatever is already on disk so an interrupted run
    /// picks up where it stopped.
    pub fn new(
        source: &'a S,
        store: &'a RawStore,
        range: TimeRange,
        queues: &[u16],
    ) -> anyhow::Result<Self> {
        let processed = store.processed()?;
        Ok(Self {
            source,
            store,
            range,
            queues: queues.iter().copied().unique().collect(),
            processed,
            summary: CollectSummary::default(),
        })
    }

    pub fn processed(&self) -> &HashSet<MatchId> {
        &self.processed
    }

    /// Walks every player through every queue.
    ///
    /// Bad credentials and storage failures abort the run. A player that does not exist
    /// is skipped. Any other request failure gives up on that player/queue pair only.
    pub async fn run(mut self, players: &[PlayerRef]) -> Result<CollectSummary, CollectError> {
        log::info!(
            "collecting queues [{}] in [{}, {}] for {} players",
            self.queues.iter().join(", "),
            self.range.start,
            self.range.end,
            players.len()
        );
        log::info!("{} matches known before starting", self.processed().len());
        for player in players {
            log::info!("processing {}", player);
            let puuid = match self.source.resolve_player(player).await {
                Ok(puuid) => puuid,
                Err(RequestError::NotFound(_)) => {
                    log::warn!("{} does not exist, skipping", player);
                    self.summary.players_missing.push(player.clone());
                    continue;
                }
                Err(err) => {
                    self.fail(player, None, err)?;
                    continue;
                }
            };

            for queue in self.queues.clone() {
                match self.collect_queue(&puuid, queue).await {
                    Ok(()) => {}
                    Err(CollectError::Request(err)) => self.fail(player, Some(queue), err)?,
                    Err(err) => return Err(err),
                }
            }
            self.summary.players_done += 1;
        }
        Ok(self.summary)
    }

    fn fail(
        &mut self,
        player: &PlayerRef,
        queue: Option<u16>,
        err: RequestError,
    ) -> Result<(), CollectError> {
        if let RequestError::Auth(..) = err {
            return Err(err.into());
        }
        match queue {
            Some(queue) => log::error!("{} queue {} failed: {}", player, queue, err),
            None => log::error!("{} could not be resolved: {}", player, err),
        }
        self.summary.failed.push(FailedPair {
            player: player.clone(),
            queue,
            reason: err.to_string(),
        });
        Ok(())
    }

    /// Pages backwards from the end of the range, using the smallest match id of each
    /// page minus one as the next `endTime`.
    pub async fn collect_queue(&mut self, puuid: &str, queue: u16) -> Result<(), CollectError> {
        log::info!("fetching matches from queue {}", queue);
        let mut last_ts = self.range.end;
        loop {
            let ids = self
                .source
                .list_match_ids(puuid, PAGE_SIZE, Some(queue), None, Some(last_ts))
                .await?;
            self.summary.list_calls += 1;
            let Some(oldest) = ids.iter().map(MatchId::seq).min() else {
                log::debug!("queue {} exhausted before {}", queue, last_ts);
                break;
            };

            for id in &ids {
                if self.processed.contains(id) {
                    log::debug!("skipping {} from queue {}", id, queue);
                    self.summary.skipped += 1;
                    continue;
                }
                log::info!("extracting {} from queue {}", id, queue);
                let record = self.source.get_match(id).await?;
                if self.store.save(id, &record)? {
                    self.summary.saved += 1;
                }
                self.processed.insert(id.clone());
            }

            let next = i64::try_from(oldest).unwrap_or(i64::MAX).saturating_sub(1);
            if next >= last_ts {
                // the upstream ignored endTime, bail out instead of looping forever
                log::warn!("cursor for queue {} did not move past {}", queue, last_ts);
                break;
            }
            last_ts = next;
            if last_ts < self.range.start {
                break;
            }
        }
        Ok(())
    }
}
