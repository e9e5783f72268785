// final pass over the flattened table: tidy strings, drop unusable games, add ratios

use std::{fs, path::Path};

use anyhow::Context;
use chrono::{DateTime, SecondsFormat};
use serde::Serialize;

use crate::flatten::{Row, COLUMNS};

/// Games this short are remakes or early surrenders.
pub const MIN_DURATION_MIN: f64 = 5.0;

/// Columns appended after the flattened ones.
pub const DERIVED_COLUMNS: [&str; 8] = [
    "kda",
    "cs_per_min",
    "damage_per_min",
    "damage_per_gold",
    "aggression_score",
    "tankiness",
    "mechanics_score",
    "risk_ratio",
];

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CleanRow {
    pub match_id: Option<String>,
    pub queue_id: i64,
    pub game_duration_min: f64,
    pub game_start_ts: Option<String>,
    pub game_end_ts: Option<String>,
    pub puuid: Option<String>,
    pub summoner_name: Option<String>,
    pub champion_name: Option<String>,
    pub team_position: Option<String>,
    pub win: Option<bool>,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub gold: i64,
    pub cs: i64,
    pub damage_to_champions: i64,
    pub damage_to_objectives: i64,
    pub damage_taken: i64,
    pub epic_monster_steals: i64,
    pub epic_monster_steals_with_smite: i64,
    pub dodge_skillshots_small_window: i64,
    pub total_heal: i64,
    pub damage_self_mitigated: i64,
    pub kda: f64,
    pub cs_per_min: f64,
    pub damage_per_min: f64,
    pub damage_per_gold: f64,
    pub aggression_score: f64,
    pub tankiness: f64,
    pub mechanics_score: f64,
    pub risk_ratio: f64,
}

fn clean_string(value: Option<String>) -> Option<String> {
    let value = value?;
    match value.trim() {
        "" | "nan" => None,
        trimmed => Some(trimmed.to_string()),
    }
}

fn datetime(millis: i64) -> Option<String> {
    if millis <= 0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn nonzero(value: i64) -> f64 {
    if value == 0 {
        1.0
    } else {
        value as f64
    }
}

impl CleanRow {
    // the duration filter runs first, so the per-minute divisions are safe
    fn from_row(row: Row) -> Self {
        let minutes = row.game_duration_min;
        let involvement = row.kills + row.assists;
        Self {
            kda: involvement as f64 / nonzero(row.deaths),
            cs_per_min: row.cs as f64 / minutes,
            damage_per_min: row.damage_to_champions as f64 / minutes,
            damage_per_gold: row.damage_to_champions as f64 / nonzero(row.gold),
            aggression_score: involvement as f64 / minutes,
            tankiness: (row.damage_taken + row.damage_self_mitigated) as f64 / minutes,
            mechanics_score: row.dodge_skillshots_small_window as f64 / minutes,
            risk_ratio: row.deaths as f64 / nonzero(involvement),
            match_id: clean_string(Some(row.match_id)),
            queue_id: row.queue_id,
            game_duration_min: minutes,
            game_start_ts: datetime(row.game_start_ts),
            game_end_ts: datetime(row.game_end_ts),
            puuid: clean_string(row.puuid),
            summoner_name: clean_string(row.summoner_name),
            champion_name: clean_string(row.champion_name),
            team_position: clean_string(row.team_position),
            win: row.win,
            kills: row.kills,
            deaths: row.deaths,
            assists: row.assists,
            gold: row.gold,
            cs: row.cs,
            damage_to_champions: row.damage_to_champions,
            damage_to_objectives: row.damage_to_objectives,
            damage_taken: row.damage_taken,
            epic_monster_steals: row.epic_monster_steals,
            epic_monster_steals_with_smite: row.epic_monster_steals_with_smite,
            dodge_skillshots_small_window: row.dodge_skillshots_small_window,
            total_heal: row.total_heal,
            damage_self_mitigated: row.damage_self_mitigated,
        }
    }
}

/// Keeps rows from allowed queues with a position and a real game length.
pub fn clean_rows(rows: Vec<Row>, queues: &[u16]) -> Vec<CleanRow> {
    let initial = rows.len();
    let cleaned = rows
        .into_iter()
        .filter(|row| queues.iter().any(|&q| i64::from(q) == row.queue_id))
        .filter(|row| row.game_duration_min > MIN_DURATION_MIN)
        .map(CleanRow::from_row)
        .filter(|row| row.team_position.is_some())
        .collect::<Vec<_>>();
    log::info!("removed {} rows", initial - cleaned.len());
    cleaned
}

pub fn write_clean(path: &Path, rows: &[CleanRow]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    if rows.is_empty() {
        writer.write_record(COLUMNS.iter().chain(DERIVED_COLUMNS.iter()))?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::info!("clean data saved to {}", path.display());
    Ok(())
}
