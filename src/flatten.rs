use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{riot::full::Match, store::RawStore};

/// One participant of one match. Field order is the column order of the table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub match_id: String,
    pub queue_id: i64,
    pub game_duration_min: f64,
    pub game_start_ts: i64,
    pub game_end_ts: i64,
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
}

pub const COLUMNS: [&str; 23] = [
    "match_id",
    "queue_id",
    "game_duration_min",
    "game_start_ts",
    "game_end_ts",
    "puuid",
    "summoner_name",
    "champion_name",
    "team_position",
    "win",
    "kills",
    "deaths",
    "assists",
    "gold",
    "cs",
    "damage_to_champions",
    "damage_to_objectives",
    "damage_taken",
    "epic_monster_steals",
    "epic_monster_steals_with_smite",
    "dodge_skillshots_small_window",
    "total_heal",
    "damage_self_mitigated",
];

fn minutes(seconds: i64) -> f64 {
    (seconds as f64 / 60.0 * 100.0).round() / 100.0
}

/// Explodes a match into one row per participant, in participant order.
pub fn flatten_match(mat: &Match, fallback_id: &str) -> Vec<Row> {
    let info = &mat.info;
    let match_id = match mat.metadata.match_id.as_str() {
        "" => fallback_id,
        id => id,
    };
    info.participants
        .iter()
        .map(|p| Row {
            match_id: match_id.to_string(),
            queue_id: info.queue_id,
            game_duration_min: minutes(info.game_duration),
            game_start_ts: info.game_start_timestamp,
            game_end_ts: info.game_end_timestamp,
            puuid: p.puuid.clone(),
            // summonerName is blank since riot ids replaced it
            summoner_name: p.riot_id_game_name.clone(),
            champion_name: p.champion_name.clone(),
            team_position: p.team_position.clone(),
            win: p.win,
            kills: p.kills,
            deaths: p.deaths,
            assists: p.assists,
            gold: p.gold_earned,
            cs: p.creep_score(),
            damage_to_champions: p.total_damage_dealt_to_champions,
            damage_to_objectives: p.damage_dealt_to_objectives,
            damage_taken: p.total_damage_taken,
            epic_monster_steals: p.challenge("epicMonsterSteals"),
            epic_monster_steals_with_smite: p.challenge("epicMonsterStealsWithSmite"),
            dodge_skillshots_small_window: p.challenge("dodgeSkillShotsSmallWindow"),
            total_heal: p.total_heal,
            damage_self_mitigated: p.damage_self_mitigated,
        })
        .collect()
}

/// Flattens every stored match.
pub fn flatten_store(store: &RawStore) -> anyhow::Result<Vec<Row>> {
    let mut records = store.load_all()?;
    records.sort_by(|(a, _), (b, _)| a.cmp(b));
    log::info!(
        "flattening {} matches from {}",
        records.len(),
        store.dir().display()
    );

    let mut rows = vec![];
    for (path, record) in records {
        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        match serde_json::from_value::<Match>(record) {
            Ok(mat) => rows.extend(flatten_match(&mat, fallback)),
            Err(err) => log::warn!("skipping {}: {}", path.display(), err),
        }
    }
    Ok(rows)
}

pub fn write_rows(path: &Path, rows: &[Row]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    if rows.is_empty() {
        // serde only emits the header alongside the first record
        writer.write_record(COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::info!("{} rows written to {}", rows.len(), path.display());
    Ok(())
}

pub fn read_rows(path: &Path) -> anyhow::Result<Vec<Row>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<Row>, _>>()
        .with_context(|| format!("reading {}", path.display()))?;
    log::info!("{} rows loaded from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> serde_json::Value {
        json!({
            "metadata": {"matchId": "NA1_500"},
            "info": {
                "queueId": 420,
                "gameDuration": 1805,
                "gameStartTimestamp": 1735700000000i64,
                "gameEndTimestamp": 1735701805000i64,
                "participants": [
                    {
                        "puuid": "p1", "riotIdGameName": "capybara Lover", "championName": "Ahri",
                        "teamPosition": "MIDDLE", "win": true, "kills": 7, "deaths": 2, "assists": 9,
                        "goldEarned": 12000, "totalMinionsKilled": 200, "neutralMinionsKilled": 14,
                        "totalDamageDealtToChampions": 25000, "damageDealtToObjectives": 4000,
                        "totalDamageTaken": 15000, "totalHeal": 2100, "damageSelfMitigated": 8000,
                        "challenges": {"epicMonsterSteals": 1, "epicMonsterStealsWithSmite": 0,
                                       "dodgeSkillShotsSmallWindow": 12}
                    },
                    {"puuid": "p2", "championName": "Garen", "win": false},
                    {"puuid": "p3"}
                ]
            }
        })
    }

    #[test]
    fn one_row_per_participant() {
        let mat: Match = serde_json::from_value(sample()).unwrap();
        let rows = flatten_match(&mat, "ignored");
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.match_id, "NA1_500");
            assert_eq!(row.queue_id, 420);
            assert_eq!(row.game_duration_min, 30.08);
            assert_eq!(row.game_start_ts, 1735700000000);
            assert_eq!(row.game_end_ts, 1735701805000);
        }
        let puuids = rows.iter().map(|r| r.puuid.as_deref()).collect::<Vec<_>>();
        assert_eq!(puuids, vec![Some("p1"), Some("p2"), Some("p3")]);

        let first = &rows[0];
        assert_eq!(first.cs, 214);
        assert_eq!(first.gold, 12000);
        assert_eq!(first.summoner_name.as_deref(), Some("capybara Lover"));
        assert_eq!(first.epic_monster_steals, 1);
        assert_eq!(first.dodge_skillshots_small_window, 12);
        assert_eq!(first.win, Some(true));
    }

    #[test]
    fn missing_challenges_default_to_zero() {
        let mat: Match = serde_json::from_value(sample()).unwrap();
        let rows = flatten_match(&mat, "ignored");
        let bare = &rows[2];
        assert_eq!(bare.epic_monster_steals, 0);
        assert_eq!(bare.epic_monster_steals_with_smite, 0);
        assert_eq!(bare.dodge_skillshots_small_window, 0);
        assert_eq!(bare.kills, 0);
        assert_eq!(bare.cs, 0);
        assert_eq!(bare.win, None);
    }

    #[test]
    fn match_id_falls_back_to_file_name() {
        let mat: Match = serde_json::from_value(json!({"info": {"participants": [{}]}})).unwrap();
        let rows = flatten_match(&mat, "EUW1_3");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].match_id, "EUW1_3");
        assert_eq!(rows[0].game_duration_min, 0.0);
    }

    #[test]
    fn table_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = RawStore::open(dir.path().join("raw")).unwrap();
        store.save(&"NA1_500".parse().unwrap(), &sample()).unwrap();
        store
            .save(
                &"NA1_400".parse().unwrap(),
                &json!({"metadata": {"matchId": "NA1_400"}, "info": {"participants": [{"puuid": "x"}]}}),
            )
            .unwrap();

        let rows = flatten_store(&store).unwrap();
        assert_eq!(rows.len(), 4);

        let out = dir.path().join("processed").join("table.csv");
        write_rows(&out, &rows).unwrap();
        let content = fs::read_to_string(&out).unwrap();
        let header = content.lines().next().unwrap();
        assert_eq!(header, COLUMNS.join(","));

        let back = read_rows(&out).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn empty_table_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.csv");
        write_rows(&out, &[]).unwrap();
        let content = fs::read_to_string(&out).unwrap();
        assert_eq!(content.trim_end(), COLUMNS.join(","));
    }
}
