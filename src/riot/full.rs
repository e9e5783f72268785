// match-v5 record, as far as the flattener cares about it
// everything is defaulted: older records and remakes are missing whole sections

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Metadata {
    pub match_id: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Participant {
    pub puuid: Option<String>,
    pub riot_id_game_name: Option<String>,
    pub champion_name: Option<String>,
    pub team_position: Option<String>,
    pub win: Option<bool>,
    #[serde(deserialize_with = "lenient::int")]
    pub kills: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub deaths: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub assists: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub gold_earned: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub total_minions_killed: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub neutral_minions_killed: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub total_damage_dealt_to_champions: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub damage_dealt_to_objectives: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub total_damage_taken: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub total_heal: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub damage_self_mitigated: i64,
    pub challenges: Option<Map<String, Value>>,
}

impl Participant {
    /// Value of a derived stat from the `challenges` map, 0 when absent.
    pub fn challenge(&self, key: &str) -> i64 {
        self.challenges
            .as_ref()
            .and_then(|c| c.get(key))
            .map_or(0, lenient::value_to_int)
    }

    pub fn creep_score(&self) -> i64 {
        self.total_minions_killed + self.neutral_minions_killed
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Info {
    #[serde(deserialize_with = "lenient::int")]
    pub queue_id: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub game_duration: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub game_start_timestamp: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub game_end_timestamp: i64,
    pub participants: Vec<Participant>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Match {
    pub metadata: Metadata,
    pub info: Info,
}

#[cfg(test)]
mod tests {
    use super::Match;

    #[test]
    fn partial_record() {
        let content = r#"{
            "metadata": {"matchId": "NA1_1"},
            "info": {
                "queueId": 420,
                "gameDuration": 1805,
                "participants": [
                    {"puuid": "a", "kills": 3, "totalMinionsKilled": 150, "neutralMinionsKilled": 12,
                     "challenges": {"epicMonsterSteals": 1, "dodgeSkillShotsSmallWindow": 4.0}},
                    {"puuid": "b", "deaths": null}
                ]
            }
        }"#;
        let mat: Match = serde_json::from_str(content).expect("Failed to parse partial record");
        assert_eq!(mat.metadata.match_id, "NA1_1");
        assert_eq!(mat.info.game_start_timestamp, 0);
        let first = &mat.info.participants[0];
        assert_eq!(first.creep_score(), 162);
        assert_eq!(first.challenge("epicMonsterSteals"), 1);
        assert_eq!(first.challenge("dodgeSkillShotsSmallWindow"), 4);
        assert_eq!(first.challenge("epicMonsterStealsWithSmite"), 0);
        let second = &mat.info.participants[1];
        assert_eq!(second.deaths, 0);
        assert!(second.challenges.is_none());
        assert_eq!(second.challenge("epicMonsterSteals"), 0);
    }

    #[test]
    fn empty_record() {
        let mat: Match = serde_json::from_str("{}").expect("Failed to parse empty record");
        assert!(mat.info.participants.is_empty());
    }
}
