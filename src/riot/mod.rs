use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod full;

// numeric fields in match records are not always present, and sometimes show up as
// floats or nulls depending on the patch, so every counter goes through here
pub(crate) mod lenient {
    use serde::de::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn int<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value_to_int(&value))
    }

    pub fn value_to_int(value: &Value) -> i64 {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or_default(),
            Value::Bool(b) => *b as i64,
            _ => 0,
        }
    }
}

/// A display identity, `game_name#tag`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct PlayerRef {
    #[serde(rename = "riot_id")]
    pub game_name: String,
    pub tag: String,
}

#[cfg(test)]
impl PlayerRef {
    pub fn new(game_name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
            tag: tag.into(),
        }
    }
}

impl Display for PlayerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.game_name, self.tag)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Account {
    pub puuid: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid match id: {0:?}")]
pub struct MatchIdError(String);

/// Platform-prefixed match id such as `NA1_4971234567`.
///
/// The numeric suffix grows with completion time inside a shard, which is the only
/// cursor the match listing endpoint gives us.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MatchId {
    id: String,
    seq: u64,
}

impl MatchId {
    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl FromStr for MatchId {
    type Err = MatchIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (shard, seq) = s
            .rsplit_once('_')
            .ok_or_else(|| MatchIdError(s.to_string()))?;
        // ids become file names, so the shard must be a plain platform code
        let shard_ok = !shard.is_empty() && shard.bytes().all(|b| b.is_ascii_alphanumeric());
        if !shard_ok || seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MatchIdError(s.to_string()));
        }
        let seq = seq.parse().map_err(|_| MatchIdError(s.to_string()))?;
        Ok(Self {
            id: s.to_string(),
            seq,
        })
    }
}

impl TryFrom<String> for MatchId {
    type Error = MatchIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MatchId> for String {
    fn from(value: MatchId) -> Self {
        value.id
    }
}

impl Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}
