use std::path::PathBuf;

use anyhow::bail;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::collector::TimeRange;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Download every match of every listed player into the raw directory
    Extract,
    /// Flatten the raw matches into one row per participant
    Transform,
    /// Filter the flattened table and add derived features
    Clean,
    /// Extract, transform and clean in one go
    Run,
}

#[derive(Parser, Debug)]
#[command(version, about = "Ranked match history ETL for the Riot match-v5 API")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
    #[arg(long, env = "RIOT_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,
    #[arg(long, env = "REGION", default_value = "americas", global = true)]
    pub region: String,
    #[arg(long, global = true)]
    pub proxy: Option<String>,
    #[arg(long, default_value = "data/input/summoners.csv", global = true)]
    pub players: PathBuf,
    #[arg(long, default_value = "data/raw", global = true)]
    pub raw_dir: PathBuf,
    #[arg(long, default_value = "data/processed/lol_player_matches_2025.csv", global = true)]
    pub processed: PathBuf,
    #[arg(long, default_value = "data/clean/matches_clean.csv", global = true)]
    pub clean_output: PathBuf,
    /// First day of the range (UTC)
    #[arg(long, default_value = "2025-01-01", value_parser = parse_date, global = true)]
    pub start: NaiveDate,
    /// Last day of the range (UTC), included up to 23:59:59
    #[arg(long, default_value = "2025-12-31", value_parser = parse_date, global = true)]
    pub end: NaiveDate,
    #[arg(long, value_delimiter = ',', default_values_t = [420u16, 440, 400], global = true)]
    pub queues: Vec<u16>,
    /// Give up on a request after being rate limited this many seconds in total
    #[arg(long, default_value_t = 600, global = true)]
    pub max_rate_limit_wait: u64,
}

fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
}

impl Args {
    pub fn time_range(&self) -> anyhow::Result<TimeRange> {
        if self.start > self.end {
            bail!("start date {} is after end date {}", self.start, self.end);
        }
        let start = self.start.and_hms_opt(0, 0, 0);
        let end = self.end.and_hms_opt(23, 59, 59);
        match (start, end) {
            (Some(start), Some(end)) => Ok(TimeRange {
                start: start.and_utc().timestamp(),
                end: end.and_utc().timestamp(),
            }),
            _ => bail!("unrepresentable date range"),
        }
    }

    pub fn api_key(&self) -> anyhow::Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => bail!("RIOT_API_KEY not found in environment variables"),
        }
    }
}
