use std::{
    collections::HashSet,
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde_json::Value;

use crate::riot::MatchId;

/// One `{match_id}.json` file per match. Files are written once and never touched again.
pub struct RawStore {
    dir: PathBuf,
}

impl RawStore {
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating raw match directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, id: &MatchId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn json_files(&self) -> anyhow::Result<impl Iterator<Item = PathBuf>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("listing {}", self.dir.display()))?;
        Ok(entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json")))
    }

    /// Ids of every match already on disk.
    pub fn processed(&self) -> anyhow::Result<HashSet<MatchId>> {
        let processed = self
            .json_files()?
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                match stem.parse() {
                    Ok(id) => Some(id),
                    Err(err) => {
                        log::warn!("ignoring {}: {}", path.display(), err);
                        None
                    }
                }
            })
            .collect::<HashSet<_>>();
        log::info!(
            "{} matches already stored in {}",
            processed.len(),
            self.dir.display()
        );
        Ok(processed)
    }

    /// Writes the record verbatim. Returns `false` if the match was already stored.
    pub fn save(&self, id: &MatchId, record: &Value) -> anyhow::Result<bool> {
        let path = self.path_of(id);
        let content = serde_json::to_vec_pretty(record)?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                log::debug!("{} already stored, leaving it alone", id);
                return Ok(false);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("creating {}", path.display()));
            }
        };
        if let Err(err) = file.write_all(&content) {
            // don't leave a truncated record behind, it would be skipped forever
            drop(file);
            fs::remove_file(&path).ok();
            return Err(err).with_context(|| format!("writing {}", path.display()));
        }
        Ok(true)
    }

    /// Every stored record, unreadable files are logged and skipped.
    pub fn load_all(&self) -> anyhow::Result<Vec<(PathBuf, Value)>> {
        let mut records = vec![];
        for path in self.json_files()? {
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    log::warn!("skipping unreadable {}: {}", path.display(), err);
                    continue;
                }
            };
            match serde_json::from_str(&content) {
                Ok(record) => records.push((path, record)),
                Err(err) => log::warn!("skipping invalid json {}: {}", path.display(), err),
            }
        }
        Ok(records)
    }
}
