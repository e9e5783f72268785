use std::path::Path;

use anyhow::Context;

use crate::riot::PlayerRef;

/// Reads the player list, a csv with a `riot_id,tag` header.
pub fn load_players(path: &Path) -> anyhow::Result<Vec<PlayerRef>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening player list {}", path.display()))?;
    let mut players = vec![];
    for (line, record) in reader.deserialize::<PlayerRef>().enumerate() {
        let player = record.with_context(|| format!("player list row {}", line + 1))?;
        if player.game_name.is_empty() || player.tag.is_empty() {
            log::warn!("player list row {} is incomplete, skipping", line + 1);
            continue;
        }
        players.push(player);
    }
    log::info!("{} players loaded from {}", players.len(), path.display());
    Ok(players)
}
