use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::models::{Player, PlayerStats};
use crate::db::{PlayerStore, StoreError};

/// Failures of a single-player lookup.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("player {id} not found")]
    NotFound { id: i64 },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Read-only player directory: search, per-player stats, top ranked.
pub struct PlayerDirectory {
    store: Arc<dyn PlayerStore>,
}

impl PlayerDirectory {
    pub fn new(store: Arc<dyn PlayerStore>) -> Self {
        PlayerDirectory { store }
    }

    /// Players whose name contains `query`, ignoring case. A storage failure
    /// is logged and reads as no matches.
    pub fn search(&self, query: &str) -> Vec<Player> {
        info!("Searching players with query: {}", query);
        self.store.search_players(query).unwrap_or_else(|e| {
            error!("Player search failed: {}", e);
            Vec::new()
        })
    }

    pub fn stats(&self, id: i64) -> Result<PlayerStats, PlayerError> {
        self.store
            .find_player(id)?
            .map(PlayerStats::from)
            .ok_or(PlayerError::NotFound { id })
    }

    /// Up to `limit` best-ranked players. Failures read as an empty list, as
    /// for [`PlayerDirectory::search`].
    pub fn top(&self, limit: u32) -> Vec<Player> {
        self.store.top_players(limit).unwrap_or_else(|e| {
            error!("Top players lookup failed: {}", e);
            Vec::new()
        })
    }

    /// Insert `players` when the directory is still empty. Returns how many
    /// were inserted.
    pub fn seed(&self, players: &[Player]) -> Result<usize, StoreError> {
        if self.store.player_count()? > 0 {
            return Ok(0);
        }
        for player in players {
            self.store.insert_player(player)?;
        }
        Ok(players.len())
    }
}

/// Parse a JSON array of players from `path`.
pub fn load_seed_file(path: &Path) -> Result<Vec<Player>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read player seed file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid player seed file {}", path.display()))
}
