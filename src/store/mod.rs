//! Score persistence.
//!
//! The engine hands each finished round's `ScoreRecord` to a `ScoreStore`
//! and only cares whether it made the leaderboard.
//!
//! Leaderboards are kept per (game, difficulty code), best first, capped at
//! `LEADERBOARD_CAPACITY`. A record ranks after existing records with an
//! equal score. Unranked records and non-finite scores never make a table.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::game::score::ScoreRecord;

/// Entries kept per leaderboard.
pub const LEADERBOARD_CAPACITY: usize = 10;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the score file failed
    #[error("score file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Score file contents could not be (de)serialized
    #[error("score file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Persistence collaborator.
pub trait ScoreStore: Send + Sync {
    /// Record a finished round. Returns true when it made the leaderboard.
    fn submit_score(&self, record: &ScoreRecord) -> Result<bool, StoreError>;

    /// Current leaderboard for a game and difficulty, best first.
    fn leaderboard(&self, game: &str, difficulty_code: &str) -> Vec<ScoreRecord>;
}

// =============================================================================
// LEADERBOARDS
// =============================================================================

/// One (game, difficulty) table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardTable {
    /// Game name
    pub game: String,
    /// Difficulty code
    pub difficulty_code: String,
    /// Records, best first
    pub entries: Vec<ScoreRecord>,
}

#[derive(Debug, Default)]
struct Leaderboards {
    tables: BTreeMap<(String, String), Vec<ScoreRecord>>,
}

impl Leaderboards {
    fn from_tables(tables: Vec<LeaderboardTable>) -> Self {
        let tables = tables
            .into_iter()
            .map(|t| ((t.game, t.difficulty_code), t.entries))
            .collect();
        Self { tables }
    }

    fn to_tables(&self) -> Vec<LeaderboardTable> {
        self.tables
            .iter()
            .map(|((game, code), entries)| LeaderboardTable {
                game: game.clone(),
                difficulty_code: code.clone(),
                entries: entries.clone(),
            })
            .collect()
    }

    fn insert(&mut self, record: &ScoreRecord) -> bool {
        if !record.ranked || !record.normalized_score.is_finite() {
            return false;
        }
        let key = (record.game.clone(), record.difficulty_code.clone());
        let entries = self.tables.entry(key).or_default();

        // First position strictly worse than the new record.
        let pos = entries
            .iter()
            .position(|e| {
                record.order.rank(record.normalized_score, e.normalized_score)
                    == std::cmp::Ordering::Less
            })
            .unwrap_or(entries.len());

        if pos >= LEADERBOARD_CAPACITY {
            return false;
        }
        entries.insert(pos, record.clone());
        entries.truncate(LEADERBOARD_CAPACITY);
        true
    }

    fn get(&self, game: &str, difficulty_code: &str) -> Vec<ScoreRecord> {
        self.tables
            .get(&(game.to_string(), difficulty_code.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Leaderboards held in memory.
#[derive(Debug, Default)]
pub struct InMemoryScoreStore {
    boards: Mutex<Leaderboards>,
    submissions: Mutex<Vec<ScoreRecord>>,
}

impl InMemoryScoreStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record ever submitted, in order.
    pub fn submissions(&self) -> Vec<ScoreRecord> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of submissions.
    pub fn submission_count(&self) -> usize {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ScoreStore for InMemoryScoreStore {
    fn submit_score(&self, record: &ScoreRecord) -> Result<bool, StoreError> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        let high = self
            .boards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record);
        debug!(
            "Score {} for {} [{}] high={}",
            record.normalized_score, record.game, record.difficulty_label, high
        );
        Ok(high)
    }

    fn leaderboard(&self, game: &str, difficulty_code: &str) -> Vec<ScoreRecord> {
        self.boards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(game, difficulty_code)
    }
}

// =============================================================================
// JSON FILE STORE
// =============================================================================

/// Leaderboards persisted to one JSON file, rewritten after each submission.
#[derive(Debug)]
pub struct JsonFileScoreStore {
    path: PathBuf,
    boards: Mutex<Leaderboards>,
}

impl JsonFileScoreStore {
    /// Open `path`, loading existing tables. A missing file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let boards = match fs::read_to_string(&path) {
            Ok(text) => {
                let tables: Vec<LeaderboardTable> = serde_json::from_str(&text)?;
                info!("Loaded {} leaderboards from {}", tables.len(), path.display());
                Leaderboards::from_tables(tables)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Leaderboards::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            boards: Mutex::new(boards),
        })
    }

    /// File backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn boards(&self) -> MutexGuard<'_, Leaderboards> {
        self.boards.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ScoreStore for JsonFileScoreStore {
    fn submit_score(&self, record: &ScoreRecord) -> Result<bool, StoreError> {
        let mut boards = self.boards();
        let high = boards.insert(record);
        if high {
            let json = serde_json::to_string_pretty(&boards.to_tables())?;
            fs::write(&self.path, json)?;
        }
        Ok(high)
    }

    fn leaderboard(&self, game: &str, difficulty_code: &str) -> Vec<ScoreRecord> {
        self.boards().get(game, difficulty_code)
    }
}
