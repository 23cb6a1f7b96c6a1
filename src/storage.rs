use crate::config::write_atomic;
use crate::geometry::Position;
use crate::model::{BackpackItem, PetStats};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;

pub(crate) const SAVE_VERSION: u32 = 1;

/// What the host keeps between runs. `stats` holds the displayed values, so
/// changes that had not settled yet are folded in.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct SaveFile {
    pub(crate) version: u32,
    pub(crate) last_seen_utc: DateTime<Utc>,
    pub(crate) stats: PetStats,
    pub(crate) steps: u64,
    /// Paw points already redeemed through cash-in.
    #[serde(default)]
    pub(crate) wallet: i64,
    pub(crate) backpack: Vec<BackpackItem>,
}

impl SaveFile {
    pub(crate) fn new_game() -> Self {
        Self {
            version: SAVE_VERSION,
            last_seen_utc: Utc::now(),
            stats: PetStats::default(),
            steps: 0,
            wallet: 0,
            backpack: starter_backpack(),
        }
    }
}

fn starter_backpack() -> Vec<BackpackItem> {
    let item = |id: &str, key: &str, location: Option<Position>| BackpackItem {
        id: id.to_string(),
        key: key.to_string(),
        location,
    };
    vec![
        item("apple-1", "apple", Some(Position::new(20.0, 30.0))),
        item("bone-1", "bone", Some(Position::new(320.0, 40.0))),
        item("ball-1", "ball", Some(Position::new(330.0, 230.0))),
        item("medicine-1", "medicine", None),
        item("apple-2", "apple", None),
    ]
}

pub(crate) fn load_or_init_save(path: &Path) -> SaveFile {
    let Ok(s) = fs::read_to_string(path) else {
        return SaveFile::new_game();
    };
    match serde_json::from_str::<SaveFile>(&s) {
        Ok(save) => save,
        Err(e) => {
            warn!(path = %path.display(), "save unreadable, starting over: {e}");
            SaveFile::new_game()
        }
    }
}

pub(crate) fn save_atomic(path: &Path, save: &SaveFile) -> Result<()> {
    let data = serde_json::to_vec_pretty(save)?;
    write_atomic(path, &data)
}
