use crate::engine::EngineConfig;
use crate::geometry::HitBox;
use crate::model::ItemCatalog;
use crate::wellbeing::DecayConfig;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::warn;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct Settings {
    /// How long an optimistic stat change stays on display before it is
    /// folded into the canonical stats.
    pub(crate) reconcile_delay_ms: u64,
    pub(crate) hurt_threshold: i32,
    pub(crate) creature_hit_box: HitBox,
    pub(crate) steps_per_paw_point: u32,
    pub(crate) decay: DecayConfig,
    pub(crate) items: ItemCatalog,
    pub(crate) pedometer_interval_ms: u64,
    pub(crate) fps_cap: u32,
    pub(crate) seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reconcile_delay_ms: 2200,
            hurt_threshold: 50,
            creature_hit_box: HitBox::default(),
            steps_per_paw_point: 1,
            decay: DecayConfig::default(),
            items: ItemCatalog::default(),
            pedometer_interval_ms: 3000,
            fps_cap: 30,
            seed: 0xC0FFEE_u64,
        }
    }
}

impl Settings {
    pub(crate) fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            reconcile_delay: Duration::from_millis(self.reconcile_delay_ms),
            hurt_threshold: self.hurt_threshold,
            creature_hit_box: self.creature_hit_box,
            steps_per_paw_point: self.steps_per_paw_point,
            catalog: self.items.clone(),
        }
    }
}

pub(crate) struct Paths {
    pub(crate) save_path: PathBuf,
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "pawpet", "PawPet")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(Paths {
        save_path: dir.join("save.json"),
        settings_path: dir.join("settings.json"),
        log_path: dir.join("pawpet.log"),
    })
}

/// Missing file means defaults; a malformed one is reported and ignored.
pub(crate) fn load_settings(path: &Path) -> Settings {
    let Ok(s) = fs::read_to_string(path) else {
        return Settings::default();
    };
    match serde_json::from_str::<Settings>(&s) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), "ignoring malformed settings: {e}");
            Settings::default()
        }
    }
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let data = serde_json::to_vec_pretty(s)?;
    write_atomic(path, &data)
}

pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
    // rename over an existing file is atomic on the same filesystem (unix)
    if path.exists() {
        let _ = fs::remove_file(path);
    }
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
