use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

pub const MONGO_URI_ENV: &str = "DELIVERYDESK_MONGO_URI";
pub const DATABASE_ENV: &str = "DELIVERYDESK_DATABASE";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LocalConfig {
    pub mongo_uri: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub remember_server: bool,
}

impl LocalConfig {
    /// Layers environment values and then explicit overrides on top of the
    /// stored file. Empty strings count as unset.
    pub fn resolve(
        mut self,
        env: impl Fn(&str) -> Option<String>,
        uri_override: Option<String>,
        database_override: Option<String>,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        if let Some(uri) = non_empty(uri_override).or_else(|| non_empty(env(MONGO_URI_ENV))) {
            self.mongo_uri = Some(uri);
        }
        if let Some(db) = non_empty(database_override).or_else(|| non_empty(env(DATABASE_ENV))) {
            self.database = Some(db);
        }
        self
    }
}

fn config_path() -> anyhow::Result<PathBuf> {
    let dirs = ProjectDirs::from("dev", "DeliveryDesk", "DeliveryDesk")
        .ok_or_else(|| anyhow::anyhow!("cannot resolve config dir"))?;
    let file = dirs.config_dir().join("config.json");
    fs::create_dir_all(dirs.config_dir())?;
    Ok(file)
}

pub fn load() -> anyhow::Result<LocalConfig> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(LocalConfig::default());
    }
    let bytes = fs::read(p)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn save(cfg: &LocalConfig) -> anyhow::Result<()> {
    let p = config_path()?;
    let bytes = serde_json::to_vec_pretty(cfg)?;
    fs::write(p, bytes)?;
    Ok(())
}
