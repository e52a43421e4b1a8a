use crate::ownership::UnknownOwnership;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the per-stage inventory snapshots.
    pub data_dir: PathBuf,
    pub patterns_path: PathBuf,
    pub scan: ScanPaths,
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            patterns_path: PathBuf::from("config/classification_config.json"),
            scan: ScanPaths::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanPaths {
    /// Empty means `RESUME_FOLDER`.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for ScanPaths {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: vec!["**/node_modules/**".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: usize,
    /// Zero disables the per-file timeout.
    pub extraction_timeout_secs: u64,
    pub unknown_ownership: UnknownOwnership,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            extraction_timeout_secs: 30,
            unknown_ownership: UnknownOwnership::NotOwned,
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("DOSSIER")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
