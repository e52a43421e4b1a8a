use dossier_core::config::AppConfig;
use std::path::PathBuf;

pub const USER_NAME: &str = "USER_NAME";
pub const RESUME_FOLDER: &str = "RESUME_FOLDER";
pub const DATA_DIR: &str = "DATA_DIR";

/// Process environment the pipeline reads. Only the binary looks at the
/// environment; the core takes these values as arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub user_name: Option<String>,
    pub resume_folder: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            user_name: get(USER_NAME),
            resume_folder: get(RESUME_FOLDER).map(PathBuf::from),
            data_dir: get(DATA_DIR).map(PathBuf::from),
        }
    }

    /// `DATA_DIR` replaces `data_dir`; `RESUME_FOLDER` is used only when
    /// `scan.include` is empty.
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(dir) = &self.data_dir {
            cfg.data_dir = dir.clone();
        }
        if cfg.scan.include.is_empty() {
            if let Some(folder) = &self.resume_folder {
                cfg.scan.include = vec![folder.to_string_lossy().into_owned()];
            }
        }
    }
}
