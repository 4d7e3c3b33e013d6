//! # Configuration
//!
//! Planillas configuration is managed by [`confique`], which layers values from
//! environment variables, an optional TOML file and compiled defaults.
//!
//! ## Resolution Order
//!
//! 1. **Environment variables**: `PLANILLAS_DOMAIN`, `PLANILLAS_MIRROR_URL`, etc.
//! 2. **Config file**: `planillas.toml` in the working directory, or the path
//!    given with `--config`.
//! 3. **Compiled defaults**: via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `domain` | `http://localhost:3001` | Public base URL for attachment links |
//! | `uploads_dir` | `uploads` | Attachments; snapshots go in `planillas/` below it |
//! | `db_file` | `db.json` | Local index document |
//! | `mirror.url` | unset | Remote document store; unset disables mirroring |
//! | `mirror.collection` | `planillas` | Collection path segment |
//! | `mirror.token` | unset | Bearer token for the mirror |
//! | `mirror.timeout_ms` | `5000` | Ceiling for each mirror call |

use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PlanillaError, Result};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "planillas.toml";

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlanillasConfig {
    /// Public base URL, e.g. "https://planillas.example.org".
    #[config(env = "PLANILLAS_DOMAIN", default = "http://localhost:3001")]
    pub domain: String,

    #[config(env = "PLANILLAS_UPLOADS_DIR", default = "uploads")]
    pub uploads_dir: PathBuf,

    #[config(env = "PLANILLAS_DB_FILE", default = "db.json")]
    pub db_file: PathBuf,

    #[config(nested)]
    pub mirror: MirrorConfig,
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    #[config(env = "PLANILLAS_MIRROR_URL")]
    pub url: Option<String>,

    #[config(env = "PLANILLAS_MIRROR_COLLECTION", default = "planillas")]
    pub collection: String,

    #[config(env = "PLANILLAS_MIRROR_TOKEN")]
    pub token: Option<String>,

    #[config(env = "PLANILLAS_MIRROR_TIMEOUT_MS", default = 5000)]
    pub timeout_ms: u64,
}

impl Default for PlanillasConfig {
    fn default() -> Self {
        Self {
            domain: "http://localhost:3001".to_string(),
            uploads_dir: PathBuf::from("uploads"),
            db_file: PathBuf::from("db.json"),
            mirror: MirrorConfig::default(),
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            url: None,
            collection: "planillas".to_string(),
            token: None,
            timeout_ms: 5000,
        }
    }
}

impl PlanillasConfig {
    /// Load from the environment and `path` (or [`DEFAULT_CONFIG_FILE`] if it
    /// exists). An explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.exists() => {
                return Err(PlanillaError::FileNotFound(path.display().to_string()));
            }
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };
        Ok(Self::builder().env().file(file).load()?)
    }

    /// Resolve relative paths against `base`.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        if self.uploads_dir.is_relative() {
            self.uploads_dir = base.join(&self.uploads_dir);
        }
        if self.db_file.is_relative() {
            self.db_file = base.join(&self.db_file);
        }
        self
    }
}

impl MirrorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn is_enabled(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PlanillasConfig::default();
        assert_eq!(config.domain, "http://localhost:3001");
        assert_eq!(config.uploads_dir, PathBuf::from("uploads"));
        assert_eq!(config.db_file, PathBuf::from("db.json"));
        assert!(!config.mirror.is_enabled());
        assert_eq!(config.mirror.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
domain = "https://planillas.example.org"
db_file = "data/db.json"

[mirror]
url = "http://mirror.local/v1"
timeout_ms = 250
"#
        )
        .unwrap();

        let config = PlanillasConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.domain, "https://planillas.example.org");
        assert_eq!(config.db_file, PathBuf::from("data/db.json"));
        assert_eq!(config.uploads_dir, PathBuf::from("uploads"));
        assert!(config.mirror.is_enabled());
        assert_eq!(config.mirror.collection, "planillas");
        assert_eq!(config.mirror.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            PlanillasConfig::load(Some(&missing)),
            Err(PlanillaError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_rooted_at_keeps_absolute_paths() {
        let config = PlanillasConfig {
            uploads_dir: PathBuf::from("/srv/uploads"),
            ..Default::default()
        }
        .rooted_at(Path::new("/work"));
        assert_eq!(config.uploads_dir, PathBuf::from("/srv/uploads"));
        assert_eq!(config.db_file, PathBuf::from("/work/db.json"));
    }

    #[test]
    fn test_blank_mirror_url_is_disabled() {
        let mirror = MirrorConfig {
            url: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(!mirror.is_enabled());
    }
}
