//! Config - TOML 設定ファイル
//!
//! 通知先（webhook URL）はここではなく、永続化された `settings` レコードに持つ。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::NudgeError;
use crate::parser::{DEFAULT_MARKER_TAG, MarkerGrammar};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NudgeConfig {
    /// ノートのルートディレクトリ
    pub notes_dir: PathBuf,
    /// 永続化ファイル。相対パスは `notes_dir` 基準
    pub state_path: PathBuf,
    pub sweep_interval_secs: u64,
    pub marker_tag: String,
    /// ドキュメントとして扱う拡張子
    pub extensions: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            notes_dir: PathBuf::from("."),
            state_path: PathBuf::from(".nudge/data.json"),
            sweep_interval_secs: 180,
            marker_tag: DEFAULT_MARKER_TAG.to_string(),
            extensions: vec!["md".to_string()],
            request_timeout_secs: 10,
        }
    }
}

impl NudgeConfig {
    pub fn from_file(path: &Path) -> Result<Self, NudgeError> {
        let content = std::fs::read_to_string(path).map_err(|e| NudgeError::io(path, e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| NudgeError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NudgeError> {
        if self.sweep_interval_secs == 0 {
            return Err(NudgeError::Config("sweep_interval_secs must be greater than zero".into()));
        }
        if self.marker_tag.trim().is_empty() {
            return Err(NudgeError::Config("marker_tag must not be empty".into()));
        }
        if self.extensions.is_empty() {
            return Err(NudgeError::Config("extensions must not be empty".into()));
        }
        Ok(())
    }

    pub fn resolved_state_path(&self) -> PathBuf {
        if self.state_path.is_absolute() {
            self.state_path.clone()
        } else {
            self.notes_dir.join(&self.state_path)
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn grammar(&self) -> Result<MarkerGrammar, NudgeError> {
        MarkerGrammar::new(self.marker_tag.clone())
    }
}
