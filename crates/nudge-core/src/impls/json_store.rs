//! JsonFileStateStore - JSON ファイルへの永続化
//!
//! # 実装詳細
//! - 形式: `{ "settings": {...}, "notifiedTasks": [...] }`
//! - 書き込みは一時ファイル → rename（途中でクラッシュしても壊れない）
//! - ファイルが無ければ `Ok(None)`、壊れていれば `Err`

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::NudgeError;
use crate::ports::{PersistedState, StateStore};

#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self) -> Result<Option<PersistedState>, NudgeError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(NudgeError::io(&self.path, e)),
        };
        let state = serde_json::from_str(&content).map_err(|e| {
            NudgeError::Store(format!("corrupt state file {}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "loaded state file");
        Ok(Some(state))
    }

    fn save(&self, state: &PersistedState) -> Result<(), NudgeError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| NudgeError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| NudgeError::Store(format!("cannot serialize state: {e}")))?;

        let tmp = self.temp_path();
        std::fs::write(&tmp, json).map_err(|e| NudgeError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| NudgeError::io(&self.path, e))?;
        Ok(())
    }
}
