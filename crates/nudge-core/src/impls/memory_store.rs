//! InMemoryStateStore - テスト・開発用の StateStore
//!
//! 読み込み / 書き込みの失敗を注入できる。

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::domain::NudgeError;
use crate::ports::{PersistedState, StateStore};

#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    state: Mutex<Option<PersistedState>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    /// `load` を失敗させる（破損扱い）
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// `save` を失敗させる（保存内容は変えない）
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Option<PersistedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self) -> Result<Option<PersistedState>, NudgeError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(NudgeError::Store("injected load failure".into()));
        }
        Ok(self.snapshot())
    }

    fn save(&self, state: &PersistedState) -> Result<(), NudgeError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(NudgeError::Store("injected save failure".into()));
        }
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
