//! NotifiedSet - 通知済み identity の永続集合
//!
//! # 不変条件
//! - 一度追加された identity は自動では削除されない（再通知しない）
//! - `add` のたびに全体を即時永続化（write-through）
//! - 永続化に失敗してもメモリ上の追加は取り消さない
//! - 読み込み失敗・破損はコールドスタート（空集合）として扱う
//! - 書き込むのは `notifiedTasks` だけ。`settings` は保存済みの値を引き継ぐ

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::{NudgeError, TaskIdentity};
use crate::ports::{PersistedState, StateStore, StoredSettings};

pub struct NotifiedSet {
    identities: HashSet<TaskIdentity>,
    settings: StoredSettings,
    store: Arc<dyn StateStore>,
}

impl NotifiedSet {
    /// `store` から復元する。無い・読めない場合は空集合
    pub fn load(store: Arc<dyn StateStore>) -> Self {
        let state = match store.load() {
            Ok(Some(state)) => state,
            Ok(None) => {
                info!("no persisted state, starting with an empty notified set");
                PersistedState::default()
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "cannot load persisted state, starting with an empty notified set"
                );
                PersistedState::default()
            }
        };

        let identities: HashSet<TaskIdentity> = state.notified_tasks.into_iter().collect();
        debug!(count = identities.len(), "loaded notified set");
        Self {
            identities,
            settings: state.settings,
            store,
        }
    }

    pub fn contains(&self, identity: &TaskIdentity) -> bool {
        self.identities.contains(identity)
    }

    /// 追加して即時永続化する
    ///
    /// 既に含まれていれば `Ok(false)`（書き込みなし）。永続化に失敗しても
    /// メモリ上には残し、エラーだけ返す。
    pub async fn add(&mut self, identity: TaskIdentity) -> Result<bool, NudgeError> {
        if !self.identities.insert(identity) {
            return Ok(false);
        }
        self.persist().await?;
        Ok(true)
    }

    /// `live` に無い identity を削除する。evaluator からは呼ばない
    pub async fn prune_absent(
        &mut self,
        live: &HashSet<TaskIdentity>,
    ) -> Result<usize, NudgeError> {
        let before = self.identities.len();
        self.identities.retain(|id| live.contains(id));
        let removed = before - self.identities.len();
        if removed > 0 {
            self.persist().await?;
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// 起動時に読み込んだ settings
    pub fn settings(&self) -> &StoredSettings {
        &self.settings
    }

    /// ソート済みの identity 一覧
    pub fn identities(&self) -> Vec<TaskIdentity> {
        let mut ids: Vec<TaskIdentity> = self.identities.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// 全体を書き出す（終了処理用）
    pub async fn flush(&self) -> Result<(), NudgeError> {
        self.persist().await
    }

    async fn persist(&self) -> Result<(), NudgeError> {
        let store = self.store.clone();
        let identities = self.identities();
        let fallback = self.settings.clone();
        tokio::task::spawn_blocking(move || write_identities(store.as_ref(), identities, fallback))
            .await
            .map_err(|e| NudgeError::Store(format!("persist task failed: {e}")))?
            .inspect_err(|e| {
                error!(error = %e, "cannot persist notified set");
            })
    }
}

/// `notifiedTasks` だけを差し替えて保存する
///
/// `settings` は `set-webhook` が別プロセスから書き換えるので、書き込み直前に
/// 読み直した値を使う。読めないときは起動時の値で埋める。
fn write_identities(
    store: &dyn StateStore,
    identities: Vec<TaskIdentity>,
    fallback: StoredSettings,
) -> Result<(), NudgeError> {
    let settings = match store.load() {
        Ok(state) => state.unwrap_or_default().settings,
        Err(e) => {
            warn!(
                error = %e,
                "cannot re-read persisted settings, keeping the ones loaded at startup"
            );
            fallback
        }
    };
    store.save(&PersistedState {
        settings,
        notified_tasks: identities,
    })
}

/// `settings` を差し替える。`notifiedTasks` は保存済みのまま
///
/// `NotifiedSet::load` と違い、読めない状態はエラーにする（壊れたファイルを
/// 空の identity 一覧で上書きしないため）。
pub fn store_settings(store: &dyn StateStore, settings: StoredSettings) -> Result<(), NudgeError> {
    let mut state = store.load()?.unwrap_or_default();
    state.settings = settings;
    store.save(&state)
}

impl std::fmt::Debug for NotifiedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifiedSet")
            .field("len", &self.identities.len())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryStateStore;

    fn id(s: &str) -> TaskIdentity {
        TaskIdentity::new(s)
    }

    #[test]
    fn absent_state_is_cold_start() {
        let store = Arc::new(InMemoryStateStore::new());
        let set = NotifiedSet::load(store);
        assert!(set.is_empty());
    }

    #[test]
    fn corrupt_state_is_cold_start() {
        let store = Arc::new(InMemoryStateStore::new());
        store.fail_loads(true);
        let set = NotifiedSet::load(store);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn add_writes_through() {
        let store = Arc::new(InMemoryStateStore::new());
        let mut set = NotifiedSet::load(store.clone());

        assert!(set.add(id("a")).await.unwrap());
        assert_eq!(store.snapshot().unwrap().notified_tasks, vec![id("a")]);
        assert_eq!(store.save_count(), 1);

        // 既存の identity は書き込まない
        assert!(!set.add(id("a")).await.unwrap());
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn failed_write_keeps_memory_insertion() {
        let store = Arc::new(InMemoryStateStore::new());
        store.fail_saves(true);
        let mut set = NotifiedSet::load(store.clone());

        assert!(set.add(id("a")).await.is_err());
        assert!(set.contains(&id("a")));
        assert!(store.snapshot().is_none());
    }

    #[tokio::test]
    async fn reload_restores_identities_and_settings() {
        let store = Arc::new(InMemoryStateStore::with_state(PersistedState {
            settings: StoredSettings {
                webhook_url: Some("https://example.invalid/hook".into()),
            },
            notified_tasks: vec![],
        }));
        let mut set = NotifiedSet::load(store.clone());
        set.add(id("X-2025-01-01T09:00:00.000Z")).await.unwrap();

        let reloaded = NotifiedSet::load(store);
        assert!(reloaded.contains(&id("X-2025-01-01T09:00:00.000Z")));
        assert_eq!(reloaded.settings().endpoint(), Some("https://example.invalid/hook"));
    }

    #[tokio::test]
    async fn store_settings_keeps_identities() {
        let store = Arc::new(InMemoryStateStore::new());
        let mut set = NotifiedSet::load(store.clone());
        set.add(id("a")).await.unwrap();

        store_settings(
            store.as_ref(),
            StoredSettings {
                webhook_url: Some("https://example.invalid/new".into()),
            },
        )
        .unwrap();

        let state = store.snapshot().unwrap();
        assert_eq!(state.notified_tasks, vec![id("a")]);
        assert_eq!(state.settings.endpoint(), Some("https://example.invalid/new"));
    }

    #[test]
    fn store_settings_refuses_unreadable_state() {
        let store = InMemoryStateStore::new();
        store.fail_loads(true);
        assert!(store_settings(&store, StoredSettings::default()).is_err());
    }

    #[tokio::test]
    async fn prune_absent_removes_only_dead_identities() {
        let store = Arc::new(InMemoryStateStore::new());
        let mut set = NotifiedSet::load(store.clone());
        set.add(id("a")).await.unwrap();
        set.add(id("b")).await.unwrap();

        let live: HashSet<TaskIdentity> = [id("b")].into_iter().collect();
        assert_eq!(set.prune_absent(&live).await.unwrap(), 1);
        assert_eq!(set.identities(), vec![id("b")]);
        assert_eq!(store.snapshot().unwrap().notified_tasks, vec![id("b")]);
    }

    #[tokio::test]
    async fn write_keeps_settings_changed_after_load() {
        let store = Arc::new(InMemoryStateStore::new());
        let mut set = NotifiedSet::load(store.clone());

        // 常駐中に別プロセスが webhook を設定する
        store_settings(
            store.as_ref(),
            StoredSettings {
                webhook_url: Some("https://example.invalid/new".into()),
            },
        )
        .unwrap();

        set.add(id("a")).await.unwrap();
        let state = store.snapshot().unwrap();
        assert_eq!(state.settings.endpoint(), Some("https://example.invalid/new"));
        assert_eq!(state.notified_tasks, vec![id("a")]);

        set.flush().await.unwrap();
        let state = store.snapshot().unwrap();
        assert_eq!(state.settings.endpoint(), Some("https://example.invalid/new"));
    }

    #[tokio::test]
    async fn write_falls_back_to_loaded_settings_when_store_unreadable() {
        let store = Arc::new(InMemoryStateStore::with_state(PersistedState {
            settings: StoredSettings {
                webhook_url: Some("https://example.invalid/hook".into()),
            },
            notified_tasks: vec![],
        }));
        let mut set = NotifiedSet::load(store.clone());
        store.fail_loads(true);

        set.add(id("a")).await.unwrap();
        let state = store.snapshot().unwrap();
        assert_eq!(state.settings.endpoint(), Some("https://example.invalid/hook"));
    }
}
