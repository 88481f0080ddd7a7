//! TaskCache - ドキュメントごとのタスクスナップショット
//!
//! # 設計原則
//! - 書き込みはドキュメント単位の丸ごと置換（部分更新なし）
//! - 評価側は `all()` でスナップショットを取る（identity で重複排除）
//! - 永続化しない（起動時のフルスキャンで再構築）

use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;

use crate::domain::{DocumentId, Task, TaskIdentity};

#[derive(Debug, Default)]
pub struct TaskCache {
    by_document: RwLock<HashMap<DocumentId, Vec<Task>>>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// ドキュメント 1 件分のタスクを丸ごと置き換える。空ならエントリごと削除
    pub async fn replace(&self, document: DocumentId, tasks: Vec<Task>) {
        let mut guard = self.by_document.write().await;
        if tasks.is_empty() {
            guard.remove(&document);
        } else {
            guard.insert(document, tasks);
        }
    }

    /// タスクを新しい id に移す（`to` の既存分は上書き）
    pub async fn rename(&self, from: &DocumentId, to: DocumentId) {
        let mut guard = self.by_document.write().await;
        match guard.remove(from) {
            Some(tasks) => {
                guard.insert(to, tasks);
            }
            None => {
                guard.remove(&to);
            }
        }
    }

    /// 全ドキュメントのタスクを identity で重複排除した和集合（due 順）
    pub async fn all(&self) -> Vec<Task> {
        let guard = self.by_document.read().await;
        let mut unique: BTreeMap<&TaskIdentity, &Task> = BTreeMap::new();
        for task in guard.values().flatten() {
            unique.entry(task.identity()).or_insert(task);
        }
        let mut tasks: Vec<Task> = unique.into_values().cloned().collect();
        tasks.sort_by(|a, b| a.due().cmp(&b.due()).then_with(|| a.identity().cmp(b.identity())));
        tasks
    }

    pub async fn tasks_for(&self, document: &DocumentId) -> Vec<Task> {
        let guard = self.by_document.read().await;
        guard.get(document).cloned().unwrap_or_default()
    }

    /// タスクを 1 件以上持つドキュメント
    pub async fn documents(&self) -> Vec<DocumentId> {
        let guard = self.by_document.read().await;
        let mut ids: Vec<DocumentId> = guard.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// 異なる identity の数
    pub async fn len(&self) -> usize {
        self.all().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.by_document.read().await.is_empty()
    }
}
