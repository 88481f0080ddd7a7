//! DueEvaluator - 期限到来タスクの評価と通知
//!
//! # フロー（1 sweep）
//! 1. TaskCache::all() でスナップショットを取る
//! 2. 各タスクで now を取得し、due <= now かつ未通知なら
//! 3. NotifiedSet::add()（先に記録・即時永続化）
//! 4. Notifier::deliver()（失敗しても Fired のまま、リトライなし）
//!
//! # 不変条件
//! - 同じ identity に対する通知は高々 1 回
//! - NotifiedSet に identity を追加するのはこの評価器だけ

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::app::status::{TaskCounts, TaskStatusView};
use crate::cache::TaskCache;
use crate::domain::{Notification, NudgeError, Task, TaskState};
use crate::notified::NotifiedSet;
use crate::ports::{Clock, Notifier};

/// 1 回の sweep の結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// スナップショット中のタスク数
    pub examined: usize,
    /// `due <= now` のタスク数（通知済みも含む）
    pub due: usize,
    /// この sweep で PENDING -> FIRED になった数
    pub fired: usize,
    pub delivered: usize,
    pub delivery_failed: usize,
    /// 通知先未設定のため配送しなかった数
    pub dispatch_skipped: usize,
    /// Fired にしたが永続化に失敗した数
    pub persist_failed: usize,
}

pub struct DueEvaluator {
    cache: Arc<TaskCache>,
    notified: NotifiedSet,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl DueEvaluator {
    pub fn new(
        cache: Arc<TaskCache>,
        notified: NotifiedSet,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            notified,
            notifier,
            clock,
        }
    }

    pub fn cache(&self) -> &Arc<TaskCache> {
        &self.cache
    }

    pub fn notified(&self) -> &NotifiedSet {
        &self.notified
    }

    pub fn state_of(&self, task: &Task) -> TaskState {
        TaskState::from_fired(self.notified.contains(task.identity()))
    }

    /// キャッシュのスナップショットを 1 回評価する
    pub async fn sweep(&mut self) -> SweepReport {
        let tasks = self.cache.all().await;
        let mut report = SweepReport {
            examined: tasks.len(),
            ..SweepReport::default()
        };

        for task in &tasks {
            let now = self.clock.now();
            if !task.is_due_at(now) {
                continue;
            }
            report.due += 1;
            if self.notified.contains(task.identity()) {
                continue;
            }

            // 記録が先。配送の成否に関わらず Fired
            if let Err(e) = self.notified.add(task.identity().clone()).await {
                warn!(identity = %task.identity(), error = %e, "fired task not persisted");
                report.persist_failed += 1;
            }
            report.fired += 1;
            info!(identity = %task.identity(), due = %task.due(), "task due, firing");

            self.dispatch(task, &mut report).await;
        }

        if report.fired > 0 {
            info!(
                examined = report.examined,
                fired = report.fired,
                delivered = report.delivered,
                failed = report.delivery_failed,
                skipped = report.dispatch_skipped,
                "sweep finished"
            );
        } else {
            debug!(examined = report.examined, due = report.due, "sweep finished, nothing to fire");
        }
        report
    }

    async fn dispatch(&self, task: &Task, report: &mut SweepReport) {
        if !self.notifier.is_configured() {
            warn!(
                identity = %task.identity(),
                "no notification endpoint configured, skipping dispatch"
            );
            report.dispatch_skipped += 1;
            return;
        }

        match self.notifier.deliver(&Notification::reminder(task)).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                error!(identity = %task.identity(), error = %e, "notification delivery failed");
                report.delivery_failed += 1;
            }
        }
    }

    /// キャッシュ中の全タスクと状態（due 順）
    pub async fn status(&self) -> Vec<TaskStatusView> {
        let now = self.clock.now();
        self.cache
            .all()
            .await
            .iter()
            .map(|task| TaskStatusView::new(task, self.state_of(task), now))
            .collect()
    }

    pub async fn counts(&self) -> TaskCounts {
        TaskCounts::from_views(&self.status().await)
    }

    /// 通知済み集合を書き出す（終了処理用）
    pub async fn flush(&self) -> Result<(), NudgeError> {
        self.notified.flush().await
    }
}

impl std::fmt::Debug for DueEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DueEvaluator")
            .field("notified", &self.notified)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentId, TaskIdentity};
    use crate::impls::{InMemoryStateStore, RecordingNotifier};
    use crate::ports::{FixedClock, PersistedState};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    struct Fixture {
        cache: Arc<TaskCache>,
        store: Arc<InMemoryStateStore>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<FixedClock>,
    }

    impl Fixture {
        fn new(now: DateTime<Utc>) -> Self {
            Self::with_store(now, InMemoryStateStore::new())
        }

        fn with_store(now: DateTime<Utc>, store: InMemoryStateStore) -> Self {
            Self {
                cache: Arc::new(TaskCache::new()),
                store: Arc::new(store),
                notifier: Arc::new(RecordingNotifier::new()),
                clock: Arc::new(FixedClock::new(now)),
            }
        }

        fn evaluator(&self) -> DueEvaluator {
            DueEvaluator::new(
                self.cache.clone(),
                NotifiedSet::load(self.store.clone()),
                self.notifier.clone(),
                self.clock.clone(),
            )
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn future_task_does_not_fire() {
        let fx = Fixture::new(at(8));
        fx.cache.replace(DocumentId::new("a.md"), vec![Task::new("later", at(9))]).await;
        let mut evaluator = fx.evaluator();

        let report = evaluator.sweep().await;
        assert_eq!(report.fired, 0);
        assert!(fx.notifier.attempts().is_empty());
    }

    #[tokio::test]
    async fn due_task_fires_exactly_once_across_sweeps() {
        let fx = Fixture::new(at(8));
        fx.cache.replace(DocumentId::new("a.md"), vec![Task::new("call", at(9))]).await;
        let mut evaluator = fx.evaluator();

        evaluator.sweep().await;
        fx.clock.set(at(9));
        let report = evaluator.sweep().await;
        assert_eq!(report.fired, 1);
        assert_eq!(report.delivered, 1);

        fx.clock.advance(Duration::minutes(3));
        let report = evaluator.sweep().await;
        assert_eq!(report.due, 1);
        assert_eq!(report.fired, 0);

        let delivered = fx.notifier.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].title, "Reminder");
        assert_eq!(delivered[0].body, "call");
        assert_eq!(delivered[0].timestamp, "2025-01-01T09:00:00.000Z");
    }

    #[tokio::test]
    async fn cold_start_fires_every_overdue_task_once() {
        let fx = Fixture::new(at(12));
        fx.cache
            .replace(
                DocumentId::new("a.md"),
                vec![Task::new("one", at(1)), Task::new("two", at(2)), Task::new("later", at(13))],
            )
            .await;
        fx.cache.replace(DocumentId::new("b.md"), vec![Task::new("one", at(1))]).await;
        let mut evaluator = fx.evaluator();

        let report = evaluator.sweep().await;
        assert_eq!(report.examined, 3);
        assert_eq!(report.fired, 2);
        assert_eq!(fx.notifier.delivered().len(), 2);
    }

    #[tokio::test]
    async fn persisted_identity_suppresses_refire() {
        let state = PersistedState {
            notified_tasks: vec![TaskIdentity::new("X-2025-01-01T09:00:00.000Z")],
            ..PersistedState::default()
        };
        let fx = Fixture::with_store(at(12), InMemoryStateStore::with_state(state));
        fx.cache.replace(DocumentId::new("a.md"), vec![Task::new("X", at(9))]).await;
        let mut evaluator = fx.evaluator();

        let report = evaluator.sweep().await;
        assert_eq!(report.due, 1);
        assert_eq!(report.fired, 0);
        assert!(fx.notifier.attempts().is_empty());
    }

    #[tokio::test]
    async fn identity_is_recorded_before_delivery() {
        let fx = Fixture::new(at(12));
        fx.cache.replace(DocumentId::new("a.md"), vec![Task::new("X", at(9))]).await;
        let mut evaluator = fx.evaluator();

        evaluator.sweep().await;
        let persisted = fx.store.snapshot().unwrap().notified_tasks;
        assert_eq!(persisted, vec![TaskIdentity::new("X-2025-01-01T09:00:00.000Z")]);
    }

    #[tokio::test]
    async fn delivery_failure_still_counts_as_fired() {
        let fx = Fixture::new(at(12));
        fx.notifier.set_failing(true);
        fx.cache.replace(DocumentId::new("a.md"), vec![Task::new("X", at(9))]).await;
        let mut evaluator = fx.evaluator();

        let report = evaluator.sweep().await;
        assert_eq!(report.fired, 1);
        assert_eq!(report.delivery_failed, 1);

        fx.notifier.set_failing(false);
        let report = evaluator.sweep().await;
        assert_eq!(report.fired, 0);
        assert_eq!(fx.notifier.attempts().len(), 1);
        assert!(fx.notifier.delivered().is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_keeps_in_memory_guard() {
        let fx = Fixture::new(at(12));
        fx.store.fail_saves(true);
        fx.cache.replace(DocumentId::new("a.md"), vec![Task::new("X", at(9))]).await;
        let mut evaluator = fx.evaluator();

        let report = evaluator.sweep().await;
        assert_eq!(report.persist_failed, 1);
        assert_eq!(report.delivered, 1);

        let report = evaluator.sweep().await;
        assert_eq!(report.fired, 0);
        assert_eq!(fx.notifier.attempts().len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_endpoint_skips_dispatch_but_records() {
        let fx = Fixture::new(at(12));
        fx.notifier.set_configured(false);
        fx.cache.replace(DocumentId::new("a.md"), vec![Task::new("X", at(9))]).await;
        let mut evaluator = fx.evaluator();

        let report = evaluator.sweep().await;
        assert_eq!(report.fired, 1);
        assert_eq!(report.dispatch_skipped, 1);
        assert!(fx.notifier.attempts().is_empty());
        assert!(evaluator.notified().contains(&TaskIdentity::new("X-2025-01-01T09:00:00.000Z")));
    }

    #[tokio::test]
    async fn late_discovered_overdue_task_fires_on_next_sweep() {
        let fx = Fixture::new(at(12));
        let mut evaluator = fx.evaluator();
        assert_eq!(evaluator.sweep().await.examined, 0);

        fx.cache.replace(DocumentId::new("a.md"), vec![Task::new("old", at(1))]).await;
        assert_eq!(evaluator.sweep().await.fired, 1);
    }

    #[tokio::test]
    async fn status_reports_states() {
        let fx = Fixture::new(at(10));
        fx.cache
            .replace(
                DocumentId::new("a.md"),
                vec![Task::new("fired", at(8)), Task::new("pending", at(11))],
            )
            .await;
        let mut evaluator = fx.evaluator();
        evaluator.sweep().await;
        fx.cache.replace(DocumentId::new("b.md"), vec![Task::new("overdue", at(9))]).await;

        let counts = evaluator.counts().await;
        assert_eq!(counts, TaskCounts { pending: 1, overdue: 1, fired: 1 });
    }
}
