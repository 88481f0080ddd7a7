//! SweepLoop - 一定間隔で DueEvaluator を回す
//!
//! # 設計
//! - 1 タスクで sweep を直列に実行（sweep 同士が重ならない）
//! - 次の tick は前の sweep が終わってから待つ（MissedTickBehavior::Delay）
//! - 最初の tick は即時。起動時のフルスキャンが終わってから spawn すること
//! - `shutdown_tx` に true を送ると、実行中の sweep を終えてから止まる

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::app::evaluator::{DueEvaluator, SweepReport};
use crate::domain::NudgeError;

/// 既定は 3 分ごと
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(180);

pub struct SweepLoop {
    shutdown_tx: watch::Sender<bool>,
    reports: watch::Receiver<SweepReport>,
    join: JoinHandle<DueEvaluator>,
}

impl SweepLoop {
    pub fn spawn(evaluator: DueEvaluator, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (report_tx, reports) = watch::channel(SweepReport::default());
        let join = tokio::spawn(run(evaluator, interval, shutdown_rx, report_tx));
        Self {
            shutdown_tx,
            reports,
            join,
        }
    }

    /// 最新の sweep 結果。sweep ごとに `changed()` が起きる
    pub fn reports(&self) -> watch::Receiver<SweepReport> {
        self.reports.clone()
    }

    pub fn request_shutdown(&self) {
        // receiver は既に drop されているかもしれない
        let _ = self.shutdown_tx.send(true);
    }

    /// 停止して、終了処理用に評価器を返す
    pub async fn shutdown_and_join(self) -> Result<DueEvaluator, NudgeError> {
        self.request_shutdown();
        self.join
            .await
            .map_err(|e| NudgeError::Store(format!("sweep loop panicked: {e}")))
    }
}

async fn run(
    mut evaluator: DueEvaluator,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    report_tx: watch::Sender<SweepReport>,
) -> DueEvaluator {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = interval.as_secs(), "sweep loop started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    // sender dropped: nobody can stop us any more, treat as shutdown
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        let report = evaluator.sweep().await;
        let _ = report_tx.send(report);
    }

    debug!("sweep loop stopped");
    evaluator
}
