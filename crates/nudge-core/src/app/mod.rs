//! App - アプリケーション層
//!
//! ports と core（parser, cache, notified）を組み合わせてアプリケーションを構成します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **DueEvaluator**: 期限到来タスクの評価（sweep）
//! - **SweepLoop**: 一定間隔で sweep を回す
//! - **DocumentIngestor**: ドキュメント変更を TaskCache に反映
//! - **status**: タスク一覧と件数

pub mod builder;
pub mod evaluator;
pub mod ingest;
pub mod status;
pub mod sweep_loop;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError, RunningApp};
pub use self::evaluator::{DueEvaluator, SweepReport};
pub use self::ingest::{DocumentIngestor, IngestLoop};
pub use self::status::{TaskCounts, TaskStatusView};
pub use self::sweep_loop::{DEFAULT_SWEEP_INTERVAL, SweepLoop};
