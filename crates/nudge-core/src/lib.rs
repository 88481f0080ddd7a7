//! nudge-core
//!
//! ノート中のリマインダーマーカーを抽出し、期限が来たら一度だけ通知するコア。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（Task, TaskIdentity, TaskState, Document, Notification, errors）
//! - **parser**: マーカーの抽出（純粋関数）
//! - **cache**: ドキュメントごとのタスクキャッシュ
//! - **notified**: 通知済み identity の永続集合
//! - **ports**: 抽象化レイヤー（Clock, StateStore, Notifier, DocumentSource）
//! - **impls**: 実装（JSON ファイル、webhook、ファイルシステム、テスト用）
//! - **app**: アプリケーションロジック（builder, evaluator, sweep_loop, ingest, status）
//! - **config**: TOML 設定

pub mod app;
pub mod cache;
pub mod config;
pub mod domain;
pub mod impls;
pub mod notified;
pub mod parser;
pub mod ports;

pub use app::{App, AppBuilder, DueEvaluator, RunningApp, SweepReport};
pub use cache::TaskCache;
pub use config::NudgeConfig;
pub use domain::{DeliveryError, NudgeError, Task, TaskIdentity, TaskState};
pub use notified::NotifiedSet;
pub use parser::{MarkerGrammar, WallClock, parse_tasks};
