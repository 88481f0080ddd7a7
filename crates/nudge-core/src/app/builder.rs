//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 必須コンポーネント（DocumentSource, StateStore）が無ければ build() でエラー
//! - sweep 間隔 0 もエラー
//!
//! # 起動順序
//! 1. NotifiedSet::load()
//! 2. フルスキャン（同期的に完了させる）
//! 3. SweepLoop を起動（最初の sweep は即時）
//! 4. DocumentEvent の受信ループを起動

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use crate::app::evaluator::DueEvaluator;
use crate::app::ingest::{DocumentIngestor, IngestLoop};
use crate::app::sweep_loop::{DEFAULT_SWEEP_INTERVAL, SweepLoop};
use crate::cache::TaskCache;
use crate::domain::{DocumentEvent, NudgeError, TaskIdentity};
use crate::impls::{DEFAULT_REQUEST_TIMEOUT, WebhookNotifier};
use crate::notified::NotifiedSet;
use crate::parser::MarkerGrammar;
use crate::ports::{Clock, DocumentSource, Notifier, StateStore, SystemClock};

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing components: {0:?}. These must be set before build().")]
    MissingComponents(Vec<&'static str>),

    #[error("sweep interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Clone)]
enum NotifierSpec {
    Fixed(Arc<dyn Notifier>),
    /// 起動時に永続化済み `settings` から組み立てる
    WebhookFromSettings { timeout: Duration },
}

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .document_source(Arc::new(FsDocumentSource::new("notes", vec!["md".into()])))
///     .state_store(Arc::new(JsonFileStateStore::new(".nudge/data.json")))
///     .build()?;
/// let running = app.start(Some(events)).await?;
/// ```
pub struct AppBuilder {
    document_source: Option<Arc<dyn DocumentSource>>,
    state_store: Option<Arc<dyn StateStore>>,
    notifier: NotifierSpec,
    clock: Arc<dyn Clock>,
    grammar: MarkerGrammar,
    sweep_interval: Duration,
}

impl AppBuilder {
    /// 新しい AppBuilder を作成
    pub fn new() -> Self {
        Self {
            document_source: None,
            state_store: None,
            notifier: NotifierSpec::WebhookFromSettings {
                timeout: DEFAULT_REQUEST_TIMEOUT,
            },
            clock: Arc::new(SystemClock),
            grammar: MarkerGrammar::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn document_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.document_source = Some(source);
        self
    }

    pub fn state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.state_store = Some(store);
        self
    }

    /// 永続化済み settings の webhook の代わりにこの Notifier を使う
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = NotifierSpec::Fixed(notifier);
        self
    }

    /// 永続化済み settings の webhook を使う（リクエストタイムアウト指定）
    pub fn webhook_timeout(mut self, timeout: Duration) -> Self {
        self.notifier = NotifierSpec::WebhookFromSettings { timeout };
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn grammar(mut self, grammar: MarkerGrammar) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        let mut missing = Vec::new();
        if self.document_source.is_none() {
            missing.push("document_source");
        }
        if self.state_store.is_none() {
            missing.push("state_store");
        }
        let (Some(document_source), Some(state_store)) = (self.document_source, self.state_store)
        else {
            return Err(BuildError::MissingComponents(missing));
        };
        if self.sweep_interval.is_zero() {
            return Err(BuildError::ZeroInterval);
        }

        Ok(App {
            document_source,
            state_store,
            notifier: self.notifier,
            clock: self.clock,
            cache: Arc::new(TaskCache::new()),
            grammar: self.grammar,
            sweep_interval: self.sweep_interval,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App は構築済みのワイヤリング。`start` で常駐、`prepare` で一回きりの評価器を得る。
pub struct App {
    document_source: Arc<dyn DocumentSource>,
    state_store: Arc<dyn StateStore>,
    notifier: NotifierSpec,
    clock: Arc<dyn Clock>,
    cache: Arc<TaskCache>,
    grammar: MarkerGrammar,
    sweep_interval: Duration,
}

impl App {
    pub fn cache(&self) -> Arc<TaskCache> {
        self.cache.clone()
    }

    fn ingestor(&self) -> DocumentIngestor {
        DocumentIngestor::new(self.cache.clone(), self.grammar.clone())
    }

    /// 通知済み集合を読み込み、全ドキュメントをスキャンする
    pub async fn prepare(&self) -> Result<DueEvaluator, NudgeError> {
        let notified = NotifiedSet::load(self.state_store.clone());
        let notifier = match &self.notifier {
            NotifierSpec::Fixed(notifier) => notifier.clone(),
            NotifierSpec::WebhookFromSettings { timeout } => {
                let webhook = WebhookNotifier::new(notified.settings().endpoint(), *timeout)?;
                Arc::new(webhook) as Arc<dyn Notifier>
            }
        };
        self.ingestor().full_scan(self.document_source.as_ref()).await?;
        Ok(DueEvaluator::new(
            self.cache.clone(),
            notified,
            notifier,
            self.clock.clone(),
        ))
    }

    /// スキャン後に定期 sweep を開始し、変更イベントがあれば受信する
    pub async fn start(
        self,
        events: Option<mpsc::Receiver<DocumentEvent>>,
    ) -> Result<RunningApp, NudgeError> {
        let evaluator = self.prepare().await?;
        let ingest = events.map(|rx| self.ingestor().spawn(rx));
        let sweeps = SweepLoop::spawn(evaluator, self.sweep_interval);
        info!("nudge started");
        Ok(RunningApp {
            cache: self.cache,
            sweeps,
            ingest,
        })
    }

    /// ノートから消えたタスクの identity を通知済み集合から削除する
    ///
    /// 常駐中の `run` とは同時に実行しないこと（`run` 側の書き込みで戻る）
    pub async fn prune(&self) -> Result<usize, NudgeError> {
        let mut notified = NotifiedSet::load(self.state_store.clone());
        self.ingestor().full_scan(self.document_source.as_ref()).await?;
        let live: HashSet<TaskIdentity> = self
            .cache
            .all()
            .await
            .into_iter()
            .map(|task| task.identity().clone())
            .collect();
        let removed = notified.prune_absent(&live).await?;
        info!(removed, remaining = notified.len(), "pruned notified set");
        Ok(removed)
    }
}

pub struct RunningApp {
    cache: Arc<TaskCache>,
    sweeps: SweepLoop,
    ingest: Option<IngestLoop>,
}

impl RunningApp {
    pub fn cache(&self) -> Arc<TaskCache> {
        self.cache.clone()
    }

    pub fn sweeps(&self) -> &SweepLoop {
        &self.sweeps
    }

    /// イベント処理と sweep を止め、永続化状態を書き出す
    pub async fn shutdown(self) -> Result<(), NudgeError> {
        if let Some(ingest) = self.ingest {
            ingest.shutdown_and_join().await;
        }
        let evaluator = self.sweeps.shutdown_and_join().await?;
        evaluator.flush().await?;
        info!("nudge stopped");
        Ok(())
    }
}
