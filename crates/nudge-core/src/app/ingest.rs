//! DocumentIngestor - ドキュメントの変更を TaskCache に反映
//!
//! # フロー
//! - 起動時: DocumentSource::all_documents() → 全ドキュメントを parse → replace
//! - 以後: DocumentEvent を受けるたびに該当ドキュメントだけ再 parse → replace

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TaskCache;
use crate::domain::{DocumentEvent, DocumentId, NudgeError};
use crate::parser::MarkerGrammar;
use crate::ports::DocumentSource;

#[derive(Debug, Clone)]
pub struct DocumentIngestor {
    cache: Arc<TaskCache>,
    grammar: MarkerGrammar,
}

impl DocumentIngestor {
    pub fn new(cache: Arc<TaskCache>, grammar: MarkerGrammar) -> Self {
        Self { cache, grammar }
    }

    /// 全ドキュメントからキャッシュを作り直す。前回から消えたドキュメントは
    /// 落とす。見つかったタスク数を返す
    pub async fn full_scan(&self, source: &dyn DocumentSource) -> Result<usize, NudgeError> {
        let documents = source.all_documents().await?;
        let seen: HashSet<DocumentId> = documents.iter().map(|d| d.id.clone()).collect();

        for stale in self.cache.documents().await {
            if !seen.contains(&stale) {
                self.cache.replace(stale, Vec::new()).await;
            }
        }

        let mut found = 0;
        let document_count = documents.len();
        for document in documents {
            let tasks = self.grammar.parse(&document.text);
            found += tasks.len();
            self.cache.replace(document.id, tasks).await;
        }
        info!(documents = document_count, tasks = found, "full scan finished");
        Ok(found)
    }

    pub async fn apply(&self, event: DocumentEvent) {
        match event {
            DocumentEvent::Changed(document) => {
                let tasks = self.grammar.parse(&document.text);
                debug!(document = %document.id, tasks = tasks.len(), "document rescanned");
                self.cache.replace(document.id, tasks).await;
            }
            DocumentEvent::Removed(id) => {
                debug!(document = %id, "document removed");
                self.cache.replace(id, Vec::new()).await;
            }
            DocumentEvent::Renamed { from, to } => {
                debug!(from = %from, to = %to, "document renamed");
                self.cache.rename(&from, to).await;
            }
        }
    }

    /// チャネルが閉じるか shutdown が来るまで変更イベントを処理する
    pub fn spawn(self, events: mpsc::Receiver<DocumentEvent>) -> IngestLoop {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(run(self, events, shutdown_rx));
        IngestLoop { shutdown_tx, join }
    }
}

pub struct IngestLoop {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl IngestLoop {
    pub async fn shutdown_and_join(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}

async fn run(
    ingestor: DocumentIngestor,
    mut events: mpsc::Receiver<DocumentEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        let event = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            event = events.recv() => event,
        };
        let Some(event) = event else {
            debug!("document event channel closed");
            break;
        };
        ingestor.apply(event).await;
    }
}
