//! FsDocumentSource - ディレクトリ配下のノートをドキュメントとして扱う
//!
//! # 実装詳細
//! - DocumentId はルートからの相対パス（区切りは `/`）
//! - `.` で始まるディレクトリ・ファイルは無視（`.git`, `.nudge` など）
//! - 変更検知は `notify`。コールバックは notify のスレッドで動くので
//!   `blocking_send` でチャネルに流す

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::domain::{Document, DocumentEvent, DocumentId, NudgeError};
use crate::ports::DocumentSource;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FsDocumentSource {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self {
            root: root.into(),
            extensions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// ルートの監視を始める。返した watcher を drop すると止まる
    pub fn watch(&self) -> Result<(RecommendedWatcher, mpsc::Receiver<DocumentEvent>), NudgeError> {
        let root = std::fs::canonicalize(&self.root).map_err(|e| NudgeError::io(&self.root, e))?;
        let filter = PathFilter {
            root: root.clone(),
            extensions: self.extensions.clone(),
        };
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for doc_event in filter.events_for(event) {
                        if tx.blocking_send(doc_event).is_err() {
                            // receiver dropped: the app is shutting down
                            return;
                        }
                    }
                }
                Err(e) => error!(error = %e, "file watcher error"),
            },
            notify::Config::default(),
        )
        .map_err(|e| NudgeError::Watch(format!("cannot create file watcher: {e}")))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| NudgeError::Watch(format!("cannot watch {}: {e}", root.display())))?;
        debug!(root = %root.display(), "watching notes directory");

        Ok((watcher, rx))
    }

    fn scan(&self) -> Result<Vec<Document>, NudgeError> {
        let filter = PathFilter {
            root: self.root.clone(),
            extensions: self.extensions.clone(),
        };
        let mut documents = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // ルート自体が読めないときだけ失敗。配下のループや権限エラーは飛ばす
                Err(e) if e.depth() == 0 => {
                    return Err(NudgeError::Store(format!(
                        "cannot walk {}: {e}",
                        self.root.display()
                    )));
                }
                Err(e) => {
                    warn!(
                        root = %self.root.display(),
                        error = %e,
                        "skipping unreadable directory entry"
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(id) = filter.document_id(entry.path()) else {
                continue;
            };
            match std::fs::read_to_string(entry.path()) {
                Ok(text) => documents.push(Document::new(id, text)),
                // 非 UTF-8 などは飛ばす
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping unreadable document")
                }
            }
        }
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }
}

#[async_trait]
impl DocumentSource for FsDocumentSource {
    async fn all_documents(&self) -> Result<Vec<Document>, NudgeError> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.scan())
            .await
            .map_err(|e| NudgeError::Store(format!("document scan task failed: {e}")))?
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

#[derive(Debug, Clone)]
struct PathFilter {
    root: PathBuf,
    extensions: Vec<String>,
}

impl PathFilter {
    fn document_id(&self, path: &Path) -> Option<DocumentId> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if !self.extensions.iter().any(|e| *e == ext) {
            return None;
        }
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut parts = Vec::new();
        for component in relative.components() {
            let Component::Normal(part) = component else {
                return None;
            };
            if is_hidden(part) {
                return None;
            }
            parts.push(part.to_str()?);
        }
        Some(DocumentId::new(parts.join("/")))
    }

    fn changed(&self, path: &Path) -> Option<DocumentEvent> {
        let id = self.document_id(path)?;
        match std::fs::read_to_string(path) {
            Ok(text) => Some(DocumentEvent::Changed(Document::new(id, text))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Some(DocumentEvent::Removed(id)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read changed document");
                None
            }
        }
    }

    fn events_for(&self, event: Event) -> Vec<DocumentEvent> {
        match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
                let from = self.document_id(&event.paths[0]);
                let to = self.document_id(&event.paths[1]);
                match (from, to) {
                    (Some(from), Some(to)) => vec![DocumentEvent::Renamed { from, to }],
                    (Some(from), None) => vec![DocumentEvent::Removed(from)],
                    (None, Some(_)) => self.changed(&event.paths[1]).into_iter().collect(),
                    (None, None) => Vec::new(),
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => event
                .paths
                .iter()
                .filter_map(|p| self.document_id(p))
                .map(DocumentEvent::Removed)
                .collect(),
            EventKind::Create(_) | EventKind::Modify(_) => {
                event.paths.iter().filter_map(|p| self.changed(p)).collect()
            }
            _ => Vec::new(),
        }
    }
}
