//! Ports - 抽象化レイヤー
//!
//! 外部システム（ドキュメントストア、通知先、永続化、時刻）への
//! インターフェースを定義します。

pub mod clock;
pub mod document_source;
pub mod notifier;
pub mod state_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::document_source::DocumentSource;
pub use self::notifier::Notifier;
pub use self::state_store::{PersistedState, StateStore, StoredSettings};
