//! Domain model (tasks, identities, documents, notifications, errors).

pub mod document;
pub mod errors;
pub mod notification;
pub mod state;
pub mod task;

pub use self::document::{Document, DocumentEvent, DocumentId};
pub use self::errors::{DeliveryError, NudgeError};
pub use self::notification::{Notification, REMINDER_TITLE};
pub use self::state::TaskState;
pub use self::task::{Task, TaskIdentity, iso_timestamp};
