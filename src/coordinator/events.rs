use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::session::RemoteDocument;

/// Notifications emitted by a running upload session, in order.
///
/// Per item the listener sees zero or more `Progress` events followed by
/// exactly one terminal `Succeeded`/`Failed` per attempt. A failure halts the
/// queue behind `RetryAvailable` until the caller resumes or cancels.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UploadEvent {
    /// In-flight fraction for the current item, 0.0..=1.0, monotone
    /// non-decreasing within an attempt. A retried item re-sends its bytes,
    /// so after a resume its fractions restart from zero.
    Progress { item_id: Uuid, fraction: f32 },
    Succeeded { item_id: Uuid },
    Failed { item_id: Uuid, cause: String },
    RetryAvailable { item_id: Uuid },
    Cancelled,
    Finished { documents: Vec<RemoteDocument> },
}

/// Channel wrapper that logs instead of failing when the listener went away
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<UploadEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an event with error handling
    pub fn emit(&self, event: UploadEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to emit upload event (listener gone, non-critical): {}", e);
                false
            }
        }
    }
}
