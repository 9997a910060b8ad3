// Upload coordinator - drives sequential upload of a session's photos
//
// Owns the queue of captured items, reports progress and errors to the
// listener, and exposes the retry path when the queue halts on a failure.

pub mod events;
pub mod progress;
pub mod queue;

pub use events::UploadEvent;
pub use progress::{FailedItem, SessionProgress, SessionStatus};
pub use queue::{SessionCanceller, SessionHandle, UploadCoordinator};
