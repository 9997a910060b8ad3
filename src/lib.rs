pub mod config;
pub mod coordinator;
pub mod errors;
pub mod security;
pub mod session;
pub mod source;
pub mod transport;

pub use coordinator::{SessionHandle, UploadCoordinator, UploadEvent};
pub use errors::{AppError, AppResult};
pub use session::{CapturedItem, ItemStatus, RemoteDocument, UploadSession};
pub use source::{FileImageSource, ImageSource};
pub use transport::{HttpTransport, Transport};
