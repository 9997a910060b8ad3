use async_trait::async_trait;

use crate::errors::AppResult;
use crate::security::InputValidator;
use crate::session::CapturedItem;

/// Produces the raw image bytes for a captured item
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn load(&self, item: &CapturedItem) -> AppResult<Vec<u8>>;
}

/// Reads captured photos from the local filesystem
pub struct FileImageSource {
    max_file_size_mb: u64,
}

impl FileImageSource {
    pub fn new(max_file_size_mb: u64) -> Self {
        Self { max_file_size_mb }
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn load(&self, item: &CapturedItem) -> AppResult<Vec<u8>> {
        InputValidator::validate_image_file(&item.file_path, self.max_file_size_mb)?;

        let bytes = tokio::fs::read(&item.file_path).await?;
        log::debug!(
            "Loaded {} bytes from {} for item {}",
            bytes.len(),
            item.file_path,
            item.id
        );
        Ok(bytes)
    }
}
