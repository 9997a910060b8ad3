use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppResult;
use crate::security::InputValidator;

/// Upload state of a single captured photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Uploading,
    Succeeded,
    Failed,
}

/// A single captured photo within a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedItem {
    pub id: Uuid,
    pub file_path: String,
    pub selected: bool,
    pub status: ItemStatus,
    pub retry_count: u32,
}

impl CapturedItem {
    pub fn new(file_path: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_path,
            selected: true,
            status: ItemStatus::Pending,
            retry_count: 0,
        }
    }

    pub fn extension(&self) -> String {
        Path::new(&self.file_path)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "jpg".to_string())
    }

    pub fn original_file_name(&self) -> String {
        Path::new(&self.file_path)
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

/// Document record returned by the remote repository for a completed upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub item_id: Uuid,
    pub document_id: String,
    pub name: String,
    pub container: String,
    pub uploaded_at: DateTime<Utc>,
}

/// One user-confirmed batch of photos to upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: String,
    pub items: Vec<CapturedItem>,
    pub container: String,
    pub base_name: String,
    pub allow_cellular: bool,
    pub created_at: DateTime<Utc>,
}

impl UploadSession {
    /// Build a session from captured photo paths. Every path is validated up
    /// front so a bad file fails here instead of mid-queue.
    pub fn new(
        file_paths: Vec<String>,
        container: &str,
        base_name: &str,
        config: &Config,
    ) -> AppResult<Self> {
        InputValidator::validate_container_name(container)?;

        for path in &file_paths {
            InputValidator::validate_image_file(path, config.max_file_size_mb)?;
        }

        let items = file_paths.into_iter().map(CapturedItem::new).collect();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            items,
            container: container.trim().to_string(),
            base_name: InputValidator::sanitize_filename(base_name),
            allow_cellular: config.allow_cellular_uploads,
            created_at: Utc::now(),
        })
    }

    pub fn selected_items(&self) -> Vec<&CapturedItem> {
        self.items.iter().filter(|i| i.selected).collect()
    }

    pub fn select_all(&mut self) {
        for item in &mut self.items {
            item.selected = true;
        }
    }

    pub fn set_selected(&mut self, item_id: Uuid, selected: bool) -> bool {
        match self.items.iter_mut().find(|i| i.id == item_id) {
            Some(item) => {
                item.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn all_selected(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| i.selected)
    }

    pub fn none_selected(&self) -> bool {
        self.items.iter().all(|i| !i.selected)
    }

    /// Selected photos that have not reached a successful upload yet
    pub fn remaining_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.selected && i.status != ItemStatus::Succeeded)
            .count()
    }

    /// Remote file name for the item at `index` within the selected set,
    /// derived from the user-chosen base name
    pub fn file_name_for(&self, item: &CapturedItem, index: usize) -> String {
        if self.base_name.is_empty() {
            item.original_file_name()
        } else {
            format!("{}-{}.{}", self.base_name, index + 1, item.extension())
        }
    }

    /// Whether the caller should ask for confirmation before uploading over
    /// a metered connection
    pub fn needs_cellular_confirmation(&self, config: &Config) -> bool {
        !self.allow_cellular && config.confirm_cellular_uploads
    }
}
