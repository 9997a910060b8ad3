use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    AwaitingRetry,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedItem {
    pub item_id: Uuid,
    pub file_path: String,
    pub error: String,
    pub retry_count: u32,
    pub is_retryable: bool,
}

/// Snapshot of a session's upload progress, readable by the caller while the
/// session task runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProgress {
    pub total_items: usize,
    pub completed: usize,
    pub current_item: Option<String>,
    pub current_fraction: f32,
    pub failed_items: Vec<FailedItem>,
    pub succeeded_items: Vec<Uuid>,
    pub status: SessionStatus,
    pub estimated_seconds_remaining: Option<u64>,
}

impl SessionProgress {
    pub fn new(total_items: usize) -> Self {
        Self {
            total_items,
            completed: 0,
            current_item: None,
            current_fraction: 0.0,
            failed_items: Vec::new(),
            succeeded_items: Vec::new(),
            status: SessionStatus::Active,
            estimated_seconds_remaining: None,
        }
    }
}

/// Progress state type
pub type ProgressState = Arc<Mutex<SessionProgress>>;

/// Safe progress state update
pub fn safe_progress_update<F>(progress_state: &ProgressState, operation: &str, f: F) -> bool
where
    F: FnOnce(&mut SessionProgress),
{
    match progress_state.lock() {
        Ok(mut progress) => {
            f(&mut progress);
            true
        }
        Err(e) => {
            log::error!(
                "Failed to acquire progress lock for {} (non-critical): {}",
                operation,
                e
            );
            false
        }
    }
}

pub fn safe_progress_read<F, R>(progress_state: &ProgressState, operation: &str, f: F) -> Option<R>
where
    F: FnOnce(&SessionProgress) -> R,
{
    match progress_state.lock() {
        Ok(progress) => Some(f(&progress)),
        Err(e) => {
            log::error!(
                "Failed to acquire progress lock for {} (non-critical): {}",
                operation,
                e
            );
            None
        }
    }
}

/// Update progress to show current file being uploaded
pub fn update_progress_current(progress_state: &ProgressState, file_name: &str) {
    safe_progress_update(progress_state, "current file update", |progress| {
        progress.current_item = Some(file_name.to_string());
        progress.current_fraction = 0.0;
        log::debug!("Progress: Currently uploading {}", file_name);
    });
}

/// Update the in-flight fraction for the current item
pub fn update_progress_fraction(progress_state: &ProgressState, fraction: f32) {
    safe_progress_update(progress_state, "fraction update", |progress| {
        progress.current_fraction = fraction;
    });
}

/// Mark an item upload as successful
pub fn update_progress_success(progress_state: &ProgressState, item_id: Uuid, file_name: &str) {
    safe_progress_update(progress_state, "success update", |progress| {
        progress.completed += 1;
        progress.succeeded_items.push(item_id);
        progress.current_fraction = 1.0;

        // Remove from failed items if it was previously failed
        progress.failed_items.retain(|f| f.item_id != item_id);

        log::info!(
            "Progress: Successfully uploaded {} ({}/{})",
            file_name,
            progress.completed,
            progress.total_items
        );
    });
}

/// Mark an item upload as failed
pub fn update_progress_failure(
    progress_state: &ProgressState,
    item_id: Uuid,
    file_path: &str,
    error: String,
    is_retryable: bool,
) {
    safe_progress_update(progress_state, "failure update", |progress| {
        // Repeat failure for the same item bumps its retry count
        if let Some(existing) = progress
            .failed_items
            .iter_mut()
            .find(|f| f.item_id == item_id)
        {
            existing.retry_count += 1;
            existing.error = error.clone();
            existing.is_retryable = is_retryable;
        } else {
            progress.failed_items.push(FailedItem {
                item_id,
                file_path: file_path.to_string(),
                error: error.clone(),
                retry_count: 0,
                is_retryable,
            });
        }

        log::warn!(
            "Progress: Failed to upload {} - {} ({}/{})",
            file_path,
            error,
            progress.completed,
            progress.total_items
        );
    });
}

/// Update the estimated time remaining for session completion
pub fn update_time_estimate(progress_state: &ProgressState, start_time: Instant) {
    safe_progress_update(progress_state, "time estimate update", |progress| {
        if progress.completed == 0 {
            return;
        }

        let elapsed = start_time.elapsed().as_secs_f64();
        let rate = progress.completed as f64 / elapsed;
        let remaining = progress.total_items - progress.completed;
        let estimated_seconds = if rate > 0.0 {
            (remaining as f64 / rate) as u64
        } else {
            0
        };

        progress.estimated_seconds_remaining = Some(estimated_seconds);

        if estimated_seconds > 0 {
            log::debug!(
                "ETA updated: {}m {}s (rate: {:.2} items/sec, remaining: {})",
                estimated_seconds / 60,
                estimated_seconds % 60,
                rate,
                remaining
            );
        }
    });
}

pub fn mark_session_status(progress_state: &ProgressState, status: SessionStatus) {
    safe_progress_update(progress_state, "status update", |progress| {
        progress.status = status;
        if matches!(
            status,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        ) {
            progress.estimated_seconds_remaining = Some(0);
            log::info!(
                "Session reached {:?}: {}/{} successful, {} failed",
                status,
                progress.succeeded_items.len(),
                progress.total_items,
                progress.failed_items.len()
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_clears_previous_failure() {
        let state: ProgressState = Arc::new(Mutex::new(SessionProgress::new(2)));
        let item_id = Uuid::new_v4();

        update_progress_failure(&state, item_id, "a.jpg", "timeout".to_string(), true);
        update_progress_success(&state, item_id, "a.jpg");

        let snapshot = safe_progress_read(&state, "test", |p| p.clone()).unwrap();
        assert!(snapshot.failed_items.is_empty());
        assert_eq!(snapshot.succeeded_items, vec![item_id]);
        assert_eq!(snapshot.completed, 1);
    }

    #[test]
    fn repeated_failure_increments_retry_count() {
        let state: ProgressState = Arc::new(Mutex::new(SessionProgress::new(1)));
        let item_id = Uuid::new_v4();

        update_progress_failure(&state, item_id, "a.jpg", "timeout".to_string(), true);
        update_progress_failure(&state, item_id, "a.jpg", "reset".to_string(), true);

        let snapshot = safe_progress_read(&state, "test", |p| p.clone()).unwrap();
        assert_eq!(snapshot.failed_items.len(), 1);
        assert_eq!(snapshot.failed_items[0].retry_count, 1);
        assert_eq!(snapshot.failed_items[0].error, "reset");
    }

    #[test]
    fn terminal_status_zeroes_eta() {
        let state: ProgressState = Arc::new(Mutex::new(SessionProgress::new(1)));
        mark_session_status(&state, SessionStatus::Cancelled);

        let snapshot = safe_progress_read(&state, "test", |p| p.clone()).unwrap();
        assert_eq!(snapshot.status, SessionStatus::Cancelled);
        assert_eq!(snapshot.estimated_seconds_remaining, Some(0));
    }
}
