use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::session::{ItemStatus, RemoteDocument, UploadSession};
use crate::source::ImageSource;
use crate::transport::Transport;

use super::events::{EventSender, UploadEvent};
use super::progress::*;

/// Outcome of waiting at a halted queue
enum ControlSignal {
    Resume,
    Cancel,
}

#[derive(Default)]
struct ControlFlags {
    cancelled: bool,
    resume_requested: bool,
}

/// Shared command state between the session handle and the session task.
/// Cancellation is cooperative: the task checks it between items and after
/// the in-flight transfer settles.
struct ControlState {
    flags: Mutex<ControlFlags>,
    notify: Notify,
}

impl ControlState {
    fn new() -> Self {
        Self {
            flags: Mutex::new(ControlFlags::default()),
            notify: Notify::new(),
        }
    }

    fn cancel(&self) {
        if let Ok(mut flags) = self.flags.lock() {
            flags.cancelled = true;
        }
        self.notify.notify_waiters();
    }

    fn request_resume(&self) {
        if let Ok(mut flags) = self.flags.lock() {
            flags.resume_requested = true;
        }
        self.notify.notify_waiters();
    }

    fn is_cancelled(&self) -> bool {
        // Treat a poisoned lock as cancelled for safety
        self.flags.lock().map(|f| f.cancelled).unwrap_or(true)
    }

    fn clear_stale_resume(&self) {
        if let Ok(mut flags) = self.flags.lock() {
            flags.resume_requested = false;
        }
    }

    async fn wait_for_resume(&self) -> ControlSignal {
        loop {
            // Register as a waiter before inspecting the flags. notify_waiters
            // stores no permit, so a signal landing between an unlocked check
            // and a later notified() registration would otherwise be lost.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.flags.lock() {
                Ok(mut flags) => {
                    if flags.cancelled {
                        return ControlSignal::Cancel;
                    }
                    if flags.resume_requested {
                        flags.resume_requested = false;
                        return ControlSignal::Resume;
                    }
                }
                Err(_) => return ControlSignal::Cancel,
            }

            notified.await;
        }
    }
}

/// Cloneable cancel switch for a session, usable from another task (e.g. a
/// signal handler)
#[derive(Clone)]
pub struct SessionCanceller {
    control: Arc<ControlState>,
}

impl SessionCanceller {
    pub fn cancel(&self) {
        self.control.cancel();
    }
}

/// Handle to a running upload session: the ordered event stream plus the
/// start/cancel/resume command surface
pub struct SessionHandle {
    pub events: mpsc::UnboundedReceiver<UploadEvent>,
    progress: ProgressState,
    control: Arc<ControlState>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Stop before the next unstarted item. The in-flight transfer is allowed
    /// to finish or fail; no partial item state is corrupted.
    pub fn cancel(&self) {
        log::info!("Cancellation requested");
        self.control.cancel();
    }

    /// Re-attempt the failed item, then continue remaining pending items in
    /// original order
    pub fn resume(&self) {
        log::info!("Resume requested");
        self.control.request_resume();
    }

    pub fn canceller(&self) -> SessionCanceller {
        SessionCanceller {
            control: Arc::clone(&self.control),
        }
    }

    /// Current progress snapshot
    pub fn progress(&self) -> Option<SessionProgress> {
        safe_progress_read(&self.progress, "handle snapshot", |p| p.clone())
    }

    pub async fn next_event(&mut self) -> Option<UploadEvent> {
        self.events.recv().await
    }

    /// Wait for the session task to end
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            log::error!("Session task ended abnormally: {}", e);
        }
    }
}

/// Drives sequential upload of a session's selected items, one transfer in
/// flight at a time, halting on failure until resumed
pub struct UploadCoordinator {
    source: Arc<dyn ImageSource>,
    transport: Arc<dyn Transport>,
    config: Config,
}

impl UploadCoordinator {
    pub fn new(source: Arc<dyn ImageSource>, transport: Arc<dyn Transport>, config: Config) -> Self {
        Self {
            source,
            transport,
            config,
        }
    }

    /// Begin uploading the session's selected items in order. Fails fast with
    /// `EmptySession` when nothing is selected; no events are emitted in that
    /// case.
    pub fn start(&self, session: UploadSession) -> AppResult<SessionHandle> {
        let selected: Vec<usize> = session
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.selected)
            .map(|(idx, _)| idx)
            .collect();

        if selected.is_empty() {
            return Err(AppError::EmptySession);
        }

        log::info!(
            "Starting session {} with {} of {} photos selected (container '{}')",
            session.id,
            selected.len(),
            session.items.len(),
            session.container
        );

        let progress: ProgressState = Arc::new(Mutex::new(SessionProgress::new(selected.len())));
        let control = Arc::new(ControlState::new());
        let (events, rx) = EventSender::channel();

        let task = tokio::spawn(run_session(
            Arc::clone(&self.source),
            Arc::clone(&self.transport),
            self.config.clone(),
            session,
            selected,
            Arc::clone(&progress),
            Arc::clone(&control),
            events,
        ));

        Ok(SessionHandle {
            events: rx,
            progress,
            control,
            task,
        })
    }
}

/// Session task body. All events are emitted from here, so per-item ordering
/// needs no extra marshaling.
#[allow(clippy::too_many_arguments)]
async fn run_session(
    source: Arc<dyn ImageSource>,
    transport: Arc<dyn Transport>,
    config: Config,
    mut session: UploadSession,
    selected: Vec<usize>,
    progress: ProgressState,
    control: Arc<ControlState>,
    events: EventSender,
) {
    let session_id = session.id.clone();
    let start_time = Instant::now();
    let mut documents: Vec<RemoteDocument> = Vec::new();
    let total = selected.len();

    for (pos, &idx) in selected.iter().enumerate() {
        if control.is_cancelled() {
            log::info!(
                "Session {} cancelled before item {} of {}",
                session_id,
                pos + 1,
                total
            );
            finish_cancelled(&progress, &events);
            return;
        }

        let item_id = session.items[idx].id;
        let file_name = session.file_name_for(&session.items[idx], pos);

        // Attempt loop for this item; repeats only through an explicit resume
        loop {
            session.items[idx].status = ItemStatus::Uploading;
            update_progress_current(&progress, &file_name);

            log::info!(
                "Uploading item {} of {} ({}) in session {}",
                pos + 1,
                total,
                file_name,
                session_id
            );

            let result =
                upload_item(&source, &transport, &session, idx, &file_name, &progress, &events)
                    .await;

            // The in-flight transfer was allowed to settle; a cancel that
            // arrived meanwhile takes effect now
            if control.is_cancelled() {
                log::info!("Session {} cancelled after item {} settled", session_id, pos + 1);
                finish_cancelled(&progress, &events);
                return;
            }

            match result {
                Ok(document_id) => {
                    session.items[idx].status = ItemStatus::Succeeded;
                    update_progress_success(&progress, item_id, &file_name);
                    update_time_estimate(&progress, start_time);
                    events.emit(UploadEvent::Succeeded { item_id });

                    documents.push(RemoteDocument {
                        item_id,
                        document_id,
                        name: file_name.clone(),
                        container: session.container.clone(),
                        uploaded_at: chrono::Utc::now(),
                    });
                    break;
                }
                Err(e) => {
                    session.items[idx].status = ItemStatus::Failed;
                    session.items[idx].retry_count += 1;
                    let retryable = e.is_retryable();
                    update_progress_failure(
                        &progress,
                        item_id,
                        &session.items[idx].file_path,
                        e.to_string(),
                        retryable,
                    );
                    events.emit(UploadEvent::Failed {
                        item_id,
                        cause: e.to_string(),
                    });

                    if !retryable {
                        log::error!(
                            "Session {} failed terminally on {}: {}",
                            session_id,
                            file_name,
                            e
                        );
                        mark_session_status(&progress, SessionStatus::Failed);
                        return;
                    }

                    // Halt the queue; nothing advances until resume or cancel
                    control.clear_stale_resume();
                    mark_session_status(&progress, SessionStatus::AwaitingRetry);
                    events.emit(UploadEvent::RetryAvailable { item_id });
                    log::warn!(
                        "Session {} halted on {} ({}), awaiting retry",
                        session_id,
                        file_name,
                        e
                    );

                    match control.wait_for_resume().await {
                        ControlSignal::Resume => {
                            log::info!("Session {} resuming from {}", session_id, file_name);
                            mark_session_status(&progress, SessionStatus::Active);
                        }
                        ControlSignal::Cancel => {
                            log::info!("Session {} cancelled while awaiting retry", session_id);
                            finish_cancelled(&progress, &events);
                            return;
                        }
                    }
                }
            }
        }

        // Spacing between transfers to be nice to the server
        if pos + 1 < total {
            sleep(Duration::from_millis(config.rate_limit_delay_ms)).await;
        }
    }

    mark_session_status(&progress, SessionStatus::Completed);
    log::info!(
        "Session {} completed with {} uploaded documents",
        session_id,
        documents.len()
    );
    events.emit(UploadEvent::Finished { documents });
}

/// Load one item's bytes and push them through the transport, forwarding
/// monotonic progress fractions to the listener
async fn upload_item(
    source: &Arc<dyn ImageSource>,
    transport: &Arc<dyn Transport>,
    session: &UploadSession,
    idx: usize,
    file_name: &str,
    progress: &ProgressState,
    events: &EventSender,
) -> AppResult<String> {
    let item = session.items[idx].clone();
    let bytes = source.load(&item).await?;

    let last_fraction = Mutex::new(0.0f32);
    let progress_state = Arc::clone(progress);
    let event_sender = events.clone();
    let item_id = item.id;

    let on_progress = move |fraction: f32| {
        let fraction = fraction.clamp(0.0, 1.0);
        let mut last = match last_fraction.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        // Monotonic non-decreasing per item
        if fraction < *last {
            return;
        }
        *last = fraction;
        update_progress_fraction(&progress_state, fraction);
        event_sender.emit(UploadEvent::Progress { item_id, fraction });
    };

    transport
        .upload(
            &session.id,
            &session.container,
            file_name,
            bytes,
            &on_progress,
        )
        .await
}

fn finish_cancelled(progress: &ProgressState, events: &EventSender) {
    mark_session_status(progress, SessionStatus::Cancelled);
    events.emit(UploadEvent::Cancelled);
}
