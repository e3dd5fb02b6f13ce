use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::debounce::{Debouncer, PROBE_DEBOUNCE};
use crate::engine::{DownloadRequest, Extractor, FetchOutcome, Metadata, RawProgress};
use crate::error::AppError;
use crate::events::{AppEvent, EventEmitter};
use crate::history::{HistoryEntry, HistoryLedger};
use crate::runner::TaskRunner;
use crate::session::Session;
use crate::thumbnail::{self, Thumbnail};

const COMMAND_CAPACITY: usize = 64;

/// Everything that can happen to the core, delivered in arrival order on one
/// serial loop. Workers never touch core state; they send one of these.
#[derive(Debug)]
pub enum AppCommand {
    /// The debouncer settled on a URL worth probing.
    ProbeRequested { url: String },
    /// Input was cleared or became invalid.
    InputCleared,
    /// A probe worker resolved. Stale generations are discarded.
    ProbeResolved {
        generation: u64,
        result: Result<Metadata, AppError>,
    },
    /// A thumbnail worker resolved for the given probe generation.
    ThumbnailResolved {
        generation: u64,
        result: Result<Thumbnail, AppError>,
    },
    /// The user asked to start a download.
    StartDownload { request: DownloadRequest },
    /// A raw progress sample from the in-flight fetch.
    FetchProgress { raw: RawProgress },
    /// The in-flight fetch resolved, one way or the other.
    FetchResolved {
        result: Result<FetchOutcome, AppError>,
    },
}

/// Cloneable front half of the core: the handle the user-facing surface
/// feeds. URL edits go through the debouncer; everything else is a direct
/// command send.
#[derive(Clone)]
pub struct App {
    tx: mpsc::Sender<AppCommand>,
    debouncer: Arc<Debouncer>,
}

impl App {
    /// Spawn the core loop with the default probe debounce.
    pub fn spawn(
        engine: Arc<dyn Extractor>,
        history: HistoryLedger,
        emitter: EventEmitter,
    ) -> (Self, JoinHandle<()>) {
        Self::spawn_with_debounce(engine, history, emitter, PROBE_DEBOUNCE)
    }

    /// Spawn the core loop with an explicit debounce delay.
    pub fn spawn_with_debounce(
        engine: Arc<dyn Extractor>,
        history: HistoryLedger,
        emitter: EventEmitter,
        debounce: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let core = AppCore::new(engine, history, emitter, TaskRunner::new(tx.clone()));
        let handle = tokio::spawn(run_app_core(core, rx));
        let app = Self {
            debouncer: Arc::new(Debouncer::new(debounce, tx.clone())),
            tx,
        };
        (app, handle)
    }

    /// Feed the latest state of the URL input field.
    pub fn url_changed(&self, raw: &str) {
        self.debouncer.notify(raw);
    }

    /// Ask for a download. The core validates and enforces the
    /// one-session-at-a-time rule; outcomes arrive as events.
    pub async fn start_download(&self, request: DownloadRequest) -> Result<(), AppError> {
        self.send(AppCommand::StartDownload { request }).await
    }

    pub async fn send(&self, command: AppCommand) -> Result<(), AppError> {
        self.tx
            .send(command)
            .await
            .map_err(|e| AppError::Worker(format!("failed to send command: {e}")))
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App").finish_non_exhaustive()
    }
}

struct AppCore {
    engine: Arc<dyn Extractor>,
    emitter: EventEmitter,
    runner: TaskRunner,
    session: Session,
    metadata: Option<Metadata>,
    history: HistoryLedger,
    /// Monotonically increasing probe generation; results carrying an older
    /// value lost the race and are dropped on arrival.
    probe_generation: u64,
}

impl AppCore {
    fn new(
        engine: Arc<dyn Extractor>,
        history: HistoryLedger,
        emitter: EventEmitter,
        runner: TaskRunner,
    ) -> Self {
        Self {
            engine,
            emitter,
            runner,
            session: Session::new(),
            metadata: None,
            history,
            probe_generation: 0,
        }
    }

    fn emit(&self, event: AppEvent) {
        (self.emitter)(event);
    }

    fn emit_status(&self, message: impl Into<String>) {
        self.emit(AppEvent::Status {
            message: message.into(),
        });
    }

    fn handle(&mut self, command: AppCommand) {
        match command {
            AppCommand::ProbeRequested { url } => self.dispatch_probe(url),
            AppCommand::InputCleared => self.clear_metadata(),
            AppCommand::ProbeResolved { generation, result } => {
                self.finish_probe(generation, result)
            }
            AppCommand::ThumbnailResolved { generation, result } => {
                self.finish_thumbnail(generation, result)
            }
            AppCommand::StartDownload { request } => self.start_download(request),
            AppCommand::FetchProgress { raw } => self.apply_progress(raw),
            AppCommand::FetchResolved { result } => self.finish_fetch(result),
        }
    }

    /* ------------------------------- probing ------------------------------- */

    fn dispatch_probe(&mut self, url: String) {
        self.probe_generation += 1;
        let generation = self.probe_generation;
        self.emit_status("Fetching video information...");

        let engine = Arc::clone(&self.engine);
        self.runner.run(
            async move { engine.probe(&url).await },
            move |result| AppCommand::ProbeResolved { generation, result },
        );
    }

    fn clear_metadata(&mut self) {
        // Bumping the generation strands any in-flight probe result.
        self.probe_generation += 1;
        if self.metadata.take().is_some() {
            self.emit(AppEvent::MetadataCleared);
        }
    }

    fn finish_probe(&mut self, generation: u64, result: Result<Metadata, AppError>) {
        if generation != self.probe_generation {
            tracing::debug!(generation, "discarding superseded probe result");
            return;
        }
        match result {
            Ok(metadata) => {
                self.metadata = Some(metadata.clone());
                self.emit(AppEvent::MetadataLoaded {
                    metadata: metadata.clone(),
                });
                self.emit_status("Video information loaded");

                if let Some(url) = metadata.thumbnail_url {
                    self.runner.run(
                        async move { thumbnail::fetch_thumbnail(&url).await },
                        move |result| AppCommand::ThumbnailResolved { generation, result },
                    );
                }
            }
            Err(err) => {
                // Probe failures only touch the status line, never the session.
                let message: String = err.to_string().chars().take(50).collect();
                self.emit_status(format!("Error fetching video info: {message}..."));
            }
        }
    }

    fn finish_thumbnail(&mut self, generation: u64, result: Result<Thumbnail, AppError>) {
        if generation != self.probe_generation {
            tracing::debug!(generation, "discarding superseded thumbnail");
            return;
        }
        match result {
            Ok(thumbnail) => self.emit(AppEvent::ThumbnailReady { thumbnail }),
            Err(err) => tracing::warn!("thumbnail fetch failed: {err}"),
        }
    }

    /* ------------------------------ downloading ---------------------------- */

    fn start_download(&mut self, request: DownloadRequest) {
        if request.url.trim().is_empty() || request.destination_dir.as_os_str().is_empty() {
            self.emit(AppEvent::ValidationFailed {
                message: "Please complete all fields".into(),
            });
            return;
        }

        if self.session.begin(request.clone()).is_err() {
            tracing::debug!("start rejected: a download is already in progress");
            return;
        }
        self.emit(AppEvent::SessionChanged {
            state: self.session.state(),
        });
        self.emit_status("Starting download...");

        let hook_tx = self.runner.sender();
        let on_progress: crate::engine::ProgressHook = Arc::new(move |raw: RawProgress| {
            // Samples are latest-wins; shedding under backpressure is fine.
            let _ = hook_tx.try_send(AppCommand::FetchProgress { raw });
        });

        let engine = Arc::clone(&self.engine);
        self.runner.run(
            async move { engine.fetch(&request, on_progress).await },
            |result| AppCommand::FetchResolved { result },
        );

        self.session.mark_dispatched();
        self.emit(AppEvent::SessionChanged {
            state: self.session.state(),
        });
    }

    fn apply_progress(&mut self, raw: RawProgress) {
        if let Some(snapshot) = self.session.apply_progress(&raw) {
            let text = snapshot.status_line();
            self.emit(AppEvent::Progress { snapshot, text });
        }
    }

    fn finish_fetch(&mut self, result: Result<FetchOutcome, AppError>) {
        match result {
            Ok(outcome) => {
                let (request, snapshot) = self.session.complete();
                let text = snapshot.status_line();
                self.emit(AppEvent::Progress { snapshot, text });

                let title = outcome
                    .title
                    .or_else(|| self.metadata.as_ref().map(|m| m.title.clone()))
                    .unwrap_or_else(|| "Unknown".into());
                self.emit(AppEvent::DownloadCompleted {
                    title: title.clone(),
                });

                if let Some(request) = request {
                    self.history.append(HistoryEntry {
                        title,
                        source_url: request.url,
                        format: request.format,
                        completed_at: Utc::now(),
                    });
                    self.emit(AppEvent::HistoryUpdated {
                        entries: self.history.entries().to_vec(),
                    });
                }
            }
            Err(err) => {
                let (_, snapshot) = self.session.fail();
                let text = snapshot.status_line();
                self.emit(AppEvent::Progress { snapshot, text });
                self.emit(AppEvent::DownloadFailed {
                    message: err.to_string(),
                });
            }
        }

        // Whatever happened, the slot is free again.
        self.emit(AppEvent::SessionChanged {
            state: self.session.state(),
        });
        self.emit_status("Ready");
    }
}

/// The interactive/serial context: drains commands one at a time and is the
/// only code that touches the session, the metadata cache, and the ledger.
async fn run_app_core(mut core: AppCore, mut rx: mpsc::Receiver<AppCommand>) {
    core.emit(AppEvent::HistoryUpdated {
        entries: core.history.entries().to_vec(),
    });
    core.emit_status("Ready");

    while let Some(command) = rx.recv().await {
        core.handle(command);
    }
    tracing::debug!("core loop stopped: all command senders dropped");
}
