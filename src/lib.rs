pub mod app;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod logging;
pub mod progress;
pub mod runner;
pub mod session;
pub mod settings;
pub mod thumbnail;
pub mod utils;

use std::sync::Arc;

use tokio::task::JoinHandle;

pub use app::{App, AppCommand};
pub use engine::{DownloadRequest, Extractor, FormatChoice, Metadata};
pub use error::AppError;
pub use events::{AppEvent, EventEmitter};
pub use history::{HistoryEntry, HistoryLedger};
pub use progress::{Phase, ProgressSnapshot};
pub use session::SessionState;
pub use settings::Settings;

/// Wire up logging, settings, the persisted history, and the core loop with
/// the production yt-dlp engine. The embedding front-end supplies the event
/// sink and drives the returned handle.
pub fn bootstrap(emitter: EventEmitter) -> (App, JoinHandle<()>) {
    let settings = settings::load_settings();
    logging::init(settings.debug_logs);
    tracing::info!("core starting; debug_logs={}", settings.debug_logs);

    let engine = Arc::new(engine::ytdlp::YtDlp::new());
    let history = HistoryLedger::open_default();
    App::spawn(engine, history, emitter)
}
