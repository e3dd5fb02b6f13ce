use std::future::Future;

use tokio::sync::mpsc;

use crate::app::AppCommand;
use crate::error::AppError;

/// Executes units of work off the core loop and marshals their results back
/// onto it as commands.
///
/// Completion always travels through the core's channel, so `into_command`
/// results are processed in arrival order on the serial loop and never race
/// with core state. A task that panics is reported as an `AppError::Worker`
/// value rather than unwinding. No retries happen here.
#[derive(Clone)]
pub struct TaskRunner {
    tx: mpsc::Sender<AppCommand>,
}

impl TaskRunner {
    pub fn new(tx: mpsc::Sender<AppCommand>) -> Self {
        Self { tx }
    }

    /// Clone of the delivery channel, for callbacks that report mid-task
    /// (progress hooks).
    pub fn sender(&self) -> mpsc::Sender<AppCommand> {
        self.tx.clone()
    }

    /// Run a future on the worker pool; deliver its result as a command.
    pub fn run<T, Fut, Into>(&self, task: Fut, into_command: Into)
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
        Into: FnOnce(Result<T, AppError>) -> AppCommand + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match tokio::spawn(task).await {
                Ok(result) => result,
                Err(err) => Err(AppError::Worker(format!("join error: {err}"))),
            };
            let _ = tx.send(into_command(result)).await;
        });
    }

    /// Run a blocking closure on the blocking pool; deliver its result as a
    /// command.
    pub fn run_blocking<T, Task, Into>(&self, task: Task, into_command: Into)
    where
        T: Send + 'static,
        Task: FnOnce() -> Result<T, AppError> + Send + 'static,
        Into: FnOnce(Result<T, AppError>) -> AppCommand + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match tokio::task::spawn_blocking(task).await {
                Ok(result) => result,
                Err(err) => Err(AppError::Worker(format!("join error: {err}"))),
            };
            let _ = tx.send(into_command(result)).await;
        });
    }
}
