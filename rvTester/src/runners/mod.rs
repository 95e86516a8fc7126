use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::RunError;
use crate::options::RunOptions;

mod etiss;

pub use etiss::EtissRunner;

/// How a simulator process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCondition {
    /// Exited on its own; `None` when killed by a signal.
    Exited(Option<i32>),
    /// Killed by the harness after the configured timeout.
    TimedOut,
}

impl ExitCondition {
    pub fn success(self) -> bool {
        self == ExitCondition::Exited(Some(0))
    }
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub exit: ExitCondition,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
}

/// Launches one simulation per call.
///
/// Implementations own nothing per run: the configuration file belongs to
/// the caller and outlives the call. Cancellation must terminate the
/// process and return [`RunError::Cancelled`].
pub trait Runner: Send + Sync {
    fn name(&self) -> &str;

    fn run(
        &self,
        config: &Path,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<RunResult, RunError>> + Send;
}
