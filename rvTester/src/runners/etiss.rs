use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::RunError;
use crate::options::{ExecutionMode, RunOptions};
use crate::runners::{ExitCondition, RunResult, Runner};

/// How long to wait for pipe readers after the process is gone. A stray
/// grandchild holding the pipe open must not stall the worker.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Runs `bare_etiss_processor`, either directly or under a debugger
/// command file.
#[derive(Debug, Clone)]
pub struct EtissRunner {
    simulator: PathBuf,
    debugger: Option<Debugger>,
}

#[derive(Debug, Clone)]
struct Debugger {
    program: PathBuf,
    script: PathBuf,
}

impl EtissRunner {
    pub fn direct(simulator: impl Into<PathBuf>) -> Self {
        Self {
            simulator: simulator.into(),
            debugger: None,
        }
    }

    pub fn with_debugger(
        simulator: impl Into<PathBuf>,
        program: impl Into<PathBuf>,
        script: impl Into<PathBuf>,
    ) -> Self {
        Self {
            simulator: simulator.into(),
            debugger: Some(Debugger {
                program: program.into(),
                script: script.into(),
            }),
        }
    }

    fn command(&self, config: &Path, mode: ExecutionMode) -> Result<std::process::Command, RunError> {
        let mut config_arg = OsString::from("-i");
        config_arg.push(config);

        let mut command = match (mode, &self.debugger) {
            (ExecutionMode::Debugger, Some(debugger)) => {
                let mut script_arg = OsString::from("-command=");
                script_arg.push(&debugger.script);
                let mut command = std::process::Command::new(&debugger.program);
                command
                    .arg("-batch")
                    .arg(script_arg)
                    .arg("-args")
                    .arg(&self.simulator);
                command
            }
            (ExecutionMode::Debugger, None) => return Err(RunError::NoDebugger),
            (ExecutionMode::Direct, _) => std::process::Command::new(&self.simulator),
        };
        command
            .arg(config_arg)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout can take down everything the
        // debugger started.
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);
        Ok(command)
    }
}

impl Runner for EtissRunner {
    fn name(&self) -> &str {
        "etiss"
    }

    async fn run(
        &self,
        config: &Path,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<RunResult, RunError> {
        let command = self.command(config, options.mode)?;
        let program = command.get_program().to_string_lossy().into_owned();
        let started = Instant::now();
        let mut child = Command::from(command)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Spawn { program, source })?;
        let stdout = tokio::spawn(drain(child.stdout.take()));
        let stderr = tokio::spawn(drain(child.stderr.take()));

        let exit = tokio::select! {
            status = child.wait() => ExitCondition::Exited(status.map_err(RunError::Wait)?.code()),
            _ = tokio::time::sleep(options.timeout) => {
                terminate(&mut child).await;
                ExitCondition::TimedOut
            }
            _ = cancel.cancelled() => {
                terminate(&mut child).await;
                return Err(RunError::Cancelled);
            }
        };
        let elapsed = started.elapsed();
        debug!(?exit, ?elapsed, config = %config.display(), "simulator finished");

        Ok(RunResult {
            exit,
            stdout: collect(stdout).await,
            stderr: collect(stderr).await,
            elapsed,
        })
    }
}

/// Kills the whole process group first so a simulator started by the
/// debugger goes down with it.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        // SAFETY: plain syscall on a process group this runner created.
        unsafe {
            libc::killpg(pid, libc::SIGKILL);
        }
    }
    if let Err(err) = child.kill().await {
        debug!("kill after timeout: {err}");
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe
        && let Err(err) = pipe.read_to_end(&mut buf).await
    {
        debug!("pipe read ended early: {err}");
    }
    buf
}

async fn collect(mut reader: JoinHandle<Vec<u8>>) -> Vec<u8> {
    match tokio::time::timeout(DRAIN_GRACE, &mut reader).await {
        Ok(Ok(buf)) => buf,
        Ok(Err(err)) => {
            warn!("output reader failed: {err}");
            Vec::new()
        }
        Err(_) => {
            warn!("output pipe still open {DRAIN_GRACE:?} after exit; dropping it");
            reader.abort();
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(command: &std::process::Command) -> Vec<String> {
        command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn debugger_mode_wraps_the_simulator() {
        let runner = EtissRunner::with_debugger("/opt/etiss/bare_etiss_processor", "gdb", "/tmp/run.gdb");
        let command = runner
            .command(Path::new("/tmp/add.ini"), ExecutionMode::Debugger)
            .expect("command");
        assert_eq!(command.get_program(), "gdb");
        assert_eq!(
            args(&command),
            [
                "-batch",
                "-command=/tmp/run.gdb",
                "-args",
                "/opt/etiss/bare_etiss_processor",
                "-i/tmp/add.ini",
            ]
        );
    }

    #[test]
    fn direct_mode_skips_the_debugger() {
        let runner = EtissRunner::with_debugger("/opt/etiss/bare_etiss_processor", "gdb", "/tmp/run.gdb");
        let command = runner
            .command(Path::new("/tmp/add.ini"), ExecutionMode::Direct)
            .expect("command");
        assert_eq!(command.get_program(), "/opt/etiss/bare_etiss_processor");
        assert_eq!(args(&command), ["-i/tmp/add.ini"]);
    }

    #[test]
    fn debugger_mode_without_debugger_is_refused() {
        let runner = EtissRunner::direct("/opt/etiss/bare_etiss_processor");
        assert!(matches!(
            runner.command(Path::new("/tmp/add.ini"), ExecutionMode::Debugger),
            Err(RunError::NoDebugger)
        ));
    }

    #[tokio::test]
    async fn run_reports_missing_debugger_without_spawning() {
        let runner = EtissRunner::direct("/nonexistent/bare_etiss_processor");
        let options = RunOptions::default();
        let result = runner
            .run(Path::new("/tmp/add.ini"), &options, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(RunError::NoDebugger)));
    }
}
