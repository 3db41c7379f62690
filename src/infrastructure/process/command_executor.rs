use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::common::cancellation::CancellationToken;
use crate::domain::entities::command::{ExecutionMode, ExecutionRequest};
use crate::domain::entities::outcome::ExecutionOutcome;

/// Default time a child gets to exit after SIGTERM before it is killed.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Runs one [`ExecutionRequest`] as a child process.
pub struct CommandExecutor;

impl CommandExecutor {
    /// Run the request to completion or until `cancel` fires.
    ///
    /// Captured output is buffered in full and only released as part of the
    /// returned outcome. On cancellation the child gets SIGTERM, then SIGKILL
    /// once `grace` has elapsed; it has always exited when this returns.
    pub async fn run(
        request: &ExecutionRequest,
        cancel: &CancellationToken,
        grace: Duration,
    ) -> ExecutionOutcome {
        if cancel.is_cancelled() {
            return ExecutionOutcome::Cancelled;
        }

        let start_time = Instant::now();
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.argv)
            .current_dir(request.working_dir())
            .kill_on_drop(true);

        match request.mode {
            ExecutionMode::Captured => {
                // Nothing can answer a prompt or drive an editor here
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .env("GIT_EDITOR", "false")
                    .env("GIT_TERMINAL_PROMPT", "0");

                // Own process group: the terminal's Ctrl-C reaches only us, and
                // cancellation can signal the whole tree the child started.
                #[cfg(unix)]
                cmd.process_group(0);
            }
            ExecutionMode::Interactive => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }

        tracing::debug!(
            "spawning '{}' in {}",
            request.display_command(),
            request.working_dir().display()
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionOutcome::SpawnError {
                    cause: format!("cannot launch '{}': {}", request.program, e),
                }
            }
        };

        let group = match request.mode {
            ExecutionMode::Captured => child.id(),
            ExecutionMode::Interactive => None,
        };
        let stdout = child.stdout.take().map(|pipe| tokio::spawn(read_pipe(pipe)));
        let stderr = child.stderr.take().map(|pipe| tokio::spawn(read_pipe(pipe)));

        let outcome = tokio::select! {
            biased;
            status = child.wait() => match status {
                // Killed by a signal while the run is being cancelled
                Ok(status) if status.code().is_none() && cancel.is_cancelled() => {
                    terminate_group(group, grace).await;
                    abort(stdout);
                    abort(stderr);
                    ExecutionOutcome::Cancelled
                }
                Ok(status) => {
                    let stdout = drain(stdout, grace).await;
                    let stderr = drain(stderr, grace).await;
                    ExecutionOutcome::from_exit(status.code(), stdout, stderr)
                }
                Err(e) => ExecutionOutcome::SpawnError {
                    cause: format!("failed waiting for '{}': {}", request.program, e),
                },
            },
            () = cancel.cancelled() => {
                terminate(&mut child, group, grace).await;
                abort(stdout);
                abort(stderr);
                ExecutionOutcome::Cancelled
            }
        };

        tracing::debug!(
            "'{}' in {} finished as {} after {}ms",
            request.display_command(),
            request.repository.identity,
            outcome.label(),
            start_time.elapsed().as_millis()
        );
        outcome
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(mut pipe: R) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    pipe.read_to_end(&mut buffer).await?;
    Ok(buffer)
}

/// Collect what a reader task buffered.
///
/// A grandchild can keep the pipe open after the child exits, so reading is
/// bounded by `limit`.
async fn drain(reader: Option<JoinHandle<std::io::Result<Vec<u8>>>>, limit: Duration) -> String {
    let Some(mut reader) = reader else {
        return String::new();
    };

    match tokio::time::timeout(limit, &mut reader).await {
        Ok(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(Ok(Err(e))) => {
            tracing::warn!("failed reading child output: {}", e);
            String::new()
        }
        Ok(Err(e)) => {
            tracing::warn!("output reader task failed: {}", e);
            String::new()
        }
        Err(_) => {
            tracing::warn!("child output still open {}ms after exit, dropping it", limit.as_millis());
            reader.abort();
            String::new()
        }
    }
}

fn abort(reader: Option<JoinHandle<std::io::Result<Vec<u8>>>>) {
    if let Some(reader) = reader {
        reader.abort();
    }
}

/// SIGTERM, wait up to `grace`, then SIGKILL.
///
/// `group` is the child's own process group, signalled as a whole so that
/// grandchildren (pipelines, ssh, credential helpers) go down with it.
async fn terminate(child: &mut Child, group: Option<u32>, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;
    request_termination(child, group);

    match tokio::time::timeout_at(deadline, child.wait()).await {
        Ok(Ok(status)) => tracing::debug!("child exited after termination request: {}", status),
        Ok(Err(e)) => tracing::warn!("failed waiting for terminated child: {}", e),
        Err(_) => {
            tracing::warn!(
                "child ignored termination for {}ms, killing it",
                grace.as_millis()
            );
            if let Err(e) = child.kill().await {
                tracing::error!("failed to kill child: {}", e);
            }
        }
    }

    kill_group(group);
}

/// The child is gone already; take down whatever it left in its group.
async fn terminate_group(group: Option<u32>, grace: Duration) {
    if !signal_group(group, GroupSignal::Terminate) {
        return;
    }
    let deadline = tokio::time::Instant::now() + grace;
    while group_alive(group) && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    kill_group(group);
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
    Terminate,
    Kill,
}

/// Members of the group that outlived the leader get SIGKILL.
fn kill_group(group: Option<u32>) {
    if group_alive(group) {
        tracing::debug!("killing leftover processes of group {:?}", group);
        signal_group(group, GroupSignal::Kill);
    }
}

/// Returns whether the signal was delivered to at least one process.
#[cfg(unix)]
fn signal_group(group: Option<u32>, signal: GroupSignal) -> bool {
    use rustix::process::{kill_process_group, Signal};

    let Some(pgid) = group_pid(group) else {
        return false;
    };
    let signal = match signal {
        GroupSignal::Terminate => Signal::TERM,
        GroupSignal::Kill => Signal::KILL,
    };
    match kill_process_group(pgid, signal) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("{:?} to group {:?} failed: {}", signal, pgid, e);
            false
        }
    }
}

#[cfg(not(unix))]
fn signal_group(_group: Option<u32>, _signal: GroupSignal) -> bool {
    false
}

#[cfg(unix)]
fn group_alive(group: Option<u32>) -> bool {
    group_pid(group).is_some_and(|pgid| rustix::process::test_kill_process_group(pgid).is_ok())
}

#[cfg(not(unix))]
fn group_alive(_group: Option<u32>) -> bool {
    false
}

#[cfg(unix)]
fn group_pid(group: Option<u32>) -> Option<rustix::process::Pid> {
    group
        .and_then(|id| i32::try_from(id).ok())
        .and_then(rustix::process::Pid::from_raw)
}

#[cfg(unix)]
fn request_termination(child: &mut Child, group: Option<u32>) {
    use rustix::process::{kill_process, Pid, Signal};

    if signal_group(group, GroupSignal::Terminate) {
        return;
    }

    // `id()` is `None` once the child has been reaped.
    let Some(pid) = child
        .id()
        .and_then(|id| i32::try_from(id).ok())
        .and_then(Pid::from_raw)
    else {
        return;
    };

    if let Err(e) = kill_process(pid, Signal::TERM) {
        tracing::debug!("SIGTERM to {:?} failed: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child, _group: Option<u32>) {
    if let Err(e) = child.start_kill() {
        tracing::debug!("failed to stop child: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::repository::RepositoryRecord;
    use tempfile::TempDir;

    fn shell_request(dir: &TempDir, script: &str) -> ExecutionRequest {
        ExecutionRequest {
            index: 0,
            repository: RepositoryRecord::new("test", dir.path()),
            program: "sh".into(),
            argv: vec!["-c".into(), script.into()],
            mode: ExecutionMode::Captured,
        }
    }

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let dir = TempDir::new().unwrap();
        let request = shell_request(&dir, "echo out; echo err >&2; exit 3");

        let outcome =
            CommandExecutor::run(&request, &CancellationToken::new(), DEFAULT_GRACE_PERIOD).await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Failed {
                stdout: "out\n".into(),
                stderr: "err\n".into(),
                exit_code: Some(3),
            }
        );
    }

    #[tokio::test]
    async fn test_runs_in_repository_directory() {
        let dir = TempDir::new().unwrap();
        let request = shell_request(&dir, "pwd");

        let outcome =
            CommandExecutor::run(&request, &CancellationToken::new(), DEFAULT_GRACE_PERIOD).await;
        match outcome {
            ExecutionOutcome::Succeeded { stdout, .. } => {
                let reported = std::path::PathBuf::from(stdout.trim());
                assert_eq!(
                    reported.canonicalize().unwrap(),
                    dir.path().canonicalize().unwrap()
                );
            }
            other => panic!("Expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_large_output_does_not_deadlock() {
        let dir = TempDir::new().unwrap();
        // Well past a pipe buffer on both streams
        let request = shell_request(
            &dir,
            "i=0; while [ $i -lt 20000 ]; do echo line-$i; echo err-$i >&2; i=$((i+1)); done",
        );

        let outcome = tokio::time::timeout(
            Duration::from_secs(30),
            CommandExecutor::run(&request, &CancellationToken::new(), DEFAULT_GRACE_PERIOD),
        )
        .await
        .expect("child should finish");
        match outcome {
            ExecutionOutcome::Succeeded { stdout, stderr } => {
                assert_eq!(stdout.lines().count(), 20000);
                assert_eq!(stderr.lines().count(), 20000);
            }
            other => panic!("Expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let mut request = shell_request(&dir, "true");
        request.program = "definitely-not-a-program-xyz".into();

        let outcome =
            CommandExecutor::run(&request, &CancellationToken::new(), DEFAULT_GRACE_PERIOD).await;
        assert!(matches!(outcome, ExecutionOutcome::SpawnError { .. }));
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("ran");
        let request = shell_request(&dir, &format!("touch {}", marker.display()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = CommandExecutor::run(&request, &cancel, DEFAULT_GRACE_PERIOD).await;
        assert_eq!(outcome, ExecutionOutcome::Cancelled);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_cancel_terminates_running_child() {
        let dir = TempDir::new().unwrap();
        let request = shell_request(&dir, "sleep 30");
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let outcome = CommandExecutor::run(&request, &cancel, Duration::from_secs(2)).await;
        assert_eq!(outcome, ExecutionOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_ignoring_sigterm_is_killed_after_grace() {
        let dir = TempDir::new().unwrap();
        // The shell itself ignores SIGTERM, so only SIGKILL ends it
        let request = shell_request(&dir, "trap '' TERM; while :; do :; done");
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let outcome = CommandExecutor::run(&request, &cancel, Duration::from_millis(300)).await;
        assert_eq!(outcome, ExecutionOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_captured_child_cannot_open_editor_or_prompt() {
        let dir = TempDir::new().unwrap();
        let request = shell_request(&dir, "echo \"$GIT_EDITOR $GIT_TERMINAL_PROMPT\"");

        let outcome =
            CommandExecutor::run(&request, &CancellationToken::new(), DEFAULT_GRACE_PERIOD).await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Succeeded {
                stdout: "false 0\n".into(),
                stderr: String::new(),
            }
        );
    }

    /// Poll until `path` holds a pid.
    #[cfg(unix)]
    async fn read_pid(path: &std::path::Path) -> rustix::process::Pid {
        for _ in 0..500 {
            if let Ok(contents) = std::fs::read_to_string(path) {
                if let Ok(raw) = contents.trim().parse::<i32>() {
                    return rustix::process::Pid::from_raw(raw).unwrap();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no pid written to {}", path.display());
    }

    /// Running, as opposed to gone or a zombie waiting for init.
    #[cfg(unix)]
    fn is_running(pid: rustix::process::Pid) -> bool {
        if rustix::process::test_kill_process(pid).is_err() {
            return false;
        }
        match std::fs::read_to_string(format!("/proc/{}/stat", pid.as_raw_nonzero())) {
            Ok(stat) => stat
                .rsplit_once(')')
                .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
                .unwrap_or(true),
            Err(_) => !std::path::Path::new("/proc/self").exists(),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captured_child_runs_in_own_process_group() {
        use rustix::process::getpgid;

        let dir = TempDir::new().unwrap();
        let pid_file = dir.path().join("pid");
        let request = shell_request(&dir, &format!("echo $$ > {}; exec sleep 30", pid_file.display()));
        let cancel = CancellationToken::new();

        let job = {
            let cancel = cancel.clone();
            tokio::spawn(async move { CommandExecutor::run(&request, &cancel, DEFAULT_GRACE_PERIOD).await })
        };

        let pid = read_pid(&pid_file).await;
        assert_eq!(getpgid(Some(pid)).unwrap(), pid);
        assert_ne!(getpgid(Some(pid)).unwrap(), getpgid(None).unwrap());

        cancel.cancel();
        assert_eq!(job.await.unwrap(), ExecutionOutcome::Cancelled);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_interrupted_during_cancel_is_cancelled() {
        use rustix::process::{kill_process, Signal};

        let dir = TempDir::new().unwrap();
        let pid_file = dir.path().join("pid");
        let request = shell_request(&dir, &format!("echo $$ > {}; exec sleep 30", pid_file.display()));
        let cancel = CancellationToken::new();

        let job = {
            let cancel = cancel.clone();
            tokio::spawn(async move { CommandExecutor::run(&request, &cancel, DEFAULT_GRACE_PERIOD).await })
        };

        // The child dies of SIGINT just as the run is cancelled
        let pid = read_pid(&pid_file).await;
        kill_process(pid, Signal::INT).unwrap();
        cancel.cancel();

        assert_eq!(job.await.unwrap(), ExecutionOutcome::Cancelled);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_terminates_grandchildren() {
        let dir = TempDir::new().unwrap();
        let pid_file = dir.path().join("gpid");
        let request = shell_request(
            &dir,
            &format!("sleep 30 & echo $! > {}; wait; echo done", pid_file.display()),
        );
        let cancel = CancellationToken::new();

        let job = {
            let cancel = cancel.clone();
            tokio::spawn(async move { CommandExecutor::run(&request, &cancel, Duration::from_secs(1)).await })
        };

        let grandchild = read_pid(&pid_file).await;
        assert!(is_running(grandchild));
        cancel.cancel();

        assert_eq!(job.await.unwrap(), ExecutionOutcome::Cancelled);
        // An orphan is reaped asynchronously by init
        let mut alive = is_running(grandchild);
        for _ in 0..50 {
            if !alive {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            alive = is_running(grandchild);
        }
        assert!(!alive, "grandchild {grandchild:?} outlived the run");
    }
}
