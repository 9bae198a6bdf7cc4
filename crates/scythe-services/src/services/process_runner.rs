//! Bounded execution of external commands.
//!
//! Every heavy step of the pipeline goes through [`ProcessRunner`]: the
//! command runs with piped stdio in a dedicated process group, is killed
//! (with its descendants) when the configured timeout elapses, and maps a
//! non-zero exit status to a typed error carrying the exit code and
//! captured stderr.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use scythe_foundation::{ScytheError, ScytheResult};

/// Runs external commands to completion or until a timeout elapses.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run a command in `cwd`, returning captured stdout on exit code 0.
    ///
    /// A timeout yields `ProcessTimeout` and guarantees the process group
    /// is no longer running; a non-zero exit yields `ProcessExit` with the
    /// exact exit code and captured stderr.
    pub async fn run(&self, program: &Path, args: &[String], cwd: &Path) -> ScytheResult<String> {
        let rendered = render_command(program, args);
        debug!(command = %rendered, cwd = %cwd.display(), "Spawning external command");

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| ScytheError::Io {
            message: format!("Failed to spawn `{rendered}`: {source}"),
            source: Some(source),
        })?;

        // Drain the pipes while waiting, so a chatty process can never
        // block on a full pipe buffer.
        let stdout_task = drain_pipe(child.stdout.take());
        let stderr_task = drain_pipe(child.stderr.take());

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(waited) => waited?,
            Err(_) => {
                warn!(command = %rendered, timeout_secs = self.timeout.as_secs(), "Command timed out, killing process group");
                kill_process_tree(&mut child).await;
                return Err(ScytheError::ProcessTimeout {
                    command: rendered,
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(String::from_utf8_lossy(&stdout).into_owned())
        } else {
            let code = status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            warn!(command = %rendered, code, stderr = %stderr, "Command failed");
            Err(ScytheError::ProcessExit {
                command: rendered,
                code,
                stderr,
            })
        }
    }
}

fn drain_pipe<R>(pipe: Option<R>) -> tokio::task::JoinHandle<Vec<u8>>
where
    R: AsyncReadExt + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer).await;
        }
        buffer
    })
}

/// Kill the child and, on unix, its whole process group, then reap it.
async fn kill_process_tree(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // the child was spawned as a group leader, so the negated pid
        // addresses the child and all of its descendants
        unsafe {
            libc::killpg(pid as i32, libc::SIGKILL);
        }
    }
    if let Err(error) = child.kill().await {
        warn!(error = %error, "Failed to kill timed-out process");
    }
}

fn render_command(program: &Path, args: &[String]) -> String {
    let mut rendered = program.display().to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}

/// Canonical absolute path for `file` inside `dir`.
///
/// `dir` must exist; `file` may not exist yet (the analysis database is
/// created by the command the resulting path is passed to).
pub fn canonical_under(dir: &Path, file: &str) -> ScytheResult<PathBuf> {
    Ok(std::fs::canonicalize(dir)?.join(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_command_for_diagnostics() {
        let rendered = render_command(
            Path::new("/usr/bin/git"),
            &["clone".to_string(), "--depth".to_string(), "1".to_string()],
        );
        assert_eq!(rendered, "/usr/bin/git clone --depth 1");
    }

    #[test]
    fn canonical_under_resolves_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = canonical_under(dir.path(), "db.udb").unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("db.udb"));
    }

    #[test]
    fn canonical_under_fails_for_missing_dir() {
        assert!(canonical_under(Path::new("/definitely/not/a/dir"), "db.udb").is_err());
    }
}
