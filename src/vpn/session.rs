//! A single tunnel process
//!
//! The tunnel executable is launched with
//! `--config <path> --auth-user-pass <auth> [extra args...]` and is only
//! considered up once [`SUCCESS_MARKER`] shows up on its standard output.

use crate::vpn::{VpnError, VpnResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Line printed by OpenVPN once the tunnel is usable
pub const SUCCESS_MARKER: &str = "Initialization Sequence Completed";

/// How long a graceful stop may take before the process is killed
const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// A running tunnel process
#[derive(Debug)]
pub struct TunnelHandle {
    child: Child,
    pid: Option<u32>,
    config: PathBuf,
    drain: JoinHandle<()>,
}

impl TunnelHandle {
    /// Process id of the tunnel, if the process has not been reaped
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Configuration the tunnel was started with
    pub fn config(&self) -> &Path {
        &self.config
    }
}

/// Launcher for the tunnel executable
#[derive(Debug, Clone)]
pub struct Tunnel {
    command: Vec<String>,
    stop_grace: Duration,
}

enum Startup {
    Ready,
    Exited { stderr: String },
    Stderr(String),
    Deadline,
}

impl Tunnel {
    /// Creates a launcher
    ///
    /// # Arguments
    ///
    /// * `command` - Program followed by any leading arguments, e.g. `["sudo", "openvpn"]`
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Sets how long [`Tunnel::stop`] waits after the termination request
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Starts a tunnel and waits for it to come up
    ///
    /// # Arguments
    ///
    /// * `config` - Path of the tunnel configuration file
    /// * `auth` - Path of the credentials file
    /// * `extra_args` - Appended to the command line as-is
    /// * `timeout` - How long to wait for [`SUCCESS_MARKER`]
    ///
    /// # Returns
    ///
    /// * `Ok(TunnelHandle)` - The marker was seen
    /// * `Err(VpnError::Timeout)` - The deadline passed; carries the captured stdout lines
    /// * `Err(VpnError::ProcessFailure)` - The process wrote to stderr or exited
    pub async fn start(
        &self,
        config: &Path,
        auth: &Path,
        extra_args: &[String],
        timeout: Duration,
    ) -> VpnResult<TunnelHandle> {
        let (program, leading) = self.command.split_first().ok_or_else(|| {
            VpnError::Spawn(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "tunnel command is empty",
            ))
        })?;

        tracing::debug!(config = %config.display(), "starting tunnel");

        let mut child = Command::new(program)
            .args(leading)
            .arg("--config")
            .arg(config)
            .arg("--auth-user-pass")
            .arg(auth)
            .args(extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(VpnError::Spawn)?;

        let pid = child.id();
        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                reap(&mut child).await;
                return Err(VpnError::Spawn(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "tunnel output pipes unavailable",
                )));
            }
        };

        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut captured: Vec<String> = Vec::new();
        let mut out_open = true;
        let mut err_open = true;

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let startup = loop {
            tokio::select! {
                biased;

                line = out_lines.next_line(), if out_open => match line {
                    Ok(Some(line)) => {
                        tracing::trace!(config = %config.display(), "{}", line);
                        if line.contains(SUCCESS_MARKER) {
                            break Startup::Ready;
                        }
                        if !line.trim().is_empty() {
                            captured.push(line);
                        }
                    }
                    _ => out_open = false,
                },

                line = err_lines.next_line(), if err_open => match line {
                    Ok(Some(line)) if !line.trim().is_empty() => break Startup::Stderr(line),
                    Ok(Some(_)) => {}
                    _ => err_open = false,
                },

                status = child.wait(), if !out_open && !err_open => {
                    let stderr = match status {
                        Ok(status) if status.success() => String::new(),
                        Ok(status) => status.to_string(),
                        Err(e) => e.to_string(),
                    };
                    break Startup::Exited { stderr };
                }

                _ = &mut deadline => break Startup::Deadline,
            }
        };

        match startup {
            Startup::Ready => {
                tracing::info!(config = %config.display(), "tunnel is up");
                Ok(TunnelHandle {
                    child,
                    pid,
                    config: config.to_path_buf(),
                    drain: tokio::spawn(drain(out_lines, err_lines)),
                })
            }
            Startup::Stderr(stderr) => {
                reap(&mut child).await;
                Err(VpnError::ProcessFailure {
                    stdout: captured.join("\n"),
                    stderr,
                })
            }
            Startup::Exited { stderr } => Err(VpnError::ProcessFailure {
                stdout: captured.join("\n"),
                stderr,
            }),
            Startup::Deadline => {
                reap(&mut child).await;
                Err(VpnError::Timeout {
                    output: captured.join("\n"),
                })
            }
        }
    }

    /// Stops a tunnel
    ///
    /// Sends a graceful termination request and waits a short grace period,
    /// then always follows up with a forced kill. A process that already
    /// exited makes the kill a no-op. Errors from both steps are reported
    /// together.
    pub async fn stop(&self, handle: Option<TunnelHandle>) -> VpnResult<()> {
        let mut handle = handle.ok_or(VpnError::NoProcess)?;
        let pid = handle.pid.ok_or(VpnError::NoProcess)?;

        tracing::debug!(pid, config = %handle.config.display(), "stopping tunnel");

        let mut errors = Vec::new();

        if let Err(e) = terminate(pid) {
            errors.push(format!("graceful stop: {}", e));
        }

        let exited = matches!(
            tokio::time::timeout(self.stop_grace, handle.child.wait()).await,
            Ok(Ok(_))
        );
        if !exited {
            tracing::debug!(pid, "tunnel ignored termination request");
        }

        match handle.child.kill().await {
            Ok(()) => {}
            Err(e) if exited => tracing::trace!(pid, "tunnel already exited: {}", e),
            Err(e) => errors.push(format!("kill {}: {}", pid, e)),
        }

        handle.drain.abort();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(VpnError::Stop(errors.join("; ")))
        }
    }

    /// Stops the tunnel if one is running, then starts a new one
    pub async fn restart(
        &self,
        handle: Option<TunnelHandle>,
        config: &Path,
        auth: &Path,
        extra_args: &[String],
        timeout: Duration,
    ) -> VpnResult<TunnelHandle> {
        match self.stop(handle).await {
            Ok(()) | Err(VpnError::NoProcess) => {}
            Err(e) => return Err(e),
        }
        self.start(config, auth, extra_args, timeout).await
    }
}

#[cfg(unix)]
fn terminate(pid: u32) -> std::io::Result<()> {
    // SAFETY: kill(2) takes plain integers and has no memory effects
    let r = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if r == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
fn terminate(_pid: u32) -> std::io::Result<()> {
    Ok(())
}

async fn reap(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::trace!("tunnel process already gone: {}", e);
    }
}

async fn drain<O, E>(mut out: Lines<BufReader<O>>, mut err: Lines<BufReader<E>>)
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out_open = true;
    let mut err_open = true;
    while out_open || err_open {
        tokio::select! {
            line = out.next_line(), if out_open => match line {
                Ok(Some(line)) => tracing::trace!("tunnel: {}", line),
                _ => out_open = false,
            },
            line = err.next_line(), if err_open => match line {
                Ok(Some(line)) => tracing::warn!("tunnel stderr: {}", line),
                _ => err_open = false,
            },
        }
    }
}
