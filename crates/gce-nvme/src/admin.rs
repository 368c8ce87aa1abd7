// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Queries against the NVMe admin interface
//!
//! The queries are issued through the `nvme` command line tool. Each query is
//! attempted exactly once; an optional deadline bounds how long a hung device
//! may stall the caller.

use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use log::{debug, warn};

use crate::Error;

/// Interval between checks on a running query when a timeout is set
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Synchronous access to the controller and namespace identify data of a device.
pub trait AdminCommand {
    /// Returns the human readable, vendor-specific controller identity (`id-ctrl -v`).
    fn id_ctrl(&self, device: &Path) -> Result<String, Error>;

    /// Returns the raw binary identify-namespace data (`id-ns -b`).
    fn id_ns_raw(&self, device: &Path) -> Result<Vec<u8>, Error>;
}

/// [`AdminCommand`] backed by the `nvme` binary from nvme-cli.
#[derive(Debug, Clone)]
pub struct NvmeCli {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl NvmeCli {
    /// Locates `binary` (a name looked up in `PATH`, or a path) and checks that it is executable.
    pub fn locate(binary: impl AsRef<Path>) -> Result<Self, Error> {
        let binary = which::which(binary.as_ref()).map_err(Error::ToolUnavailable)?;
        debug!("using nvme cli at {}", binary.display());
        Ok(Self { binary, timeout: None })
    }

    /// Bounds each query to `timeout`, killing the tool when it expires.
    pub fn with_timeout(self, timeout: Option<Duration>) -> Self {
        Self { timeout, ..self }
    }

    /// Returns the path of the binary in use.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn run(&self, args: &[&str], device: &Path) -> Result<Vec<u8>, Error> {
        let command = format!("{} {} {}", self.binary.display(), args.join(" "), device.display());
        debug!("running `{command}`");

        let child = Command::new(&self.binary)
            .args(args)
            .arg(device)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let (status, stdout, stderr) = match self.timeout {
            Some(timeout) => wait_with_deadline(child, timeout, &command)?,
            None => {
                let output = child.wait_with_output()?;
                (output.status, output.stdout, output.stderr)
            }
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_owned();
            warn!("`{command}` exited with {status}: {stderr}");
            return Err(Error::AdminFailed {
                command,
                reason: if stderr.is_empty() { status.to_string() } else { stderr },
            });
        }

        Ok(stdout)
    }
}

impl AdminCommand for NvmeCli {
    fn id_ctrl(&self, device: &Path) -> Result<String, Error> {
        let stdout = self.run(&["id-ctrl", "-v"], device)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn id_ns_raw(&self, device: &Path) -> Result<Vec<u8>, Error> {
        self.run(&["id-ns", "-b"], device)
    }
}

/// Waits for `child` to exit, killing it once `timeout` has elapsed.
///
/// The pipes are drained on helper threads so a chatty tool cannot block on a full pipe.
///
/// A timeout too large to represent as an instant never expires.
fn wait_with_deadline(
    mut child: Child,
    timeout: Duration,
    command: &str,
) -> Result<(ExitStatus, Vec<u8>, Vec<u8>), Error> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let deadline = Instant::now().checked_add(timeout);

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            warn!("`{command}` timed out after {timeout:?}, killing it");
            child.kill()?;
            child.wait()?;
            return Err(Error::AdminFailed {
                command: command.to_owned(),
                reason: format!("timed out after {}s", timeout.as_secs_f32()),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let collect = |handle: Option<thread::JoinHandle<Vec<u8>>>| {
        handle.and_then(|h| h.join().ok()).unwrap_or_default()
    };
    Ok((status, collect(stdout), collect(stderr)))
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_locate_missing_tool() {
        let err = NvmeCli::locate("definitely-not-an-nvme-cli").unwrap_err();
        assert!(matches!(err, Error::ToolUnavailable(_)));
        assert!(err.to_string().contains("try running as root"));
    }

    #[test]
    fn test_run_reports_failure() {
        // `false` ignores its arguments and exits non-zero
        let cli = NvmeCli::locate("false").unwrap();
        let err = cli.id_ctrl(Path::new("/dev/nvme0")).unwrap_err();
        assert!(matches!(err, Error::AdminFailed { .. }));
    }

    #[test]
    fn test_run_captures_stdout() {
        // `echo` stands in for the tool and echoes the query back
        let cli = NvmeCli::locate("echo").unwrap();
        let out = cli.id_ctrl(Path::new("/dev/nvme0")).unwrap();
        assert_eq!(out.trim(), "id-ctrl -v /dev/nvme0");

        let cli = cli.with_timeout(Some(Duration::from_secs(5)));
        let out = cli.id_ns_raw(Path::new("/dev/nvme0n1")).unwrap();
        assert_eq!(out, b"id-ns -b /dev/nvme0n1\n");
    }

    #[test]
    fn test_run_with_unbounded_timeout() {
        let cli = NvmeCli::locate("echo")
            .unwrap()
            .with_timeout(Some(Duration::from_secs(u64::MAX / 2)));
        let out = cli.id_ctrl(Path::new("/dev/nvme0")).unwrap();
        assert_eq!(out.trim(), "id-ctrl -v /dev/nvme0");
    }

    #[test]
    fn test_run_times_out() {
        // `sleep` treats the query arguments as invalid and exits, so use a
        // script that ignores them and hangs instead
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("hung-nvme");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let cli = NvmeCli::locate(&script)
            .unwrap()
            .with_timeout(Some(Duration::from_millis(200)));
        let started = Instant::now();
        let err = cli.id_ctrl(Path::new("/dev/nvme0")).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(err.to_string().contains("timed out"));
    }
}
