//! A long-running `git diff-tree --stdin` process serving diffs by hash.
//!
//! Each request writes `<hash>\nENDOFPATCH\n` to the process. git prints the
//! patch for the hash and echoes the `ENDOFPATCH` line verbatim, because it
//! does not name an object, which marks the end of the response. Requests are
//! serialized by a mutex.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::commit::DiffSource;
use crate::error::{Result, SiftError};

const END_OF_PATCH: &[u8] = b"ENDOFPATCH\n";

/// Read one patch terminated by a line ending in `ENDOFPATCH\n`.
///
/// The terminator is stripped. A terminator on a line of its own yields an
/// empty patch; end of input before the terminator is an error.
pub fn read_patch<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut patch = Vec::new();
    loop {
        let start = patch.len();
        let read = reader.read_until(b'\n', &mut patch)?;
        if read == 0 {
            return Err(SiftError::subprocess(
                "unexpected end of output while reading patch",
                None,
            ));
        }
        if patch[start..].ends_with(END_OF_PATCH) {
            patch.truncate(patch.len() - END_OF_PATCH.len());
            return Ok(patch);
        }
    }
}

struct Process {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<Vec<u8>>>,
    failed: bool,
}

impl Process {
    /// Wait for the stderr reader and return what it collected. Only
    /// meaningful once stdout is closed, since the reader runs until EOF.
    fn collect_stderr(&mut self) -> Option<String> {
        let handle = self.stderr.take()?;
        let bytes = handle.join().ok()?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn request(&mut self, hash: &str) -> Result<Vec<u8>> {
        self.stdin.write_all(format!("{hash}\nENDOFPATCH\n").as_bytes())?;
        self.stdin.flush()?;
        read_patch(&mut self.stdout)
    }
}

/// Serves diffs from a single git subprocess.
pub struct DiffFetcher {
    process: Mutex<Process>,
}

impl DiffFetcher {
    /// Start `git diff-tree` in the repository at `repo_dir`.
    pub fn spawn<P: AsRef<Path>>(repo_dir: P) -> Result<Self> {
        let mut command = Command::new("git");
        command
            .args([
                "diff-tree",
                "--stdin",
                "--no-prefix",
                "-p",
                "--format=format:",
                "--root",
            ])
            .current_dir(repo_dir);
        Self::with_command(command)
    }

    /// Start an arbitrary command speaking the same protocol.
    pub fn with_command(mut command: Command) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SiftError::subprocess(format!("failed to spawn {command:?}: {e}"), None))?;

        let missing = |stream: &str| SiftError::subprocess(format!("child has no {stream}"), None);
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let mut stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let stderr = std::thread::spawn(move || {
            let mut buf = Vec::new();
            // Whatever was read before a failure is still worth reporting.
            let _ = stderr.read_to_end(&mut buf);
            buf
        });

        log::debug!("spawned diff fetcher {command:?}");
        Ok(DiffFetcher {
            process: Mutex::new(Process {
                child,
                stdin,
                stdout: BufReader::new(stdout),
                stderr: Some(stderr),
                failed: false,
            }),
        })
    }

    /// Fetch the patch of `hash` against its first parent.
    pub fn fetch(&self, hash: &str) -> Result<Vec<u8>> {
        let mut process = self.process.lock();
        if process.failed {
            return Err(SiftError::subprocess("diff fetcher is no longer running", None));
        }

        process.request(hash).map_err(|err| {
            // The stream is out of sync after any failure.
            process.failed = true;
            let _ = process.child.kill();
            let stderr = process.collect_stderr();
            log::warn!("diff fetcher failed for {hash}: {err}");
            match err {
                SiftError::Subprocess { message, .. } => SiftError::subprocess(message, stderr),
                other => SiftError::subprocess(other.to_string(), stderr),
            }
        })
    }
}

impl DiffSource for DiffFetcher {
    fn raw_diff(&self, hash: &str) -> Result<Vec<u8>> {
        self.fetch(hash)
    }
}

impl Drop for DiffFetcher {
    fn drop(&mut self) {
        let process = self.process.get_mut();
        let _ = process.child.kill();
        let _ = process.child.wait();
    }
}
