//! Append-only text log shared by every writer.
//!
//! Each append takes an advisory whole-file exclusive lock
//! (`flock(LOCK_EX)`), writes the complete line in one call and unlocks, so
//! lines from concurrent writers never interleave. `flock` only excludes
//! other open file descriptions, so clones of one sink also share an
//! in-process mutex.
//!
//! [`LogSink`] implements [`MakeWriter`], so it plugs straight into a
//! `tracing_subscriber::fmt` layer; every formatted event becomes one
//! locked append.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing_subscriber::fmt::MakeWriter;

/// Handle to an append-only log file. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LogSink {
    file: Arc<Mutex<File>>,
    path: Arc<PathBuf>,
}

impl LogSink {
    /// Opens (creating if needed) `path` for appending.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path: Arc::new(path.to_path_buf()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line. A trailing newline is added if missing.
    pub fn append(&self, line: &str) -> io::Result<()> {
        if line.ends_with('\n') {
            self.append_bytes(line.as_bytes())
        } else {
            let mut buf = Vec::with_capacity(line.len() + 1);
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
            self.append_bytes(&buf)
        }
    }

    /// Appends raw bytes under the file lock.
    pub fn append_bytes(&self, bytes: &[u8]) -> io::Result<()> {
        let file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let _lock = FileLock::exclusive(&file)?;
        (&*file).write_all(bytes)
    }
}

// ---------------------------------------------------------------------------
// File lock
// ---------------------------------------------------------------------------

/// Holds `flock(LOCK_EX)` until dropped.
struct FileLock<'a> {
    #[cfg_attr(not(unix), allow(dead_code))]
    file: &'a File,
}

impl<'a> FileLock<'a> {
    #[cfg(unix)]
    fn exclusive(file: &'a File) -> io::Result<Self> {
        use std::os::fd::AsRawFd;

        // SAFETY: the descriptor is owned by `file`, which outlives the lock.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { file })
    }

    #[cfg(not(unix))]
    fn exclusive(file: &'a File) -> io::Result<Self> {
        Ok(Self { file })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::fd::AsRawFd;

            // SAFETY: see `exclusive`.
            unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
        }
    }
}

// ---------------------------------------------------------------------------
// tracing integration
// ---------------------------------------------------------------------------

/// Buffers one formatted event and appends it when dropped.
pub struct LogWriter {
    sink: LogSink,
    buf: Vec<u8>,
}

impl Write for LogWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = self.sink.append_bytes(&self.buf);
        self.buf.clear();
        result
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        // Nowhere to report a failed log write.
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            sink: self.clone(),
            buf: Vec::with_capacity(256),
        }
    }
}
