//! Output streams shared by commands, hooks, help, and the exit funnel.
//!
//! Production wiring writes through `anstream`, which strips ANSI styling when
//! the destination is not a terminal. Tests swap in in-memory buffers to assert
//! on exactly what reached stdout and stderr.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Cloneable handle to the stdout/stderr pair of one invocation.
#[derive(Clone)]
pub struct Streams {
    stdout: Sink,
    stderr: Sink,
}

impl fmt::Debug for Streams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streams").finish_non_exhaustive()
    }
}

impl Default for Streams {
    fn default() -> Self {
        Self::terminal()
    }
}

impl Streams {
    /// Streams bound to the process stdout/stderr.
    pub fn terminal() -> Self {
        Self {
            stdout: Arc::new(Mutex::new(Box::new(anstream::stdout()))),
            stderr: Arc::new(Mutex::new(Box::new(anstream::stderr()))),
        }
    }

    /// In-memory streams plus a handle for reading back what was written.
    pub fn capture() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        let streams = Self {
            stdout: Arc::new(Mutex::new(Box::new(SharedBuffer(Arc::clone(&captured.stdout))))),
            stderr: Arc::new(Mutex::new(Box::new(SharedBuffer(Arc::clone(&captured.stderr))))),
        };
        (streams, captured)
    }

    pub fn write_stdout(&self, text: &str) {
        write_to(&self.stdout, text.as_bytes());
    }

    pub fn write_stderr(&self, text: &str) {
        write_to(&self.stderr, text.as_bytes());
    }

    /// Raw bytes, for forwarding child process output.
    pub fn write_stdout_bytes(&self, bytes: &[u8]) {
        write_to(&self.stdout, bytes);
    }

    pub fn write_stderr_bytes(&self, bytes: &[u8]) {
        write_to(&self.stderr, bytes);
    }
}

fn write_to(sink: &Sink, bytes: &[u8]) {
    let mut out = sink.lock().unwrap_or_else(PoisonError::into_inner);
    out.write_all(bytes).ok();
    out.flush().ok();
}

/// Read side of [`Streams::capture`].
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    stdout: Arc<Mutex<Vec<u8>>>,
    stderr: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn stdout(&self) -> String {
        read_buffer(&self.stdout)
    }

    pub fn stderr(&self) -> String {
        read_buffer(&self.stderr)
    }
}

fn read_buffer(buffer: &Mutex<Vec<u8>>) -> String {
    let bytes = buffer.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
}

struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
