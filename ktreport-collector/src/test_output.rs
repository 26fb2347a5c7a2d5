// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-thread capture of output written by tests.
//!
//! Test bodies write through [`stdout`] and [`stderr`] (or the [`kt_print!`](crate::kt_print)
//! family of macros). Every write is routed to the innermost capture installed on the *writing
//! thread*, or passed through to the process's real stream if that thread isn't capturing.
//!
//! Nothing global is swapped out while a test runs, so tests executing concurrently on separate
//! threads each see only their own output, and finishing one test can never redirect or restore
//! the stream another test is writing to.
//!
//! Captures nest: installing a capture while one is already active on the thread shadows it, and
//! draining the inner capture makes the outer one active again.

use bytes::{Bytes, BytesMut};
use std::{
    cell::RefCell,
    io::{self, Write},
    marker::PhantomData,
    ops::Range,
};

/// The initial capacity of each capture buffer.
const CHUNK_SIZE: usize = 4 * 1024;

thread_local! {
    static CAPTURES: RefCell<Vec<TestOutputAccumulator>> = const { RefCell::new(Vec::new()) };
}

/// Installs a new capture for the calling thread.
///
/// Until the matching [`drain`], everything the calling thread writes through [`stdout`] and
/// [`stderr`] is captured instead of being written to the process's streams.
pub fn install() {
    CAPTURES.with_borrow_mut(|captures| captures.push(TestOutputAccumulator::new()));
}

/// Removes the calling thread's innermost capture, returning everything written to it.
///
/// Returns `None` if no capture is installed on the calling thread.
pub fn drain() -> Option<CapturedOutput> {
    CAPTURES
        .with_borrow_mut(|captures| captures.pop())
        .map(TestOutputAccumulator::freeze)
}

/// Returns the number of captures installed on the calling thread.
pub fn capture_depth() -> usize {
    CAPTURES.with_borrow(|captures| captures.len())
}

/// Returns a writer for the calling thread's standard output.
pub fn stdout() -> OutputWriter {
    OutputWriter {
        stream: OutputStream::Stdout,
    }
}

/// Returns a writer for the calling thread's standard error.
pub fn stderr() -> OutputWriter {
    OutputWriter {
        stream: OutputStream::Stderr,
    }
}

/// Prints to the calling thread's captured standard output, or the real one if the thread isn't
/// capturing.
///
/// This is the capturing equivalent of [`print!`].
#[macro_export]
macro_rules! kt_print {
    ($($arg:tt)*) => {
        $crate::test_output::__print($crate::test_output::stdout(), ::std::format_args!($($arg)*))
    };
}

/// Like [`kt_print!`], but with a trailing newline.
#[macro_export]
macro_rules! kt_println {
    () => {
        $crate::kt_print!("\n")
    };
    ($($arg:tt)*) => {
        $crate::test_output::__print(
            $crate::test_output::stdout(),
            ::std::format_args!("{}\n", ::std::format_args!($($arg)*)),
        )
    };
}

/// Prints to the calling thread's captured standard error, or the real one if the thread isn't
/// capturing.
///
/// This is the capturing equivalent of [`eprint!`].
#[macro_export]
macro_rules! kt_eprint {
    ($($arg:tt)*) => {
        $crate::test_output::__print($crate::test_output::stderr(), ::std::format_args!($($arg)*))
    };
}

/// Like [`kt_eprint!`], but with a trailing newline.
#[macro_export]
macro_rules! kt_eprintln {
    () => {
        $crate::kt_eprint!("\n")
    };
    ($($arg:tt)*) => {
        $crate::test_output::__print(
            $crate::test_output::stderr(),
            ::std::format_args!("{}\n", ::std::format_args!($($arg)*)),
        )
    };
}

#[doc(hidden)]
pub fn __print(mut writer: OutputWriter, args: std::fmt::Arguments<'_>) {
    // Match the behavior of print! and eprint!.
    if let Err(error) = writer.write_fmt(args) {
        panic!("failed printing to {}: {error}", writer.stream.name());
    }
}

/// One of the two standard streams.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,

    /// Standard error.
    Stderr,
}

impl OutputStream {
    fn name(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// A writer for one of the calling thread's standard streams.
///
/// Returned by [`stdout`] and [`stderr`]. Whether a write is captured is decided at the time of
/// the write, so a writer obtained before a capture is installed is captured as well.
#[derive(Clone, Copy, Debug)]
pub struct OutputWriter {
    stream: OutputStream,
}

impl Write for OutputWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let captured = CAPTURES.with_borrow_mut(|captures| match captures.last_mut() {
            Some(acc) => {
                acc.push_chunk(self.stream, data);
                true
            }
            None => false,
        });

        if captured {
            return Ok(data.len());
        }
        match self.stream {
            OutputStream::Stdout => io::stdout().write(data),
            OutputStream::Stderr => io::stderr().write(data),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if capture_depth() > 0 {
            return Ok(());
        }
        match self.stream {
            OutputStream::Stdout => io::stdout().flush(),
            OutputStream::Stderr => io::stderr().flush(),
        }
    }
}

/// A guard that captures the calling thread's output for as long as it is alive.
///
/// Use this to wrap a test body: the capture is released on every exit path, including an
/// unwinding panic. Call [`finish`](Self::finish) to retrieve the output.
#[derive(Debug)]
#[must_use = "dropping the scope discards the captured output"]
pub struct CaptureScope {
    finished: bool,
    // The capture lives in a thread-local, so the scope must be finished on the same thread.
    _not_send: PhantomData<*const ()>,
}

impl CaptureScope {
    /// Installs a capture for the calling thread.
    pub fn install() -> Self {
        install();
        Self {
            finished: false,
            _not_send: PhantomData,
        }
    }

    /// Releases the capture and returns everything written while it was installed.
    pub fn finish(mut self) -> CapturedOutput {
        self.finished = true;
        drain().unwrap_or_default()
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        if !self.finished {
            drain();
        }
    }
}

/// A single chunk of captured output, which may represent 0 or more lines.
#[derive(Clone, Debug, Eq, PartialEq)]
struct OutputChunk {
    /// The byte range the chunk occupies in the buffer.
    range: Range<usize>,
    stream: OutputStream,
}

/// Output captured while a single test was running.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CapturedOutput {
    /// The raw buffer of interleaved stdout and stderr.
    buf: Bytes,
    /// Which stream each range of the buffer was written to.
    chunks: Vec<OutputChunk>,
}

impl CapturedOutput {
    /// Returns true if nothing was written to either stream.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Gets only stdout as a lossy UTF-8 string.
    pub fn stdout_lossy(&self) -> String {
        self.as_string(OutputStream::Stdout)
    }

    /// Gets only stderr as a lossy UTF-8 string.
    pub fn stderr_lossy(&self) -> String {
        self.as_string(OutputStream::Stderr)
    }

    /// Gets both streams, interleaved in the order they were written, as a lossy UTF-8 string.
    pub fn combined_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buf)
    }

    fn as_string(&self, stream: OutputStream) -> String {
        // Gather the bytes before decoding, since a multi-byte character may be split across
        // writes.
        let count = self
            .chunks
            .iter()
            .filter_map(|oc| (oc.stream == stream).then_some(oc.range.len()))
            .sum();

        let bytes = self
            .chunks
            .iter()
            .filter(|oc| oc.stream == stream)
            .fold(Vec::with_capacity(count), |mut acc, oc| {
                acc.extend_from_slice(&self.buf[oc.range.clone()]);
                acc
            });

        match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        }
    }
}

/// Accumulates the output of a single capture.
#[derive(Debug)]
struct TestOutputAccumulator {
    buf: BytesMut,
    chunks: Vec<OutputChunk>,
}

impl TestOutputAccumulator {
    fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(CHUNK_SIZE),
            chunks: Vec::new(),
        }
    }

    fn push_chunk(&mut self, stream: OutputStream, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }

        let start = self.buf.len();
        if self.buf.capacity() - start < chunk.len() {
            self.buf.reserve(CHUNK_SIZE.max(chunk.len()));
        }
        self.buf.extend_from_slice(chunk);

        // Coalesce consecutive writes to the same stream.
        if let Some(last) = self.chunks.last_mut() {
            if last.stream == stream && last.range.end == start {
                last.range.end = self.buf.len();
                return;
            }
        }
        self.chunks.push(OutputChunk {
            range: start..self.buf.len(),
            stream,
        });
    }

    fn freeze(self) -> CapturedOutput {
        CapturedOutput {
            buf: self.buf.freeze(),
            chunks: self.chunks,
        }
    }
}
