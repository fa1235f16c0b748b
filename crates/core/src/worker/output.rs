//! Bounded capture of worker output.
//!
//! Worker stdout/stderr go to per-job log files, never to the ledger line
//! by line. When a worker exits unsuccessfully the launcher reads back the
//! end of each log and turns the last N lines into the job's `error` text.

use std::collections::VecDeque;

/// Default number of lines kept per stream.
pub const DEFAULT_TAIL_LINES: usize = 40;

/// Longest single line kept, in bytes. Longer lines are cut.
pub const MAX_LINE_BYTES: usize = 4 * 1024;

/// Most bytes read back from the end of a worker log.
pub const MAX_TAIL_BYTES: u64 = 64 * 1024;

/// Ring buffer holding the most recent lines of a stream.
#[derive(Debug, Clone)]
pub struct OutputTail {
    capacity: usize,
    lines: VecDeque<String>,
    dropped: usize,
    cut: bool,
}

impl OutputTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            lines: VecDeque::with_capacity(capacity.max(1)),
            dropped: 0,
            cut: false,
        }
    }

    /// Rebuild a tail from the last bytes of a log.
    ///
    /// Both `\n` and `\r` end a line, so progress bars redrawn in place
    /// count as lines. `cut` means the log continued before `bytes`; the
    /// first, partial line is then discarded unless it is the only one.
    pub fn from_log(capacity: usize, bytes: &[u8], cut: bool) -> Self {
        let mut tail = Self::new(capacity);
        tail.cut = cut;

        let mut segments: Vec<&[u8]> = bytes.split(|b| matches!(*b, b'\n' | b'\r')).collect();
        if cut && segments.len() > 1 {
            segments.remove(0);
        }
        for segment in segments.into_iter().filter(|s| !s.is_empty()) {
            tail.push(&String::from_utf8_lossy(segment));
        }
        tail
    }

    /// Append a line, evicting the oldest one when full.
    pub fn push(&mut self, line: &str) {
        let line = truncate_line(line.trim_end_matches(['\r', '\n']));
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(line);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// Captured lines joined with newlines, prefixed by an elision marker
    /// when older output is missing.
    pub fn render(&self) -> String {
        let body = self.lines.iter().cloned().collect::<Vec<_>>().join("\n");
        if self.cut {
            format!("[... earlier output omitted]\n{body}")
        } else if self.dropped > 0 {
            format!("[... {} earlier lines omitted]\n{body}", self.dropped)
        } else {
            body
        }
    }
}

fn truncate_line(line: &str) -> String {
    if line.len() <= MAX_LINE_BYTES {
        return line.to_string();
    }
    let mut end = MAX_LINE_BYTES;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &line[..end])
}

/// Build the `error` text for a worker that exited unsuccessfully.
///
/// Prefers the stderr tail, falls back to stdout, and always returns a
/// non-empty string.
pub fn exit_failure_message(
    exit_code: Option<i32>,
    stderr: &OutputTail,
    stdout: &OutputTail,
) -> String {
    let head = match exit_code {
        Some(code) => format!("Worker exited with status {code}"),
        None => "Worker was terminated by a signal".to_string(),
    };

    if !stderr.is_empty() {
        format!("{head}:\n{}", stderr.render())
    } else if !stdout.is_empty() {
        format!("{head} (no stderr output; last stdout lines):\n{}", stdout.render())
    } else {
        format!("{head} without producing any output")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
