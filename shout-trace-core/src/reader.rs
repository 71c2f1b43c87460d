//! Line windows over a file, addressed by byte offset.
//!
//! Offsets returned in [`FileLine`] are the resumption tokens for the next
//! read. Line indices are never reused across reads, the reader keeps no
//! knowledge of how many lines a file has.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};

pub const DEFAULT_BLOCK_SIZE: u64 = 8192;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLine {
    pub offset: u64,
    /// Line text including its trailing newline, if the file has one.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineWindow {
    pub lines: Vec<FileLine>,
    pub start_offset: u64,
    /// Offset three quarters into the window; the next page starts here so
    /// consecutive pages overlap by a quarter.
    pub next_offset: u64,
}

impl LineWindow {
    /// `position` is where reading stopped and stands in for both offsets
    /// when no line was read.
    pub fn new(lines: Vec<FileLine>, position: u64) -> Self {
        let start_offset = lines.first().map_or(position, |line| line.offset);
        let next_offset = lines
            .get(lines.len() * 3 / 4)
            .map_or(start_offset, |line| line.offset);
        Self {
            lines,
            start_offset,
            next_offset,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileLine> {
        self.lines.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowedFileReader {
    block_size: u64,
}

impl Default for WindowedFileReader {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl WindowedFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block_size(block_size: u64) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Reads up to `max_lines` lines (all remaining when `None`) starting at
    /// `start_offset`. A negative offset counts from the end of the file and
    /// skips ahead to the next full line.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn read_forward(
        &self,
        path: &Path,
        start_offset: i64,
        max_lines: Option<usize>,
    ) -> Result<LineWindow> {
        let mut cursor = LineCursor::open(path)?;
        cursor.seek_offset(start_offset);
        let start = cursor.pos;

        let mut lines = Vec::new();
        while max_lines.map_or(true, |max| lines.len() < max) {
            match cursor.read_line() {
                Some(line) => lines.push(line),
                None => break,
            }
        }
        debug!(start, count = lines.len(), "read forward");
        Ok(LineWindow::new(lines, start))
    }

    /// Reads the `max_lines` lines that end at `end_offset`.
    ///
    /// Walks backward one block at a time until `lookback` lines (defaulting
    /// to, and capped at, `max_lines`) of history are found, then tops the
    /// window up with lines from `end_offset` onward when history runs out.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn read_backward(
        &self,
        path: &Path,
        end_offset: i64,
        max_lines: usize,
        lookback: Option<usize>,
    ) -> Result<LineWindow> {
        let lookback = lookback.unwrap_or(max_lines).min(max_lines);
        let mut cursor = LineCursor::open(path)?;

        let pos_end = if end_offset < 0 {
            cursor.seek_offset(end_offset);
            cursor.pos
        } else {
            // Past EOF there is nothing to scan; walk back from the end instead.
            let requested = end_offset as u64;
            cursor.len().map_or(requested, |len| requested.min(len))
        };

        let mut lines: Vec<FileLine> = Vec::new();
        let mut block_start = pos_end;
        let mut reached_start = false;
        while lines.len() < lookback && !reached_start {
            // Never re-read lines already captured by a later block.
            let stop = lines.first().map_or(pos_end, |line| line.offset);

            block_start = block_start.saturating_sub(self.block_size);
            cursor.seek(SeekFrom::Start(block_start));
            if block_start == 0 {
                reached_start = true;
            } else {
                // Most likely landed mid-line.
                cursor.skip_line();
            }

            let mut block = Vec::new();
            while cursor.pos < stop {
                match cursor.read_line() {
                    Some(line) => block.push(line),
                    None => break,
                }
            }
            debug!(block_start, stop, found = block.len(), "scanned block");
            block.append(&mut lines);
            lines = block;
        }

        if lines.len() > lookback {
            lines.drain(..lines.len() - lookback);
        }

        if lines.len() < max_lines {
            cursor.seek(SeekFrom::Start(pos_end));
            while lines.len() < max_lines {
                match cursor.read_line() {
                    Some(line) => lines.push(line),
                    None => break,
                }
            }
        }

        Ok(LineWindow::new(lines, pos_end))
    }
}

/// A buffered handle that tracks its own byte position. Lives for a single
/// read call.
struct LineCursor {
    reader: BufReader<File>,
    pos: u64,
    buf: Vec<u8>,
}

impl LineCursor {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            reader: BufReader::new(file),
            pos: 0,
            buf: Vec::new(),
        })
    }

    fn len(&self) -> Option<u64> {
        match self.reader.get_ref().metadata() {
            Ok(meta) => Some(meta.len()),
            Err(err) => {
                warn!(%err, "file length unavailable");
                None
            }
        }
    }

    /// Seek failures leave the position where it was.
    fn seek(&mut self, target: SeekFrom) {
        match self.reader.seek(target) {
            Ok(pos) => self.pos = pos,
            Err(err) => debug!(?target, pos = self.pos, %err, "seek failed, staying put"),
        }
    }

    fn seek_offset(&mut self, offset: i64) {
        if offset >= 0 {
            self.seek(SeekFrom::Start(offset as u64));
        } else {
            self.seek(SeekFrom::End(offset));
            if self.pos > 0 {
                self.skip_line();
            }
        }
    }

    fn read_line(&mut self) -> Option<FileLine> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(count) => {
                let line = FileLine {
                    offset: self.pos,
                    text: String::from_utf8_lossy(&self.buf).into_owned(),
                };
                self.pos += count as u64;
                Some(line)
            }
            Err(err) => {
                warn!(pos = self.pos, %err, "read failed, truncating window");
                None
            }
        }
    }

    fn skip_line(&mut self) {
        let _ = self.read_line();
    }
}
