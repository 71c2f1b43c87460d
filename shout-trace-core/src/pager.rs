use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::nav::Navigation;
use crate::reader::{LineWindow, WindowedFileReader, DEFAULT_BLOCK_SIZE};
use crate::request::PagingRequest;

pub const DEFAULT_PAGE_LINES: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerConfig {
    /// Page size for backward reads that arrive without `n`.
    pub page_lines: usize,
    pub block_size: u64,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_lines: DEFAULT_PAGE_LINES,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub path: PathBuf,
    pub window: LineWindow,
    /// Present only for paged requests (`n` given).
    pub navigation: Option<Navigation>,
}

/// Turns a [`PagingRequest`] into a [`Page`] of a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pager {
    reader: WindowedFileReader,
    config: PagerConfig,
}

impl Pager {
    pub fn new(config: PagerConfig) -> Self {
        Self {
            reader: WindowedFileReader::with_block_size(config.block_size),
            config,
        }
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    #[instrument(skip(self, path, request), fields(path = %path.display(), offset = request.offset, backward = request.backward))]
    pub fn page(&self, path: &Path, request: &PagingRequest) -> Result<Page> {
        let window = if request.backward {
            let max_lines = request.max_lines.unwrap_or(self.config.page_lines);
            self.reader
                .read_backward(path, request.offset, max_lines, Some(lookback(request, max_lines)))?
        } else {
            self.reader
                .read_forward(path, request.offset, request.max_lines)?
        };
        debug!(
            lines = window.len(),
            start = window.start_offset,
            next = window.next_offset,
            "paged"
        );

        let navigation = request
            .max_lines
            .map(|_| Navigation::for_window(&window, request.play));
        Ok(Page {
            path: path.to_path_buf(),
            window,
            navigation,
        })
    }
}

/// Stepping back moves three quarters of a page. Reads anchored at the end of
/// the file need a full page of history since nothing follows.
fn lookback(request: &PagingRequest, max_lines: usize) -> usize {
    if request.offset < 0 {
        max_lines
    } else {
        three_quarters(max_lines).max(1)
    }
}

/// `n * 3 / 4` without overflowing for page sizes near `usize::MAX`.
fn three_quarters(n: usize) -> usize {
    n / 4 * 3 + n % 4 * 3 / 4
}
