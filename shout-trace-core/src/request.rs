//! Paging parameters as they arrive on a file-view URL, e.g.
//! `?pos=1024;n=40;prev=1;play=1`.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::nav::NavTarget;

const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?');

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingRequest {
    /// `pos`: byte offset; negative counts from the end of the file.
    pub offset: i64,
    /// `n`: page size. Unbounded reads and no navigation when absent.
    pub max_lines: Option<usize>,
    /// `prev`: read the page that ends at `offset`.
    pub backward: bool,
    /// `line`: 1-based line within the window to highlight.
    pub highlight_line: Option<usize>,
    /// `annotate`: link trace references inside displayed lines.
    pub annotate: bool,
    /// `play`: auto-refresh.
    pub play: bool,
    /// `msg`: free-text heading.
    pub msg: Option<String>,
    /// `abspath`: link absolute paths when annotating.
    pub absolute_path: bool,
    /// `title`: link title override when annotating.
    pub title: Option<String>,
}

impl PagingRequest {
    /// Parses `key=value` pairs separated by `;` or `&`. Unknown keys and
    /// unparsable values are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut request = Self::default();
        for pair in query.split([';', '&']).filter(|pair| !pair.is_empty()) {
            let (key, raw) = match pair.split_once('=') {
                Some((key, raw)) => (key, Some(raw)),
                None => (pair, None),
            };
            let value = raw.map(decode_value);
            let value = value.as_deref();
            match key {
                "pos" => {
                    if let Some(offset) = parse_number(value) {
                        request.offset = offset;
                    }
                }
                "n" => request.max_lines = parse_number(value).filter(|&n| n > 0),
                "line" => request.highlight_line = parse_number(value).filter(|&n| n > 0),
                "prev" => request.backward = parse_flag(value),
                "annotate" => request.annotate = parse_flag(value),
                "play" => request.play = parse_flag(value),
                "abspath" => request.absolute_path = parse_flag(value),
                "msg" => request.msg = value.map(str::to_string),
                "title" => request.title = value.map(str::to_string),
                other => debug!(key = other, "ignoring unknown paging parameter"),
            }
        }
        request
    }

    /// Serializes back into the `;`-separated form, omitting defaults.
    pub fn to_query(&self) -> String {
        let mut out = format!("pos={};", self.offset);
        if let Some(n) = self.max_lines {
            out.push_str(&format!("n={};", n));
        }
        if self.backward {
            out.push_str("prev=1;");
        }
        if let Some(line) = self.highlight_line {
            out.push_str(&format!("line={};", line));
        }
        if self.annotate {
            out.push_str("annotate=1;");
        }
        if self.play {
            out.push_str("play=1;");
        }
        if let Some(msg) = &self.msg {
            out.push_str(&format!("msg={};", utf8_percent_encode(msg, QUERY_VALUE)));
        }
        if self.absolute_path {
            out.push_str("abspath=1;");
        }
        if let Some(title) = &self.title {
            out.push_str(&format!("title={};", utf8_percent_encode(title, QUERY_VALUE)));
        }
        out
    }

    /// The request a navigation control issues: same page size and display
    /// options, new position, direction and play state.
    pub fn navigate(&self, target: &NavTarget) -> Self {
        Self {
            offset: target.offset,
            backward: target.backward,
            play: target.play,
            ..self.clone()
        }
    }
}

fn decode_value(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value?.trim().parse().ok()
}

fn parse_flag(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
    }
}
