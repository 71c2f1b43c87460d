use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::html::escape_attr;
use crate::path_codec;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3333;

/// Route prefix understood by the editor service. The trailing `-` anchors
/// the path so relative and absolute paths both survive intact.
pub const LINK_PREFIX: &str = "/shout_trace/file/-";
pub const LINK_TARGET: &str = "shout_trace_file";

/// Lines of context kept above the referenced line when the view scrolls.
const CONTEXT_LINES: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceReference {
    pub path: String,
    pub line: u64,
}

impl TraceReference {
    pub fn new(path: impl Into<String>, line: u64) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }

    /// Parses the path component of a generated link.
    pub fn from_link_path(url_path: &str) -> Option<Self> {
        unmake_link(url_path)
    }

    /// Accepts either a full `http://…` link or its bare path component.
    /// Query and fragment are ignored.
    pub fn from_url(link: &str) -> Option<Self> {
        match Url::parse(link) {
            // `Url::path` drops `.` segments; the path must stay byte for byte.
            Ok(url) if url.has_authority() => unmake_link(raw_url_path(link)),
            Ok(_) => None,
            Err(_) => unmake_link(link),
        }
    }

    /// Line the file view scrolls to so a few lines of context stay visible.
    pub fn target_line(&self) -> u64 {
        self.line.saturating_sub(CONTEXT_LINES).max(1)
    }
}

impl fmt::Display for TraceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}

/// Where generated links point. One per [`Annotator`], never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSpec {
    pub host: String,
    pub port: u16,
    pub query: Option<String>,
    pub open_in_new_target: bool,
}

impl Default for LinkSpec {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            query: None,
            open_in_new_target: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotateOptions {
    /// Escape surrounding text for markup.
    pub html: bool,
    /// Resolve paths against the current directory before linking.
    pub absolute_path: bool,
    /// Replaces the generated `Go to <file>:<line>` title.
    pub title: Option<String>,
}

impl AnnotateOptions {
    pub fn html() -> Self {
        Self {
            html: true,
            ..Self::default()
        }
    }
}

/// Rewrites trace references into links for one [`LinkSpec`].
#[derive(Debug, Clone, Default)]
pub struct Annotator {
    spec: LinkSpec,
}

impl Annotator {
    pub fn new(spec: LinkSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &LinkSpec {
        &self.spec
    }

    pub fn link_url(&self, reference: &TraceReference, options: &AnnotateOptions) -> String {
        let path = normalize_path(&reference.path, options.absolute_path);
        self.url_for(&path, reference)
    }

    /// Anchor markup for `reference`. `display_text` is inserted as given;
    /// escaping it is up to the caller.
    pub fn make_link(
        &self,
        reference: &TraceReference,
        display_text: &str,
        options: &AnnotateOptions,
    ) -> String {
        let path = normalize_path(&reference.path, options.absolute_path);
        let title = match &options.title {
            Some(title) => title.clone(),
            None => format!("Go to {}:{}", basename(&path), reference.line),
        };
        let target = if self.spec.open_in_new_target {
            format!(" target=\"{}\"", LINK_TARGET)
        } else {
            String::new()
        };
        format!(
            "<a href=\"{}\" title=\"ShoutTrace: {}\"{}>{}</a>",
            self.url_for(&path, reference),
            escape_attr(&title),
            target,
            display_text
        )
    }

    pub fn unmake_link(url_path: &str) -> Option<TraceReference> {
        unmake_link(url_path)
    }

    fn url_for(&self, normalized_path: &str, reference: &TraceReference) -> String {
        let query = match &self.spec.query {
            Some(query) => format!("?{}", query),
            None => String::new(),
        };
        format!(
            "http://{}:{}{}{}/{}{}#{}",
            self.spec.host,
            self.spec.port,
            LINK_PREFIX,
            path_codec::encode(normalized_path),
            reference.line,
            query,
            reference.target_line()
        )
    }
}

/// Inverse of the link path built by [`Annotator::make_link`]. Input without a
/// trailing `/<digits>` yields `None`.
pub fn unmake_link(url_path: &str) -> Option<TraceReference> {
    let rest = url_path.strip_prefix(LINK_PREFIX).unwrap_or(url_path);
    let (encoded, digits) = rest.rsplit_once('/')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let line: u64 = digits.parse().ok()?;
    if line == 0 {
        return None;
    }
    Some(TraceReference {
        path: path_codec::decode(encoded),
        line,
    })
}

/// Path component of an absolute URL exactly as written.
fn raw_url_path(link: &str) -> &str {
    let link = link.trim();
    let authority = link.find("://").map_or(link, |idx| &link[idx + 3..]);
    let path = authority.find('/').map_or("", |idx| &authority[idx..]);
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

fn normalize_path(path: &str, absolute: bool) -> String {
    let mut collapsed = path.to_string();
    while collapsed.contains("//") {
        collapsed = collapsed.replace("//", "/");
    }
    if !absolute {
        return collapsed;
    }
    absolutize(Path::new(&collapsed))
        .to_string_lossy()
        .into_owned()
}

fn absolutize(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| {
            if path.is_absolute() {
                Ok(path.to_path_buf())
            } else {
                std::env::current_dir().map(|cwd| cwd.join(path))
            }
        })
        .unwrap_or_else(|_| path.to_path_buf())
}

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
