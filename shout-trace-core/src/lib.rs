//! Trace-link codec and windowed file paging for the ShoutTrace editor
//! service.
//!
//! [`Annotator`] turns `path:line` references in logs and backtraces into
//! links to the local "open in editor" service and decodes such links back
//! into [`TraceReference`]s. [`WindowedFileReader`] and [`Pager`] serve the
//! file view those links lead to, paging by byte offset in either direction.

pub mod config;
pub mod error;
pub mod html;
pub mod link;
pub mod nav;
pub mod pager;
pub mod path_codec;
pub mod reader;
pub mod request;
pub mod scanner;

pub use config::{Config, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use html::{escape_attr, escape_if, escape_str, html_escape};
pub use link::{
    unmake_link, AnnotateOptions, Annotator, LinkSpec, TraceReference, DEFAULT_HOST,
    DEFAULT_PORT, LINK_PREFIX, LINK_TARGET,
};
pub use nav::{NavAction, NavTarget, Navigation, END_OF_FILE};
pub use pager::{Page, Pager, PagerConfig, DEFAULT_PAGE_LINES};
pub use reader::{FileLine, LineWindow, WindowedFileReader, DEFAULT_BLOCK_SIZE};
pub use request::PagingRequest;
pub use scanner::{find_references, Terminator, TraceMatch, TraceReferences};
