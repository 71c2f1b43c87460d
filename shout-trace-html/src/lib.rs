use std::io::Write;

use anyhow::Result;
use shout_trace_core::{
    escape_attr, escape_str, AnnotateOptions, Annotator, FileLine, NavTarget, Navigation, Page,
    PagingRequest,
};
use tracing::trace;

const HIGHLIGHT_STYLE: &str = "color: orange;";

/// Writes file-view fragments (navigation bar, numbered lines) for a page.
/// Document assembly is left to the caller.
pub struct FragmentRenderer<W: Write> {
    writer: W,
    annotator: Annotator,
    base_path: String,
}

impl<W: Write> FragmentRenderer<W> {
    /// `base_path` is the path navigation links point back to, typically the
    /// file-view route the page was served from.
    pub fn new(writer: W, annotator: Annotator, base_path: impl Into<String>) -> Self {
        Self {
            writer,
            annotator,
            base_path: base_path.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn draw_page(&mut self, page: &Page, request: &PagingRequest) -> Result<()> {
        if let Some(heading) = render_heading(request) {
            writeln!(self.writer, "{}", heading)?;
        }
        if let Some(nav) = &page.navigation {
            writeln!(self.writer, "{}", render_nav(nav, request, &self.base_path))?;
        }
        self.draw_lines(page, request)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn draw_lines(&mut self, page: &Page, request: &PagingRequest) -> Result<()> {
        writeln!(self.writer, "{}", render_lines(page, request, &self.annotator))?;
        Ok(())
    }
}

pub fn render_heading(request: &PagingRequest) -> Option<String> {
    request
        .msg
        .as_deref()
        .map(|msg| format!("<h1>{}</h1>", escape_str(msg)))
}

/// One line of the file view. Lines are numbered from 1 within the window;
/// the anchor shows that number when a line is highlighted, otherwise the
/// line's byte offset.
pub fn render_line(
    line: &FileLine,
    lineno: usize,
    request: &PagingRequest,
    annotator: &Annotator,
) -> String {
    let body = if request.annotate {
        let options = AnnotateOptions {
            html: true,
            absolute_path: request.absolute_path,
            title: request.title.clone(),
        };
        annotator.annotate(&line.text, &options)
    } else {
        escape_str(&line.text).into_owned()
    };

    let highlighted = request.highlight_line == Some(lineno);
    let (marker, number) = match request.highlight_line {
        Some(_) => (
            escape_str(if highlighted { "=> " } else { "   " }).into_owned(),
            format!("{:6} ", lineno),
        ),
        None => (String::new(), format!("{:8} ", line.offset)),
    };

    let rendered = format!(
        "{}<a name=\"{}\">{}</a>{}",
        marker,
        lineno,
        escape_str(&number),
        body
    );
    if highlighted {
        format!("<span style=\"{}\">{}</span>", HIGHLIGHT_STYLE, rendered)
    } else {
        rendered
    }
}

pub fn render_lines(page: &Page, request: &PagingRequest, annotator: &Annotator) -> String {
    trace!(lines = page.window.len(), "rendering lines");
    page.window
        .iter()
        .enumerate()
        .map(|(index, line)| render_line(line, index + 1, request, annotator))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_nav(nav: &Navigation, request: &PagingRequest, base_path: &str) -> String {
    let cells: String = nav
        .targets()
        .iter()
        .map(|target| format!("<td>{}</td>", render_nav_link(target, request, base_path)))
        .collect();
    format!("<table><tr>{}</tr></table><br />", cells)
}

pub fn render_nav_link(target: &NavTarget, request: &PagingRequest, base_path: &str) -> String {
    let href = format!("{}?{}", base_path, request.navigate(target).to_query());
    format!(
        "<a href=\"{}\" title=\"{}\">{}</a>",
        escape_attr(&href),
        target.action.title(),
        escape_str(target.action.label())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use shout_trace_core::{LineWindow, NavAction, Pager};
    use tempfile::NamedTempFile;

    fn line(offset: u64, text: &str) -> FileLine {
        FileLine {
            offset,
            text: text.to_string(),
        }
    }

    #[test]
    fn plain_line_shows_byte_offset() {
        let rendered = render_line(
            &line(1024, "a < b\n"),
            3,
            &PagingRequest::default(),
            &Annotator::default(),
        );
        assert_eq!(
            rendered,
            "<a name=\"3\">&nbsp;&nbsp;&nbsp;&nbsp;1024&nbsp;</a>a&nbsp;&lt;&nbsp;b<br />\n"
        );
    }

    #[test]
    fn highlighted_line_is_marked_and_numbered() {
        let request = PagingRequest {
            highlight_line: Some(2),
            ..PagingRequest::default()
        };
        let annotator = Annotator::default();

        let other = render_line(&line(0, "x"), 1, &request, &annotator);
        assert!(other.starts_with("&nbsp;&nbsp;&nbsp;<a name=\"1\">"));
        assert!(!other.contains("<span"));

        let hit = render_line(&line(2, "y"), 2, &request, &annotator);
        assert_eq!(
            hit,
            "<span style=\"color: orange;\">=&gt;&nbsp;<a name=\"2\">\
             &nbsp;&nbsp;&nbsp;&nbsp;&nbsp;2&nbsp;</a>y</span>"
        );
    }

    #[test]
    fn annotate_links_references_inside_lines() {
        let request = PagingRequest {
            annotate: true,
            ..PagingRequest::default()
        };
        let rendered = render_line(
            &line(0, "  lib/a.rb:12:in `go'\n"),
            1,
            &request,
            &Annotator::default(),
        );
        assert!(rendered.contains("href=\"http://localhost:3333/shout_trace/file/-lib/a.rb/12#7\""));
        assert!(rendered.ends_with(">lib/a.rb:12</a>:in&nbsp;`go'<br />\n"));
    }

    #[test]
    fn nav_links_carry_follow_up_requests() {
        let window = LineWindow::new(vec![line(10, "a\n"), line(12, "b\n")], 0);
        let request = PagingRequest::from_query("pos=10;n=2");
        let nav = Navigation::for_window(&window, false);

        let html = render_nav(&nav, &request, "/shout_trace/file/-log.txt/1");
        assert!(html.starts_with("<table><tr><td>"));
        assert!(html.ends_with("</tr></table><br />"));
        assert!(html.contains(
            "<a href=\"/shout_trace/file/-log.txt/1?pos=0;n=2;\" title=\"First\">|&lt;</a>"
        ));
        assert!(html.contains("?pos=10;n=2;prev=1;\" title=\"Prev\">&lt;&lt;</a>"));
        assert!(html.contains("?pos=12;n=2;\" title=\"Next\">&gt;&gt;</a>"));
        assert!(html.contains("?pos=-1;n=2;prev=1;\" title=\"Last\">&gt;|</a>"));
        assert!(html.contains("?pos=10;n=2;play=1;\" title=\"Play\">=&gt;</a>"));
        assert_eq!(nav.toggle.action, NavAction::Play);
    }

    #[test]
    fn draw_page_writes_heading_nav_and_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "first").unwrap();
        writeln!(file, "second").unwrap();
        file.flush().unwrap();

        let request = PagingRequest::from_query("n=5;msg=Build+log");
        let page = Pager::default().page(file.path(), &request).unwrap();
        let mut renderer =
            FragmentRenderer::new(Vec::new(), Annotator::default(), "/view");
        renderer.draw_page(&page, &request).unwrap();
        let output = String::from_utf8(renderer.into_inner()).unwrap();

        assert!(output.starts_with("<h1>Build&nbsp;log</h1>\n<table>"));
        assert!(output.contains("first<br />\n\n<a name=\"2\">"));
        assert!(output.contains("second"));
    }

    #[test]
    fn unpaged_page_has_no_nav() {
        let page = Page {
            path: PathBuf::from("x"),
            window: LineWindow::new(vec![line(0, "only\n")], 0),
            navigation: None,
        };
        let mut renderer = FragmentRenderer::new(Vec::new(), Annotator::default(), "/view");
        renderer.draw_page(&page, &PagingRequest::default()).unwrap();
        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(!output.contains("<table>"));
        assert!(output.starts_with("<a name=\"1\">"));
    }
}
