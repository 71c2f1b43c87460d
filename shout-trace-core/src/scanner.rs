//! Line-oriented lexer for `path:line` references in free text.
//!
//! A reference starts a line, or directly follows the previous reference's
//! terminator, after optional horizontal whitespace. It runs up to the first
//! `:`, carries a decimal line number and ends in one of the [`Terminator`]
//! cases. Anything else is left untouched.

use crate::html::escape_if;
use crate::link::{AnnotateOptions, Annotator, TraceReference};

const RUBY_FRAME: &str = ":in `";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// `app.rb:12:in `method'`
    RubyFrame,
    /// Trailing horizontal whitespace, then a newline or the end of input.
    LineEnd,
    /// `app.rb:12: message`. Only the colon belongs to the terminator.
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceMatch<'a> {
    pub reference: TraceReference,
    /// Byte range of the literal `path:line` text.
    pub start: usize,
    pub reference_end: usize,
    /// Byte offset just past the terminator.
    pub end: usize,
    pub terminator: Terminator,
    pub terminator_text: &'a str,
}

impl<'a> TraceMatch<'a> {
    pub fn display_text(&self, text: &'a str) -> &'a str {
        &text[self.start..self.reference_end]
    }
}

/// Iterator over non-overlapping references, left to right.
pub struct TraceReferences<'a> {
    text: &'a str,
    next_start: Option<usize>,
}

pub fn find_references(text: &str) -> TraceReferences<'_> {
    TraceReferences {
        text,
        next_start: Some(0),
    }
}

impl<'a> Iterator for TraceReferences<'a> {
    type Item = TraceMatch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(start) = self.next_start {
            match match_at(self.text, start) {
                Some(found) => {
                    self.next_start = Some(found.end).filter(|&end| end < self.text.len());
                    return Some(found);
                }
                None => self.next_start = next_line_start(self.text, start),
            }
        }
        None
    }
}

impl Annotator {
    /// Replaces every trace reference in `text` with a link. Text between
    /// references is copied through, escaped when `options.html` is set.
    pub fn annotate(&self, text: &str, options: &AnnotateOptions) -> String {
        let mut out = String::with_capacity(text.len() + text.len() / 2);
        let mut emitted = 0;
        for found in find_references(text) {
            out.push_str(&escape_if(&text[emitted..found.start], options.html));
            let display = escape_if(found.display_text(text), options.html);
            out.push_str(&self.make_link(&found.reference, &display, options));
            out.push_str(&escape_if(found.terminator_text, options.html));
            emitted = found.end;
        }
        out.push_str(&escape_if(&text[emitted..], options.html));
        out
    }
}

fn is_horizontal_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | 0x0b | 0x0c)
}

fn match_at(text: &str, from: usize) -> Option<TraceMatch<'_>> {
    let bytes = text.as_bytes();
    let len = bytes.len();

    let mut i = from;
    while i < len && is_horizontal_space(bytes[i]) {
        i += 1;
    }
    let start = i;
    while i < len && bytes[i] != b':' && bytes[i] != b'\n' {
        i += 1;
    }
    if i == start || i >= len || bytes[i] != b':' {
        return None;
    }
    let path_end = i;

    i += 1;
    let digits_start = i;
    while i < len && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return None;
    }
    let reference_end = i;
    let line: u64 = text[digits_start..reference_end].parse().ok()?;
    if line == 0 {
        return None;
    }

    let (terminator, end) = terminator_at(bytes, reference_end)?;
    Some(TraceMatch {
        reference: TraceReference::new(&text[start..path_end], line),
        start,
        reference_end,
        end,
        terminator,
        terminator_text: &text[reference_end..end],
    })
}

fn terminator_at(bytes: &[u8], at: usize) -> Option<(Terminator, usize)> {
    if bytes[at..].starts_with(RUBY_FRAME.as_bytes()) {
        return Some((Terminator::RubyFrame, at + RUBY_FRAME.len()));
    }

    let mut j = at;
    while j < bytes.len() && is_horizontal_space(bytes[j]) {
        j += 1;
    }
    if j == bytes.len() {
        return Some((Terminator::LineEnd, j));
    }
    if bytes[j] == b'\n' {
        return Some((Terminator::LineEnd, j + 1));
    }

    if bytes[at] == b':' && bytes.get(at + 1).copied().is_some_and(is_horizontal_space) {
        return Some((Terminator::Message, at + 1));
    }
    None
}

fn next_line_start(text: &str, from: usize) -> Option<usize> {
    text[from..]
        .find('\n')
        .map(|idx| from + idx + 1)
        .filter(|&start| start < text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> AnnotateOptions {
        AnnotateOptions::default()
    }

    #[test]
    fn message_form_links_reference() {
        let text = "Traceback:\n  app.rb:42: foo\n";
        let out = Annotator::default().annotate(text, &plain());
        assert!(out.starts_with("Traceback:\n  <a href="));
        assert!(out.contains("/shout_trace/file/-app.rb/42#37\""));
        assert!(out.ends_with(">app.rb:42</a>: foo\n"));

        let found: Vec<_> = find_references(text).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].terminator, Terminator::Message);
        assert_eq!(found[0].reference, TraceReference::new("app.rb", 42));
    }

    #[test]
    fn ruby_frames_are_linked() {
        let text = "/app/models/user.rb:17:in `save'\n/app/lib/x.rb:3:in `call'\n";
        let found: Vec<_> = find_references(text).collect();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|m| m.terminator == Terminator::RubyFrame));
        assert_eq!(found[0].reference, TraceReference::new("/app/models/user.rb", 17));
        assert_eq!(found[1].reference, TraceReference::new("/app/lib/x.rb", 3));
        assert_eq!(found[0].terminator_text, ":in `");
    }

    #[test]
    fn line_end_terminator_consumes_trailing_space_and_newline() {
        let text = "\tsrc/main.rs:7  \r\nnext";
        let found: Vec<_> = find_references(text).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].terminator, Terminator::LineEnd);
        assert_eq!(found[0].terminator_text, "  \r\n");
        assert_eq!(found[0].start, 1);
    }

    #[test]
    fn reference_at_end_of_input() {
        let found: Vec<_> = find_references("lib/a.rb:99").collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].terminator, Terminator::LineEnd);
        assert_eq!(found[0].terminator_text, "");
    }

    #[test]
    fn mid_line_references_are_ignored() {
        let text = "error at app.rb:42 in handler\nsee x.rb:1:2 and y.rb:3\n";
        assert_eq!(find_references(text).count(), 0);
        assert_eq!(Annotator::default().annotate(text, &plain()), text);
    }

    #[test]
    fn non_matching_text_is_only_sanitized() {
        let text = "a <b> & c\nno refs: here\n";
        assert_eq!(Annotator::default().annotate(text, &plain()), text);
        assert_eq!(
            Annotator::default().annotate(text, &AnnotateOptions::html()),
            crate::html::escape_str(text)
        );
    }

    #[test]
    fn html_mode_escapes_around_links() {
        let text = "<err>\n  a b.rb:5\n";
        let out = Annotator::default().annotate(text, &AnnotateOptions::html());
        assert!(out.starts_with("&lt;err&gt;<br />\n&nbsp;&nbsp;<a href="));
        assert!(out.contains("-a%20b.rb/5#1\""));
        assert!(out.ends_with(">a&nbsp;b.rb:5</a><br />\n"));
    }

    #[test]
    fn text_outside_links_is_preserved() {
        let text = "boom\n  a.rb:1:in `x'\n\n    b.rb:22\nc.rb:3: msg\ntrailing";
        let out = Annotator::default().annotate(text, &plain());

        let mut stripped = String::new();
        let mut rest = out.as_str();
        while let Some(open) = rest.find("<a ") {
            stripped.push_str(&rest[..open]);
            let body = &rest[open..];
            let text_start = body.find('>').unwrap() + 1;
            let close = body.find("</a>").unwrap();
            stripped.push_str(&body[text_start..close]);
            rest = &body[close + "</a>".len()..];
        }
        stripped.push_str(rest);

        assert_eq!(stripped, text);
        assert_eq!(out.matches("<a ").count(), 3);
    }

    #[test]
    fn scanning_resumes_right_after_a_terminator() {
        let text = "a.rb:1:in `b.rb:2:in `c'\n";
        let found: Vec<_> = find_references(text).collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].reference, TraceReference::new("a.rb", 1));
        assert_eq!(found[1].reference, TraceReference::new("b.rb", 2));
        assert_eq!(found[1].start, found[0].end);

        let out = Annotator::default().annotate(text, &plain());
        assert_eq!(out.matches("<a ").count(), 2);
        assert!(out.ends_with(">b.rb:2</a>:in `c'\n"));
    }

    #[test]
    fn message_terminator_resumes_mid_line() {
        let found: Vec<_> = find_references("a.rb:1: b.rb:2\n").collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].terminator, Terminator::Message);
        assert_eq!(found[1].reference, TraceReference::new("b.rb", 2));
        assert_eq!(found[1].start, 8);
    }

    #[test]
    fn ruby_frame_with_method_name_links_once() {
        let text = "a.rb:1:in `b.rb:2'\n";
        let found: Vec<_> = find_references(text).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reference.path, "a.rb");
    }

    #[test]
    fn huge_line_numbers_are_linked() {
        let found: Vec<_> = find_references("big.log:5000000000\n").collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reference.line, 5_000_000_000);
    }

    #[test]
    fn colon_without_digits_or_empty_path_is_not_a_reference() {
        for text in ["Traceback:\n", ":12\n", "   :12\n", "file.rb:\n", "file.rb:0\n"] {
            assert_eq!(find_references(text).count(), 0, "text {text:?}");
        }
    }
}
