//! Render-time consumer of decorated console logs.
//!
//! Each line is scanned for note candidates. Verified notes are removed and
//! turn the text after them (up to the end of the line) into markup;
//! candidates that fail verification stay in the output as literal text.

use crate::charset::Charset;
use crate::codec::{find_note, NoteCodec};
use crate::note::NoteKind;
use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    #[default]
    Html,
    Ansi,
    Plain,
}

impl std::str::FromStr for RenderFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(RenderFormat::Html),
            "ansi" => Ok(RenderFormat::Ansi),
            "plain" => Ok(RenderFormat::Plain),
            _ => Err(format!("invalid render format: {s}. Expected: html, ansi, plain")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub format: RenderFormat,
    pub charset: Charset,
    /// Apply section-header markup. When off, section notes are still
    /// stripped but produce neither markup nor outline entries.
    pub section_markup: bool,
    /// Put an `<a name=...>` anchor inside each section header (HTML only).
    pub outline_anchors: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: RenderFormat::Html,
            charset: Charset::Utf8,
            section_markup: true,
            outline_anchors: false,
        }
    }
}

/// One section header in the console outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineEntry {
    pub anchor: String,
    pub name: String,
    /// 1-based line number in the log.
    pub line: usize,
}

#[derive(Debug, Default)]
pub struct Rendered {
    pub body: String,
    pub outline: Vec<OutlineEntry>,
    /// Verified notes consumed.
    pub notes: usize,
    /// Candidates that failed verification and were kept as text.
    pub rejected: usize,
}

impl Rendered {
    pub fn outline_html(&self) -> String {
        let mut out = String::from("<ul id=\"console-outline\">\n");
        for entry in &self.outline {
            out.push_str(&format!(
                "<li><a href=\"#{}\">{}</a></li>\n",
                entry.anchor,
                escape_html(&entry.name)
            ));
        }
        out.push_str("</ul>\n");
        out
    }

    pub fn outline_text(&self) -> String {
        self.outline
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{:>3}. {} (line {})\n", i + 1, e.name, e.line))
            .collect()
    }
}

/// Streaming renderer; feed it one line at a time.
pub struct Renderer<'a> {
    codec: &'a NoteCodec,
    options: RenderOptions,
    out: Rendered,
    line_no: usize,
}

impl<'a> Renderer<'a> {
    pub fn new(codec: &'a NoteCodec, options: RenderOptions) -> Self {
        Self {
            codec,
            options,
            out: Rendered::default(),
            line_no: 0,
        }
    }

    /// Render one line. `raw` may include its terminator.
    pub fn push_line(&mut self, raw: &[u8]) {
        self.line_no += 1;
        let (content, terminator) = split_terminator(raw);

        // Text before the first verified note renders plain; everything after
        // it is covered by the notes.
        let mut lead = Vec::new();
        let mut tail = Vec::new();
        let mut kinds: Vec<NoteKind> = Vec::new();
        let mut rest = content;
        while let Some(range) = find_note(rest) {
            let target = if kinds.is_empty() { &mut lead } else { &mut tail };
            target.extend_from_slice(&rest[..range.start]);
            let candidate = &rest[range.clone()];
            match self.codec.decode(candidate) {
                Ok(kind) => {
                    self.out.notes += 1;
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                Err(err) => {
                    self.out.rejected += 1;
                    tracing::warn!(line = self.line_no, error = %err, "note rejected, rendering as text");
                    let target = if kinds.is_empty() { &mut lead } else { &mut tail };
                    target.extend_from_slice(candidate);
                }
            }
            rest = &rest[range.end..];
        }
        if kinds.is_empty() {
            lead.extend_from_slice(rest);
        } else {
            tail.extend_from_slice(rest);
        }

        let charset = self.options.charset;
        let mut line = self.text(&charset.decode(&lead));
        if !kinds.is_empty() {
            line.push_str(&self.annotate(&kinds, &charset.decode(&tail)));
        }
        line.push_str(&charset.decode(terminator));
        self.out.body.push_str(&line);
    }

    pub fn finish(self) -> Rendered {
        self.out
    }

    fn text(&self, s: &str) -> String {
        match self.options.format {
            RenderFormat::Html => escape_html(s),
            RenderFormat::Ansi | RenderFormat::Plain => s.to_string(),
        }
    }

    fn annotate(&mut self, kinds: &[NoteKind], text: &str) -> String {
        let mut marked = None;
        if kinds.contains(&NoteKind::SectionHeader) && self.options.section_markup {
            marked = self.section_header(text);
        }
        let mut s = marked.unwrap_or_else(|| self.text(text));
        if kinds.contains(&NoteKind::Outcome) {
            if text.contains("FAIL") {
                s = self.outcome(s, false);
            }
            if text.contains("SUCCESS") {
                s = self.outcome(s, true);
            }
        }
        s
    }

    /// Bold everything before the last `:`; the colon itself stays outside.
    fn section_header(&mut self, text: &str) -> Option<String> {
        let idx = text.rfind(':')?;
        let (name, rest) = text.split_at(idx);
        let anchor = format!("ant-target-{}", self.out.outline.len());
        let marked = match self.options.format {
            RenderFormat::Html => {
                let a = if self.options.outline_anchors {
                    format!("<a name=\"{anchor}\"></a>")
                } else {
                    String::new()
                };
                format!(
                    "<b class=ant-target>{}{a}</b>{}",
                    escape_html(name),
                    escape_html(rest)
                )
            }
            RenderFormat::Ansi => format!("\x1b[1m{name}\x1b[22m{rest}"),
            RenderFormat::Plain => text.to_string(),
        };
        self.out.outline.push(OutlineEntry {
            anchor,
            name: name.to_string(),
            line: self.line_no,
        });
        Some(marked)
    }

    fn outcome(&self, inner: String, success: bool) -> String {
        match (self.options.format, success) {
            (RenderFormat::Html, true) => format!("<span class=ant-outcome-success>{inner}</span>"),
            (RenderFormat::Html, false) => format!("<span class=ant-outcome-failure>{inner}</span>"),
            (RenderFormat::Ansi, true) => format!("\x1b[32m{inner}\x1b[39m"),
            (RenderFormat::Ansi, false) => format!("\x1b[31m{inner}\x1b[39m"),
            (RenderFormat::Plain, _) => inner,
        }
    }
}

/// Render a whole decorated log.
pub fn render_log(codec: &NoteCodec, options: RenderOptions, bytes: &[u8]) -> Rendered {
    let mut renderer = Renderer::new(codec, options);
    for line in bytes.split_inclusive(|&b| b == b'\n') {
        renderer.push_line(line);
    }
    renderer.finish()
}

/// Remove verified notes from `bytes`, leaving everything else untouched.
pub fn strip_notes(codec: &NoteCodec, bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut rest = bytes;
    while let Some(range) = find_note(rest) {
        out.extend_from_slice(&rest[..range.start]);
        let candidate = &rest[range.clone()];
        if codec.decode(candidate).is_err() {
            out.extend_from_slice(candidate);
        }
        rest = &rest[range.end..];
    }
    out.extend_from_slice(rest);
    out
}

fn split_terminator(raw: &[u8]) -> (&[u8], &[u8]) {
    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    raw.split_at(end)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
