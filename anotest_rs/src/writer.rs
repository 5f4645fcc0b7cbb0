//! Markdown fragments appended to the report in call order.

use std::io::{self, Write};

/// Inline link to an anchor in the same report.
pub fn make_link(title: &str, anchor: &str) -> String {
    format!(" [{}](#{}) ", title, anchor)
}

/// Turn a displayed chapter path (`a > b`) into its anchor form (`ab`).
pub fn make_str_path(path: &str) -> String {
    path.replace(" > ", "")
}

/// Appends Markdown to any writer. Nothing is buffered beyond the writer itself.
#[derive(Debug)]
pub struct MarkdownWriter<W: Write> {
    out: W,
}

impl<W: Write> MarkdownWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn story_heading(&mut self, title: &str) -> io::Result<()> {
        write!(self.out, "# {}\n\n\n", title)
    }

    /// Chapter heading; `level` is the chapter depth (top-level chapters are 1).
    pub fn chapter_heading(&mut self, level: usize, name: &str, title: &str) -> io::Result<()> {
        write!(self.out, "{} {}\n{}\n\n", "#".repeat(level + 1), name, title)
    }

    pub fn heading(&mut self, level: usize, text: &str) -> io::Result<()> {
        write!(self.out, "{} {}\n\n", "#".repeat(level.max(1)), text)
    }

    pub fn comment(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{}\n\n", text)
    }

    pub fn br(&mut self) -> io::Result<()> {
        write!(self.out, "\n<br/>\n")
    }

    pub fn image(&mut self, alt: &str, url: &str) -> io::Result<()> {
        write!(self.out, "\n\n![{}]({})\n\n", alt, url)
    }

    /// Header line of a quoted code sample.
    pub fn code_header(&mut self, name: &str, link: Option<&str>, comment: &str) -> io::Result<()> {
        match link {
            Some(link) => write!(self.out, "### {}\n({}) {}\n\n", name, link, comment),
            None => write!(self.out, "### {}\n{}\n\n", name, comment),
        }
    }

    pub fn code_block(&mut self, language: &str, body: &str) -> io::Result<()> {
        write!(self.out, "```{}\n{}\n```\n\n", language, body)
    }

    /// Output block; only the final newline before the fence is folded.
    pub fn captured_output(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "stdout:\n\n")?;
        self.code_block("text", text.strip_suffix('\n').unwrap_or(text))
    }

    pub fn raw(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
