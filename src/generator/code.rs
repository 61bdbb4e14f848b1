//! Indentation-aware line writer used to pre-render code bodies for the templates.

const INDENT: &str = "    ";

/// Accumulates lines at a current nesting depth.
#[derive(Debug, Default)]
pub struct CodeWriter {
    buf: String,
    depth: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts at `depth` levels of indentation.
    pub fn at_depth(depth: usize) -> Self {
        Self {
            buf: String::new(),
            depth,
        }
    }

    /// Writes one line at the current depth; an empty line carries no indentation.
    pub fn line(&mut self, s: impl AsRef<str>) -> &mut Self {
        let s = s.as_ref();
        if !s.is_empty() {
            for _ in 0..self.depth {
                self.buf.push_str(INDENT);
            }
            self.buf.push_str(s);
        }
        self.buf.push('\n');
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        if !self.buf.is_empty() && !self.buf.ends_with("\n\n") {
            self.buf.push('\n');
        }
        self
    }

    /// Writes `/// text` lines; nothing for empty text.
    pub fn doc(&mut self, text: &str) -> &mut Self {
        for l in text.lines() {
            if l.trim().is_empty() {
                self.line("///");
            } else {
                self.line(format!("/// {}", l.trim_end()));
            }
        }
        self
    }

    /// Writes `head` and indents what follows.
    pub fn open(&mut self, head: impl AsRef<str>) -> &mut Self {
        self.line(head);
        self.depth += 1;
        self
    }

    /// Dedents and writes `tail` (`}`, `})`, `};`, ...).
    pub fn close(&mut self, tail: impl AsRef<str>) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.line(tail)
    }

    /// Closes the open block and starts its continuation (`} else {`).
    pub fn reopen(&mut self, s: impl AsRef<str>) -> &mut Self {
        self.close(s);
        self.depth += 1;
        self
    }

    /// `head {` ... `}` around whatever `body` writes.
    pub fn block(&mut self, head: impl AsRef<str>, body: impl FnOnce(&mut Self)) -> &mut Self {
        self.open(format!("{} {{", head.as_ref()));
        body(self);
        self.close("}")
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> String {
        self.buf
    }
}
