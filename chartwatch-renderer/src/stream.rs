//! Incremental splitting of a multi-document YAML stream.
//!
//! Documents are separated by a `---` line (optionally followed by inline
//! content) and may be terminated by a `...` line. Both markers only count at
//! column zero. Only the document currently being assembled is buffered.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// The undecoded text of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Zero-based position in the stream.
    pub index: usize,
    /// One-based line where the document's content starts.
    pub line: usize,
    pub text: String,
}

impl RawDocument {
    /// True when the document holds nothing but whitespace and comments.
    pub fn is_blank(&self) -> bool {
        self.text.lines().all(|line| {
            let line = line.trim_start();
            line.is_empty() || line.starts_with('#')
        })
    }
}

enum Marker<'a> {
    Start(&'a str),
    End,
}

fn marker(line: &str) -> Option<Marker<'_>> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line == "..." {
        return Some(Marker::End);
    }
    let rest = line.strip_prefix("---")?;
    if rest.is_empty() {
        Some(Marker::Start(""))
    } else if rest.starts_with([' ', '\t']) {
        Some(Marker::Start(rest.trim_start()))
    } else {
        None
    }
}

/// Pulls [`RawDocument`]s out of a buffered reader.
pub struct DocumentStream<R> {
    reader: R,
    line_buf: String,
    pending: String,
    pending_line: usize,
    line: usize,
    index: usize,
    finished: bool,
}

impl<R: AsyncBufRead + Unpin> DocumentStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_buf: String::new(),
            pending: String::new(),
            pending_line: 1,
            line: 0,
            index: 0,
            finished: false,
        }
    }

    /// Next document, or `None` at end of stream.
    ///
    /// Empty stretches between markers are skipped; comment-only documents
    /// are returned so the caller can count them.
    pub async fn next_document(&mut self) -> io::Result<Option<RawDocument>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            self.line_buf.clear();
            if self.reader.read_line(&mut self.line_buf).await? == 0 {
                self.finished = true;
                return Ok(self.take_pending(0));
            }
            self.line += 1;

            let taken = match marker(&self.line_buf) {
                Some(Marker::Start(inline)) => {
                    let inline = (!inline.is_empty()).then(|| format!("{inline}\n"));
                    let taken = self.take_pending(self.line);
                    if let Some(inline) = inline {
                        self.pending.push_str(&inline);
                    }
                    taken
                }
                Some(Marker::End) => self.take_pending(self.line + 1),
                None => {
                    if self.pending.is_empty() {
                        self.pending_line = self.line;
                    }
                    self.pending.push_str(&self.line_buf);
                    None
                }
            };

            if taken.is_some() {
                return Ok(taken);
            }
        }
    }

    /// Emit the buffered document (if any) and start a new one at `next_line`.
    fn take_pending(&mut self, next_line: usize) -> Option<RawDocument> {
        let text = std::mem::take(&mut self.pending);
        let line = std::mem::replace(&mut self.pending_line, next_line);
        if text.is_empty() {
            return None;
        }
        let index = self.index;
        self.index += 1;
        Some(RawDocument { index, line, text })
    }
}
