//! Output framing for render cycles.
//!
//! Each matched document is written as YAML followed by a blank line. A
//! [`CYCLE_DELIMITER`] line separates successive cycles (never documents of
//! the same cycle), so a cycle holding several documents is meant to be read
//! by a person, not fed back into a YAML parser as-is. Errors are written as
//! `#` comment lines and never interleave with document text.

use std::fmt::Display;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use chartwatch_core::Document;

use crate::error::WatcherError;

pub const CYCLE_DELIMITER: &str = "---";

/// A document selected by one filter entry.
#[derive(Debug, Clone)]
pub struct MatchedDocument {
    /// Index of the selecting entry in the filter spec.
    pub entry: usize,
    pub document: Arc<Document>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub written: usize,
    pub failed: usize,
}

pub struct Emitter<W> {
    out: W,
    cycles: usize,
}

impl<W: AsyncWrite + Unpin> Emitter<W> {
    pub fn new(out: W) -> Self {
        Self { out, cycles: 0 }
    }

    /// Number of cycles written so far, failed ones included.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write one successful cycle.
    ///
    /// A document that cannot be re-encoded is replaced by a comment line;
    /// the rest of the cycle is still written.
    pub async fn emit(&mut self, matched: &[MatchedDocument]) -> Result<EmitSummary, WatcherError> {
        self.begin_cycle().await?;
        let mut summary = EmitSummary::default();
        for item in matched {
            if self.write_document(&item.document, item.document.to_yaml()).await? {
                summary.written += 1;
            } else {
                summary.failed += 1;
            }
        }
        self.flush().await?;
        Ok(summary)
    }

    /// Write one encoded document, or a comment when encoding failed.
    /// Returns whether the document itself was written.
    async fn write_document(
        &mut self,
        document: &Document,
        encoded: Result<String, serde_yaml::Error>,
    ) -> Result<bool, WatcherError> {
        match encoded {
            Ok(text) => {
                self.write(&text).await?;
                if !text.ends_with('\n') {
                    self.write("\n").await?;
                }
                self.write("\n").await?;
                Ok(true)
            }
            Err(err) => {
                tracing::error!(document = %document, error = %err, "cannot encode document");
                self.write_comment(&format!("invalid YAML for {document}: {err}"))
                    .await?;
                Ok(false)
            }
        }
    }

    /// Write a failed cycle as an error comment.
    pub async fn report_error<E>(&mut self, err: &E) -> Result<(), WatcherError>
    where
        E: Display + ?Sized,
    {
        let message = format!("error generating manifests: {err}");
        self.begin_cycle().await?;
        self.write_comment(&message).await?;
        self.flush().await
    }

    async fn begin_cycle(&mut self) -> Result<(), WatcherError> {
        if self.cycles > 0 {
            self.write(CYCLE_DELIMITER).await?;
            self.write("\n").await?;
        }
        self.cycles += 1;
        Ok(())
    }

    async fn write_comment(&mut self, text: &str) -> Result<(), WatcherError> {
        for line in text.lines() {
            self.write("# ").await?;
            self.write(line).await?;
            self.write("\n").await?;
        }
        Ok(())
    }

    async fn write(&mut self, text: &str) -> Result<(), WatcherError> {
        self.out
            .write_all(text.as_bytes())
            .await
            .map_err(WatcherError::Output)
    }

    async fn flush(&mut self) -> Result<(), WatcherError> {
        self.out.flush().await.map_err(WatcherError::Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(entry: usize, yaml: &str) -> MatchedDocument {
        let value = serde_yaml::from_str(yaml).expect("yaml");
        MatchedDocument {
            entry,
            document: Arc::new(Document::from_value(value).expect("document")),
        }
    }

    fn output(emitter: Emitter<Vec<u8>>) -> String {
        String::from_utf8(emitter.into_inner()).expect("utf8")
    }

    #[tokio::test]
    async fn delimiter_goes_between_cycles_not_documents() {
        let mut emitter = Emitter::new(Vec::new());
        let docs = vec![
            matched(0, "kind: Deployment\napiVersion: apps/v1\nmetadata:\n  name: web\n"),
            matched(1, "kind: Service\napiVersion: v1\nmetadata:\n  name: web-svc\n"),
        ];
        let summary = emitter.emit(&docs).await.expect("emit");
        assert_eq!(summary, EmitSummary { written: 2, failed: 0 });
        emitter.emit(&docs[..1]).await.expect("emit");

        assert_eq!(emitter.cycles(), 2);
        let text = output(emitter);
        assert_eq!(
            text,
            "kind: Deployment\napiVersion: apps/v1\nmetadata:\n  name: web\n\n\
             kind: Service\napiVersion: v1\nmetadata:\n  name: web-svc\n\n\
             ---\n\
             kind: Deployment\napiVersion: apps/v1\nmetadata:\n  name: web\n\n"
        );
    }

    #[tokio::test]
    async fn empty_cycle_still_advances_the_delimiter() {
        let mut emitter = Emitter::new(Vec::new());
        emitter.emit(&[]).await.expect("emit");
        emitter.emit(&[]).await.expect("emit");
        assert_eq!(output(emitter), "---\n");
    }

    #[tokio::test]
    async fn encode_failure_skips_only_that_document() {
        let mut emitter = Emitter::new(Vec::new());
        let broken = matched(0, "kind: Secret\napiVersion: v1\nmetadata:\n  name: creds\n");
        let good = matched(1, "kind: Service\napiVersion: v1\nmetadata:\n  name: web-svc\n");
        let encode_err = serde_yaml::from_str::<serde_yaml::Value>("[unclosed").unwrap_err();

        emitter.begin_cycle().await.expect("cycle");
        let written = emitter
            .write_document(&broken.document, Err(encode_err))
            .await
            .expect("write");
        assert!(!written);
        let written = emitter
            .write_document(&good.document, good.document.to_yaml())
            .await
            .expect("write");
        assert!(written);

        let text = output(emitter);
        let mut lines = text.lines();
        let comment = lines.next().expect("comment line");
        assert!(
            comment.starts_with("# invalid YAML for Secret/creds: "),
            "got: {comment}"
        );
        assert!(text.ends_with("kind: Service\napiVersion: v1\nmetadata:\n  name: web-svc\n\n"));
        assert!(!text.contains("name: creds"));
    }

    #[tokio::test]
    async fn errors_are_written_as_comment_lines() {
        let mut emitter = Emitter::new(Vec::new());
        emitter
            .report_error(&"helm exited with status 1: line one\nline two")
            .await
            .expect("report");
        assert_eq!(
            output(emitter),
            "# error generating manifests: helm exited with status 1: line one\n# line two\n"
        );
    }
}
