//! Engine invocation: the [`ManifestSource`] seam and the [`HelmEngine`] driver.
//!
//! # Invocation
//!
//! ```text
//! <program> template [release] <chart> [-f <values>]... [extra args]...
//! ```
//!
//! Standard output is decoded while the engine is still running. Standard
//! error is collected on a separate task so neither pipe can fill up and
//! stall the engine. The exit status is awaited only after stdout reaches
//! end of stream.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde_yaml::Value;
use tokio::io::{AsyncBufRead, AsyncReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio_util::sync::CancellationToken;

use chartwatch_core::{Document, RenderRequest, DEFAULT_ENGINE};

use crate::error::RenderError;
use crate::stream::{DocumentStream, RawDocument};

/// Per-render document counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Documents found in the stream, blank ones included.
    pub seen: usize,
    /// Documents passed to the sink.
    pub kept: usize,
    /// Blank documents and documents without `kind`/`apiVersion`.
    pub dropped: usize,
}

/// Something that can produce one render cycle of documents.
pub trait ManifestSource {
    /// Render once, handing each valid document to `sink` in stream order.
    ///
    /// Documents already passed to `sink` are not retracted when the
    /// render later fails; callers buffer until `Ok` is returned.
    fn render_each(
        &self,
        sink: &mut (dyn FnMut(Document) + Send),
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<RenderStats, RenderError>> + Send;
}

/// Drives a helm-compatible `template` subcommand.
#[derive(Debug, Clone)]
pub struct HelmEngine {
    program: PathBuf,
    request: RenderRequest,
}

impl HelmEngine {
    pub fn new(request: RenderRequest) -> Self {
        Self {
            program: PathBuf::from(DEFAULT_ENGINE),
            request,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn request(&self) -> &RenderRequest {
        &self.request
    }

    /// The command for one invocation; the child is killed if dropped.
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(self.request.template_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Render once and collect the whole cycle.
    pub async fn render(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(Vec<Document>, RenderStats), RenderError> {
        let mut documents = Vec::new();
        let stats = self
            .render_each(&mut |doc| documents.push(doc), cancel)
            .await?;
        Ok((documents, stats))
    }
}

impl ManifestSource for HelmEngine {
    async fn render_each(
        &self,
        sink: &mut (dyn FnMut(Document) + Send),
        cancel: &CancellationToken,
    ) -> Result<RenderStats, RenderError> {
        let mut child = self.command().spawn().map_err(|source| RenderError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;
        let stderr_task = tokio::spawn(collect_stderr(stderr));

        let mut stream = DocumentStream::new(BufReader::new(stdout));
        let mut stats = RenderStats::default();
        let drained = tokio::select! {
            result = drain(&mut stream, sink, &mut stats) => result,
            _ = cancel.cancelled() => Err(RenderError::Cancelled),
        };
        if let Err(err) = drained {
            // stdout is no longer read, so the engine must not keep running.
            let _ = child.kill().await;
            stderr_task.abort();
            return Err(err);
        }

        let status = tokio::select! {
            status = child.wait() => status.map_err(|source| RenderError::Io {
                stream: "exit status",
                source,
            })?,
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                stderr_task.abort();
                return Err(RenderError::Cancelled);
            }
        };
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(RenderError::Exit {
                program: self.program.clone(),
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        if !stderr.trim().is_empty() {
            tracing::warn!(stderr = %stderr.trim(), "engine wrote to stderr");
        }

        tracing::debug!(
            seen = stats.seen,
            kept = stats.kept,
            dropped = stats.dropped,
            "render finished",
        );
        Ok(stats)
    }
}

async fn drain<R: AsyncBufRead + Unpin>(
    stream: &mut DocumentStream<R>,
    sink: &mut (dyn FnMut(Document) + Send),
    stats: &mut RenderStats,
) -> Result<(), RenderError> {
    while let Some(raw) = stream
        .next_document()
        .await
        .map_err(|source| RenderError::Io {
            stream: "stdout",
            source,
        })?
    {
        stats.seen += 1;
        match decode(&raw)? {
            Some(doc) => {
                stats.kept += 1;
                sink(doc);
            }
            None => stats.dropped += 1,
        }
    }
    Ok(())
}

/// Decode one raw document. `Ok(None)` means the document is not a resource.
fn decode(raw: &RawDocument) -> Result<Option<Document>, RenderError> {
    if raw.is_blank() {
        return Ok(None);
    }
    let value: Value = serde_yaml::from_str(&raw.text).map_err(|source| RenderError::Decode {
        index: raw.index,
        line: raw.line,
        source,
    })?;
    match Document::from_value(value) {
        Ok(doc) => Ok(Some(doc)),
        Err(reason) => {
            tracing::debug!(
                index = raw.index,
                line = raw.line,
                reason = %reason,
                "dropping document without resource shape",
            );
            Ok(None)
        }
    }
}

async fn collect_stderr(mut stderr: ChildStderr) -> String {
    let mut buf = Vec::new();
    if let Err(err) = stderr.read_to_end(&mut buf).await {
        tracing::debug!(error = %err, "reading engine stderr failed");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn missing_pipe(stream: &'static str) -> RenderError {
    RenderError::Io {
        stream,
        source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe not captured"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str) -> RawDocument {
        RawDocument {
            index: 3,
            line: 10,
            text: text.to_string(),
        }
    }

    #[test]
    fn decode_keeps_resources() {
        let doc = decode(&raw("apiVersion: v1\nkind: Service\nmetadata:\n  name: web-svc\n"))
            .expect("decode")
            .expect("resource");
        assert_eq!(doc.kind(), "Service");
        assert_eq!(doc.name(), Some("web-svc"));
    }

    #[test]
    fn decode_drops_blank_and_shapeless_documents() {
        assert!(decode(&raw("# Source: chart/templates/off.yaml\n\n"))
            .expect("blank")
            .is_none());
        assert!(decode(&raw("metadata:\n  name: orphan\n"))
            .expect("shapeless")
            .is_none());
        assert!(decode(&raw("just a string\n")).expect("scalar").is_none());
    }

    #[test]
    fn decode_reports_syntax_errors_with_position() {
        let err = decode(&raw("kind: [unclosed\n")).unwrap_err();
        match err {
            RenderError::Decode { index, line, .. } => {
                assert_eq!(index, 3);
                assert_eq!(line, 10);
            }
            other => panic!("expected decode error, got {other}"),
        }
    }

    #[test]
    fn command_uses_template_args() {
        let engine = HelmEngine::new(RenderRequest::new("chart").with_release("web"))
            .with_program("/opt/helm");
        let command = engine.command();
        let std = command.as_std();
        assert_eq!(std.get_program(), "/opt/helm");
        let args: Vec<_> = std.get_args().collect();
        assert_eq!(args, ["template", "web", "chart"]);
    }
}
