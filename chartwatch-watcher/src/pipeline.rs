//! Render → filter → emit orchestration.
//!
//! # States
//!
//! ```text
//!            start / relevant change
//!   Idle ───────────────────────────▶ Rendering
//!    ▲                                 │     │
//!    │ render failed (reported)        │     │ render ok
//!    └─────────────────────────────────┘     ▼
//!    ▲                                    Emitting
//!    └──────────── all documents written ────┘
//! ```
//!
//! Changes arriving while `Rendering` or `Emitting` are folded into a single
//! follow-up cycle that starts as soon as the current one completes. At most
//! one engine invocation is in flight at any time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use chartwatch_core::{Document, FilterSpec};
use chartwatch_renderer::{ManifestSource, RenderError, RenderStats};

use crate::emitter::{Emitter, MatchedDocument};
use crate::error::WatcherError;
use crate::watch::{ChangeEvent, ChangeStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Rendering,
    Emitting,
}

/// Decides when a cycle starts and coalesces changes that arrive mid-cycle.
#[derive(Debug)]
pub struct TriggerGate {
    state: PipelineState,
    follow_up: bool,
}

impl Default for TriggerGate {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerGate {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            follow_up: false,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn follow_up_pending(&self) -> bool {
        self.follow_up
    }

    /// Ask for a cycle. Returns `true` when one should start now; otherwise
    /// the request is remembered as the single follow-up.
    pub fn request(&mut self) -> bool {
        match self.state {
            PipelineState::Idle => {
                self.state = PipelineState::Rendering;
                true
            }
            PipelineState::Rendering | PipelineState::Emitting => {
                self.follow_up = true;
                false
            }
        }
    }

    pub fn begin_emit(&mut self) {
        if self.state == PipelineState::Rendering {
            self.state = PipelineState::Emitting;
        }
    }

    /// Finish the current cycle. Returns `true` when a follow-up starts now.
    pub fn complete(&mut self) -> bool {
        self.state = PipelineState::Idle;
        if std::mem::take(&mut self.follow_up) {
            self.state = PipelineState::Rendering;
            true
        } else {
            false
        }
    }
}

/// What one cycle produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub stats: RenderStats,
    /// Selections, counting a document once per satisfied entry.
    pub matched: usize,
    pub emitted: usize,
    /// Selected documents skipped for lacking `metadata.name`.
    pub skipped: usize,
    pub encode_failures: usize,
    pub duration: Duration,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Emitted(CycleReport),
    Failed(RenderError),
    Cancelled,
}

/// Totals for a [`Pipeline::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: usize,
    pub failures: usize,
    /// Relevant changes absorbed by a cycle that was already in flight.
    pub coalesced: usize,
}

pub struct Pipeline<S, W> {
    source: S,
    filter: FilterSpec,
    emitter: Emitter<W>,
    gate: TriggerGate,
}

impl<S, W> Pipeline<S, W>
where
    S: ManifestSource,
    W: AsyncWrite + Unpin,
{
    pub fn new(source: S, filter: FilterSpec, out: W) -> Self {
        Self {
            source,
            filter,
            emitter: Emitter::new(out),
            gate: TriggerGate::new(),
        }
    }

    pub fn into_output(self) -> W {
        self.emitter.into_inner()
    }

    /// Render once now, then once per batch of relevant changes, until
    /// `cancel` fires. A notifier failure ends the run with an error.
    pub async fn run(
        &mut self,
        changes: &mut ChangeStream,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, WatcherError> {
        let mut summary = RunSummary::default();
        let mut start = self.gate.request();

        loop {
            if start {
                match self.cycle(Some(&mut *changes), cancel, &mut summary).await? {
                    CycleOutcome::Cancelled => break,
                    CycleOutcome::Emitted(_) => summary.cycles += 1,
                    CycleOutcome::Failed(_) => {
                        summary.cycles += 1;
                        summary.failures += 1;
                    }
                }
                while let Some(event) = changes.try_next()? {
                    note_change(&mut self.gate, &event, &mut summary);
                }
                start = self.gate.complete();
                if start {
                    tracing::info!("chart changed during render, regenerating");
                }
                if cancel.is_cancelled() {
                    break;
                }
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                event = changes.next() => {
                    let event = event?;
                    if !event.is_relevant() {
                        tracing::trace!(
                            path = %event.path.display(),
                            kind = ?event.kind,
                            "ignoring change",
                        );
                        continue;
                    }
                    tracing::info!(
                        path = %event.path.display(),
                        kind = ?event.kind,
                        filters = %self.filter,
                        "chart modified, regenerating",
                    );
                    start = self.gate.request();
                }
            }
        }

        tracing::info!(
            cycles = summary.cycles,
            failures = summary.failures,
            coalesced = summary.coalesced,
            "pipeline stopped",
        );
        Ok(summary)
    }

    /// Run exactly one cycle without watching for changes.
    pub async fn run_once(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<CycleOutcome, WatcherError> {
        self.gate.request();
        let outcome = self.cycle(None, cancel, &mut RunSummary::default()).await;
        self.gate.complete();
        outcome
    }

    async fn cycle(
        &mut self,
        mut changes: Option<&mut ChangeStream>,
        cancel: &CancellationToken,
        summary: &mut RunSummary,
    ) -> Result<CycleOutcome, WatcherError> {
        let Self {
            source,
            filter,
            emitter,
            gate,
        } = self;
        let filter = &*filter;
        let started = Instant::now();
        let mut matched = Vec::new();
        let mut skipped = 0usize;

        let rendered = {
            let mut sink = |doc: Document| collect_matches(filter, doc, &mut matched, &mut skipped);
            let render = source.render_each(&mut sink, cancel);
            tokio::pin!(render);
            loop {
                tokio::select! {
                    result = &mut render => break result,
                    event = next_change(changes.as_deref_mut()) => {
                        note_change(gate, &event?, summary);
                    }
                }
            }
        };

        match rendered {
            Ok(stats) => {
                gate.begin_emit();
                let emitted = emitter.emit(&matched).await?;
                let report = CycleReport {
                    stats,
                    matched: matched.len(),
                    emitted: emitted.written,
                    skipped,
                    encode_failures: emitted.failed,
                    duration: started.elapsed(),
                };
                tracing::info!(
                    seen = report.stats.seen,
                    kept = report.stats.kept,
                    dropped = report.stats.dropped,
                    matched = report.matched,
                    emitted = report.emitted,
                    skipped = report.skipped,
                    duration_ms = report.duration.as_millis(),
                    "render cycle completed",
                );
                Ok(CycleOutcome::Emitted(report))
            }
            Err(RenderError::Cancelled) => {
                tracing::info!("render abandoned for shutdown");
                Ok(CycleOutcome::Cancelled)
            }
            Err(err) => {
                tracing::error!(error = %err, "error generating manifests");
                emitter.report_error(&err).await?;
                Ok(CycleOutcome::Failed(err))
            }
        }
    }
}

fn collect_matches(
    filter: &FilterSpec,
    doc: Document,
    matched: &mut Vec<MatchedDocument>,
    skipped: &mut usize,
) {
    match filter.select(&doc) {
        Ok(entries) if entries.is_empty() => {}
        Ok(entries) => {
            let document = Arc::new(doc);
            matched.extend(entries.into_iter().map(|entry| MatchedDocument {
                entry,
                document: Arc::clone(&document),
            }));
        }
        Err(err) => {
            *skipped += 1;
            tracing::warn!(error = %err, "skipping selected document");
        }
    }
}

fn note_change(gate: &mut TriggerGate, event: &ChangeEvent, summary: &mut RunSummary) {
    if !event.is_relevant() {
        return;
    }
    if !gate.request() {
        summary.coalesced += 1;
        tracing::debug!(path = %event.path.display(), "change coalesced into follow-up render");
    }
}

async fn next_change(changes: Option<&mut ChangeStream>) -> Result<ChangeEvent, WatcherError> {
    match changes {
        Some(changes) => changes.next().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_starts_immediately_when_idle() {
        let mut gate = TriggerGate::new();
        assert_eq!(gate.state(), PipelineState::Idle);
        assert!(gate.request());
        assert_eq!(gate.state(), PipelineState::Rendering);
        assert!(!gate.complete());
        assert_eq!(gate.state(), PipelineState::Idle);
    }

    #[test]
    fn gate_coalesces_requests_during_a_cycle() {
        let mut gate = TriggerGate::new();
        assert!(gate.request());
        for _ in 0..5 {
            assert!(!gate.request(), "no second cycle while rendering");
        }
        gate.begin_emit();
        assert_eq!(gate.state(), PipelineState::Emitting);
        assert!(!gate.request(), "no second cycle while emitting");
        assert!(gate.follow_up_pending());

        assert!(gate.complete(), "exactly one follow-up");
        assert_eq!(gate.state(), PipelineState::Rendering);
        assert!(!gate.complete(), "follow-up consumed");
    }

    #[test]
    fn begin_emit_only_follows_rendering() {
        let mut gate = TriggerGate::new();
        gate.begin_emit();
        assert_eq!(gate.state(), PipelineState::Idle);
    }
}
