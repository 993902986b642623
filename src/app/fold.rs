// LogFold - app/fold.rs
//
// Background visibility computation. Runs `compute_visibility` on a worker
// thread and sends the result back over an mpsc channel.
//
// Architecture:
//   - `FoldCalculator` lives with the document session; `run_fold` runs on a
//     background thread.
//   - At most one computation is in flight. Starting a new one sets the
//     previous run's `Arc<AtomicBool>` cancel flag and drops its receiver.
//   - Every run carries a generation number; the session only accepts a
//     result newer than the one it already shows.

use crate::core::document::DocumentSnapshot;
use crate::core::model::VisibilityResult;
use crate::core::visibility::{self, HiddenSubstrings};
use crate::util::constants::DEFAULT_PARALLEL_THRESHOLD_LINES;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

/// Message sent from the worker to the session.
#[derive(Debug, Clone)]
pub enum FoldProgress {
    /// The run finished; its result carries the generation.
    Completed(VisibilityResult),

    /// The run observed its cancel flag and produced nothing.
    Cancelled { generation: u64 },
}

/// A previous result that can be extended instead of recomputed, valid when
/// the new substring set only adds entries and the document is unchanged.
#[derive(Debug, Clone)]
pub struct FoldBase {
    pub previous: VisibilityResult,
    pub added: HiddenSubstrings,
}

/// Runs visibility computations on a background thread.
pub struct FoldCalculator {
    progress_rx: Option<mpsc::Receiver<FoldProgress>>,
    cancel_flag: Option<Arc<AtomicBool>>,
    last_generation: u64,
    parallel_threshold: usize,
}

impl FoldCalculator {
    pub fn new() -> Self {
        Self::with_parallel_threshold(DEFAULT_PARALLEL_THRESHOLD_LINES)
    }

    pub fn with_parallel_threshold(parallel_threshold: usize) -> Self {
        Self {
            progress_rx: None,
            cancel_flag: None,
            last_generation: 0,
            parallel_threshold,
        }
    }

    /// Start computing visibility for `snapshot`, cancelling any run in
    /// flight. Returns the generation assigned to the new run.
    pub fn start(
        &mut self,
        snapshot: DocumentSnapshot,
        substrings: HiddenSubstrings,
        base: Option<FoldBase>,
    ) -> u64 {
        self.cancel();

        self.last_generation += 1;
        let generation = self.last_generation;

        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        self.progress_rx = Some(rx);
        self.cancel_flag = Some(Arc::clone(&cancel));

        let threshold = self.parallel_threshold;
        std::thread::spawn(move || {
            run_fold(
                snapshot,
                substrings,
                base,
                generation,
                threshold,
                tx,
                cancel,
            );
        });

        tracing::debug!(generation, "Visibility computation started");
        generation
    }

    /// Request cancellation of the running computation, if any.
    pub fn cancel(&mut self) {
        if let Some(flag) = &self.cancel_flag {
            flag.store(true, Ordering::SeqCst);
        }
        self.cancel_flag = None;
    }

    /// Poll for messages without blocking. Returns all pending messages.
    pub fn poll_progress(&self) -> Vec<FoldProgress> {
        let mut messages = Vec::new();
        if let Some(ref rx) = self.progress_rx {
            while let Ok(msg) = rx.try_recv() {
                messages.push(msg);
            }
        }
        messages
    }

    /// Block until the current run reports or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Option<FoldProgress> {
        self.progress_rx.as_ref()?.recv_timeout(timeout).ok()
    }

    /// Generation of the most recently started run (0 if none).
    pub fn last_generation(&self) -> u64 {
        self.last_generation
    }

    /// Mark the current run as finished once its message was received.
    pub fn finish(&mut self, generation: u64) {
        if generation == self.last_generation {
            self.cancel_flag = None;
        }
    }
}

impl Default for FoldCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FoldCalculator {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Worker body. Sends exactly one message unless the receiver is gone.
fn run_fold(
    snapshot: DocumentSnapshot,
    substrings: HiddenSubstrings,
    base: Option<FoldBase>,
    generation: u64,
    parallel_threshold: usize,
    tx: mpsc::Sender<FoldProgress>,
    cancel: Arc<AtomicBool>,
) {
    let started = Instant::now();

    let refined = base.and_then(|b| {
        visibility::refine_visibility(
            &snapshot,
            &b.previous,
            &b.added,
            generation,
            &cancel,
            parallel_threshold,
        )
    });
    let incremental = refined.is_some();
    let result = match refined {
        Some(r) => Some(r),
        None => visibility::compute_visibility(
            &snapshot,
            &substrings,
            generation,
            &cancel,
            parallel_threshold,
        ),
    };

    let msg = match result {
        Some(result) => {
            tracing::debug!(
                generation,
                incremental,
                lines = result.line_count(),
                hidden = result.hidden_count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Visibility computation complete"
            );
            FoldProgress::Completed(result)
        }
        None => {
            tracing::debug!(generation, "Visibility computation cancelled");
            FoldProgress::Cancelled { generation }
        }
    };

    // Receiver dropped means a newer run superseded this one.
    let _ = tx.send(msg);
}
