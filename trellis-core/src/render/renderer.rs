//! The output boundary.

use super::patch::PatchBatch;

/// Receives the output of render passes.
///
/// `apply` mutates the host output; `present` makes it visible. Layout
/// effects run between the two calls, passive effects after `present`.
pub trait Renderer {
    fn apply(&mut self, batch: &PatchBatch);

    fn present(&mut self) {}
}

/// Discards all output.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn apply(&mut self, _batch: &PatchBatch) {}
}

/// Keeps every batch it receives.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub batches: Vec<PatchBatch>,
    pub presents: usize,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the batches received so far.
    pub fn drain(&mut self) -> Vec<PatchBatch> {
        std::mem::take(&mut self.batches)
    }
}

impl Renderer for RecordingRenderer {
    fn apply(&mut self, batch: &PatchBatch) {
        self.batches.push(batch.clone());
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}
