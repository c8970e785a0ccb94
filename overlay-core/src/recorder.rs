//! Deferred command recording.
//!
//! The browser thread may not touch the render thread's primary context, so
//! paints are recorded here as staged writes and replayed by the render thread
//! when it drains the store. Every write remembers the surface generation it
//! targeted; writes aimed at a surface that has since been replaced are
//! discarded instead of being applied to its successor.

use std::sync::Arc;

use crate::backend::OverlayBackend;
use crate::geometry::SurfaceSize;

/// Number of staging buffers kept for reuse between paints.
const MAX_SPARE_BUFFERS: usize = 2;

/// A single staged full-surface write.
struct PendingWrite<T> {
    target: Arc<T>,
    generation: u64,
    size: SurfaceSize,
    pixels: Vec<u8>,
}

/// Outcome of executing a [`CommandBatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Writes submitted to the primary context.
    pub applied: usize,
    /// Writes dropped because their target surface was replaced.
    pub discarded: usize,
    /// Writes the backend failed to submit.
    pub failed: usize,
}

impl DrainReport {
    /// Total number of writes the batch contained.
    #[must_use]
    pub fn total(&self) -> usize {
        self.applied + self.discarded + self.failed
    }
}

/// Secondary recording context for surface writes.
///
/// Not synchronized on its own; the store only touches it under its lock.
pub struct CommandRecorder<T> {
    pending: Vec<PendingWrite<T>>,
    spare: Vec<Vec<u8>>,
}

impl<T> CommandRecorder<T> {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            spare: Vec::new(),
        }
    }

    /// Stage a copy of `pixels` for upload into `target`.
    ///
    /// Writes cover the whole surface, so a write aimed at a generation that
    /// already has one pending replaces it in place and reuses its staging
    /// buffer. Returns `true` when an earlier write was replaced this way.
    pub fn record_write(
        &mut self,
        target: &Arc<T>,
        generation: u64,
        size: SurfaceSize,
        pixels: &[u8],
    ) -> bool {
        if let Some(existing) = self
            .pending
            .iter_mut()
            .find(|write| write.generation == generation)
        {
            existing.size = size;
            existing.pixels.clear();
            existing.pixels.extend_from_slice(pixels);
            return true;
        }

        let mut staging = self.spare.pop().unwrap_or_default();
        staging.clear();
        staging.extend_from_slice(pixels);

        self.pending.push(PendingWrite {
            target: Arc::clone(target),
            generation,
            size,
            pixels: staging,
        });
        false
    }

    /// Number of writes recorded since the last [`finish`](Self::finish).
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop every recorded write that does not target `live_generation`.
    ///
    /// Returns the number of writes dropped.
    pub fn discard_stale(&mut self, live_generation: Option<u64>) -> usize {
        let before = self.pending.len();
        let mut kept = Vec::with_capacity(before);
        for write in self.pending.drain(..) {
            if Some(write.generation) == live_generation {
                kept.push(write);
            } else if self.spare.len() < MAX_SPARE_BUFFERS {
                self.spare.push(write.pixels);
            }
        }
        self.pending = kept;
        before - self.pending.len()
    }

    /// Close the current recording into a batch.
    ///
    /// Returns `None` when nothing was recorded. The recorder is empty
    /// afterwards, so a batch can only be produced once.
    pub fn finish(&mut self) -> Option<CommandBatch<T>> {
        if self.pending.is_empty() {
            return None;
        }
        Some(CommandBatch {
            writes: std::mem::take(&mut self.pending),
        })
    }

    fn recycle(&mut self, pixels: Vec<u8>) {
        if self.spare.len() < MAX_SPARE_BUFFERS {
            self.spare.push(pixels);
        }
    }
}

impl<T> Default for CommandRecorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// An ordered batch of recorded writes, ready for the primary context.
pub struct CommandBatch<T> {
    writes: Vec<PendingWrite<T>>,
}

impl<T> CommandBatch<T> {
    /// Number of writes in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// True if the batch holds no writes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Replay the batch on `backend` in recording order.
    ///
    /// Writes whose generation differs from `live_generation` are skipped.
    /// Backend failures are logged and counted, never propagated. Spent staging
    /// buffers are handed back to `recorder` for reuse.
    pub fn execute<B>(
        self,
        backend: &B,
        live_generation: Option<u64>,
        recorder: &mut CommandRecorder<T>,
    ) -> DrainReport
    where
        B: OverlayBackend<Texture = T>,
    {
        let mut report = DrainReport::default();

        for write in self.writes {
            if Some(write.generation) != live_generation {
                report.discarded += 1;
            } else if let Err(e) = backend.write_texture(&write.target, write.size, &write.pixels)
            {
                tracing::warn!(generation = write.generation, "Dropping surface write: {e}");
                report.failed += 1;
            } else {
                report.applied += 1;
            }
            recorder.recycle(write.pixels);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TextureDescriptor;
    use crate::software::SoftwareBackend;

    fn texture(backend: &SoftwareBackend, size: SurfaceSize) -> Arc<crate::software::SoftwareTexture> {
        Arc::new(
            backend
                .create_texture(&TextureDescriptor::shared_surface(size))
                .expect("texture should allocate"),
        )
    }

    #[test]
    fn test_finish_empty_is_none() {
        let mut recorder: CommandRecorder<()> = CommandRecorder::new();
        assert!(recorder.finish().is_none());
    }

    #[test]
    fn test_finish_consumes_pending() {
        let backend = SoftwareBackend::new();
        let size = SurfaceSize::new(2, 2);
        let target = texture(&backend, size);
        let mut recorder = CommandRecorder::new();

        assert!(!recorder.record_write(&target, 1, size, &[7u8; 16]));
        assert_eq!(recorder.pending_len(), 1);

        let batch = recorder.finish().expect("batch should exist");
        assert_eq!(batch.len(), 1);
        assert_eq!(recorder.pending_len(), 0);
        assert!(recorder.finish().is_none());
    }

    #[test]
    fn test_same_generation_writes_coalesce() {
        let backend = SoftwareBackend::new();
        let size = SurfaceSize::new(2, 2);
        let target = texture(&backend, size);
        let mut recorder = CommandRecorder::new();

        assert!(!recorder.record_write(&target, 1, size, &[1u8; 16]));
        assert!(recorder.record_write(&target, 1, size, &[2u8; 16]));
        assert!(recorder.record_write(&target, 1, size, &[3u8; 16]));
        assert_eq!(recorder.pending_len(), 1);
        assert!(recorder.spare.is_empty());

        let batch = recorder.finish().expect("batch should exist");
        let report = batch.execute(&backend, Some(1), &mut recorder);

        assert_eq!(report.applied, 1);
        assert_eq!(report.discarded, 0);
        assert_eq!(backend.writes_executed(), 1);
        assert_eq!(target.pixels(), vec![3u8; 16]);
    }

    #[test]
    fn test_execute_applies_in_order() {
        let backend = SoftwareBackend::new();
        let size = SurfaceSize::new(2, 2);
        let old = texture(&backend, size);
        let live = texture(&backend, size);
        let mut recorder = CommandRecorder::new();

        recorder.record_write(&old, 1, size, &[1u8; 16]);
        recorder.record_write(&live, 2, size, &[2u8; 16]);

        let batch = recorder.finish().expect("batch should exist");
        assert_eq!(batch.len(), 2);
        let report = batch.execute(&backend, Some(2), &mut recorder);

        assert_eq!(report.applied, 1);
        assert_eq!(report.discarded, 1);
        assert_eq!(old.pixels(), vec![0u8; 16]);
        assert_eq!(live.pixels(), vec![2u8; 16]);
    }

    #[test]
    fn test_execute_discards_other_generations() {
        let backend = SoftwareBackend::new();
        let size = SurfaceSize::new(1, 1);
        let old = texture(&backend, size);
        let mut recorder = CommandRecorder::new();

        recorder.record_write(&old, 1, size, &[5u8; 4]);
        let batch = recorder.finish().expect("batch should exist");
        let report = batch.execute(&backend, Some(2), &mut recorder);

        assert_eq!(report.applied, 0);
        assert_eq!(report.discarded, 1);
        assert_eq!(old.pixels(), vec![0u8; 4]);
    }

    #[test]
    fn test_discard_stale_keeps_live_writes() {
        let backend = SoftwareBackend::new();
        let size = SurfaceSize::new(1, 1);
        let old = texture(&backend, size);
        let live = texture(&backend, size);
        let mut recorder = CommandRecorder::new();

        recorder.record_write(&old, 1, size, &[1u8; 4]);
        recorder.record_write(&live, 2, size, &[2u8; 4]);
        assert!(recorder.record_write(&old, 1, size, &[3u8; 4]));
        assert_eq!(recorder.pending_len(), 2);

        assert_eq!(recorder.discard_stale(Some(2)), 1);
        assert_eq!(recorder.pending_len(), 1);
        assert_eq!(recorder.discard_stale(None), 1);
        assert_eq!(recorder.pending_len(), 0);
    }

    #[test]
    fn test_staging_buffers_are_reused() {
        let backend = SoftwareBackend::new();
        let size = SurfaceSize::new(4, 4);
        let target = texture(&backend, size);
        let mut recorder = CommandRecorder::new();

        recorder.record_write(&target, 1, size, &[1u8; 64]);
        let batch = recorder.finish().expect("batch should exist");
        batch.execute(&backend, Some(1), &mut recorder);
        assert_eq!(recorder.spare.len(), 1);

        recorder.record_write(&target, 1, size, &[2u8; 64]);
        assert!(recorder.spare.is_empty());
        assert_eq!(recorder.pending[0].pixels, vec![2u8; 64]);
    }
}
