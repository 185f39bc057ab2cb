// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bounded batch of frames, the only data exchanged across links.

use arrayvec::ArrayVec;
use net::buffer::PacketBuffer;
use net::frame::Frame;

/// Maximum number of frames moved in one batch.
///
/// The cap bounds the worst-case work of a single poll step end to end.
pub const MAX_BURST: usize = 64;

/// Error returned when pushing into a full [`Batch`].
///
/// Carries the rejected frame back so the caller keeps ownership of it.
#[derive(Debug, thiserror::Error)]
#[error("batch full: capacity {MAX_BURST}")]
pub struct BatchFull<Buf: PacketBuffer> {
    /// The frame that did not fit.
    pub frame: Frame<Buf>,
}

/// A bounded, contiguous collection of frames passed between bricks in one call.
///
/// Ownership of a batch transfers along the call chain: the receiving brick takes
/// responsibility for every frame in it before returning control.
#[derive(Debug, Clone)]
pub struct Batch<Buf: PacketBuffer> {
    frames: ArrayVec<Frame<Buf>, MAX_BURST>,
}

impl<Buf: PacketBuffer> Default for Batch<Buf> {
    fn default() -> Self {
        Batch::new()
    }
}

impl<Buf: PacketBuffer> Batch<Buf> {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Batch<Buf> {
        Batch {
            frames: ArrayVec::new(),
        }
    }

    /// Append a frame to the batch.
    ///
    /// # Errors
    ///
    /// Returns [`BatchFull`], handing the frame back, when the batch already holds
    /// [`MAX_BURST`] frames. Overfilling is never silent.
    pub fn push(&mut self, frame: Frame<Buf>) -> Result<(), BatchFull<Buf>> {
        self.frames
            .try_push(frame)
            .map_err(|e| BatchFull { frame: e.element() })
    }

    /// Number of frames in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when the batch holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Iterate over the frames without taking them.
    pub fn iter(&self) -> impl Iterator<Item = &Frame<Buf>> {
        self.frames.iter()
    }

    /// Remove and return all frames, leaving the batch empty.
    pub fn drain(&mut self) -> impl Iterator<Item = Frame<Buf>> {
        self.frames.drain(..)
    }
}

impl<Buf: PacketBuffer> IntoIterator for Batch<Buf> {
    type Item = Frame<Buf>;
    type IntoIter = arrayvec::IntoIter<Frame<Buf>, MAX_BURST>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

impl<'a, Buf: PacketBuffer> IntoIterator for &'a Batch<Buf> {
    type Item = &'a Frame<Buf>;
    type IntoIter = std::slice::Iter<'a, Frame<Buf>>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
