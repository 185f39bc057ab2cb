// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! # Brick Building Blocks
//!
//! This crate provides the processing-unit abstraction of the datapath: the [`Brick`]
//! trait. A brick has two connection faces ([`Side::West`] and [`Side::East`]), each
//! with a fixed number of ports; it receives a bounded [`Batch`] of frames on one
//! side-port and emits zero or more batches through an [`Emitter`].
//!
//! Bricks never call their peers directly. Emissions are collected by the [`Emitter`]
//! and routed by the graph layer along the configured links, which keeps propagation
//! an explicit work-list instead of unbounded call-stack recursion.
//!
//! The [`sample_bricks`] module provides the small bricks used in tests and demos:
//! a queue-backed source, a collecting sink, and a logging pass-through tap.

#![deny(clippy::all, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod batch;
mod emitter;
pub mod sample_bricks;
mod side;

pub use batch::{Batch, BatchFull, MAX_BURST};
pub use emitter::{Emission, Emitter};
pub use side::Side;

use net::buffer::PacketBuffer;
use std::any::Any;

/// Errors produced by individual bricks.
///
/// Structural errors (capacity, lookup, lifecycle) live in the graph layer; this
/// enum covers the failures a brick itself can produce.
#[derive(Debug, thiserror::Error)]
pub enum BrickError {
    /// Invalid parameters at construction or reconfiguration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A brick failed while processing a batch.
    #[error("brick {brick} failed to process a batch: {reason}")]
    Receive {
        /// Name of the failing brick.
        brick: String,
        /// Human-readable failure cause.
        reason: String,
    },
}

/// A packet-processing unit with two connection faces.
///
/// Implementations are polymorphic over a small capability set: pass-through
/// transforms, fan-in/fan-out aggregation (the switch), terminal sources and
/// terminal sinks. A brick takes ownership of every batch handed to its
/// [`Brick::receive`]: each frame must be dropped, forwarded through the emitter,
/// or retained by the brick as its new owner before the call returns.
pub trait Brick<Buf: PacketBuffer>: Any {
    /// The brick's name, unique within a graph.
    fn name(&self) -> &str;

    /// Maximum number of links the given side accepts, fixed at construction.
    fn side_capacity(&self, side: Side) -> usize;

    /// Handle a batch arriving on `side`, port `port`.
    ///
    /// Emitted batches are handed to `tx`; the graph layer routes them along the
    /// links attached to this brick. Emitting into an unlinked port drops the batch.
    ///
    /// # Errors
    ///
    /// Returns a [`BrickError`] if the brick cannot process the batch. The failure
    /// aborts the propagation of this batch only; the graph stays intact.
    fn receive(
        &mut self,
        side: Side,
        port: usize,
        batch: Batch<Buf>,
        tx: &mut Emitter<Buf>,
    ) -> Result<(), BrickError>;

    /// Ingress step for source bricks: drain at most one batch of pending frames.
    ///
    /// Non-source bricks keep the default no-op. The returned count is the number
    /// of frames pulled in, bounded by [`MAX_BURST`] to cap the work done by a
    /// single poll.
    ///
    /// # Errors
    ///
    /// Returns a [`BrickError`] if the underlying ingress fails.
    fn pull(&mut self, tx: &mut Emitter<Buf>) -> Result<usize, BrickError> {
        let _ = tx;
        Ok(0)
    }

    /// True for terminal ingress adapters that the poll scheduler must drive.
    fn is_source(&self) -> bool {
        false
    }
}

impl<Buf: PacketBuffer> std::fmt::Debug for dyn Brick<Buf> + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Brick").field("name", &self.name()).finish()
    }
}
