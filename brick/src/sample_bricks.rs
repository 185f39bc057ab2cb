// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Sample bricks: a queue-backed source, a collecting sink, and a logging tap.
//!
//! These stand in for the terminal adapters (port drivers) in tests and demos;
//! they implement the same [`Brick`] contract any real adapter would.

use crate::{Batch, Brick, BrickError, Emitter, MAX_BURST, Side};
use net::buffer::PacketBuffer;
use net::frame::Frame;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// A queue-backed source brick.
///
/// Frames are fed in from the driver side with [`Feeder::feed`]; each [`Brick::pull`]
/// drains at most [`MAX_BURST`] of them onto the feeder's single east port. Frames
/// received back (the transmit direction of a real port) are counted and dropped.
pub struct Feeder<Buf: PacketBuffer> {
    name: String,
    queue: VecDeque<Frame<Buf>>,
    tx_count: u64,
}

impl<Buf: PacketBuffer> Feeder<Buf> {
    /// Create a feeder with the given name.
    #[must_use]
    pub fn new(name: &str) -> Feeder<Buf> {
        Feeder {
            name: name.to_owned(),
            queue: VecDeque::new(),
            tx_count: 0,
        }
    }

    /// Queue a frame for the next pulls.
    pub fn feed(&mut self, frame: Frame<Buf>) {
        self.queue.push_back(frame);
    }

    /// Queue every frame of an iterator.
    pub fn feed_all(&mut self, frames: impl IntoIterator<Item = Frame<Buf>>) {
        self.queue.extend(frames);
    }

    /// Frames still waiting to be pulled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Frames delivered back to this feeder for transmission.
    #[must_use]
    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }
}

impl<Buf: PacketBuffer> Brick<Buf> for Feeder<Buf> {
    fn name(&self) -> &str {
        &self.name
    }

    fn side_capacity(&self, side: Side) -> usize {
        match side {
            Side::West => 0,
            Side::East => 1,
        }
    }

    fn receive(
        &mut self,
        _side: Side,
        _port: usize,
        batch: Batch<Buf>,
        _tx: &mut Emitter<Buf>,
    ) -> Result<(), BrickError> {
        // transmit direction of the adapter: account and release
        self.tx_count += batch.len() as u64;
        trace!("{}: transmitting {} frames", self.name, batch.len());
        Ok(())
    }

    fn pull(&mut self, tx: &mut Emitter<Buf>) -> Result<usize, BrickError> {
        let mut batch = Batch::new();
        while batch.len() < MAX_BURST {
            let Some(frame) = self.queue.pop_front() else {
                break;
            };
            batch.push(frame).map_err(|_| BrickError::Receive {
                brick: self.name.clone(),
                reason: "burst overflow while draining queue".to_owned(),
            })?;
        }
        let pulled = batch.len();
        tx.emit(Side::East, 0, batch);
        Ok(pulled)
    }

    fn is_source(&self) -> bool {
        true
    }
}

/// A sink brick that stores everything it receives for later inspection.
pub struct Collector<Buf: PacketBuffer> {
    name: String,
    received: Vec<Batch<Buf>>,
}

impl<Buf: PacketBuffer> Collector<Buf> {
    /// Create a collector with the given name.
    #[must_use]
    pub fn new(name: &str) -> Collector<Buf> {
        Collector {
            name: name.to_owned(),
            received: Vec::new(),
        }
    }

    /// The batches received so far, in arrival order.
    #[must_use]
    pub fn batches(&self) -> &[Batch<Buf>] {
        &self.received
    }

    /// Iterate over every received frame across all batches.
    pub fn frames(&self) -> impl Iterator<Item = &Frame<Buf>> {
        self.received.iter().flat_map(Batch::iter)
    }

    /// Total number of frames received.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.received.iter().map(Batch::len).sum()
    }

    /// Forget everything received so far.
    pub fn clear(&mut self) {
        self.received.clear();
    }
}

impl<Buf: PacketBuffer> Brick<Buf> for Collector<Buf> {
    fn name(&self) -> &str {
        &self.name
    }

    fn side_capacity(&self, side: Side) -> usize {
        match side {
            Side::West => 1,
            Side::East => 0,
        }
    }

    fn receive(
        &mut self,
        _side: Side,
        _port: usize,
        batch: Batch<Buf>,
        _tx: &mut Emitter<Buf>,
    ) -> Result<(), BrickError> {
        self.received.push(batch);
        Ok(())
    }
}

/// A pass-through brick that `debug!`-logs every frame it sees.
///
/// This is the print/debug tap: one port per side, batches received on one side are
/// forwarded unchanged out the other. Dumping has a real performance cost; taps are
/// meant for debugging topologies, not steady-state forwarding.
pub struct Tap {
    name: String,
    count: u64,
}

impl Tap {
    /// Create a tap with the given name.
    #[must_use]
    pub fn new(name: &str) -> Tap {
        Tap {
            name: name.to_owned(),
            count: 0,
        }
    }

    /// Number of frames that have passed through the tap.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<Buf: PacketBuffer> Brick<Buf> for Tap {
    fn name(&self) -> &str {
        &self.name
    }

    fn side_capacity(&self, _side: Side) -> usize {
        1
    }

    fn receive(
        &mut self,
        side: Side,
        _port: usize,
        batch: Batch<Buf>,
        tx: &mut Emitter<Buf>,
    ) -> Result<(), BrickError> {
        for frame in &batch {
            debug!(
                "@{}, frame ({}): {} -> {}, {} octets",
                self.name,
                self.count,
                frame.eth().source(),
                frame.eth().destination(),
                frame.total_len()
            );
            self.count += 1;
        }
        tx.emit(side.flip(), 0, batch);
        Ok(())
    }
}
