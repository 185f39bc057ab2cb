// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Collection point for the batches a brick emits during one `receive` or `pull`.

use crate::batch::Batch;
use crate::side::Side;
use net::buffer::PacketBuffer;
use tracing::trace;

/// One emitted batch, addressed by the emitting brick's own side and port.
#[derive(Debug)]
pub struct Emission<Buf: PacketBuffer> {
    /// Side of the emitting brick the batch leaves through.
    pub side: Side,
    /// Port index on that side.
    pub port: usize,
    /// The batch itself.
    pub batch: Batch<Buf>,
}

/// Per-call emission buffer handed to [`Brick::receive`] and [`Brick::pull`].
///
/// The graph layer drains it after the call returns and routes every emission
/// along the link attached to the named side-port, if any.
///
/// [`Brick::receive`]: crate::Brick::receive
/// [`Brick::pull`]: crate::Brick::pull
#[derive(Debug, Default)]
pub struct Emitter<Buf: PacketBuffer> {
    emissions: Vec<Emission<Buf>>,
}

impl<Buf: PacketBuffer> Emitter<Buf> {
    /// Create an empty emitter.
    #[must_use]
    pub fn new() -> Emitter<Buf> {
        Emitter {
            emissions: Vec::new(),
        }
    }

    /// Queue a batch for delivery through the given side-port.
    ///
    /// Empty batches are discarded here rather than walked through the graph.
    pub fn emit(&mut self, side: Side, port: usize, batch: Batch<Buf>) {
        if batch.is_empty() {
            trace!("discarding empty emission on {side}:{port}");
            return;
        }
        self.emissions.push(Emission { side, port, batch });
    }

    /// Number of queued emissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.emissions.len()
    }

    /// True when nothing has been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emissions.is_empty()
    }

    /// Take all queued emissions, leaving the emitter empty for reuse.
    pub fn take(&mut self) -> Vec<Emission<Buf>> {
        std::mem::take(&mut self.emissions)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod test {
    use super::Emitter;
    use crate::batch::Batch;
    use crate::side::Side;
    use net::buffer::TestBuffer;
    use net::eth::Mac;
    use net::frame::test_utils::build_test_frame;

    #[test]
    fn empty_batches_are_discarded() {
        let mut tx: Emitter<TestBuffer> = Emitter::new();
        tx.emit(Side::East, 0, Batch::new());
        assert!(tx.is_empty());
    }

    #[test]
    fn take_leaves_the_emitter_reusable() {
        let mut tx = Emitter::new();
        let mut batch = Batch::new();
        batch
            .push(build_test_frame(Mac([2, 0, 0, 0, 0, 1]), Mac::BROADCAST))
            .unwrap();
        tx.emit(Side::West, 1, batch);
        let taken = tx.take();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].side, Side::West);
        assert_eq!(taken[0].port, 1);
        assert!(tx.is_empty());
    }
}
