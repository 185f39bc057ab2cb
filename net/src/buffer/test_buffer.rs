// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Toy implementation of [`PacketBuffer`] which is useful for testing.

use tracing::trace;

// only included for doc ref
#[cfg(doc)]
use crate::buffer::PacketBuffer;

/// Toy data structure which implements [`PacketBuffer`]
///
/// The core function of this structure is to facilitate testing by "faking" the useful
/// properties of a real driver-owned packet buffer without binding any hardware.
#[derive(Debug, Clone)]
pub struct TestBuffer {
    buffer: Vec<u8>,
}

impl TestBuffer {
    /// The maximum capacity of a `TestBuffer`, in octets.
    ///
    /// Matches the customary default capacity of a driver-level packet buffer.
    pub const CAPACITY: usize = 2048;

    /// Create a new `TestBuffer` from a given slice of octets.
    ///
    /// Data past [`TestBuffer::CAPACITY`] is not stored.
    #[must_use]
    pub fn from_raw_data(data: &[u8]) -> TestBuffer {
        let take = data.len().min(TestBuffer::CAPACITY);
        if take < data.len() {
            trace!("TestBuffer truncating {} octets", data.len() - take);
        }
        TestBuffer {
            buffer: data[..take].to_vec(),
        }
    }
}

impl AsRef<[u8]> for TestBuffer {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_slice()
    }
}
