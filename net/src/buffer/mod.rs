// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! [`PacketBuffer`] and related traits

#[cfg(any(doc, test, feature = "test_buffer"))]
pub mod test_buffer;

use core::fmt::Debug;

#[allow(unused_imports)] // re-export
#[cfg(any(doc, test, feature = "test_buffer"))]
pub use test_buffer::*;

/// Super trait representing the abstract operations which may be performed on a packet buffer.
///
/// `Clone` is part of the contract because flooding duplicates a frame into several
/// egress batches; a hardware-backed buffer would implement it by bumping a refcount.
pub trait PacketBuffer: AsRef<[u8]> + Clone + Debug + Send + 'static {}
impl<T> PacketBuffer for T where T: AsRef<[u8]> + Clone + Debug + Send + 'static {}
