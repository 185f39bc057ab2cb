// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Parsed ethernet frame moved between bricks.

use crate::buffer::PacketBuffer;
use crate::eth::{EthType, Mac};

/// Length of an untagged ethernet header: two macs plus the ethertype.
pub const ETH_HEADER_LEN: usize = 14;

/// The parsed ethernet header of a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eth {
    destination: Mac,
    source: Mac,
    ethtype: EthType,
}

impl Eth {
    /// The destination mac of the header.
    #[must_use]
    pub fn destination(&self) -> Mac {
        self.destination
    }

    /// The source mac of the header.
    #[must_use]
    pub fn source(&self) -> Mac {
        self.source
    }

    /// The ethertype of the header.
    #[must_use]
    pub fn ethtype(&self) -> EthType {
        self.ethtype
    }
}

/// A parsed ethernet frame.
///
/// A `Frame` owns its backing buffer; the header fields are parsed once at
/// construction so that forwarding decisions never re-touch the raw octets.
#[derive(Debug, Clone)]
pub struct Frame<Buf: PacketBuffer> {
    eth: Eth,
    buffer: Buf,
}

/// Errors which may occur when failing to produce a [`Frame`]
#[derive(Debug, thiserror::Error)]
pub struct InvalidFrame<Buf: PacketBuffer> {
    /// The buffer which failed to parse, returned to the caller untouched.
    pub buffer: Buf,
    /// Why the buffer did not parse.
    #[source]
    pub error: FrameParseError,
}

impl<Buf: PacketBuffer> std::fmt::Display for InvalidFrame<Buf> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid frame: {}", self.error)
    }
}

/// The ways a raw buffer can fail to parse as an ethernet frame.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameParseError {
    /// Buffer shorter than an ethernet header.
    #[error("frame too short: {len} octets, need at least {ETH_HEADER_LEN}")]
    Runt {
        /// The offending buffer length.
        len: usize,
    },
}

impl<Buf: PacketBuffer> Frame<Buf> {
    /// Map a [`PacketBuffer`] to a `Frame` if the buffer contains a valid ethernet header.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidFrame`] error, carrying the buffer back, if the buffer does
    /// not parse as an ethernet frame.
    pub fn new(buffer: Buf) -> Result<Frame<Buf>, InvalidFrame<Buf>> {
        let raw = buffer.as_ref();
        let len = raw.len();
        let (Some(dst), Some(src), Some(ethtype)) = (
            raw.get(0..6),
            raw.get(6..12),
            raw.get(12..ETH_HEADER_LEN),
        ) else {
            return Err(InvalidFrame {
                buffer,
                error: FrameParseError::Runt { len },
            });
        };
        let eth = Eth {
            destination: Mac(dst.try_into().unwrap_or_else(|_| unreachable!())),
            source: Mac(src.try_into().unwrap_or_else(|_| unreachable!())),
            ethtype: EthType::from_be_bytes(ethtype.try_into().unwrap_or_else(|_| unreachable!())),
        };
        Ok(Frame { eth, buffer })
    }

    /// Get the parsed ethernet header of this frame.
    #[must_use]
    pub fn eth(&self) -> &Eth {
        &self.eth
    }

    /// Get a reference to the backing buffer (header included).
    pub fn buffer(&self) -> &Buf {
        &self.buffer
    }

    /// Get the octets following the ethernet header.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[ETH_HEADER_LEN..]
    }

    /// Get the total frame length in octets.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.buffer.as_ref().len()
    }

    /// Unwind the frame back into its buffer.
    pub fn into_buffer(self) -> Buf {
        self.buffer
    }
}

#[cfg(any(doc, test, feature = "test_buffer"))]
pub mod test_utils {
    //! Helpers to build [`Frame`]s over a [`TestBuffer`] in tests.

    use super::{ETH_HEADER_LEN, Frame};
    use crate::buffer::TestBuffer;
    use crate::eth::{EthType, Mac};

    /// Build a small test frame with the given source and destination macs.
    ///
    /// The payload is a fixed 50-octet filler, giving a 64-octet frame.
    #[must_use]
    pub fn build_test_frame(source: Mac, destination: Mac) -> Frame<TestBuffer> {
        let mut data = [0xa5u8; 64];
        data[0..6].copy_from_slice(destination.as_ref());
        data[6..12].copy_from_slice(source.as_ref());
        data[12..ETH_HEADER_LEN].copy_from_slice(&EthType::IPV4.0.to_be_bytes());
        Frame::new(TestBuffer::from_raw_data(&data)).unwrap_or_else(|_| unreachable!())
    }
}
