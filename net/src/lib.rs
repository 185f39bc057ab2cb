// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Minimal packet plumbing for the brick engine.
//!
//! This crate provides the [`Mac`] address type, the [`PacketBuffer`] abstraction over
//! raw packet memory, and the parsed [`Frame`] that bricks move between each other.
//!
//! [`Mac`]: eth::mac::Mac
//! [`PacketBuffer`]: buffer::PacketBuffer
//! [`Frame`]: frame::Frame

#![deny(clippy::all, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod buffer;
pub mod eth;
pub mod frame;
