// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! # Brick Graph and Poll Scheduler
//!
//! This crate wires bricks into a topology and drives it:
//!
//! - [`Registry`]: the arena that owns every brick and the links between them.
//!   Handles ([`BrickId`]) stay valid for the life of the registry, so link
//!   endpoints never dangle. Batch propagation runs as an explicit work-list with
//!   a hop guard, never as unbounded call-stack recursion.
//! - [`Graph`]: a named index over a registry. It discovers connected bricks by
//!   name ([`Graph::explore`]), looks them up ([`Graph::get`]), and drives every
//!   source brick once per [`Graph::poll`].
//!
//! Topology mutation (link, unlink, remove) happens between polls; a poll itself
//! never changes the wiring.

#![deny(clippy::all, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod graph;
mod registry;

pub use graph::Graph;
pub use registry::{BrickId, MAX_HOPS, Registry};

use brick::{BrickError, Side};
use uuid::Uuid;

/// The errors produced by graph and registry operations.
///
/// Every fallible operation in this crate returns one of these; nothing is
/// reported through global state and nothing aborts the process.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Invalid name, side, or wiring at construction or linking.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A side has no free port left.
    #[error("no free port on {side} side of brick {brick} (capacity {capacity})")]
    CapacityExceeded {
        /// The brick whose side is full.
        brick: String,
        /// The full side.
        side: Side,
        /// The side's configured capacity.
        capacity: usize,
    },
    /// Name lookup miss.
    #[error("no brick named {0}")]
    NotFound(String),
    /// Destroy attempted on a brick with active links (manual-unlink policy).
    #[error("brick {brick} still has {links} active links")]
    StillLinked {
        /// The still-linked brick.
        brick: String,
        /// How many links remain.
        links: usize,
    },
    /// A handle that does not (or no longer does) resolve in this registry.
    #[error("unknown brick handle {0}")]
    UnknownBrick(Uuid),
    /// A batch crossed more links than the guard allows; the topology is likely cyclic.
    #[error("propagation exceeded {hops} hops, topology is likely cyclic")]
    HopLimitExceeded {
        /// Hop count at which propagation was aborted.
        hops: usize,
    },
    /// A downstream brick's receive failed mid-batch.
    #[error("propagation failed in brick {brick}")]
    Propagation {
        /// The failing brick.
        brick: String,
        /// The brick-level failure.
        #[source]
        source: BrickError,
    },
}
