// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The two connection faces of a brick.

use std::fmt::Display;

/// One of the two named connection faces of a brick.
///
/// Every brick exposes a west and an east face, each with an independently
/// configured port capacity. Data received on one face is conventionally emitted
/// through the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// The west face.
    West,
    /// The east face.
    East,
}

impl Side {
    /// Both sides, west first.
    pub const BOTH: [Side; 2] = [Side::West, Side::East];

    /// The opposite face.
    #[must_use]
    pub fn flip(self) -> Side {
        match self {
            Side::West => Side::East,
            Side::East => Side::West,
        }
    }

    /// Stable index of the side (west = 0, east = 1), used for per-side slot arrays.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Side::West => 0,
            Side::East => 1,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::West => write!(f, "west"),
            Side::East => write!(f, "east"),
        }
    }
}
