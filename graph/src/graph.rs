// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Named index over a registry, exploration, and the poll scheduler.

use crate::registry::{BrickId, Registry};
use crate::GraphError;
use brick::Brick;
use net::buffer::PacketBuffer;
use ordermap::OrderMap;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, trace};

/// A named, indexed collection of interlinked bricks plus the poll entry point.
///
/// The graph owns the [`Registry`] and keeps a name-to-handle index over the
/// bricks that have been discovered in it. Indexing is by exploration
/// ([`Graph::explore`]): linking alone does not register a brick under its name.
pub struct Graph<Buf: PacketBuffer> {
    name: String,
    registry: Registry<Buf>,
    index: OrderMap<String, BrickId<Buf>>,
}

impl<Buf: PacketBuffer> Graph<Buf> {
    /// Create a graph over a registry, rooted at an existing brick.
    ///
    /// The root is indexed under its brick name immediately.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownBrick`] if `root` does not resolve in `registry`.
    pub fn new(
        name: &str,
        registry: Registry<Buf>,
        root: BrickId<Buf>,
    ) -> Result<Graph<Buf>, GraphError> {
        let root_name = registry
            .name(root)
            .ok_or_else(|| GraphError::UnknownBrick(root.into_raw()))?
            .to_owned();
        let mut index = OrderMap::new();
        index.insert(root_name, root);
        Ok(Graph {
            name: name.to_owned(),
            registry,
            index,
        })
    }

    /// The graph's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &Registry<Buf> {
        &self.registry
    }

    /// The underlying registry, mutably (topology mutation between polls).
    pub fn registry_mut(&mut self) -> &mut Registry<Buf> {
        &mut self.registry
    }

    /// Number of indexed bricks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no brick is indexed. Never true in practice: the root is indexed
    /// at construction and stays until destruction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Look up an indexed brick's handle by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<BrickId<Buf>> {
        self.index.get(name).copied()
    }

    /// Look up an indexed brick by name, downcast to its concrete type.
    #[must_use]
    pub fn brick_ref<T: Brick<Buf>>(&self, name: &str) -> Option<&T> {
        self.registry.brick_ref(self.get(name)?)
    }

    /// Look up an indexed brick by name, downcast mutably to its concrete type.
    #[must_use]
    pub fn brick_mut<T: Brick<Buf>>(&mut self, name: &str) -> Option<&mut T> {
        let id = self.get(name)?;
        self.registry.brick_mut(id)
    }

    /// Discover and index bricks reachable over existing links.
    ///
    /// Runs a breadth-first traversal from the brick named `start`, or from every
    /// currently indexed brick when `start` is `None`, and registers each newly
    /// reached brick under its name. Exploration follows links only; it never
    /// creates them. Re-exploring is idempotent.
    ///
    /// Returns the number of newly indexed bricks.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NotFound`] if `start` names no indexed brick.
    /// - [`GraphError::Configuration`] if two distinct bricks carry the same name.
    pub fn explore(&mut self, start: Option<&str>) -> Result<usize, GraphError> {
        let seeds: Vec<BrickId<Buf>> = match start {
            Some(name) => vec![
                self.get(name)
                    .ok_or_else(|| GraphError::NotFound(name.to_owned()))?,
            ],
            None => self.index.values().copied().collect(),
        };
        let mut visited: HashSet<BrickId<Buf>> = seeds.iter().copied().collect();
        let mut queue: VecDeque<BrickId<Buf>> = seeds.into();
        let mut discovered = 0;

        while let Some(id) = queue.pop_front() {
            for peer in self.registry.peers(id) {
                if !visited.insert(peer) {
                    continue;
                }
                let peer_name = self
                    .registry
                    .name(peer)
                    .ok_or_else(|| GraphError::UnknownBrick(peer.into_raw()))?
                    .to_owned();
                match self.index.get(&peer_name) {
                    Some(existing) if *existing != peer => {
                        return Err(GraphError::Configuration(format!(
                            "duplicate brick name {peer_name} discovered during exploration"
                        )));
                    }
                    Some(_) => {}
                    None => {
                        trace!("indexed brick {peer_name}");
                        self.index.insert(peer_name, peer);
                        discovered += 1;
                    }
                }
                queue.push_back(peer);
            }
        }
        debug!(
            "explored graph {}: {} new bricks, {} indexed",
            self.name,
            discovered,
            self.index.len()
        );
        Ok(discovered)
    }

    /// One bounded unit of work across the whole topology.
    ///
    /// Drives every indexed source brick once, in index order, propagating each
    /// pulled batch to termination. A graph with zero sources polls successfully
    /// as a no-op. Returns the total number of frames pulled in.
    ///
    /// # Errors
    ///
    /// The first failure aborts the poll and is returned; batches dispatched
    /// earlier in the same call stay delivered, and the topology is left intact
    /// for the next poll.
    pub fn poll(&mut self) -> Result<usize, GraphError> {
        let sources: Vec<BrickId<Buf>> = self
            .index
            .values()
            .copied()
            .filter(|id| self.registry.is_source(*id))
            .collect();
        let mut pulled = 0;
        for id in sources {
            pulled += self.registry.drive(id)?;
        }
        Ok(pulled)
    }

    /// Tear the graph down, releasing indexed bricks in reverse insertion order.
    ///
    /// Links are detached as each brick is released (auto-unlink policy), so the
    /// order never trips over still-wired peers.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownBrick`] if the index references a brick the
    /// registry no longer holds (possible only after direct registry mutation).
    pub fn destroy(mut self) -> Result<(), GraphError> {
        while let Some((name, id)) = self.index.pop() {
            trace!("releasing brick {name}");
            self.registry.detach(id)?;
        }
        Ok(())
    }
}
