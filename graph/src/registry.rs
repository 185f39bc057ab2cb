// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Arena storage for bricks and the links between them.

use crate::GraphError;
use brick::{Batch, Brick, Emitter, Side};
use id::Id;
use net::buffer::PacketBuffer;
use ordermap::OrderMap;
use std::any::Any;
use std::collections::VecDeque;
use tracing::trace;

/// A type that represents a handle to a brick held in a [`Registry`].
pub type BrickId<Buf> = Id<Box<dyn Brick<Buf>>>;

/// Maximum number of links a single batch may cross during one propagation.
///
/// Cycles are legal topology; this guard turns a non-terminating one into a
/// [`GraphError::HopLimitExceeded`] instead of unbounded work.
pub const MAX_HOPS: usize = 64;

/// One half of a link, stored on the brick it is attached to.
#[derive(Debug, Clone, Copy)]
struct LinkEnd<Buf: PacketBuffer> {
    peer: BrickId<Buf>,
    peer_side: Side,
    peer_port: usize,
}

/// A brick plus its per-side link slots. Slot count equals the declared capacity.
struct Node<Buf: PacketBuffer> {
    brick: Box<dyn Brick<Buf>>,
    slots: [Vec<Option<LinkEnd<Buf>>>; 2],
}

impl<Buf: PacketBuffer> Node<Buf> {
    fn new(brick: Box<dyn Brick<Buf>>) -> Node<Buf> {
        let slots = [
            vec![None; brick.side_capacity(Side::West)],
            vec![None; brick.side_capacity(Side::East)],
        ];
        Node { brick, slots }
    }

    fn capacity(&self, side: Side) -> usize {
        self.slots[side.index()].len()
    }

    fn free_port(&self, side: Side) -> Option<usize> {
        self.slots[side.index()].iter().position(Option::is_none)
    }

    fn link_count(&self) -> usize {
        self.slots
            .iter()
            .map(|side| side.iter().flatten().count())
            .sum()
    }
}

/// A unit of pending work during batch propagation.
struct Hop<Buf: PacketBuffer> {
    target: BrickId<Buf>,
    side: Side,
    port: usize,
    batch: Batch<Buf>,
    hops: usize,
}

/// Owns every brick of a topology together with the links wired between them.
///
/// Bricks are addressed by stable [`BrickId`] handles; links live on the nodes they
/// connect. The registry is the single owner, so there is no double-ownership or
/// cyclic-reference hazard even for cyclic topologies.
pub struct Registry<Buf: PacketBuffer> {
    nodes: OrderMap<BrickId<Buf>, Node<Buf>>,
}

impl<Buf: PacketBuffer> Default for Registry<Buf> {
    fn default() -> Self {
        Registry::new()
    }
}

impl<Buf: PacketBuffer> Registry<Buf> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Registry<Buf> {
        Registry {
            nodes: OrderMap::new(),
        }
    }

    /// Take ownership of a brick and return its handle.
    pub fn add<B: Brick<Buf> + 'static>(&mut self, brick: B) -> BrickId<Buf> {
        self.add_boxed(Box::new(brick))
    }

    /// Take ownership of an already boxed brick and return its handle.
    pub fn add_boxed(&mut self, brick: Box<dyn Brick<Buf>>) -> BrickId<Buf> {
        let id = BrickId::<Buf>::new();
        trace!("registering brick {} as {id}", brick.name());
        self.nodes.insert(id, Node::new(brick));
        id
    }

    /// Number of bricks held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the registry holds no bricks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when the handle resolves in this registry.
    #[must_use]
    pub fn contains(&self, id: BrickId<Buf>) -> bool {
        self.nodes.contains_key(&id)
    }

    /// The name of the brick behind a handle.
    #[must_use]
    pub fn name(&self, id: BrickId<Buf>) -> Option<&str> {
        self.nodes.get(&id).map(|node| node.brick.name())
    }

    /// True when the brick behind the handle is a source the scheduler must drive.
    #[must_use]
    pub fn is_source(&self, id: BrickId<Buf>) -> bool {
        self.nodes.get(&id).is_some_and(|node| node.brick.is_source())
    }

    /// Handles of all bricks, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = BrickId<Buf>> {
        self.nodes.keys().copied()
    }

    /// Get a brick by handle, downcast to its concrete type.
    #[must_use]
    pub fn brick_ref<T: Brick<Buf>>(&self, id: BrickId<Buf>) -> Option<&T> {
        self.nodes
            .get(&id)
            .and_then(|node| (&*node.brick as &dyn Any).downcast_ref::<T>())
    }

    /// Get a brick by handle, downcast mutably to its concrete type.
    #[must_use]
    pub fn brick_mut<T: Brick<Buf>>(&mut self, id: BrickId<Buf>) -> Option<&mut T> {
        self.nodes
            .get_mut(&id)
            .and_then(|node| (&mut *node.brick as &mut dyn Any).downcast_mut::<T>())
    }

    /// Number of free ports left on a side.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownBrick`] if the handle does not resolve.
    pub fn free_ports(&self, id: BrickId<Buf>, side: Side) -> Result<usize, GraphError> {
        let node = self.node(id)?;
        Ok(node.slots[side.index()]
            .iter()
            .filter(|slot| slot.is_none())
            .count())
    }

    /// Number of active links on a brick, both sides included.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownBrick`] if the handle does not resolve.
    pub fn link_count(&self, id: BrickId<Buf>) -> Result<usize, GraphError> {
        Ok(self.node(id)?.link_count())
    }

    /// The opposite end of the link at a side-port, if the slot is occupied.
    #[must_use]
    pub fn peer(
        &self,
        id: BrickId<Buf>,
        side: Side,
        port: usize,
    ) -> Option<(BrickId<Buf>, Side, usize)> {
        let end = self
            .nodes
            .get(&id)?
            .slots[side.index()]
            .get(port)?
            .as_ref()?;
        Some((end.peer, end.peer_side, end.peer_port))
    }

    /// Every brick directly linked to `id`, on either side.
    #[must_use]
    pub fn peers(&self, id: BrickId<Buf>) -> Vec<BrickId<Buf>> {
        self.nodes
            .get(&id)
            .map(|node| {
                node.slots
                    .iter()
                    .flat_map(|side| side.iter().flatten().map(|end| end.peer))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Wire a link between two bricks.
    ///
    /// Data leaving `a` through `side_a` arrives at `b` on `side_b` and vice versa.
    /// The lowest free port index on each side is assigned; the pair of assigned
    /// ports is returned as `(port on a, port on b)`.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownBrick`] if either handle does not resolve.
    /// - [`GraphError::Configuration`] for a self-link, a same-side link, or a link
    ///   that reverses an existing link between the same pair (contradictory wiring).
    /// - [`GraphError::CapacityExceeded`] if either side has no free port. An
    ///   occupied slot is never overwritten.
    pub fn link(
        &mut self,
        a: BrickId<Buf>,
        side_a: Side,
        b: BrickId<Buf>,
        side_b: Side,
    ) -> Result<(usize, usize), GraphError> {
        if a == b {
            return Err(GraphError::Configuration(
                "cannot link a brick to itself".to_owned(),
            ));
        }
        if side_a == side_b {
            return Err(GraphError::Configuration(format!(
                "ambiguous wiring: both endpoints on the {side_a} side"
            )));
        }
        let node_a = self.node(a)?;
        let node_b = self.node(b)?;
        if node_a.slots[side_b.index()]
            .iter()
            .flatten()
            .any(|end| end.peer == b)
        {
            return Err(GraphError::Configuration(format!(
                "contradictory wiring: {} and {} are already linked in the opposite orientation",
                node_a.brick.name(),
                node_b.brick.name()
            )));
        }
        let port_a = node_a
            .free_port(side_a)
            .ok_or_else(|| GraphError::CapacityExceeded {
                brick: node_a.brick.name().to_owned(),
                side: side_a,
                capacity: node_a.capacity(side_a),
            })?;
        let port_b = node_b
            .free_port(side_b)
            .ok_or_else(|| GraphError::CapacityExceeded {
                brick: node_b.brick.name().to_owned(),
                side: side_b,
                capacity: node_b.capacity(side_b),
            })?;

        self.node_mut(a)?.slots[side_a.index()][port_a] = Some(LinkEnd {
            peer: b,
            peer_side: side_b,
            peer_port: port_b,
        });
        self.node_mut(b)?.slots[side_b.index()][port_b] = Some(LinkEnd {
            peer: a,
            peer_side: side_a,
            peer_port: port_a,
        });
        trace!("linked {side_a}:{port_a} <-> {side_b}:{port_b}");
        Ok((port_a, port_b))
    }

    /// Remove one link from a side: the lowest occupied port.
    ///
    /// Unlinking a side with no links is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownBrick`] if the handle does not resolve.
    pub fn unlink(&mut self, id: BrickId<Buf>, side: Side) -> Result<(), GraphError> {
        let occupied = self.node(id)?.slots[side.index()]
            .iter()
            .position(Option::is_some);
        match occupied {
            Some(port) => self.unlink_port(id, side, port),
            None => Ok(()),
        }
    }

    /// Remove the link at a specific side-port. A vacant slot is a no-op.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownBrick`] if the handle does not resolve.
    /// - [`GraphError::Configuration`] if `port` is beyond the side's capacity.
    pub fn unlink_port(
        &mut self,
        id: BrickId<Buf>,
        side: Side,
        port: usize,
    ) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        let capacity = node.capacity(side);
        let Some(slot) = node.slots[side.index()].get_mut(port) else {
            return Err(GraphError::Configuration(format!(
                "port {port} out of range on {side} side (capacity {capacity})"
            )));
        };
        let Some(end) = slot.take() else {
            return Ok(());
        };
        // vacate the opposite end as well
        if let Ok(peer) = self.node_mut(end.peer) {
            peer.slots[end.peer_side.index()][end.peer_port] = None;
        }
        Ok(())
    }

    /// Detach every link of a brick, vacating all peer slots.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownBrick`] if the handle does not resolve.
    pub fn unlink_all(&mut self, id: BrickId<Buf>) -> Result<(), GraphError> {
        for side in Side::BOTH {
            let occupied: Vec<usize> = self.node(id)?.slots[side.index()]
                .iter()
                .enumerate()
                .filter_map(|(port, slot)| slot.as_ref().map(|_| port))
                .collect();
            for port in occupied {
                self.unlink_port(id, side, port)?;
            }
        }
        Ok(())
    }

    /// Release a brick under the manual-unlink policy.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownBrick`] if the handle does not resolve.
    /// - [`GraphError::StillLinked`] while any link remains; callers must unlink
    ///   first (or use [`Registry::detach`]).
    pub fn remove(&mut self, id: BrickId<Buf>) -> Result<Box<dyn Brick<Buf>>, GraphError> {
        let node = self.node(id)?;
        let links = node.link_count();
        if links > 0 {
            return Err(GraphError::StillLinked {
                brick: node.brick.name().to_owned(),
                links,
            });
        }
        self.nodes
            .remove(&id)
            .map(|node| node.brick)
            .ok_or_else(|| GraphError::UnknownBrick(id.into_raw()))
    }

    /// Release a brick under the auto-unlink policy: detach every link, then remove.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownBrick`] if the handle does not resolve.
    pub fn detach(&mut self, id: BrickId<Buf>) -> Result<Box<dyn Brick<Buf>>, GraphError> {
        self.unlink_all(id)?;
        self.remove(id)
    }

    /// Drive a source brick once: pull one batch and propagate it to termination.
    ///
    /// Returns the number of frames pulled.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownBrick`] if the handle does not resolve.
    /// - [`GraphError::Propagation`] if the pull or any downstream receive fails.
    /// - [`GraphError::HopLimitExceeded`] if the batch crosses more than
    ///   [`MAX_HOPS`] links.
    pub fn drive(&mut self, id: BrickId<Buf>) -> Result<usize, GraphError> {
        let mut tx = Emitter::new();
        let node = self.node_mut(id)?;
        let name = node.brick.name().to_owned();
        let pulled = node
            .brick
            .pull(&mut tx)
            .map_err(|source| GraphError::Propagation {
                brick: name,
                source,
            })?;
        self.propagate(id, &mut tx)?;
        Ok(pulled)
    }

    /// Hand a batch to a brick directly and propagate the result to termination.
    ///
    /// This is the entry point terminal adapters (and tests) use to push frames
    /// into the topology outside of a poll.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Registry::drive`].
    pub fn inject(
        &mut self,
        id: BrickId<Buf>,
        side: Side,
        port: usize,
        batch: Batch<Buf>,
    ) -> Result<(), GraphError> {
        let mut tx = Emitter::new();
        let node = self.node_mut(id)?;
        let name = node.brick.name().to_owned();
        node.brick
            .receive(side, port, batch, &mut tx)
            .map_err(|source| GraphError::Propagation {
                brick: name,
                source,
            })?;
        self.propagate(id, &mut tx)
    }

    /// Work-list propagation of everything `from` emitted.
    ///
    /// Each emission is routed along the link at the emitting side-port; emissions
    /// into unlinked slots are dropped. Receives happen in breadth order; per-link
    /// batch order is preserved.
    fn propagate(&mut self, from: BrickId<Buf>, tx: &mut Emitter<Buf>) -> Result<(), GraphError> {
        let mut work: VecDeque<Hop<Buf>> = VecDeque::new();
        self.route(from, tx, 0, &mut work);
        while let Some(hop) = work.pop_front() {
            if hop.hops >= MAX_HOPS {
                return Err(GraphError::HopLimitExceeded { hops: hop.hops });
            }
            let node = self.node_mut(hop.target)?;
            let name = node.brick.name().to_owned();
            node.brick
                .receive(hop.side, hop.port, hop.batch, tx)
                .map_err(|source| GraphError::Propagation {
                    brick: name,
                    source,
                })?;
            self.route(hop.target, tx, hop.hops + 1, &mut work);
        }
        Ok(())
    }

    /// Map the emissions of `from` onto its links and queue the resulting hops.
    fn route(
        &self,
        from: BrickId<Buf>,
        tx: &mut Emitter<Buf>,
        hops: usize,
        work: &mut VecDeque<Hop<Buf>>,
    ) {
        for emission in tx.take() {
            match self.peer(from, emission.side, emission.port) {
                Some((target, side, port)) => work.push_back(Hop {
                    target,
                    side,
                    port,
                    batch: emission.batch,
                    hops,
                }),
                None => {
                    trace!(
                        "dropping {} frames emitted on unlinked port {}:{}",
                        emission.batch.len(),
                        emission.side,
                        emission.port
                    );
                }
            }
        }
    }

    fn node(&self, id: BrickId<Buf>) -> Result<&Node<Buf>, GraphError> {
        self.nodes
            .get(&id)
            .ok_or_else(|| GraphError::UnknownBrick(id.into_raw()))
    }

    fn node_mut(&mut self, id: BrickId<Buf>) -> Result<&mut Node<Buf>, GraphError> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| GraphError::UnknownBrick(id.into_raw()))
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod test {
    use crate::{GraphError, Registry};
    use brick::sample_bricks::{Collector, Feeder, Tap};
    use brick::{Batch, Side};
    use net::buffer::TestBuffer;
    use net::eth::Mac;
    use net::frame::test_utils::build_test_frame;

    fn batch_of(n: usize) -> Batch<TestBuffer> {
        let mut batch = Batch::new();
        for _ in 0..n {
            batch
                .push(build_test_frame(
                    Mac([2, 0, 0, 0, 0, 1]),
                    Mac([2, 0, 0, 0, 0, 2]),
                ))
                .unwrap();
        }
        batch
    }

    #[test]
    fn link_then_unlink_restores_capacity() {
        let mut registry: Registry<TestBuffer> = Registry::new();
        let feeder = registry.add(Feeder::new("feeder0"));
        let tap = registry.add(Tap::new("tap0"));

        assert_eq!(registry.free_ports(feeder, Side::East).unwrap(), 1);
        let (port_a, port_b) = registry.link(feeder, Side::East, tap, Side::West).unwrap();
        assert_eq!((port_a, port_b), (0, 0));
        assert_eq!(registry.free_ports(feeder, Side::East).unwrap(), 0);
        assert_eq!(registry.free_ports(tap, Side::West).unwrap(), 0);

        registry.unlink(feeder, Side::East).unwrap();
        assert_eq!(registry.free_ports(feeder, Side::East).unwrap(), 1);
        // the peer's slot is vacated too
        assert_eq!(registry.free_ports(tap, Side::West).unwrap(), 1);
        // unlinking an already-unlinked side is a no-op
        registry.unlink(feeder, Side::East).unwrap();
    }

    #[test]
    fn double_link_on_full_side_fails() {
        let mut registry: Registry<TestBuffer> = Registry::new();
        let feeder = registry.add(Feeder::new("feeder0"));
        let tap_a = registry.add(Tap::new("tap0"));
        let tap_b = registry.add(Tap::new("tap1"));

        registry.link(feeder, Side::East, tap_a, Side::West).unwrap();
        let err = registry
            .link(feeder, Side::East, tap_b, Side::West)
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::CapacityExceeded {
                side: Side::East,
                capacity: 1,
                ..
            }
        ));
        // the original link is untouched
        assert_eq!(
            registry.peer(feeder, Side::East, 0).map(|(id, _, _)| id),
            Some(tap_a)
        );
    }

    #[test]
    fn self_and_same_side_links_are_rejected() {
        let mut registry: Registry<TestBuffer> = Registry::new();
        let tap_a = registry.add(Tap::new("tap0"));
        let tap_b = registry.add(Tap::new("tap1"));

        assert!(matches!(
            registry.link(tap_a, Side::East, tap_a, Side::West),
            Err(GraphError::Configuration(_))
        ));
        assert!(matches!(
            registry.link(tap_a, Side::East, tap_b, Side::East),
            Err(GraphError::Configuration(_))
        ));
    }

    #[test]
    fn reverse_orientation_relink_is_rejected() {
        let mut registry: Registry<TestBuffer> = Registry::new();
        let tap_a = registry.add(Tap::new("tap0"));
        let tap_b = registry.add(Tap::new("tap1"));

        registry.link(tap_a, Side::East, tap_b, Side::West).unwrap();
        assert!(matches!(
            registry.link(tap_a, Side::West, tap_b, Side::East),
            Err(GraphError::Configuration(_))
        ));
        assert!(matches!(
            registry.link(tap_b, Side::East, tap_a, Side::West),
            Err(GraphError::Configuration(_))
        ));
    }

    #[test]
    fn remove_enforces_manual_unlink_policy() {
        let mut registry: Registry<TestBuffer> = Registry::new();
        let feeder = registry.add(Feeder::new("feeder0"));
        let tap = registry.add(Tap::new("tap0"));
        registry.link(feeder, Side::East, tap, Side::West).unwrap();

        let err = registry.remove(tap).unwrap_err();
        assert!(matches!(err, GraphError::StillLinked { links: 1, .. }));
        assert!(registry.contains(tap));

        registry.unlink(tap, Side::West).unwrap();
        let brick = registry.remove(tap).unwrap();
        assert_eq!(brick.name(), "tap0");
        assert!(!registry.contains(tap));
    }

    #[test]
    fn detach_vacates_peer_sides() {
        let mut registry: Registry<TestBuffer> = Registry::new();
        let feeder = registry.add(Feeder::new("feeder0"));
        let tap = registry.add(Tap::new("tap0"));
        let collector = registry.add(Collector::new("collector0"));
        registry.link(feeder, Side::East, tap, Side::West).unwrap();
        registry
            .link(tap, Side::East, collector, Side::West)
            .unwrap();

        registry.detach(tap).unwrap();
        assert!(!registry.contains(tap));
        assert_eq!(registry.free_ports(feeder, Side::East).unwrap(), 1);
        assert_eq!(registry.free_ports(collector, Side::West).unwrap(), 1);
    }

    #[test]
    fn inject_propagates_through_a_chain() {
        let mut registry: Registry<TestBuffer> = Registry::new();
        let tap_a = registry.add(Tap::new("tap0"));
        let tap_b = registry.add(Tap::new("tap1"));
        let collector = registry.add(Collector::new("collector0"));
        registry.link(tap_a, Side::East, tap_b, Side::West).unwrap();
        registry
            .link(tap_b, Side::East, collector, Side::West)
            .unwrap();

        registry
            .inject(tap_a, Side::West, 0, batch_of(4))
            .unwrap();
        let collector = registry.brick_ref::<Collector<TestBuffer>>(collector).unwrap();
        assert_eq!(collector.frame_count(), 4);
    }

    #[test]
    fn emission_into_unlinked_port_is_dropped() {
        let mut registry: Registry<TestBuffer> = Registry::new();
        let tap = registry.add(Tap::new("tap0"));
        // tap forwards east, but nothing is linked there
        registry.inject(tap, Side::West, 0, batch_of(2)).unwrap();
        let tap = registry.brick_ref::<Tap>(tap).unwrap();
        assert_eq!(tap.count(), 2);
    }

    #[test]
    fn cyclic_topology_trips_the_hop_guard() {
        let mut registry: Registry<TestBuffer> = Registry::new();
        let tap_a = registry.add(Tap::new("tap0"));
        let tap_b = registry.add(Tap::new("tap1"));
        let tap_c = registry.add(Tap::new("tap2"));
        // a ring: batches circulate west-to-east forever
        registry.link(tap_a, Side::East, tap_b, Side::West).unwrap();
        registry.link(tap_b, Side::East, tap_c, Side::West).unwrap();
        registry.link(tap_c, Side::East, tap_a, Side::West).unwrap();

        let err = registry
            .inject(tap_a, Side::West, 0, batch_of(1))
            .unwrap_err();
        assert!(matches!(err, GraphError::HopLimitExceeded { .. }));
    }

    #[test]
    fn unlink_port_out_of_range_is_a_configuration_error() {
        let mut registry: Registry<TestBuffer> = Registry::new();
        let tap = registry.add(Tap::new("tap0"));
        assert!(matches!(
            registry.unlink_port(tap, Side::West, 5),
            Err(GraphError::Configuration(_))
        ));
        // in-range vacant slot is a no-op
        registry.unlink_port(tap, Side::West, 0).unwrap();
    }
}
