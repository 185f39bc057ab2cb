// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! # Learning Switch Brick
//!
//! An N-to-M forwarding brick with source-address learning. On every received
//! frame the switch records the source mac against the ingress side-port
//! (overwrite-on-move, so a station that migrates is re-learned silently), then
//! forwards by destination: known unicast goes to exactly the learned port,
//! anything unknown, broadcast, or multicast is flooded according to the
//! configured [`FloodPolicy`], never back out the ingress port.
//!
//! Ports can be disabled ("gated") and re-enabled at runtime to support hot
//! add/remove of attached adapters without rebuilding the topology.

#![deny(clippy::all, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use ahash::AHashMap;
use brick::{Batch, Brick, BrickError, Emitter, Side};
use net::buffer::PacketBuffer;
use net::eth::Mac;
use tracing::trace;

/// Upper bound on the number of learned addresses.
///
/// Once full, unknown source addresses are no longer learned (and keep being
/// flooded); already-known addresses keep refreshing. There is no age-out.
pub const TABLE_CAPACITY: usize = 1024;

/// A side-port pair on the switch itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchPort {
    /// The side the port belongs to.
    pub side: Side,
    /// Port index within the side.
    pub port: usize,
}

impl std::fmt::Display for SwitchPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.side, self.port)
    }
}

/// Where frames without a known unicast destination are replicated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloodPolicy {
    /// Every enabled port on both sides except the ingress port.
    #[default]
    AllPorts,
    /// Every enabled port on the side opposite the ingress port.
    OppositeSide,
}

#[derive(Debug, Clone, Copy)]
struct Port {
    enabled: bool,
}

/// A learning switch with asymmetric west/east port counts.
pub struct Switch {
    name: String,
    ports: [Vec<Port>; 2],
    table: AHashMap<Mac, SwitchPort>,
    flood_policy: FloodPolicy,
}

impl Switch {
    /// Create a switch with `west` ports on the west side and `east` on the east.
    ///
    /// # Errors
    ///
    /// Returns [`BrickError::Configuration`] when both sides are sized zero.
    pub fn new(name: &str, west: usize, east: usize) -> Result<Switch, BrickError> {
        if west + east == 0 {
            return Err(BrickError::Configuration(format!(
                "switch {name} needs at least one port"
            )));
        }
        Ok(Switch {
            name: name.to_owned(),
            ports: [
                vec![Port { enabled: true }; west],
                vec![Port { enabled: true }; east],
            ],
            table: AHashMap::new(),
            flood_policy: FloodPolicy::default(),
        })
    }

    /// Replace the flood policy.
    #[must_use]
    pub fn with_flood_policy(mut self, policy: FloodPolicy) -> Switch {
        self.flood_policy = policy;
        self
    }

    /// Gate the switch: on each side, ports at index `gate` and above start
    /// disabled until explicitly enabled. Supports hot-add of adapters: size the
    /// side for the eventual maximum and open ports as they come up.
    #[must_use]
    pub fn with_gate(mut self, gate: usize) -> Switch {
        for side in &mut self.ports {
            for port in side.iter_mut().skip(gate) {
                port.enabled = false;
            }
        }
        self
    }

    /// Enable a gated port.
    ///
    /// # Errors
    ///
    /// Returns [`BrickError::Configuration`] if the port does not exist.
    pub fn enable_port(&mut self, side: Side, port: usize) -> Result<(), BrickError> {
        self.set_port_enabled(side, port, true)
    }

    /// Disable a port. Frames arriving on it are dropped unlearned; it is skipped
    /// by flooding, and a learned destination behind it is flooded as unknown.
    ///
    /// # Errors
    ///
    /// Returns [`BrickError::Configuration`] if the port does not exist.
    pub fn disable_port(&mut self, side: Side, port: usize) -> Result<(), BrickError> {
        self.set_port_enabled(side, port, false)
    }

    /// Whether a port is currently enabled, or `None` if it does not exist.
    #[must_use]
    pub fn port_enabled(&self, side: Side, port: usize) -> Option<bool> {
        self.ports[side.index()].get(port).map(|p| p.enabled)
    }

    /// Number of learned addresses.
    #[must_use]
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// The port a mac was last learned on, if any.
    #[must_use]
    pub fn lookup(&self, mac: Mac) -> Option<SwitchPort> {
        self.table.get(&mac).copied()
    }

    fn set_port_enabled(
        &mut self,
        side: Side,
        port: usize,
        enabled: bool,
    ) -> Result<(), BrickError> {
        let capacity = self.ports[side.index()].len();
        match self.ports[side.index()].get_mut(port) {
            Some(p) => {
                p.enabled = enabled;
                Ok(())
            }
            None => Err(BrickError::Configuration(format!(
                "switch {} has no port {port} on its {side} side (capacity {capacity})",
                self.name
            ))),
        }
    }

    fn learn(&mut self, mac: Mac, at: SwitchPort) {
        if self.table.len() >= TABLE_CAPACITY && !self.table.contains_key(&mac) {
            trace!("{}: table full, not learning {mac}", self.name);
            return;
        }
        self.table.insert(mac, at);
    }

    /// The ports an unknown/broadcast frame received on `ingress` replicates to.
    fn flood_targets(&self, ingress: SwitchPort) -> Vec<SwitchPort> {
        let sides: &[Side] = match self.flood_policy {
            FloodPolicy::AllPorts => &Side::BOTH,
            FloodPolicy::OppositeSide => &[ingress.side.flip()],
        };
        let mut targets = Vec::new();
        for &side in sides {
            for (port, state) in self.ports[side.index()].iter().enumerate() {
                let target = SwitchPort { side, port };
                if state.enabled && target != ingress {
                    targets.push(target);
                }
            }
        }
        targets
    }
}

impl<Buf: PacketBuffer> Brick<Buf> for Switch {
    fn name(&self) -> &str {
        &self.name
    }

    fn side_capacity(&self, side: Side) -> usize {
        self.ports[side.index()].len()
    }

    fn receive(
        &mut self,
        side: Side,
        port: usize,
        batch: Batch<Buf>,
        tx: &mut Emitter<Buf>,
    ) -> Result<(), BrickError> {
        match self.port_enabled(side, port) {
            Some(true) => {}
            Some(false) => {
                trace!(
                    "{name}: dropping {count} frames on disabled port {side}:{port}",
                    name = self.name,
                    count = batch.len()
                );
                return Ok(());
            }
            None => {
                return Err(BrickError::Receive {
                    brick: self.name.clone(),
                    reason: format!("batch arrived on nonexistent port {side}:{port}"),
                });
            }
        }

        let ingress = SwitchPort { side, port };
        let flood = self.flood_targets(ingress);
        let mut egress: [Vec<Option<Batch<Buf>>>; 2] = [
            (0..self.ports[0].len()).map(|_| None).collect(),
            (0..self.ports[1].len()).map(|_| None).collect(),
        ];
        let name = self.name.clone();
        let mut queue = |target: SwitchPort, frame| -> Result<(), BrickError> {
            egress[target.side.index()][target.port]
                .get_or_insert_with(Batch::new)
                .push(frame)
                .map_err(|_| BrickError::Receive {
                    brick: name.clone(),
                    reason: format!("egress burst overflow on {target}"),
                })
        };

        for frame in batch {
            let src = frame.eth().source();
            if src.valid_src().is_ok() {
                self.learn(src, ingress);
            }

            let dst = frame.eth().destination();
            let learned = if dst.is_unicast() {
                self.lookup(dst)
            } else {
                None
            };
            match learned {
                // known station on the segment it came from: filter
                Some(at) if at == ingress => {
                    trace!("{}: filtering frame to {dst} on its own port", self.name);
                }
                Some(at) if self.port_enabled(at.side, at.port) == Some(true) => {
                    queue(at, frame)?;
                }
                // unknown, non-unicast, or learned behind a disabled port: flood
                _ => {
                    for &target in &flood {
                        queue(target, frame.clone())?;
                    }
                }
            }
        }

        for side in Side::BOTH {
            for port in 0..self.ports[side.index()].len() {
                if let Some(out) = egress[side.index()][port].take() {
                    tx.emit(side, port, out);
                }
            }
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod test {
    use super::{FloodPolicy, Switch, SwitchPort, TABLE_CAPACITY};
    use brick::{Batch, Brick, BrickError, Emission, Emitter, Side};
    use net::buffer::TestBuffer;
    use net::eth::Mac;
    use net::frame::test_utils::build_test_frame;

    fn mac(last: u8) -> Mac {
        Mac([0x02, 0, 0, 0, 0, last])
    }

    fn at(side: Side, port: usize) -> SwitchPort {
        SwitchPort { side, port }
    }

    /// Deliver one frame and return the resulting emissions.
    fn deliver(
        sw: &mut Switch,
        ingress: SwitchPort,
        src: Mac,
        dst: Mac,
    ) -> Vec<Emission<TestBuffer>> {
        let mut batch = Batch::new();
        batch.push(build_test_frame(src, dst)).unwrap();
        let mut tx = Emitter::new();
        sw.receive(ingress.side, ingress.port, batch, &mut tx)
            .unwrap();
        tx.take()
    }

    fn targets(emissions: &[Emission<TestBuffer>]) -> Vec<SwitchPort> {
        emissions
            .iter()
            .map(|e| at(e.side, e.port))
            .collect()
    }

    #[test]
    fn zero_ports_is_a_configuration_error() {
        assert!(matches!(
            Switch::new("sw", 0, 0),
            Err(BrickError::Configuration(_))
        ));
        assert!(Switch::new("sw", 2, 0).is_ok());
    }

    #[test]
    fn unknown_destinations_are_flooded_and_sources_learned() {
        let mut sw = Switch::new("sw", 2, 1).unwrap();
        let emissions = deliver(&mut sw, at(Side::West, 0), mac(0xaa), mac(0xbb));
        // flooded everywhere but the ingress port
        assert_eq!(
            targets(&emissions),
            vec![at(Side::West, 1), at(Side::East, 0)]
        );
        assert_eq!(sw.table_len(), 1);
        assert_eq!(sw.lookup(mac(0xaa)), Some(at(Side::West, 0)));
    }

    #[test]
    fn known_destinations_are_forwarded_to_one_port() {
        let mut sw = Switch::new("sw", 2, 1).unwrap();
        deliver(&mut sw, at(Side::West, 0), mac(0xaa), Mac::BROADCAST);

        let emissions = deliver(&mut sw, at(Side::East, 0), mac(0xbb), mac(0xaa));
        assert_eq!(targets(&emissions), vec![at(Side::West, 0)]);
        assert_eq!(emissions[0].batch.len(), 1);
        // the reply's source was learned too
        assert_eq!(sw.lookup(mac(0xbb)), Some(at(Side::East, 0)));
    }

    #[test]
    fn frames_to_their_own_segment_are_filtered() {
        let mut sw = Switch::new("sw", 2, 1).unwrap();
        deliver(&mut sw, at(Side::West, 0), mac(0xaa), Mac::BROADCAST);

        // another station behind the same port talks to it: nothing to forward
        let emissions = deliver(&mut sw, at(Side::West, 0), mac(0xcc), mac(0xaa));
        assert!(emissions.is_empty());
        assert_eq!(sw.lookup(mac(0xcc)), Some(at(Side::West, 0)));
    }

    #[test]
    fn broadcast_and_multicast_always_flood() {
        let mut sw = Switch::new("sw", 2, 2).unwrap();
        let emissions = deliver(&mut sw, at(Side::East, 1), mac(0xaa), Mac::BROADCAST);
        assert_eq!(
            targets(&emissions),
            vec![at(Side::West, 0), at(Side::West, 1), at(Side::East, 0)]
        );

        let multicast = Mac([0x01, 0, 0x5e, 0, 0, 1]);
        let emissions = deliver(&mut sw, at(Side::East, 1), mac(0xaa), multicast);
        assert_eq!(emissions.len(), 3);
    }

    #[test]
    fn two_port_single_sided_segment() {
        let mut sw = Switch::new("sw", 2, 0).unwrap();
        // 0xaa announces itself from west:0
        deliver(&mut sw, at(Side::West, 0), mac(0xaa), Mac::BROADCAST);
        assert_eq!(sw.lookup(mac(0xaa)), Some(at(Side::West, 0)));

        // traffic to it from west:1 goes to west:0 only
        let emissions = deliver(&mut sw, at(Side::West, 1), mac(0xdd), mac(0xaa));
        assert_eq!(targets(&emissions), vec![at(Side::West, 0)]);

        // unknown 0xbb from west:1 floods, which here is also just west:0
        let emissions = deliver(&mut sw, at(Side::West, 1), mac(0xdd), mac(0xbb));
        assert_eq!(targets(&emissions), vec![at(Side::West, 0)]);
    }

    #[test]
    fn invalid_sources_are_not_learned() {
        let mut sw = Switch::new("sw", 2, 0).unwrap();
        deliver(&mut sw, at(Side::West, 0), Mac::BROADCAST, mac(0xbb));
        deliver(&mut sw, at(Side::West, 0), Mac::ZERO, mac(0xbb));
        let multicast_src = Mac([0x01, 0, 0x5e, 0, 0, 1]);
        deliver(&mut sw, at(Side::West, 0), multicast_src, mac(0xbb));
        assert_eq!(sw.table_len(), 0);
    }

    #[test]
    fn a_station_that_moves_is_relearned() {
        let mut sw = Switch::new("sw", 2, 1).unwrap();
        deliver(&mut sw, at(Side::West, 0), mac(0xaa), Mac::BROADCAST);
        assert_eq!(sw.lookup(mac(0xaa)), Some(at(Side::West, 0)));

        deliver(&mut sw, at(Side::East, 0), mac(0xaa), Mac::BROADCAST);
        assert_eq!(sw.lookup(mac(0xaa)), Some(at(Side::East, 0)));
        assert_eq!(sw.table_len(), 1);
    }

    #[test]
    fn opposite_side_policy_floods_one_side_only() {
        let mut sw = Switch::new("sw", 2, 2)
            .unwrap()
            .with_flood_policy(FloodPolicy::OppositeSide);
        let emissions = deliver(&mut sw, at(Side::West, 0), mac(0xaa), mac(0xbb));
        assert_eq!(
            targets(&emissions),
            vec![at(Side::East, 0), at(Side::East, 1)]
        );
    }

    #[test]
    fn gated_ports_stay_out_of_the_flood_until_enabled() {
        let mut sw = Switch::new("sw", 3, 0).unwrap().with_gate(2);
        assert_eq!(sw.port_enabled(Side::West, 1), Some(true));
        assert_eq!(sw.port_enabled(Side::West, 2), Some(false));

        let emissions = deliver(&mut sw, at(Side::West, 0), mac(0xaa), Mac::BROADCAST);
        assert_eq!(targets(&emissions), vec![at(Side::West, 1)]);

        sw.enable_port(Side::West, 2).unwrap();
        let emissions = deliver(&mut sw, at(Side::West, 0), mac(0xaa), Mac::BROADCAST);
        assert_eq!(
            targets(&emissions),
            vec![at(Side::West, 1), at(Side::West, 2)]
        );
    }

    #[test]
    fn frames_on_a_disabled_port_are_dropped_unlearned() {
        let mut sw = Switch::new("sw", 3, 0).unwrap().with_gate(2);
        let emissions = deliver(&mut sw, at(Side::West, 2), mac(0xaa), Mac::BROADCAST);
        assert!(emissions.is_empty());
        assert_eq!(sw.table_len(), 0);
    }

    #[test]
    fn destinations_behind_a_disabled_port_are_flooded() {
        let mut sw = Switch::new("sw", 2, 1).unwrap();
        deliver(&mut sw, at(Side::West, 1), mac(0xaa), Mac::BROADCAST);
        sw.disable_port(Side::West, 1).unwrap();

        let emissions = deliver(&mut sw, at(Side::West, 0), mac(0xbb), mac(0xaa));
        assert_eq!(targets(&emissions), vec![at(Side::East, 0)]);
    }

    #[test]
    fn port_toggles_validate_the_port() {
        let mut sw = Switch::new("sw", 1, 0).unwrap();
        assert!(matches!(
            sw.enable_port(Side::East, 0),
            Err(BrickError::Configuration(_))
        ));
        assert!(matches!(
            sw.disable_port(Side::West, 7),
            Err(BrickError::Configuration(_))
        ));
        assert!(sw.port_enabled(Side::East, 0).is_none());
    }

    #[test]
    fn a_full_table_stops_learning_but_keeps_refreshing() {
        let mut sw = Switch::new("sw", 1, 1).unwrap();
        let station = |i: usize| Mac([0x02, 0, 0, (i >> 8) as u8, (i & 0xff) as u8, 9]);

        let mut pending: Vec<Mac> = (0..TABLE_CAPACITY).map(station).collect();
        while !pending.is_empty() {
            let mut batch = Batch::new();
            for src in pending.drain(..pending.len().min(brick::MAX_BURST)) {
                batch.push(build_test_frame(src, Mac::BROADCAST)).unwrap();
            }
            let mut tx = Emitter::new();
            sw.receive(Side::West, 0, batch, &mut tx).unwrap();
        }
        assert_eq!(sw.table_len(), TABLE_CAPACITY);

        // one station too many: flooded, never learned
        let overflow = station(TABLE_CAPACITY);
        deliver(&mut sw, at(Side::West, 0), overflow, Mac::BROADCAST);
        assert!(sw.lookup(overflow).is_none());
        assert_eq!(sw.table_len(), TABLE_CAPACITY);

        // a known station moving sides still refreshes
        deliver(&mut sw, at(Side::East, 0), station(0), Mac::BROADCAST);
        assert_eq!(sw.lookup(station(0)), Some(at(Side::East, 0)));
    }
}
