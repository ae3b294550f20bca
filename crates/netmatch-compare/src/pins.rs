//! Pin mapping: swappable pins within a circuit, and the A-to-B pin
//! bijection of a matched circuit pair.

use std::collections::HashMap;

use netmatch_core::{CircuitId, PinId};

use crate::equivalence::EquivalenceClasses;

/// Per-circuit equivalence classes over pin ids, modelling swappable
/// pins. Swapping is realized by normalizing every pin of a class to one
/// canonical representative (the minimum pin id of the class).
#[derive(Debug, Clone, Default)]
pub struct CircuitPinMapper {
    map: HashMap<CircuitId, EquivalenceClasses<PinId>>,
}

impl CircuitPinMapper {
    /// Create an empty mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare two pins of a circuit swappable.
    pub fn map_pins(&mut self, circuit: CircuitId, pin1: PinId, pin2: PinId) {
        self.map.entry(circuit).or_default().merge(pin1, pin2);
    }

    /// Declare a whole group of pins swappable. Lists shorter than two
    /// pins declare nothing.
    pub fn map_pin_group(&mut self, circuit: CircuitId, pins: &[PinId]) {
        if pins.len() < 2 {
            return;
        }
        let classes = self.map.entry(circuit).or_default();
        for &pin in &pins[1..] {
            classes.merge(pins[0], pin);
        }
    }

    /// Whether the pin belongs to a (non-singleton) swap class.
    pub fn is_mapped(&self, circuit: CircuitId, pin: PinId) -> bool {
        self.map
            .get(&circuit)
            .is_some_and(|classes| classes.contains(pin))
    }

    /// The canonical representative of the pin's swap class, or the pin
    /// itself if it has none. Idempotent.
    pub fn normalize_pin_id(&self, circuit: CircuitId, pin: PinId) -> PinId {
        self.map
            .get(&circuit)
            .and_then(|classes| classes.representative(pin))
            .unwrap_or(pin)
    }
}

/// The pin bijection between a circuit and its matched peer.
///
/// "this" pins live in the mapped circuit's own pin space; "other" pins
/// live in the peer's (canonical) pin space. For B-side circuits the
/// driver installs a trivial self-mapper so the same graph-building code
/// applies to both sides.
#[derive(Debug, Clone)]
pub struct CircuitMapper {
    other: CircuitId,
    pin_map: HashMap<PinId, PinId>,
    rev_pin_map: HashMap<PinId, PinId>,
}

impl CircuitMapper {
    /// Create a mapper towards the given peer circuit.
    pub fn new(other: CircuitId) -> Self {
        Self {
            other,
            pin_map: HashMap::new(),
            rev_pin_map: HashMap::new(),
        }
    }

    /// The peer circuit.
    pub fn other(&self) -> CircuitId {
        self.other
    }

    /// Record a pin correspondence.
    pub fn map_pin(&mut self, this_pin: PinId, other_pin: PinId) {
        self.pin_map.insert(this_pin, other_pin);
        self.rev_pin_map.insert(other_pin, this_pin);
    }

    /// The peer pin for one of this circuit's pins.
    pub fn other_pin(&self, this_pin: PinId) -> Option<PinId> {
        self.pin_map.get(&this_pin).copied()
    }

    /// This circuit's pin for a peer pin.
    pub fn this_pin(&self, other_pin: PinId) -> Option<PinId> {
        self.rev_pin_map.get(&other_pin).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmatch_core::Netlist;

    fn circuit_with_pins(count: u32) -> (Netlist, CircuitId) {
        let mut nl = Netlist::new();
        let c = nl.add_circuit("C").unwrap();
        for i in 0..count {
            nl.add_pin(c, format!("P{i}"), None);
        }
        (nl, c)
    }

    #[test]
    fn test_normalize_unmapped_is_identity() {
        let (_nl, c) = circuit_with_pins(3);
        let pm = CircuitPinMapper::new();
        assert_eq!(pm.normalize_pin_id(c, PinId::new(2)), PinId::new(2));
        assert!(!pm.is_mapped(c, PinId::new(2)));
    }

    #[test]
    fn test_normalize_is_minimum_and_idempotent() {
        let (_nl, c) = circuit_with_pins(4);
        let mut pm = CircuitPinMapper::new();
        pm.map_pin_group(c, &[PinId::new(3), PinId::new(1), PinId::new(2)]);

        for raw in [1, 2, 3] {
            let pin = PinId::new(raw);
            let n = pm.normalize_pin_id(c, pin);
            assert_eq!(n, PinId::new(1));
            assert_eq!(pm.normalize_pin_id(c, n), n);
            assert!(pm.is_mapped(c, pin));
        }
        assert!(!pm.is_mapped(c, PinId::new(0)));
    }

    #[test]
    fn test_group_shorter_than_two_is_ignored() {
        let (_nl, c) = circuit_with_pins(2);
        let mut pm = CircuitPinMapper::new();
        pm.map_pin_group(c, &[PinId::new(1)]);
        assert!(!pm.is_mapped(c, PinId::new(1)));
    }

    #[test]
    fn test_circuit_mapper_round_trip() {
        let (nl, c) = circuit_with_pins(1);
        let _ = nl;
        let mut cm = CircuitMapper::new(c);
        cm.map_pin(PinId::new(0), PinId::new(2));
        assert_eq!(cm.other_pin(PinId::new(0)), Some(PinId::new(2)));
        assert_eq!(cm.this_pin(PinId::new(2)), Some(PinId::new(0)));
        assert_eq!(cm.other_pin(PinId::new(1)), None);
    }
}
