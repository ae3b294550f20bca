//! Nets: the equipotential nodes of a circuit.

use crate::ids::{DeviceId, PinId, SubCircuitId, TerminalId};

/// A net within a circuit, with back-references to everything attached
/// to it: circuit pins, device terminals, and subcircuit pins.
#[derive(Debug, Clone)]
pub struct Net {
    name: String,
    pins: Vec<PinId>,
    terminals: Vec<(DeviceId, TerminalId)>,
    subcircuit_pins: Vec<(SubCircuitId, PinId)>,
}

impl Net {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: Vec::new(),
            terminals: Vec::new(),
            subcircuit_pins: Vec::new(),
        }
    }

    /// Get the net's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Circuit pins attached to this net, in attachment order.
    pub fn pins(&self) -> &[PinId] {
        &self.pins
    }

    /// Number of circuit pins attached to this net.
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Device terminal attachments `(device, terminal)`.
    pub fn terminals(&self) -> &[(DeviceId, TerminalId)] {
        &self.terminals
    }

    /// Subcircuit pin attachments `(subcircuit, pin)`.
    pub fn subcircuit_pins(&self) -> &[(SubCircuitId, PinId)] {
        &self.subcircuit_pins
    }

    /// A floating net connects no device terminal and no subcircuit pin;
    /// it may still be bound to circuit pins.
    pub fn is_floating(&self) -> bool {
        self.terminals.is_empty() && self.subcircuit_pins.is_empty()
    }

    pub(crate) fn attach_pin(&mut self, pin: PinId) {
        self.pins.push(pin);
    }

    pub(crate) fn attach_terminal(&mut self, device: DeviceId, terminal: TerminalId) {
        self.terminals.push((device, terminal));
    }

    pub(crate) fn attach_subcircuit_pin(&mut self, subcircuit: SubCircuitId, pin: PinId) {
        self.subcircuit_pins.push((subcircuit, pin));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floating() {
        let mut net = Net::new("n1");
        assert!(net.is_floating());
        net.attach_pin(PinId::new(0));
        assert!(net.is_floating());
        net.attach_terminal(DeviceId::new(0), TerminalId::new(1));
        assert!(!net.is_floating());
    }
}
