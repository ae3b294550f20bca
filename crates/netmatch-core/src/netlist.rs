//! The netlist container and its builder API.

use indexmap::IndexMap;

use crate::circuit::{Circuit, SubCircuit};
use crate::device::{Device, DeviceClass};
use crate::error::{Error, Result};
use crate::ids::{
    next_netlist_tag, CircuitId, DeviceClassId, DeviceId, NetId, PinId, SubCircuitId, TerminalId,
};

/// A collection of device classes and circuits.
///
/// Circuits instantiate each other through subcircuits; instantiation is
/// acyclic (enforced at construction), so [`bottom_up`](Netlist::bottom_up)
/// is always well defined.
///
/// Cloning preserves identity: the clone shares the original's tag, so
/// circuit and device-class ids obtained from one resolve in the other.
/// This makes `b = a.clone()` a convenient way to build two netlists
/// that start out identical.
#[derive(Debug, Clone)]
pub struct Netlist {
    tag: u32,
    name: Option<String>,
    device_classes: Vec<DeviceClass>,
    circuits: Vec<Circuit>,
    circuit_names: IndexMap<String, CircuitId>,
}

impl Netlist {
    /// Create an empty netlist.
    pub fn new() -> Self {
        Self {
            tag: next_netlist_tag(),
            name: None,
            device_classes: Vec::new(),
            circuits: Vec::new(),
            circuit_names: IndexMap::new(),
        }
    }

    /// Create an empty netlist with a name (used in reports).
    pub fn with_name(name: impl Into<String>) -> Self {
        let mut nl = Self::new();
        nl.name = Some(name.into());
        nl
    }

    /// Get the netlist's name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Register a device class, returning its id.
    pub fn add_device_class(&mut self, class: DeviceClass) -> DeviceClassId {
        let id = DeviceClassId {
            tag: self.tag,
            index: self.device_classes.len() as u32,
        };
        self.device_classes.push(class);
        id
    }

    /// Get a device class by id.
    ///
    /// Panics if the id belongs to another netlist.
    pub fn device_class(&self, id: DeviceClassId) -> &DeviceClass {
        assert_eq!(id.tag, self.tag, "device class id from another netlist");
        &self.device_classes[id.index()]
    }

    /// Whether this netlist owns the given device class id.
    pub fn contains_device_class(&self, id: DeviceClassId) -> bool {
        id.tag == self.tag
    }

    /// Iterate over device classes in registration order.
    pub fn device_classes(&self) -> impl Iterator<Item = (DeviceClassId, &DeviceClass)> {
        self.device_classes.iter().enumerate().map(|(i, c)| {
            (
                DeviceClassId {
                    tag: self.tag,
                    index: i as u32,
                },
                c,
            )
        })
    }

    /// Create a circuit, returning its id.
    pub fn add_circuit(&mut self, name: impl Into<String>) -> Result<CircuitId> {
        let name = name.into();
        if self.circuit_names.contains_key(&name) {
            return Err(Error::DuplicateCircuit(name));
        }
        let id = CircuitId {
            tag: self.tag,
            index: self.circuits.len() as u32,
        };
        self.circuits.push(Circuit::new(name.clone()));
        self.circuit_names.insert(name, id);
        Ok(id)
    }

    /// Get a circuit by id.
    ///
    /// Panics if the id belongs to another netlist.
    pub fn circuit(&self, id: CircuitId) -> &Circuit {
        assert_eq!(id.tag, self.tag, "circuit id from another netlist");
        &self.circuits[id.index()]
    }

    /// Whether this netlist owns the given circuit id.
    pub fn contains_circuit(&self, id: CircuitId) -> bool {
        id.tag == self.tag
    }

    /// Iterate over circuits in creation order.
    pub fn circuits(&self) -> impl Iterator<Item = (CircuitId, &Circuit)> {
        self.circuits.iter().enumerate().map(|(i, c)| {
            (
                CircuitId {
                    tag: self.tag,
                    index: i as u32,
                },
                c,
            )
        })
    }

    /// Look up a circuit by name.
    pub fn circuit_named(&self, name: &str) -> Option<CircuitId> {
        self.circuit_names.get(name).copied()
    }

    /// Number of circuits.
    pub fn circuit_count(&self) -> usize {
        self.circuits.len()
    }

    /// Create a net within a circuit.
    pub fn add_net(&mut self, circuit: CircuitId, name: impl Into<String>) -> Result<NetId> {
        let name = name.into();
        self.circuit_entry(circuit)
            .add_net(name.clone())
            .ok_or(Error::DuplicateNet(name))
    }

    /// Create a pin within a circuit, optionally bound to a net.
    pub fn add_pin(
        &mut self,
        circuit: CircuitId,
        name: impl Into<String>,
        net: Option<NetId>,
    ) -> PinId {
        self.circuit_entry(circuit).add_pin(name, net)
    }

    /// Create a device within a circuit. `nets` gives the attached net
    /// per terminal of the class, in terminal order.
    pub fn add_device(
        &mut self,
        circuit: CircuitId,
        name: impl Into<String>,
        class: DeviceClassId,
        nets: &[Option<NetId>],
    ) -> Result<DeviceId> {
        let name = name.into();
        let cls = self.device_class(class);
        if nets.len() != cls.terminal_count() {
            return Err(Error::TerminalCountMismatch {
                device: name,
                expected: cls.terminal_count(),
                got: nets.len(),
            });
        }
        let parameters = cls.default_parameters();
        let c = self.circuit_entry(circuit);
        let id = c.push_device(Device::new(name, class, nets.to_vec(), parameters));
        for (t, net) in nets.iter().enumerate() {
            if let Some(net) = *net {
                c.net_mut(net).attach_terminal(id, TerminalId::new(t as u32));
            }
        }
        Ok(id)
    }

    /// Set a device parameter by name.
    pub fn set_device_parameter(
        &mut self,
        circuit: CircuitId,
        device: DeviceId,
        name: &str,
        value: f64,
    ) -> Result<()> {
        let class = self.circuit(circuit).device(device).class();
        let index = self
            .device_class(class)
            .parameter_id(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        self.circuit_entry(circuit)
            .device_mut(device)
            .set_parameter_value(index, value);
        Ok(())
    }

    /// Instantiate `target` inside `parent`. `nets` gives the outer net
    /// per pin of `target`, in pin order.
    pub fn add_subcircuit(
        &mut self,
        parent: CircuitId,
        name: impl Into<String>,
        target: CircuitId,
        nets: &[Option<NetId>],
    ) -> Result<SubCircuitId> {
        let name = name.into();
        let expected = self.circuit(target).pin_count();
        if nets.len() != expected {
            return Err(Error::PinCountMismatch {
                subcircuit: name,
                expected,
                got: nets.len(),
            });
        }
        if target == parent || self.instantiates(target, parent) {
            return Err(Error::RecursiveInstantiation {
                parent: self.circuit(parent).name().to_string(),
                target: self.circuit(target).name().to_string(),
            });
        }
        let c = self.circuit_entry(parent);
        let id = c.push_subcircuit(SubCircuit::new(name, target, nets.to_vec()));
        for (p, net) in nets.iter().enumerate() {
            if let Some(net) = *net {
                c.net_mut(net)
                    .attach_subcircuit_pin(id, PinId::new(p as u32));
            }
        }
        Ok(id)
    }

    /// Circuit ids in bottom-up order: every circuit appears after all
    /// circuits it instantiates. Deterministic for a given netlist.
    pub fn bottom_up(&self) -> Vec<CircuitId> {
        let mut order = Vec::with_capacity(self.circuits.len());
        let mut visited = vec![false; self.circuits.len()];
        for index in 0..self.circuits.len() {
            self.visit_bottom_up(index, &mut visited, &mut order);
        }
        order
    }

    fn visit_bottom_up(&self, index: usize, visited: &mut [bool], order: &mut Vec<CircuitId>) {
        if visited[index] {
            return;
        }
        visited[index] = true;
        for (_, sc) in self.circuits[index].subcircuits() {
            self.visit_bottom_up(sc.target().index(), visited, order);
        }
        order.push(CircuitId {
            tag: self.tag,
            index: index as u32,
        });
    }

    /// Whether `from` (transitively) instantiates `target`.
    fn instantiates(&self, from: CircuitId, target: CircuitId) -> bool {
        for (_, sc) in self.circuit(from).subcircuits() {
            if sc.target() == target || self.instantiates(sc.target(), target) {
                return true;
            }
        }
        false
    }

    fn circuit_entry(&mut self, id: CircuitId) -> &mut Circuit {
        assert_eq!(id.tag, self.tag, "circuit id from another netlist");
        &mut self.circuits[id.index()]
    }
}

impl Default for Netlist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inverter(nl: &mut Netlist) -> CircuitId {
        let nmos = nl.add_device_class(DeviceClass::mos4("NMOS"));
        let pmos = nl.add_device_class(DeviceClass::mos4("PMOS"));
        let inv = nl.add_circuit("INV").unwrap();
        let input = nl.add_net(inv, "IN").unwrap();
        let output = nl.add_net(inv, "OUT").unwrap();
        let vdd = nl.add_net(inv, "VDD").unwrap();
        let vss = nl.add_net(inv, "VSS").unwrap();
        nl.add_pin(inv, "IN", Some(input));
        nl.add_pin(inv, "OUT", Some(output));
        nl.add_pin(inv, "VDD", Some(vdd));
        nl.add_pin(inv, "VSS", Some(vss));
        // terminal order is S, G, D, B
        nl.add_device(
            inv,
            "M1",
            pmos,
            &[Some(vdd), Some(input), Some(output), Some(vdd)],
        )
        .unwrap();
        nl.add_device(
            inv,
            "M2",
            nmos,
            &[Some(vss), Some(input), Some(output), Some(vss)],
        )
        .unwrap();
        inv
    }

    #[test]
    fn test_build_inverter() {
        let mut nl = Netlist::new();
        let inv = inverter(&mut nl);
        let c = nl.circuit(inv);
        assert_eq!(c.pin_count(), 4);
        assert_eq!(c.net_count(), 4);
        assert_eq!(c.device_count(), 2);

        let input = c.net_named("IN").unwrap();
        // one pin and two gate terminals attach to IN
        assert_eq!(c.net(input).pin_count(), 1);
        assert_eq!(c.net(input).terminals().len(), 2);
        assert!(!c.net(input).is_floating());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut nl = Netlist::new();
        let c = nl.add_circuit("TOP").unwrap();
        assert!(nl.add_circuit("TOP").is_err());
        nl.add_net(c, "N1").unwrap();
        assert!(nl.add_net(c, "N1").is_err());
    }

    #[test]
    fn test_terminal_count_validated() {
        let mut nl = Netlist::new();
        let res = nl.add_device_class(DeviceClass::resistor("RES"));
        let c = nl.add_circuit("TOP").unwrap();
        let n1 = nl.add_net(c, "N1").unwrap();
        let err = nl.add_device(c, "R1", res, &[Some(n1)]).unwrap_err();
        assert!(matches!(err, Error::TerminalCountMismatch { .. }));
    }

    #[test]
    fn test_bottom_up_order() {
        let mut nl = Netlist::new();
        let top = nl.add_circuit("TOP").unwrap();
        let mid = nl.add_circuit("MID").unwrap();
        let leaf = nl.add_circuit("LEAF").unwrap();
        nl.add_pin(leaf, "P", None);
        nl.add_pin(mid, "P", None);
        nl.add_subcircuit(mid, "XL", leaf, &[None]).unwrap();
        nl.add_subcircuit(top, "XM", mid, &[None]).unwrap();

        let order = nl.bottom_up();
        let pos = |id: CircuitId| order.iter().position(|&c| c == id).unwrap();
        assert!(pos(leaf) < pos(mid));
        assert!(pos(mid) < pos(top));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_recursive_instantiation_rejected() {
        let mut nl = Netlist::new();
        let a = nl.add_circuit("A").unwrap();
        let b = nl.add_circuit("B").unwrap();
        nl.add_subcircuit(a, "XB", b, &[]).unwrap();
        let err = nl.add_subcircuit(b, "XA", a, &[]).unwrap_err();
        assert!(matches!(err, Error::RecursiveInstantiation { .. }));
    }

    #[test]
    fn test_device_parameters() {
        let mut nl = Netlist::new();
        let res = nl.add_device_class(DeviceClass::resistor("RES"));
        let c = nl.add_circuit("TOP").unwrap();
        let n1 = nl.add_net(c, "N1").unwrap();
        let n2 = nl.add_net(c, "N2").unwrap();
        let r1 = nl
            .add_device(c, "R1", res, &[Some(n1), Some(n2)])
            .unwrap();
        nl.set_device_parameter(c, r1, "R", 1e3).unwrap();
        assert_eq!(nl.circuit(c).device(r1).parameter_value(0), 1e3);
        assert!(nl.set_device_parameter(c, r1, "BOGUS", 1.0).is_err());
    }
}
