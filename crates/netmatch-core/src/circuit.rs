//! Circuits: pins, nets, devices and subcircuit instances.

use indexmap::IndexMap;

use crate::device::Device;
use crate::ids::{CircuitId, DeviceId, NetId, PinId, SubCircuitId};
use crate::net::Net;

/// A named port of a circuit with a stable integer id.
#[derive(Debug, Clone)]
pub struct Pin {
    id: PinId,
    name: String,
}

impl Pin {
    /// Get the pin's id.
    pub fn id(&self) -> PinId {
        self.id
    }

    /// Get the pin's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An instance of a circuit placed inside another circuit.
#[derive(Debug, Clone)]
pub struct SubCircuit {
    name: String,
    target: CircuitId,
    pin_nets: Vec<Option<NetId>>,
}

impl SubCircuit {
    pub(crate) fn new(
        name: impl Into<String>,
        target: CircuitId,
        pin_nets: Vec<Option<NetId>>,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            pin_nets,
        }
    }

    /// Get the instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The circuit this instance refers to.
    pub fn target(&self) -> CircuitId {
        self.target
    }

    /// The outer net attached at the given pin of the instance, if any.
    pub fn net_for_pin(&self, pin: PinId) -> Option<NetId> {
        self.pin_nets.get(pin.index()).copied().flatten()
    }
}

/// A circuit: named, with ordered pins, nets, devices and subcircuit
/// instances.
#[derive(Debug, Clone)]
pub struct Circuit {
    name: String,
    pins: Vec<Pin>,
    pin_nets: Vec<Option<NetId>>,
    nets: Vec<Net>,
    net_names: IndexMap<String, NetId>,
    devices: Vec<Device>,
    subcircuits: Vec<SubCircuit>,
}

impl Circuit {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: Vec::new(),
            pin_nets: Vec::new(),
            nets: Vec::new(),
            net_names: IndexMap::new(),
            devices: Vec::new(),
            subcircuits: Vec::new(),
        }
    }

    /// Get the circuit's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of pins.
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Iterate over pins in id order.
    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter()
    }

    /// Get a pin by id.
    pub fn pin(&self, id: PinId) -> &Pin {
        &self.pins[id.index()]
    }

    /// The net bound to the given pin, if any.
    pub fn net_for_pin(&self, pin: PinId) -> Option<NetId> {
        self.pin_nets.get(pin.index()).copied().flatten()
    }

    /// Number of nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Iterate over nets in id order.
    pub fn nets(&self) -> impl Iterator<Item = (NetId, &Net)> {
        self.nets
            .iter()
            .enumerate()
            .map(|(i, n)| (NetId::new(i as u32), n))
    }

    /// Get a net by id.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.index()]
    }

    /// Look up a net by name.
    pub fn net_named(&self, name: &str) -> Option<NetId> {
        self.net_names.get(name).copied()
    }

    /// Number of devices.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Iterate over devices in id order.
    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &Device)> {
        self.devices
            .iter()
            .enumerate()
            .map(|(i, d)| (DeviceId::new(i as u32), d))
    }

    /// Get a device by id.
    pub fn device(&self, id: DeviceId) -> &Device {
        &self.devices[id.index()]
    }

    /// Number of subcircuit instances.
    pub fn subcircuit_count(&self) -> usize {
        self.subcircuits.len()
    }

    /// Iterate over subcircuit instances in id order.
    pub fn subcircuits(&self) -> impl Iterator<Item = (SubCircuitId, &SubCircuit)> {
        self.subcircuits
            .iter()
            .enumerate()
            .map(|(i, s)| (SubCircuitId::new(i as u32), s))
    }

    /// Get a subcircuit instance by id.
    pub fn subcircuit(&self, id: SubCircuitId) -> &SubCircuit {
        &self.subcircuits[id.index()]
    }

    pub(crate) fn add_pin(&mut self, name: impl Into<String>, net: Option<NetId>) -> PinId {
        let id = PinId::new(self.pins.len() as u32);
        self.pins.push(Pin {
            id,
            name: name.into(),
        });
        self.pin_nets.push(net);
        if let Some(net) = net {
            self.nets[net.index()].attach_pin(id);
        }
        id
    }

    pub(crate) fn add_net(&mut self, name: String) -> Option<NetId> {
        if self.net_names.contains_key(&name) {
            return None;
        }
        let id = NetId::new(self.nets.len() as u32);
        self.nets.push(Net::new(name.clone()));
        self.net_names.insert(name, id);
        Some(id)
    }

    pub(crate) fn net_mut(&mut self, id: NetId) -> &mut Net {
        &mut self.nets[id.index()]
    }

    pub(crate) fn push_device(&mut self, device: Device) -> DeviceId {
        let id = DeviceId::new(self.devices.len() as u32);
        self.devices.push(device);
        id
    }

    pub(crate) fn device_mut(&mut self, id: DeviceId) -> &mut Device {
        &mut self.devices[id.index()]
    }

    pub(crate) fn push_subcircuit(&mut self, subcircuit: SubCircuit) -> SubCircuitId {
        let id = SubCircuitId::new(self.subcircuits.len() as u32);
        self.subcircuits.push(subcircuit);
        id
    }
}
