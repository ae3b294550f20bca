//! Device classes and device instances.
//!
//! A [`DeviceClass`] describes a kind of device: its terminals (with a
//! normalization table mapping symmetric terminals onto one canonical
//! id), its parameters (with per-parameter comparison tolerances), and a
//! [`DeviceKind`] capability flag used by device filtering. A [`Device`]
//! is an instance of a class placed in a circuit, with per-terminal net
//! bindings and parameter values.

use crate::ids::{DeviceClassId, NetId, TerminalId};

/// The broad kind of a device class.
///
/// This is the capability flag consumers key on when they need to treat
/// resistors or capacitors specially (e.g. threshold-based filtering),
/// instead of sniffing the class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Resistor,
    Capacitor,
    Inductor,
    Diode,
    Mosfet,
    Bjt,
    Other,
}

/// A terminal of a device class.
#[derive(Debug, Clone)]
pub struct TerminalDef {
    name: String,
}

impl TerminalDef {
    /// Get the terminal's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A parameter of a device class.
#[derive(Debug, Clone)]
pub struct ParameterDef {
    name: String,
    default_value: f64,
    /// Relative tolerance applied when comparing two devices. 0 means
    /// exact comparison.
    tolerance: f64,
}

impl ParameterDef {
    /// Get the parameter's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the default value.
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Get the relative comparison tolerance.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn values_equal(&self, a: f64, b: f64) -> bool {
        if self.tolerance <= 0.0 {
            a == b
        } else {
            (a - b).abs() <= self.tolerance * a.abs().max(b.abs())
        }
    }
}

/// A device class: named, with ordered terminals and parameters.
#[derive(Debug, Clone)]
pub struct DeviceClass {
    name: String,
    kind: DeviceKind,
    terminals: Vec<TerminalDef>,
    /// Maps each terminal to its canonical representative. Identity for
    /// asymmetric terminals.
    normalization: Vec<TerminalId>,
    parameters: Vec<ParameterDef>,
}

impl DeviceClass {
    /// Create an empty device class.
    pub fn new(name: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            terminals: Vec::new(),
            normalization: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// A two-terminal resistor with swappable terminals and an `R`
    /// parameter (ohms).
    pub fn resistor(name: impl Into<String>) -> Self {
        let mut cls = Self::new(name, DeviceKind::Resistor);
        let a = cls.add_terminal("A");
        let b = cls.add_terminal("B");
        cls.make_terminals_symmetric(&[a, b]);
        cls.add_parameter("R", 0.0, 0.0);
        cls
    }

    /// A two-terminal capacitor with swappable terminals and a `C`
    /// parameter (farads).
    pub fn capacitor(name: impl Into<String>) -> Self {
        let mut cls = Self::new(name, DeviceKind::Capacitor);
        let a = cls.add_terminal("A");
        let b = cls.add_terminal("B");
        cls.make_terminals_symmetric(&[a, b]);
        cls.add_parameter("C", 0.0, 0.0);
        cls
    }

    /// A two-terminal inductor with swappable terminals and an `L`
    /// parameter (henries).
    pub fn inductor(name: impl Into<String>) -> Self {
        let mut cls = Self::new(name, DeviceKind::Inductor);
        let a = cls.add_terminal("A");
        let b = cls.add_terminal("B");
        cls.make_terminals_symmetric(&[a, b]);
        cls.add_parameter("L", 0.0, 0.0);
        cls
    }

    /// A diode with anode/cathode terminals and an `AREA` parameter.
    pub fn diode(name: impl Into<String>) -> Self {
        let mut cls = Self::new(name, DeviceKind::Diode);
        cls.add_terminal("A");
        cls.add_terminal("C");
        cls.add_parameter("AREA", 0.0, 0.0);
        cls
    }

    /// A three-terminal MOS transistor (source, gate, drain) with
    /// swappable source/drain and `W`/`L` parameters.
    pub fn mos3(name: impl Into<String>) -> Self {
        let mut cls = Self::new(name, DeviceKind::Mosfet);
        let s = cls.add_terminal("S");
        cls.add_terminal("G");
        let d = cls.add_terminal("D");
        cls.make_terminals_symmetric(&[s, d]);
        cls.add_parameter("W", 0.0, 0.0);
        cls.add_parameter("L", 0.0, 0.0);
        cls
    }

    /// A four-terminal MOS transistor (source, gate, drain, bulk) with
    /// swappable source/drain and `W`/`L` parameters.
    pub fn mos4(name: impl Into<String>) -> Self {
        let mut cls = Self::new(name, DeviceKind::Mosfet);
        let s = cls.add_terminal("S");
        cls.add_terminal("G");
        let d = cls.add_terminal("D");
        cls.add_terminal("B");
        cls.make_terminals_symmetric(&[s, d]);
        cls.add_parameter("W", 0.0, 0.0);
        cls.add_parameter("L", 0.0, 0.0);
        cls
    }

    /// A bipolar transistor (collector, base, emitter) with an `AREA`
    /// parameter.
    pub fn bjt(name: impl Into<String>) -> Self {
        let mut cls = Self::new(name, DeviceKind::Bjt);
        cls.add_terminal("C");
        cls.add_terminal("B");
        cls.add_terminal("E");
        cls.add_parameter("AREA", 0.0, 0.0);
        cls
    }

    /// Add a terminal, returning its id.
    pub fn add_terminal(&mut self, name: impl Into<String>) -> TerminalId {
        let id = TerminalId::new(self.terminals.len() as u32);
        self.terminals.push(TerminalDef { name: name.into() });
        self.normalization.push(id);
        id
    }

    /// Add a parameter, returning its index.
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        default_value: f64,
        tolerance: f64,
    ) -> usize {
        self.parameters.push(ParameterDef {
            name: name.into(),
            default_value,
            tolerance,
        });
        self.parameters.len() - 1
    }

    /// Declare a group of terminals electrically interchangeable. All
    /// listed terminals normalize to the lowest id of the group.
    ///
    /// One group per terminal; declaring overlapping groups keeps the
    /// last declaration for the overlapped terminals.
    pub fn make_terminals_symmetric(&mut self, terminals: &[TerminalId]) {
        let Some(&canonical) = terminals.iter().min() else {
            return;
        };
        for &t in terminals {
            self.normalization[t.index()] = canonical;
        }
        // the representative must map to itself
        self.normalization[canonical.index()] = canonical;
    }

    /// Map a terminal to its canonical representative. Idempotent.
    pub fn normalize_terminal_id(&self, terminal: TerminalId) -> TerminalId {
        self.normalization[terminal.index()]
    }

    /// Get the class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the device kind.
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Number of terminals.
    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    /// Iterate over terminal ids in declaration order.
    pub fn terminal_ids(&self) -> impl Iterator<Item = TerminalId> {
        (0..self.terminals.len() as u32).map(TerminalId::new)
    }

    /// Get a terminal definition.
    pub fn terminal(&self, id: TerminalId) -> &TerminalDef {
        &self.terminals[id.index()]
    }

    /// Look up a terminal by name.
    pub fn terminal_named(&self, name: &str) -> Option<TerminalId> {
        self.terminals
            .iter()
            .position(|t| t.name == name)
            .map(|i| TerminalId::new(i as u32))
    }

    /// Number of parameters.
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Get a parameter definition.
    pub fn parameter(&self, index: usize) -> &ParameterDef {
        &self.parameters[index]
    }

    /// Look up a parameter by name.
    pub fn parameter_id(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    /// Default parameter values for a new instance.
    pub(crate) fn default_parameters(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.default_value).collect()
    }

    /// Whether two devices of this class carry equal parameters, within
    /// the per-parameter tolerances.
    pub fn devices_equal(&self, a: &Device, b: &Device) -> bool {
        self.parameters
            .iter()
            .enumerate()
            .all(|(i, p)| p.values_equal(a.parameter_value(i), b.parameter_value(i)))
    }

    /// Strict weak ordering over devices of this class, consistent with
    /// [`devices_equal`](Self::devices_equal).
    pub fn devices_less(&self, a: &Device, b: &Device) -> bool {
        for (i, p) in self.parameters.iter().enumerate() {
            let (va, vb) = (a.parameter_value(i), b.parameter_value(i));
            if !p.values_equal(va, vb) {
                return va < vb;
            }
        }
        false
    }
}

/// A device instance within a circuit.
#[derive(Debug, Clone)]
pub struct Device {
    name: String,
    class: DeviceClassId,
    terminal_nets: Vec<Option<NetId>>,
    parameters: Vec<f64>,
}

impl Device {
    pub(crate) fn new(
        name: impl Into<String>,
        class: DeviceClassId,
        terminal_nets: Vec<Option<NetId>>,
        parameters: Vec<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            class,
            terminal_nets,
            parameters,
        }
    }

    /// Get the device's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the device's class.
    pub fn class(&self) -> DeviceClassId {
        self.class
    }

    /// The net attached at the given terminal, if any.
    pub fn net_for_terminal(&self, terminal: TerminalId) -> Option<NetId> {
        self.terminal_nets.get(terminal.index()).copied().flatten()
    }

    /// Get a parameter value by index. Missing parameters read as 0.
    pub fn parameter_value(&self, index: usize) -> f64 {
        self.parameters.get(index).copied().unwrap_or(0.0)
    }

    /// All parameter values in declaration order.
    pub fn parameter_values(&self) -> &[f64] {
        &self.parameters
    }

    pub(crate) fn set_parameter_value(&mut self, index: usize, value: f64) {
        self.parameters[index] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resistor_terminals_symmetric() {
        let cls = DeviceClass::resistor("RES");
        let a = cls.terminal_named("A").unwrap();
        let b = cls.terminal_named("B").unwrap();
        assert_eq!(cls.normalize_terminal_id(a), a);
        assert_eq!(cls.normalize_terminal_id(b), a);
    }

    #[test]
    fn test_normalization_idempotent() {
        let cls = DeviceClass::mos4("NMOS");
        for t in cls.terminal_ids() {
            let n = cls.normalize_terminal_id(t);
            assert_eq!(cls.normalize_terminal_id(n), n);
        }
    }

    #[test]
    fn test_mos_source_drain_swap() {
        let cls = DeviceClass::mos4("NMOS");
        let s = cls.terminal_named("S").unwrap();
        let d = cls.terminal_named("D").unwrap();
        let g = cls.terminal_named("G").unwrap();
        assert_eq!(cls.normalize_terminal_id(d), s);
        assert_eq!(cls.normalize_terminal_id(g), g);
    }

    #[test]
    fn test_parameter_tolerance() {
        let mut cls = DeviceClass::resistor("RES");
        // exact by default
        let d1 = Device::new("R1", DeviceClassId { tag: 0, index: 0 }, vec![], vec![1000.0]);
        let d2 = Device::new("R2", DeviceClassId { tag: 0, index: 0 }, vec![], vec![1001.0]);
        assert!(!cls.devices_equal(&d1, &d2));
        assert!(cls.devices_less(&d1, &d2));

        // 1% relative tolerance makes them equal
        cls.parameters[0].tolerance = 0.01;
        assert!(cls.devices_equal(&d1, &d2));
        assert!(!cls.devices_less(&d1, &d2));
    }
}
