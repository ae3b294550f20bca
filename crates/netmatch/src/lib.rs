//! # netmatch
//!
//! Netlist equivalence checking for hierarchical circuit netlists.
//!
//! netmatch decides whether two netlists (say, one extracted from a
//! layout and one drawn as a schematic) describe the same electrical
//! network. It pairs up corresponding nets, devices, pins and
//! subcircuits, resolves swappable pins and symmetric device terminals,
//! and reports matches and mismatches through a sink trait.
//!
//! ## Quick start
//!
//! ```rust
//! use netmatch::prelude::*;
//!
//! // Build two identical inverters with different net names.
//! let build = |prefix: &str| {
//!     let mut nl = Netlist::new();
//!     let pmos = nl.add_device_class(DeviceClass::mos4("PMOS"));
//!     let nmos = nl.add_device_class(DeviceClass::mos4("NMOS"));
//!     let inv = nl.add_circuit("INV").unwrap();
//!     let i = nl.add_net(inv, format!("{prefix}_IN")).unwrap();
//!     let o = nl.add_net(inv, format!("{prefix}_OUT")).unwrap();
//!     let vdd = nl.add_net(inv, format!("{prefix}_VDD")).unwrap();
//!     let vss = nl.add_net(inv, format!("{prefix}_VSS")).unwrap();
//!     nl.add_pin(inv, "IN", Some(i));
//!     nl.add_pin(inv, "OUT", Some(o));
//!     nl.add_pin(inv, "VDD", Some(vdd));
//!     nl.add_pin(inv, "VSS", Some(vss));
//!     // terminal order: S G D B
//!     nl.add_device(inv, "MP", pmos, &[Some(vdd), Some(i), Some(o), Some(vdd)]).unwrap();
//!     nl.add_device(inv, "MN", nmos, &[Some(vss), Some(i), Some(o), Some(vss)]).unwrap();
//!     nl
//! };
//!
//! let a = build("A");
//! let b = build("B");
//!
//! let mut log = EventLog::new();
//! let comparer = NetlistComparer::new();
//! assert!(comparer.compare_with_logger(&a, &b, &mut log));
//! println!("{}", log.to_text());
//! ```
//!
//! The crates behind this facade:
//!
//! - [`netmatch_core`] (re-exported as `core`) - the netlist data
//!   model: [`Netlist`], [`Circuit`], [`Net`], [`Device`],
//!   [`DeviceClass`], [`SubCircuit`]
//! - [`netmatch_compare`] (re-exported as `compare`) - the comparison
//!   core: [`NetlistComparer`], the [`NetlistCompareLogger`] sink trait
//!   and the recording [`EventLog`]

pub use netmatch_compare as compare;
pub use netmatch_core as core;

pub use netmatch_core::{
    Circuit, CircuitId, Device, DeviceClass, DeviceClassId, DeviceId, DeviceKind, Net, NetId,
    NetRef, Netlist, Pin, PinId, SubCircuit, SubCircuitId, TerminalId,
};

pub use netmatch_compare::{
    CompareEvent, CompareSummary, EventLog, NetlistCompareLogger, NetlistComparer,
};

/// Commonly used types and traits.
///
/// ```rust
/// use netmatch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CompareEvent, DeviceClass, DeviceKind, EventLog, NetRef, Netlist, NetlistCompareLogger,
        NetlistComparer,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_compare_empty() {
        let a = Netlist::new();
        let b = Netlist::new();
        assert!(NetlistComparer::new().compare(&a, &b));
    }
}
