//! Netlist data model for the netmatch equivalence checker.
//!
//! This crate provides the entities the comparison core reads:
//!
//! - [`Netlist`] - a collection of device classes and circuits with a
//!   bottom-up traversal order
//! - [`Circuit`] - named, with ordered pins, nets, devices and
//!   subcircuit instances
//! - [`Net`] - an equipotential node with back-references to everything
//!   attached to it
//! - [`DeviceClass`] / [`Device`] - device kinds with terminal
//!   normalization and parameter tolerances, and their instances
//! - [`SubCircuit`] - an instance of a circuit placed inside another
//!
//! # Example: Building a voltage divider
//!
//! ```rust
//! use netmatch_core::{DeviceClass, Netlist};
//!
//! let mut nl = Netlist::new();
//! let res = nl.add_device_class(DeviceClass::resistor("RES"));
//!
//! let top = nl.add_circuit("DIVIDER").unwrap();
//! let vin = nl.add_net(top, "VIN").unwrap();
//! let vout = nl.add_net(top, "VOUT").unwrap();
//! let gnd = nl.add_net(top, "GND").unwrap();
//! nl.add_pin(top, "VIN", Some(vin));
//! nl.add_pin(top, "VOUT", Some(vout));
//! nl.add_pin(top, "GND", Some(gnd));
//!
//! let r1 = nl.add_device(top, "R1", res, &[Some(vin), Some(vout)]).unwrap();
//! let r2 = nl.add_device(top, "R2", res, &[Some(vout), Some(gnd)]).unwrap();
//! nl.set_device_parameter(top, r1, "R", 1e3).unwrap();
//! nl.set_device_parameter(top, r2, "R", 1e3).unwrap();
//!
//! let c = nl.circuit(top);
//! assert_eq!(c.device_count(), 2);
//! assert_eq!(c.net(vout).terminals().len(), 2);
//! ```

pub mod circuit;
pub mod device;
pub mod error;
pub mod ids;
pub mod net;
pub mod netlist;

pub use circuit::{Circuit, Pin, SubCircuit};
pub use device::{Device, DeviceClass, DeviceKind, ParameterDef, TerminalDef};
pub use error::{Error, Result};
pub use ids::{CircuitId, DeviceClassId, DeviceId, NetId, NetRef, PinId, SubCircuitId, TerminalId};
pub use net::Net;
pub use netlist::Netlist;
