//! Graph-isomorphism netlist comparison core.
//!
//! Given two circuit netlists (reference and implementation), the
//! [`NetlistComparer`] decides whether they describe the same electrical
//! network, pairs up corresponding nets, devices, pins and subcircuits,
//! and reports everything through a [`NetlistCompareLogger`] sink.
//!
//! The approach, bottom-up:
//!
//! 1. Device classes and circuits are mapped to integer *categories*,
//!    merging caller-declared equivalences and falling back to
//!    case-insensitive name matching.
//! 2. For each pair of equivalent circuits, every net is given a local
//!    signature: the sorted multiset of *transitions* to neighbour nets
//!    through devices and subcircuits, with symmetric device terminals
//!    and swappable pins normalized away.
//! 3. A backtracking deduction engine propagates pairings from seeds,
//!    pairing nodes with unique signatures directly and resolving
//!    ambiguity groups through tentative trials with exact rollback.
//! 4. Devices, subcircuits and pins are then classified by their
//!    incident-net signatures, and pins left observationally
//!    indistinguishable (abstract macros) are declared swappable so the
//!    equivalence propagates up the hierarchy.
//!
//! ```rust
//! use netmatch_compare::{EventLog, NetlistComparer};
//! use netmatch_core::{DeviceClass, Netlist};
//!
//! let build = |name: &str| {
//!     let mut nl = Netlist::new();
//!     let res = nl.add_device_class(DeviceClass::resistor("RES"));
//!     let top = nl.add_circuit("TOP").unwrap();
//!     let n1 = nl.add_net(top, format!("{name}_IN")).unwrap();
//!     let n2 = nl.add_net(top, format!("{name}_OUT")).unwrap();
//!     nl.add_pin(top, "IN", Some(n1));
//!     nl.add_pin(top, "OUT", Some(n2));
//!     nl.add_device(top, "R1", res, &[Some(n1), Some(n2)]).unwrap();
//!     nl
//! };
//!
//! let a = build("A");
//! let b = build("B");
//!
//! let mut log = EventLog::new();
//! let good = NetlistComparer::new().compare_with_logger(&a, &b, &mut log);
//! assert!(good);
//! assert!(log.is_clean());
//! ```

pub mod categorize;
pub mod compare;
pub mod equivalence;
pub mod filter;
pub mod logger;
pub mod pins;

mod deduce;
mod graph;

pub use categorize::{CircuitCategorizer, DeviceCategorizer};
pub use compare::NetlistComparer;
pub use equivalence::EquivalenceClasses;
pub use filter::DeviceFilter;
pub use graph::{Transition, TAKE_ADDITIONAL_PINS};
pub use logger::{CompareEvent, CompareSummary, EventLog, NetlistCompareLogger};
pub use pins::{CircuitMapper, CircuitPinMapper};
