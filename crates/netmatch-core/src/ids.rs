//! Typed identifiers for netlist entities.
//!
//! Circuits and device classes are identified across netlists: every
//! [`Netlist`](crate::Netlist) draws a unique tag from a process-wide
//! counter and stamps it into the ids it hands out, so ids from two
//! different netlists never collide and can key the same map. Entities
//! owned by a single circuit (nets, devices, subcircuit instances, pins,
//! terminals) use plain index newtypes.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_NETLIST_TAG: AtomicU32 = AtomicU32::new(0);

pub(crate) fn next_netlist_tag() -> u32 {
    NEXT_NETLIST_TAG.fetch_add(1, Ordering::Relaxed)
}

/// Identifies a circuit, unique across all netlists in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CircuitId {
    pub(crate) tag: u32,
    pub(crate) index: u32,
}

impl CircuitId {
    /// Position of the circuit within its netlist.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circuit#{}", self.index)
    }
}

/// Identifies a device class, unique across all netlists in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceClassId {
    pub(crate) tag: u32,
    pub(crate) index: u32,
}

impl DeviceClassId {
    /// Position of the class within its netlist.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for DeviceClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.index)
    }
}

macro_rules! local_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Create an id from a raw index.
            pub fn new(index: u32) -> Self {
                $name(index)
            }

            /// Get the raw index.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Get the raw index as `u32`.
            pub fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

local_id! {
    /// Identifies a net within one circuit.
    NetId
}

local_id! {
    /// Identifies a device instance within one circuit.
    DeviceId
}

local_id! {
    /// Identifies a subcircuit instance within one circuit.
    SubCircuitId
}

local_id! {
    /// Identifies a pin of a circuit. Pins are numbered 0..P-1 in
    /// declaration order.
    PinId
}

local_id! {
    /// Identifies a terminal of a device class. Terminals are numbered
    /// 0..T-1 in declaration order.
    TerminalId
}

/// Globally names a net: the circuit that owns it plus the net's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NetRef {
    /// The circuit owning the net.
    pub circuit: CircuitId,
    /// The net within that circuit.
    pub net: NetId,
}

impl NetRef {
    /// Create a net reference.
    pub fn new(circuit: CircuitId, net: NetId) -> Self {
        Self { circuit, net }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ids() {
        let n = NetId::new(3);
        assert_eq!(n.index(), 3);
        assert_eq!(n.as_u32(), 3);
        assert_eq!(n.to_string(), "3");
        assert!(NetId::new(1) < NetId::new(2));
    }

    #[test]
    fn test_netlist_tags_are_unique() {
        let a = next_netlist_tag();
        let b = next_netlist_tag();
        assert_ne!(a, b);
    }
}
