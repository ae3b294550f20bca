//! The reporting sink: an abstract callback surface for matches and
//! mismatches, plus a recording implementation that turns callbacks
//! into serializable events and a text report.

use serde::{Deserialize, Serialize};

use netmatch_core::{Circuit, Device, DeviceClass, Net, Netlist, Pin, SubCircuit};

/// Receives match/mismatch notifications while a comparison runs.
///
/// All methods default to no-ops so implementations only pick what they
/// need. Either side of a match/mismatch call may be `None` to denote
/// "no counterpart". Callbacks must not fail into the engine; fallible
/// sinks should buffer and surface errors after `compare` returns.
#[allow(unused_variables)]
pub trait NetlistCompareLogger {
    /// A comparison run begins.
    fn begin_netlist(&mut self, a: &Netlist, b: &Netlist) {}

    /// The comparison run is done.
    fn end_netlist(&mut self, a: &Netlist, b: &Netlist) {}

    /// A device class lacks a counterpart.
    fn device_class_mismatch(&mut self, a: Option<&DeviceClass>, b: Option<&DeviceClass>) {}

    /// A circuit lacks a counterpart.
    fn circuit_mismatch(&mut self, a: Option<&Circuit>, b: Option<&Circuit>) {}

    /// A circuit pair could not be compared because a subcircuit failed
    /// verification earlier.
    fn circuit_skipped(&mut self, a: &Circuit, b: &Circuit) {}

    /// Comparison of a circuit pair begins.
    fn begin_circuit(&mut self, a: &Circuit, b: &Circuit) {}

    /// Comparison of a circuit pair is done.
    fn end_circuit(&mut self, a: &Circuit, b: &Circuit, matched: bool) {}

    /// Two nets were paired.
    fn match_nets(&mut self, a: Option<&Net>, b: Option<&Net>) {}

    /// Two nets were paired, but other pairings would have been
    /// topologically equivalent.
    fn match_ambiguous_nets(&mut self, a: Option<&Net>, b: Option<&Net>) {}

    /// A net could not be paired.
    fn net_mismatch(&mut self, a: Option<&Net>, b: Option<&Net>) {}

    /// Two pins were paired.
    fn match_pins(&mut self, a: Option<&Pin>, b: Option<&Pin>) {}

    /// A pin could not be paired.
    fn pin_mismatch(&mut self, a: Option<&Pin>, b: Option<&Pin>) {}

    /// Two devices were paired.
    fn match_devices(&mut self, a: Option<&Device>, b: Option<&Device>) {}

    /// Two devices were paired topologically but their parameters
    /// differ.
    fn match_devices_with_different_parameters(
        &mut self,
        a: Option<&Device>,
        b: Option<&Device>,
    ) {
    }

    /// Two devices were paired topologically but belong to different
    /// device classes.
    fn match_devices_with_different_device_classes(
        &mut self,
        a: Option<&Device>,
        b: Option<&Device>,
    ) {
    }

    /// A device could not be paired.
    fn device_mismatch(&mut self, a: Option<&Device>, b: Option<&Device>) {}

    /// Two subcircuit instances were paired.
    fn match_subcircuits(&mut self, a: Option<&SubCircuit>, b: Option<&SubCircuit>) {}

    /// A subcircuit instance could not be paired.
    fn subcircuit_mismatch(&mut self, a: Option<&SubCircuit>, b: Option<&SubCircuit>) {}
}

/// An optional sink, threaded by reference through the engine and the
/// driver.
pub(crate) type OptLogger<'a, 'b> = Option<&'a mut (dyn NetlistCompareLogger + 'b)>;

/// One recorded comparison callback. Entity references are captured by
/// name so events outlive the netlists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareEvent {
    BeginNetlist,
    EndNetlist,
    DeviceClassMismatch {
        a: Option<String>,
        b: Option<String>,
    },
    CircuitMismatch {
        a: Option<String>,
        b: Option<String>,
    },
    CircuitSkipped {
        a: String,
        b: String,
    },
    BeginCircuit {
        a: String,
        b: String,
    },
    EndCircuit {
        a: String,
        b: String,
        matched: bool,
    },
    MatchNets {
        a: Option<String>,
        b: Option<String>,
    },
    MatchAmbiguousNets {
        a: Option<String>,
        b: Option<String>,
    },
    NetMismatch {
        a: Option<String>,
        b: Option<String>,
    },
    MatchPins {
        a: Option<String>,
        b: Option<String>,
    },
    PinMismatch {
        a: Option<String>,
        b: Option<String>,
    },
    MatchDevices {
        a: Option<String>,
        b: Option<String>,
    },
    MatchDevicesWithDifferentParameters {
        a: Option<String>,
        b: Option<String>,
    },
    MatchDevicesWithDifferentDeviceClasses {
        a: Option<String>,
        b: Option<String>,
    },
    DeviceMismatch {
        a: Option<String>,
        b: Option<String>,
    },
    MatchSubCircuits {
        a: Option<String>,
        b: Option<String>,
    },
    SubCircuitMismatch {
        a: Option<String>,
        b: Option<String>,
    },
}

/// Summary counters over a recorded comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareSummary {
    pub matched_nets: usize,
    pub ambiguous_nets: usize,
    pub matched_pins: usize,
    pub matched_devices: usize,
    pub matched_subcircuits: usize,
    pub mismatches: usize,
}

/// A sink that records every callback as a [`CompareEvent`].
///
/// Useful for tests (asserting exact event sequences) and as a simple
/// report: [`to_text`](EventLog::to_text) renders a human-readable
/// summary, and the whole log serializes with serde.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<CompareEvent>,
    summary: CompareSummary,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, in callback order.
    pub fn events(&self) -> &[CompareEvent] {
        &self.events
    }

    /// Summary counters.
    pub fn summary(&self) -> &CompareSummary {
        &self.summary
    }

    /// Whether no mismatch of any kind was recorded.
    pub fn is_clean(&self) -> bool {
        self.summary.mismatches == 0
    }

    /// Count events matching a predicate.
    pub fn count(&self, pred: impl Fn(&CompareEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    /// Render the log as a human-readable report.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Netlist comparison: {}\n",
            if self.is_clean() { "PASS" } else { "FAIL" }
        ));
        out.push_str(&format!(
            "nets: {} matched ({} ambiguous), pins: {}, devices: {}, subcircuits: {}, mismatches: {}\n",
            self.summary.matched_nets,
            self.summary.ambiguous_nets,
            self.summary.matched_pins,
            self.summary.matched_devices,
            self.summary.matched_subcircuits,
            self.summary.mismatches,
        ));
        for event in &self.events {
            match event {
                CompareEvent::CircuitSkipped { a, b } => {
                    out.push_str(&format!("  skipped: {a} vs {b}\n"));
                }
                CompareEvent::CircuitMismatch { a, b } => {
                    out.push_str(&format!(
                        "  circuit mismatch: {} vs {}\n",
                        fmt_side(a),
                        fmt_side(b)
                    ));
                }
                CompareEvent::DeviceClassMismatch { a, b } => {
                    out.push_str(&format!(
                        "  device class mismatch: {} vs {}\n",
                        fmt_side(a),
                        fmt_side(b)
                    ));
                }
                CompareEvent::NetMismatch { a, b } => {
                    out.push_str(&format!(
                        "  net mismatch: {} vs {}\n",
                        fmt_side(a),
                        fmt_side(b)
                    ));
                }
                CompareEvent::PinMismatch { a, b } => {
                    out.push_str(&format!(
                        "  pin mismatch: {} vs {}\n",
                        fmt_side(a),
                        fmt_side(b)
                    ));
                }
                CompareEvent::DeviceMismatch { a, b } => {
                    out.push_str(&format!(
                        "  device mismatch: {} vs {}\n",
                        fmt_side(a),
                        fmt_side(b)
                    ));
                }
                CompareEvent::SubCircuitMismatch { a, b } => {
                    out.push_str(&format!(
                        "  subcircuit mismatch: {} vs {}\n",
                        fmt_side(a),
                        fmt_side(b)
                    ));
                }
                _ => {}
            }
        }
        out
    }

    fn push(&mut self, event: CompareEvent) {
        self.events.push(event);
    }
}

fn fmt_side(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("(none)")
}

fn name_of<T, F: Fn(&T) -> &str>(x: Option<&T>, f: F) -> Option<String> {
    x.map(|v| f(v).to_string())
}

impl NetlistCompareLogger for EventLog {
    fn begin_netlist(&mut self, _a: &Netlist, _b: &Netlist) {
        self.push(CompareEvent::BeginNetlist);
    }

    fn end_netlist(&mut self, _a: &Netlist, _b: &Netlist) {
        self.push(CompareEvent::EndNetlist);
    }

    fn device_class_mismatch(&mut self, a: Option<&DeviceClass>, b: Option<&DeviceClass>) {
        self.summary.mismatches += 1;
        self.push(CompareEvent::DeviceClassMismatch {
            a: name_of(a, DeviceClass::name),
            b: name_of(b, DeviceClass::name),
        });
    }

    fn circuit_mismatch(&mut self, a: Option<&Circuit>, b: Option<&Circuit>) {
        self.summary.mismatches += 1;
        self.push(CompareEvent::CircuitMismatch {
            a: name_of(a, Circuit::name),
            b: name_of(b, Circuit::name),
        });
    }

    fn circuit_skipped(&mut self, a: &Circuit, b: &Circuit) {
        self.summary.mismatches += 1;
        self.push(CompareEvent::CircuitSkipped {
            a: a.name().to_string(),
            b: b.name().to_string(),
        });
    }

    fn begin_circuit(&mut self, a: &Circuit, b: &Circuit) {
        self.push(CompareEvent::BeginCircuit {
            a: a.name().to_string(),
            b: b.name().to_string(),
        });
    }

    fn end_circuit(&mut self, a: &Circuit, b: &Circuit, matched: bool) {
        self.push(CompareEvent::EndCircuit {
            a: a.name().to_string(),
            b: b.name().to_string(),
            matched,
        });
    }

    fn match_nets(&mut self, a: Option<&Net>, b: Option<&Net>) {
        self.summary.matched_nets += 1;
        self.push(CompareEvent::MatchNets {
            a: name_of(a, Net::name),
            b: name_of(b, Net::name),
        });
    }

    fn match_ambiguous_nets(&mut self, a: Option<&Net>, b: Option<&Net>) {
        self.summary.matched_nets += 1;
        self.summary.ambiguous_nets += 1;
        self.push(CompareEvent::MatchAmbiguousNets {
            a: name_of(a, Net::name),
            b: name_of(b, Net::name),
        });
    }

    fn net_mismatch(&mut self, a: Option<&Net>, b: Option<&Net>) {
        self.summary.mismatches += 1;
        self.push(CompareEvent::NetMismatch {
            a: name_of(a, Net::name),
            b: name_of(b, Net::name),
        });
    }

    fn match_pins(&mut self, a: Option<&Pin>, b: Option<&Pin>) {
        self.summary.matched_pins += 1;
        self.push(CompareEvent::MatchPins {
            a: name_of(a, Pin::name),
            b: name_of(b, Pin::name),
        });
    }

    fn pin_mismatch(&mut self, a: Option<&Pin>, b: Option<&Pin>) {
        self.summary.mismatches += 1;
        self.push(CompareEvent::PinMismatch {
            a: name_of(a, Pin::name),
            b: name_of(b, Pin::name),
        });
    }

    fn match_devices(&mut self, a: Option<&Device>, b: Option<&Device>) {
        self.summary.matched_devices += 1;
        self.push(CompareEvent::MatchDevices {
            a: name_of(a, Device::name),
            b: name_of(b, Device::name),
        });
    }

    fn match_devices_with_different_parameters(
        &mut self,
        a: Option<&Device>,
        b: Option<&Device>,
    ) {
        self.summary.mismatches += 1;
        self.push(CompareEvent::MatchDevicesWithDifferentParameters {
            a: name_of(a, Device::name),
            b: name_of(b, Device::name),
        });
    }

    fn match_devices_with_different_device_classes(
        &mut self,
        a: Option<&Device>,
        b: Option<&Device>,
    ) {
        self.summary.mismatches += 1;
        self.push(CompareEvent::MatchDevicesWithDifferentDeviceClasses {
            a: name_of(a, Device::name),
            b: name_of(b, Device::name),
        });
    }

    fn device_mismatch(&mut self, a: Option<&Device>, b: Option<&Device>) {
        self.summary.mismatches += 1;
        self.push(CompareEvent::DeviceMismatch {
            a: name_of(a, Device::name),
            b: name_of(b, Device::name),
        });
    }

    fn match_subcircuits(&mut self, a: Option<&SubCircuit>, b: Option<&SubCircuit>) {
        self.summary.matched_subcircuits += 1;
        self.push(CompareEvent::MatchSubCircuits {
            a: name_of(a, SubCircuit::name),
            b: name_of(b, SubCircuit::name),
        });
    }

    fn subcircuit_mismatch(&mut self, a: Option<&SubCircuit>, b: Option<&SubCircuit>) {
        self.summary.mismatches += 1;
        self.push(CompareEvent::SubCircuitMismatch {
            a: name_of(a, SubCircuit::name),
            b: name_of(b, SubCircuit::name),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_counters() {
        let mut log = EventLog::new();
        log.match_nets(None, None);
        log.match_ambiguous_nets(None, None);
        log.net_mismatch(None, None);
        assert_eq!(log.summary().matched_nets, 2);
        assert_eq!(log.summary().ambiguous_nets, 1);
        assert_eq!(log.summary().mismatches, 1);
        assert!(!log.is_clean());
    }

    #[test]
    fn test_event_log_serializes() {
        let mut log = EventLog::new();
        log.match_nets(None, None);
        let json = serde_json::to_string(&log).unwrap();
        let back: EventLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.events(), log.events());
    }

    #[test]
    fn test_to_text_mentions_mismatches() {
        let mut log = EventLog::new();
        log.net_mismatch(None, None);
        let text = log.to_text();
        assert!(text.contains("FAIL"));
        assert!(text.contains("net mismatch"));
    }
}
