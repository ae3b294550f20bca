//! Threshold-based suppression of negligible R/C devices.

use netmatch_core::{Device, DeviceClass, DeviceKind};

/// Decides which devices take part in graph building and device
/// matching. Large resistors behave like opens, as do very small
/// capacitors; stripping them avoids spurious edges. Applied uniformly
/// to both netlists so the graphs stay comparable.
#[derive(Debug, Clone, Copy)]
pub struct DeviceFilter {
    cap_threshold: f64,
    res_threshold: f64,
}

impl DeviceFilter {
    /// Create a filter. Thresholds <= 0 disable the respective rule.
    pub fn new(cap_threshold: f64, res_threshold: f64) -> Self {
        Self {
            cap_threshold,
            res_threshold,
        }
    }

    /// Whether the device participates in comparison.
    pub fn passes(&self, device: &Device, class: &DeviceClass) -> bool {
        match class.kind() {
            DeviceKind::Resistor if self.res_threshold > 0.0 => {
                match class.parameter_id("R") {
                    Some(r) => device.parameter_value(r) <= self.res_threshold,
                    None => true,
                }
            }
            DeviceKind::Capacitor if self.cap_threshold > 0.0 => {
                match class.parameter_id("C") {
                    Some(c) => device.parameter_value(c) >= self.cap_threshold,
                    None => true,
                }
            }
            _ => true,
        }
    }
}
