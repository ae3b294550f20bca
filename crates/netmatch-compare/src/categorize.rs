//! Category assignment for device classes and circuits.
//!
//! A category is an integer id identifying equivalent entities from
//! netlist A and B. Two entities share a category if the caller declared
//! them equivalent or, as a fallback, if their canonicalized names match.
//! Category 0 is reserved for "none" and is never allocated.

use std::collections::HashMap;

use netmatch_core::{CircuitId, DeviceClassId};

/// Assigns category ids to device classes.
///
/// Caller-declared equivalences merge categories through a union-find,
/// so A≡C declared after A≡B relabels all three to one category.
#[derive(Debug, Clone)]
pub struct DeviceCategorizer {
    by_class: HashMap<DeviceClassId, usize>,
    by_name: HashMap<String, usize>,
    /// Union-find over allocated category ids; index 0 is a dummy for
    /// the reserved "none" category.
    parent: Vec<usize>,
    case_sensitive: bool,
}

impl DeviceCategorizer {
    pub(crate) fn new(case_sensitive: bool) -> Self {
        Self {
            by_class: HashMap::new(),
            by_name: HashMap::new(),
            parent: vec![0],
            case_sensitive,
        }
    }

    pub(crate) fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
    }

    /// Declare two device classes equivalent.
    pub fn same_class(&mut self, a: DeviceClassId, b: DeviceClassId) {
        let ca = self.by_class.get(&a).copied();
        let cb = self.by_class.get(&b).copied();
        match (ca, cb) {
            (Some(ca), Some(cb)) => {
                let ra = self.resolve(ca);
                let rb = self.resolve(cb);
                if ra != rb {
                    self.parent[rb] = ra;
                }
            }
            (Some(ca), None) => {
                self.by_class.insert(b, ca);
            }
            (None, Some(cb)) => {
                self.by_class.insert(a, cb);
            }
            (None, None) => {
                let cat = self.alloc();
                self.by_class.insert(a, cat);
                self.by_class.insert(b, cat);
            }
        }
    }

    /// Category for a device class, allocating one on first sight.
    /// Lookup is by id first, then by canonicalized name.
    pub fn cat_for_class(&mut self, id: DeviceClassId, name: &str) -> usize {
        if let Some(&cat) = self.by_class.get(&id) {
            return self.resolve(cat);
        }
        let key = canonical_name(name, self.case_sensitive);
        if let Some(&cat) = self.by_name.get(&key) {
            self.by_class.insert(id, cat);
            return self.resolve(cat);
        }
        let cat = self.alloc();
        self.by_name.insert(key, cat);
        self.by_class.insert(id, cat);
        cat
    }

    fn alloc(&mut self) -> usize {
        let cat = self.parent.len();
        self.parent.push(cat);
        cat
    }

    fn resolve(&self, mut cat: usize) -> usize {
        while self.parent[cat] != cat {
            cat = self.parent[cat];
        }
        cat
    }
}

/// Assigns category ids to circuits.
///
/// Unlike device classes, a declared equivalence always allocates a
/// fresh category for the pair; at most one equivalence per circuit is
/// supported (3-way declarations are not merged).
#[derive(Debug, Clone)]
pub struct CircuitCategorizer {
    by_circuit: HashMap<CircuitId, usize>,
    by_name: HashMap<String, usize>,
    next_cat: usize,
    case_sensitive: bool,
}

impl CircuitCategorizer {
    pub(crate) fn new(case_sensitive: bool) -> Self {
        Self {
            by_circuit: HashMap::new(),
            by_name: HashMap::new(),
            next_cat: 0,
            case_sensitive,
        }
    }

    pub(crate) fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
    }

    /// Declare two circuits equivalent.
    pub fn same_circuit(&mut self, a: CircuitId, b: CircuitId) {
        self.next_cat += 1;
        let cat = self.next_cat;
        self.by_circuit.entry(a).or_insert(cat);
        self.by_circuit.entry(b).or_insert(cat);
    }

    /// Category for a circuit, allocating one on first sight. Lookup is
    /// by id first, then by canonicalized name.
    pub fn cat_for_circuit(&mut self, id: CircuitId, name: &str) -> usize {
        if let Some(&cat) = self.by_circuit.get(&id) {
            return cat;
        }
        let key = canonical_name(name, self.case_sensitive);
        if let Some(&cat) = self.by_name.get(&key) {
            self.by_circuit.insert(id, cat);
            return cat;
        }
        self.next_cat += 1;
        let cat = self.next_cat;
        self.by_name.insert(key, cat);
        self.by_circuit.insert(id, cat);
        cat
    }
}

fn canonical_name(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_uppercase()
    }
}
