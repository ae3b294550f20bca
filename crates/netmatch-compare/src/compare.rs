//! The comparison driver: walks the circuit hierarchy bottom-up, builds
//! net graphs, runs the deduction engine, then classifies devices,
//! subcircuits and pins and derives pin equivalences that propagate up
//! the hierarchy.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use log::{debug, trace};
use netmatch_core::{
    Circuit, CircuitId, DeviceClassId, DeviceId, NetId, NetRef, Netlist, PinId, SubCircuitId,
    TerminalId,
};

use crate::categorize::{CircuitCategorizer, DeviceCategorizer};
use crate::deduce::{derive_node_identities, derive_node_identities_from_node_set, EngineEnv};
use crate::filter::DeviceFilter;
use crate::graph::{resolve_circuit, NetGraph};
use crate::logger::{NetlistCompareLogger, OptLogger};
use crate::pins::{CircuitMapper, CircuitPinMapper};

/// Above this many unmatched subcircuits, skip the pairing refinement
/// and report plain one-sided mismatches.
const MAX_ALIGNMENT_SET: usize = 1000;

/// Compares two netlists and reports corresponding objects and
/// mismatches through a [`NetlistCompareLogger`].
///
/// The comparer holds the caller's declarations (equivalences, seed net
/// pairs, filter thresholds); each [`compare`](NetlistComparer::compare)
/// call works on a copy of that state, so a comparer can be reused.
///
/// ```rust
/// use netmatch_compare::NetlistComparer;
/// use netmatch_core::{DeviceClass, Netlist};
///
/// let mut a = Netlist::new();
/// let res = a.add_device_class(DeviceClass::resistor("RES"));
/// let top = a.add_circuit("TOP").unwrap();
/// let n1 = a.add_net(top, "N1").unwrap();
/// let n2 = a.add_net(top, "N2").unwrap();
/// a.add_pin(top, "IN", Some(n1));
/// a.add_pin(top, "OUT", Some(n2));
/// a.add_device(top, "R1", res, &[Some(n1), Some(n2)]).unwrap();
///
/// let b = a.clone();
/// let comparer = NetlistComparer::new();
/// assert!(comparer.compare(&a, &b));
/// ```
#[derive(Debug, Clone)]
pub struct NetlistComparer {
    device_categorizer: DeviceCategorizer,
    circuit_categorizer: CircuitCategorizer,
    pin_mapper: CircuitPinMapper,
    same_nets: HashMap<(CircuitId, CircuitId), Vec<(NetId, NetId)>>,
    cap_threshold: f64,
    res_threshold: f64,
    max_depth: usize,
    max_n_branch: usize,
    case_sensitive: bool,
}

impl NetlistComparer {
    /// Create a comparer with default budgets and no filtering.
    pub fn new() -> Self {
        Self {
            device_categorizer: DeviceCategorizer::new(false),
            circuit_categorizer: CircuitCategorizer::new(false),
            pin_mapper: CircuitPinMapper::new(),
            same_nets: HashMap::new(),
            cap_threshold: -1.0,
            res_threshold: -1.0,
            max_depth: 8,
            max_n_branch: 100,
            case_sensitive: false,
        }
    }

    /// Exclude capacitors below the given capacitance from comparison.
    /// A threshold <= 0 disables the exclusion.
    pub fn exclude_caps(&mut self, threshold: f64) {
        self.cap_threshold = threshold;
    }

    /// Exclude resistors above the given resistance from comparison.
    /// A threshold <= 0 disables the exclusion.
    pub fn exclude_resistors(&mut self, threshold: f64) {
        self.res_threshold = threshold;
    }

    /// Declare a seed net pair (first from netlist A, second from B).
    pub fn same_nets(&mut self, a: NetRef, b: NetRef) {
        self.same_nets
            .entry((a.circuit, b.circuit))
            .or_default()
            .push((a.net, b.net));
    }

    /// Declare two pins of a circuit swappable.
    pub fn equivalent_pins(&mut self, circuit: CircuitId, pin1: PinId, pin2: PinId) {
        self.pin_mapper.map_pins(circuit, pin1, pin2);
    }

    /// Declare a group of pins of a circuit swappable.
    pub fn equivalent_pin_group(&mut self, circuit: CircuitId, pins: &[PinId]) {
        self.pin_mapper.map_pin_group(circuit, pins);
    }

    /// Declare two device classes equivalent (first from netlist A,
    /// second from B).
    pub fn same_device_classes(&mut self, a: DeviceClassId, b: DeviceClassId) {
        self.device_categorizer.same_class(a, b);
    }

    /// Declare two circuits equivalent (first from netlist A, second
    /// from B).
    pub fn same_circuits(&mut self, a: CircuitId, b: CircuitId) {
        self.circuit_categorizer.same_circuit(a, b);
    }

    /// Set the maximum backtracking depth (default 8).
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Set the branch complexity budget (default 100).
    pub fn set_max_branch_complexity(&mut self, max_n_branch: usize) {
        self.max_n_branch = max_n_branch;
    }

    /// Use case-sensitive name matching for circuits and device classes
    /// (default is case-insensitive).
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
        self.device_categorizer.set_case_sensitive(case_sensitive);
        self.circuit_categorizer.set_case_sensitive(case_sensitive);
    }

    /// Compare two netlists. Returns true when they are equivalent.
    pub fn compare(&self, a: &Netlist, b: &Netlist) -> bool {
        let mut logger: OptLogger<'_, '_> = None;
        self.do_compare(a, b, &mut logger)
    }

    /// Compare two netlists, reporting through the given sink.
    pub fn compare_with_logger(
        &self,
        a: &Netlist,
        b: &Netlist,
        sink: &mut dyn NetlistCompareLogger,
    ) -> bool {
        let mut logger: OptLogger<'_, '_> = Some(sink);
        self.do_compare(a, b, &mut logger)
    }

    fn do_compare(&self, a: &Netlist, b: &Netlist, logger: &mut OptLogger<'_, '_>) -> bool {
        // work on copies so the comparer stays reusable
        let mut device_categorizer = self.device_categorizer.clone();
        let mut circuit_categorizer = self.circuit_categorizer.clone();
        let mut pin_mapper = self.pin_mapper.clone();

        let mut good = true;

        let mut cat2circuits: BTreeMap<usize, (Option<CircuitId>, Option<CircuitId>)> =
            BTreeMap::new();
        for (id, c) in a.circuits() {
            let cat = circuit_categorizer.cat_for_circuit(id, c.name());
            cat2circuits.entry(cat).or_default().0 = Some(id);
        }
        for (id, c) in b.circuits() {
            let cat = circuit_categorizer.cat_for_circuit(id, c.name());
            cat2circuits.entry(cat).or_default().1 = Some(id);
        }

        if let Some(lg) = logger.as_deref_mut() {
            lg.begin_netlist(a, b);
        }

        // device classes without a counterpart
        let mut cat2dc: BTreeMap<usize, (Option<DeviceClassId>, Option<DeviceClassId>)> =
            BTreeMap::new();
        for (id, dc) in a.device_classes() {
            let cat = device_categorizer.cat_for_class(id, dc.name());
            cat2dc.entry(cat).or_default().0 = Some(id);
        }
        for (id, dc) in b.device_classes() {
            let cat = device_categorizer.cat_for_class(id, dc.name());
            cat2dc.entry(cat).or_default().1 = Some(id);
        }
        for (da, db) in cat2dc.values() {
            if da.is_none() || db.is_none() {
                good = false;
                if let Some(lg) = logger.as_deref_mut() {
                    lg.device_class_mismatch(
                        da.map(|id| a.device_class(id)),
                        db.map(|id| b.device_class(id)),
                    );
                }
            }
        }

        // circuits without a counterpart
        for (ca, cb) in cat2circuits.values() {
            if ca.is_none() || cb.is_none() {
                good = false;
                if let Some(lg) = logger.as_deref_mut() {
                    lg.circuit_mismatch(ca.map(|id| a.circuit(id)), cb.map(|id| b.circuit(id)));
                }
            }
        }

        let mut verified_a: HashSet<CircuitId> = HashSet::new();
        let mut verified_b: HashSet<CircuitId> = HashSet::new();
        let mut c12: HashMap<CircuitId, CircuitMapper> = HashMap::new();
        let mut c22: HashMap<CircuitId, CircuitMapper> = HashMap::new();

        for ca_id in a.bottom_up() {
            let cat = circuit_categorizer.cat_for_circuit(ca_id, a.circuit(ca_id).name());
            let &(opt_a, opt_b) = cat2circuits
                .get(&cat)
                .expect("every circuit is categorized");
            let (Some(ca), Some(cb)) = (opt_a, opt_b) else {
                continue;
            };

            let net_identity: &[(NetId, NetId)] = self
                .same_nets
                .get(&(ca, cb))
                .map(|v| v.as_slice())
                .unwrap_or(&[]);

            if all_subcircuits_verified(a, ca, &verified_a)
                && all_subcircuits_verified(b, cb, &verified_b)
            {
                debug!(
                    "comparing circuit {} vs {}",
                    a.circuit(ca).name(),
                    b.circuit(cb).name()
                );
                if let Some(lg) = logger.as_deref_mut() {
                    lg.begin_circuit(a.circuit(ca), b.circuit(cb));
                }

                let (g, pin_mismatch) = self.compare_circuits(
                    a,
                    b,
                    ca,
                    cb,
                    &mut device_categorizer,
                    &mut circuit_categorizer,
                    &pin_mapper,
                    net_identity,
                    &mut c12,
                    &mut c22,
                    logger,
                );
                if !g {
                    good = false;
                }
                if !pin_mismatch {
                    verified_a.insert(ca);
                    verified_b.insert(cb);
                }

                derive_pin_equivalence(a, b, ca, cb, &mut pin_mapper);

                if let Some(lg) = logger.as_deref_mut() {
                    lg.end_circuit(a.circuit(ca), b.circuit(cb), g);
                }
            } else {
                good = false;
                if let Some(lg) = logger.as_deref_mut() {
                    lg.circuit_skipped(a.circuit(ca), b.circuit(cb));
                }
            }
        }

        if let Some(lg) = logger.as_deref_mut() {
            lg.end_netlist(a, b);
        }

        good
    }

    /// Compare one pair of categorically equivalent circuits. Returns
    /// `(good, pin_mismatch)`.
    #[allow(clippy::too_many_arguments)]
    fn compare_circuits(
        &self,
        a: &Netlist,
        b: &Netlist,
        ca: CircuitId,
        cb: CircuitId,
        device_categorizer: &mut DeviceCategorizer,
        circuit_categorizer: &mut CircuitCategorizer,
        pin_mapper: &CircuitPinMapper,
        net_identity: &[(NetId, NetId)],
        c12: &mut HashMap<CircuitId, CircuitMapper>,
        c22: &mut HashMap<CircuitId, CircuitMapper>,
        logger: &mut OptLogger<'_, '_>,
    ) -> (bool, bool) {
        let filter = DeviceFilter::new(self.cap_threshold, self.res_threshold);

        // Subcircuits of both sides are rewritten into the canonical
        // B-side pin space; pin swapping happens only there.
        let mut g1 = NetGraph::build(
            a,
            b,
            ca,
            device_categorizer,
            circuit_categorizer,
            &filter,
            c12,
            pin_mapper,
        );
        let mut g2 = NetGraph::build(
            b,
            a,
            cb,
            device_categorizer,
            circuit_categorizer,
            &filter,
            c22,
            pin_mapper,
        );

        // the null-net sentinels pair with each other
        g1.identify(0, 0);
        g2.identify(0, 0);

        for &(na, nb) in net_identity {
            let ni1 = g1.node_index_for_net(Some(na));
            let ni2 = g2.node_index_for_net(Some(nb));
            g1.identify(ni1, ni2);
            g2.identify(ni2, ni1);
        }

        let env = EngineEnv {
            circuit_a: a.circuit(ca),
            circuit_b: b.circuit(cb),
            max_depth: self.max_depth,
            max_n_branch: self.max_n_branch,
        };

        // Two passes: the first forbids ambiguous groups so exact
        // matches take priority, the second allows them.
        let mut good = true;
        for pass in 0..2 {
            let with_ambiguous = pass > 0;
            good = true;
            loop {
                trace!("deduction iteration (ambiguous: {with_ambiguous})");
                let mut new_identities = 0;

                for i in 0..g1.len() {
                    if g1.node(i).other().is_some() && g1.node(i).net().is_some() {
                        if let Some(n) = derive_node_identities(
                            &env,
                            &mut g1,
                            &mut g2,
                            i,
                            0,
                            1,
                            logger,
                            None,
                            with_ambiguous,
                        ) {
                            new_identities += n;
                        }
                    }
                }

                // topological seeding: globally unique signatures pair
                // without an anchor
                let mut nodes: Vec<usize> = (0..g1.len())
                    .filter(|&i| g1.node(i).other().is_none() && g1.node(i).net().is_some())
                    .collect();
                let mut other_nodes: Vec<usize> = (0..g2.len())
                    .filter(|&i| g2.node(i).other().is_none() && g2.node(i).net().is_some())
                    .collect();

                if nodes.is_empty() || other_nodes.is_empty() {
                    good = nodes.is_empty() && other_nodes.is_empty();
                    break;
                }

                nodes.sort_by(|&x, &y| g1.node(x).content_cmp(g1.node(y)));
                other_nodes.sort_by(|&x, &y| g2.node(x).content_cmp(g2.node(y)));

                if let Some(n) = derive_node_identities_from_node_set(
                    &env,
                    &mut g1,
                    &mut g2,
                    nodes,
                    other_nodes,
                    0,
                    1,
                    logger,
                    None,
                    with_ambiguous,
                ) {
                    new_identities += n;
                }

                if new_identities == 0 {
                    good = false;
                    break;
                }
            }
        }

        // nets without an assignment
        if let Some(lg) = logger.as_deref_mut() {
            for i in 0..g1.len() {
                if g1.node(i).other().is_none() {
                    lg.net_mismatch(env.net_a(g1.node(i)), None);
                }
            }
            for i in 0..g2.len() {
                if g2.node(i).other().is_none() {
                    lg.net_mismatch(None, env.net_b(g2.node(i)));
                }
            }
        }

        let mut pin_mismatch = false;

        let c1 = a.circuit(ca);
        let c2 = b.circuit(cb);

        // Pin assignment; also establishes the pin mapping that parent
        // circuits use to rewrite their subcircuit attachments.
        if c1.pin_count() > 0 && c2.pin_count() > 0 {
            let mut floating: VecDeque<PinId> = VecDeque::new();
            let mut net2pin: BTreeMap<usize, VecDeque<PinId>> = BTreeMap::new();
            for p in c2.pins() {
                match c2.net_for_pin(p.id()) {
                    Some(net) => net2pin
                        .entry(g2.node_index_for_net(Some(net)))
                        .or_default()
                        .push_back(p.id()),
                    None => floating.push_back(p.id()),
                }
            }

            let mut m12 = CircuitMapper::new(cb);
            // the B side maps onto itself so the same graph-building
            // code applies to both sides
            let mut m22 = CircuitMapper::new(cb);

            for p in c1.pins() {
                let Some(net) = c1.net_for_pin(p.id()) else {
                    // Pins without a net pair with any remaining
                    // floating pin; derive_pin_equivalence makes the
                    // choice irrelevant upward.
                    if let Some(f) = floating.pop_front() {
                        if let Some(lg) = logger.as_deref_mut() {
                            lg.match_pins(Some(p), Some(c2.pin(f)));
                        }
                        m12.map_pin(p.id(), f);
                        m22.map_pin(f, f);
                    } else {
                        if let Some(lg) = logger.as_deref_mut() {
                            lg.pin_mismatch(Some(p), None);
                        }
                        pin_mismatch = true;
                        good = false;
                    }
                    continue;
                };

                let node = g1.node(g1.node_index_for_net(Some(net)));
                let Some(other_index) = node.other() else {
                    if let Some(lg) = logger.as_deref_mut() {
                        lg.pin_mismatch(Some(p), None);
                    }
                    pin_mismatch = true;
                    good = false;
                    continue;
                };

                match net2pin.get_mut(&other_index).and_then(VecDeque::pop_front) {
                    Some(q) => {
                        if let Some(lg) = logger.as_deref_mut() {
                            lg.match_pins(Some(p), Some(c2.pin(q)));
                        }
                        m12.map_pin(p.id(), q);
                        m22.map_pin(q, q);
                    }
                    None => {
                        if let Some(lg) = logger.as_deref_mut() {
                            lg.pin_mismatch(Some(p), None);
                        }
                        pin_mismatch = true;
                        good = false;
                    }
                }
            }

            for queue in net2pin.values() {
                for &q in queue {
                    if let Some(lg) = logger.as_deref_mut() {
                        lg.pin_mismatch(None, Some(c2.pin(q)));
                    }
                    pin_mismatch = true;
                    good = false;
                }
            }
            for &q in &floating {
                if let Some(lg) = logger.as_deref_mut() {
                    lg.pin_mismatch(None, Some(c2.pin(q)));
                }
                pin_mismatch = true;
                good = false;
            }

            c12.insert(ca, m12);
            c22.insert(cb, m22);
        } else {
            // One side has no pins at all, typical for top circuits. The
            // pins are reported as matched so they appear in the
            // cross-reference, but the circuit is not considered usable
            // inside subcircuits when the counts differ.
            if let Some(lg) = logger.as_deref_mut() {
                for p in c1.pins() {
                    lg.match_pins(Some(p), None);
                }
                for p in c2.pins() {
                    lg.match_pins(None, Some(p));
                }
            }
            if c1.pin_count() != c2.pin_count() {
                pin_mismatch = true;
            }
        }

        // device assignment by incident-net signature
        let mut device_map: BTreeMap<Vec<(TerminalId, usize)>, VecDeque<(DeviceId, usize)>> =
            BTreeMap::new();

        for (d_id, dev) in c1.devices() {
            let class = a.device_class(dev.class());
            if !filter.passes(dev, class) {
                continue;
            }
            let key = compute_device_key(a, c1, d_id, &g1);
            let mapped = key.iter().all(|&(_, ni)| g1.node(ni).other().is_some());
            if !mapped {
                if let Some(lg) = logger.as_deref_mut() {
                    lg.device_mismatch(Some(dev), None);
                }
                good = false;
            } else {
                let cat = device_categorizer.cat_for_class(dev.class(), class.name());
                device_map.entry(key).or_default().push_back((d_id, cat));
            }
        }

        for (d_id, dev) in c2.devices() {
            let class = b.device_class(dev.class());
            if !filter.passes(dev, class) {
                continue;
            }
            let mut key = compute_device_key(b, c2, d_id, &g2);
            let mut mapped = true;
            for (_, ni) in key.iter_mut() {
                match g2.node(*ni).other() {
                    Some(other) => *ni = other,
                    None => mapped = false,
                }
            }
            key.sort();

            let entry = if mapped { device_map.get_mut(&key) } else { None };
            let Some(queue) = entry else {
                if let Some(lg) = logger.as_deref_mut() {
                    lg.device_mismatch(None, Some(dev));
                }
                good = false;
                continue;
            };
            let Some((a_id, a_cat)) = queue.pop_front() else {
                if let Some(lg) = logger.as_deref_mut() {
                    lg.device_mismatch(None, Some(dev));
                }
                good = false;
                continue;
            };

            let a_dev = c1.device(a_id);
            let cat = device_categorizer.cat_for_class(dev.class(), class.name());
            let a_class = a.device_class(a_dev.class());
            if a_cat != cat {
                if let Some(lg) = logger.as_deref_mut() {
                    lg.match_devices_with_different_device_classes(Some(a_dev), Some(dev));
                }
                good = false;
            } else if !a_class.devices_equal(a_dev, dev) {
                if let Some(lg) = logger.as_deref_mut() {
                    lg.match_devices_with_different_parameters(Some(a_dev), Some(dev));
                }
                good = false;
            } else if let Some(lg) = logger.as_deref_mut() {
                lg.match_devices(Some(a_dev), Some(dev));
            }
        }

        for queue in device_map.values() {
            for &(d_id, _) in queue {
                if let Some(lg) = logger.as_deref_mut() {
                    lg.device_mismatch(Some(c1.device(d_id)), None);
                }
                good = false;
            }
        }

        // subcircuit assignment by outer-pin signature
        let mut subcircuit_map: BTreeMap<Vec<(PinId, usize)>, VecDeque<(SubCircuitId, usize)>> =
            BTreeMap::new();
        let mut unmatched_a: Vec<(Vec<(PinId, usize)>, SubCircuitId)> = Vec::new();
        let mut unmatched_b: Vec<(Vec<(PinId, usize)>, SubCircuitId)> = Vec::new();

        for (sc_id, sc) in c1.subcircuits() {
            let key = compute_subcircuit_key(a, b, c1, sc_id, &g1, c12, pin_mapper);
            let mapped = key.iter().all(|&(_, ni)| g1.node(ni).other().is_some());
            if !mapped {
                if let Some(lg) = logger.as_deref_mut() {
                    lg.subcircuit_mismatch(Some(sc), None);
                }
                good = false;
            } else if !key.is_empty() {
                let cat = circuit_categorizer
                    .cat_for_circuit(sc.target(), resolve_circuit(a, b, sc.target()).name());
                subcircuit_map.entry(key).or_default().push_back((sc_id, cat));
            }
        }

        for (sc_id, sc) in c2.subcircuits() {
            let mut key = compute_subcircuit_key(b, a, c2, sc_id, &g2, c22, pin_mapper);
            let mut mapped = true;
            for (_, ni) in key.iter_mut() {
                match g2.node(*ni).other() {
                    Some(other) => *ni = other,
                    None => mapped = false,
                }
            }
            key.sort();

            let entry = if mapped {
                subcircuit_map.get_mut(&key)
            } else {
                None
            };
            let popped = entry.and_then(VecDeque::pop_front);
            let Some((a_id, a_cat)) = popped else {
                good = false;
                if logger.is_some() {
                    unmatched_b.push((key, sc_id));
                }
                continue;
            };

            let cat = circuit_categorizer
                .cat_for_circuit(sc.target(), resolve_circuit(b, a, sc.target()).name());
            if a_cat != cat {
                if let Some(lg) = logger.as_deref_mut() {
                    lg.subcircuit_mismatch(Some(c1.subcircuit(a_id)), Some(sc));
                }
                good = false;
            } else if let Some(lg) = logger.as_deref_mut() {
                lg.match_subcircuits(Some(c1.subcircuit(a_id)), Some(sc));
            }
        }

        for (key, queue) in &subcircuit_map {
            for &(sc_id, _) in queue {
                good = false;
                if logger.is_some() {
                    unmatched_a.push((key.clone(), sc_id));
                }
            }
        }

        if logger.is_some() {
            report_unmatched_subcircuits(c1, c2, unmatched_a, unmatched_b, logger);
        }

        (good, pin_mismatch)
    }
}

impl Default for NetlistComparer {
    fn default() -> Self {
        Self::new()
    }
}

fn all_subcircuits_verified(
    netlist: &Netlist,
    circuit: CircuitId,
    verified: &HashSet<CircuitId>,
) -> bool {
    netlist.circuit(circuit).subcircuits().all(|(_, sc)| {
        // via-style single-pin subcircuits contribute no graph edges
        // and need no prior verification
        netlist.circuit(sc.target()).pin_count() <= 1 || verified.contains(&sc.target())
    })
}

/// Pins whose nets are null or floating are observationally
/// indistinguishable (typical for abstract macros); declaring them
/// mutually swappable prevents false mismatches up the hierarchy.
fn derive_pin_equivalence(
    a: &Netlist,
    b: &Netlist,
    ca: CircuitId,
    cb: CircuitId,
    pin_mapper: &mut CircuitPinMapper,
) {
    let pa = collect_pins_with_empty_nets(a.circuit(ca), ca, pin_mapper);
    let pb = collect_pins_with_empty_nets(b.circuit(cb), cb, pin_mapper);
    pin_mapper.map_pin_group(ca, &pa);
    pin_mapper.map_pin_group(cb, &pb);
}

fn collect_pins_with_empty_nets(
    circuit: &Circuit,
    id: CircuitId,
    pin_mapper: &CircuitPinMapper,
) -> Vec<PinId> {
    circuit
        .pins()
        .filter(|p| {
            let empty = match circuit.net_for_pin(p.id()) {
                None => true,
                Some(net) => circuit.net(net).is_floating(),
            };
            empty && !pin_mapper.is_mapped(id, p.id())
        })
        .map(|p| p.id())
        .collect()
}

/// A device's signature: its normalized terminals paired with the node
/// index of the attached net, sorted.
fn compute_device_key(
    netlist: &Netlist,
    circuit: &Circuit,
    device: DeviceId,
    g: &NetGraph,
) -> Vec<(TerminalId, usize)> {
    let dev = circuit.device(device);
    let class = netlist.device_class(dev.class());
    let mut key: Vec<(TerminalId, usize)> = class
        .terminal_ids()
        .map(|t| {
            (
                class.normalize_terminal_id(t),
                g.node_index_for_net(dev.net_for_terminal(t)),
            )
        })
        .collect();
    key.sort();
    key
}

/// A subcircuit's signature: its normalized (canonical-space) pins
/// paired with the node index of the outer net, sorted. Empty when the
/// inner circuit has no matched peer.
fn compute_subcircuit_key(
    netlist: &Netlist,
    peer: &Netlist,
    circuit: &Circuit,
    subcircuit: SubCircuitId,
    g: &NetGraph,
    circuit_map: &HashMap<CircuitId, CircuitMapper>,
    pin_mapper: &CircuitPinMapper,
) -> Vec<(PinId, usize)> {
    let sc = circuit.subcircuit(subcircuit);
    let Some(cm) = circuit_map.get(&sc.target()) else {
        return Vec::new();
    };
    let canon_id = cm.other();
    let canon = resolve_circuit(netlist, peer, canon_id);

    let mut key = Vec::new();
    for p in canon.pins() {
        if let Some(this_pin) = cm.this_pin(p.id()) {
            let pin_id = pin_mapper.normalize_pin_id(canon_id, p.id());
            let net = sc.net_for_pin(this_pin);
            key.push((pin_id, g.node_index_for_net(net)));
        }
    }
    key.sort();
    key
}

/// Pair up leftover subcircuits for reporting: not matches, but more
/// informative than two one-sided lists. Keys of equal length are
/// refined by a greedy pair-swap pass minimizing the summed squared
/// key/index distance.
fn report_unmatched_subcircuits(
    c1: &Circuit,
    c2: &Circuit,
    mut unmatched_a: Vec<(Vec<(PinId, usize)>, SubCircuitId)>,
    mut unmatched_b: Vec<(Vec<(PinId, usize)>, SubCircuitId)>,
    logger: &mut OptLogger<'_, '_>,
) {
    let Some(lg) = logger.as_deref_mut() else {
        return;
    };

    if unmatched_a.len() + unmatched_b.len() > MAX_ALIGNMENT_SET {
        // analysis would be a waste of time at this size
        for (_, sc) in &unmatched_a {
            lg.subcircuit_mismatch(Some(c1.subcircuit(*sc)), None);
        }
        for (_, sc) in &unmatched_b {
            lg.subcircuit_mismatch(None, Some(c2.subcircuit(*sc)));
        }
        return;
    }

    unmatched_a.sort_by_key(|(key, _)| key.len());
    unmatched_b.sort_by_key(|(key, _)| key.len());

    let (mut i, mut j) = (0, 0);
    loop {
        if i == unmatched_a.len() {
            for (_, sc) in &unmatched_b[j..] {
                lg.subcircuit_mismatch(None, Some(c2.subcircuit(*sc)));
            }
            break;
        }
        if j == unmatched_b.len() {
            for (_, sc) in &unmatched_a[i..] {
                lg.subcircuit_mismatch(Some(c1.subcircuit(*sc)), None);
            }
            break;
        }

        let len_a = unmatched_a[i].0.len();
        let len_b = unmatched_b[j].0.len();
        if len_a < len_b {
            lg.subcircuit_mismatch(Some(c1.subcircuit(unmatched_a[i].1)), None);
            i += 1;
            continue;
        }
        if len_b < len_a {
            lg.subcircuit_mismatch(None, Some(c2.subcircuit(unmatched_b[j].1)));
            j += 1;
            continue;
        }

        let (i0, j0) = (i, j);
        while i < unmatched_a.len() && unmatched_a[i].0.len() == len_a {
            i += 1;
        }
        while j < unmatched_b.len() && unmatched_b[j].0.len() == len_a {
            j += 1;
        }

        for (x, y) in align_group(&unmatched_a[i0..i], &unmatched_b[j0..j]) {
            match (x, y) {
                (Some(x), Some(y)) => lg.subcircuit_mismatch(
                    Some(c1.subcircuit(unmatched_a[i0 + x].1)),
                    Some(c2.subcircuit(unmatched_b[j0 + y].1)),
                ),
                (Some(x), None) => {
                    lg.subcircuit_mismatch(Some(c1.subcircuit(unmatched_a[i0 + x].1)), None)
                }
                (None, Some(y)) => {
                    lg.subcircuit_mismatch(None, Some(c2.subcircuit(unmatched_b[j0 + y].1)))
                }
                (None, None) => {}
            }
        }
    }
}

/// Greedy pair-swap alignment of two equal-key-length groups. Returns
/// per-slot pairings of positions within the groups; the shorter side
/// is padded with `None`.
fn align_group(
    ga: &[(Vec<(PinId, usize)>, SubCircuitId)],
    gb: &[(Vec<(PinId, usize)>, SubCircuitId)],
) -> Vec<(Option<usize>, Option<usize>)> {
    let n = ga.len().max(gb.len());
    let vi: Vec<Option<usize>> = (0..n).map(|x| (x < ga.len()).then_some(x)).collect();
    let mut vj: Vec<Option<usize>> = (0..n).map(|x| (x < gb.len()).then_some(x)).collect();

    if n > 1 {
        let dist = |x: usize, y: usize| key_distance(&ga[x].0, &gb[y].0);
        loop {
            let mut swapped = false;
            for x in 0..n {
                for y in x + 1..n {
                    let (Some(ax), Some(bx), Some(ay), Some(by)) = (vi[x], vj[x], vi[y], vj[y])
                    else {
                        continue;
                    };
                    if dist(ax, by) + dist(ay, bx) < dist(ax, bx) + dist(ay, by) {
                        vj.swap(x, y);
                        swapped = true;
                    }
                }
            }
            if !swapped {
                break;
            }
        }
    }

    vi.into_iter().zip(vj).collect()
}

fn key_distance(a: &[(PinId, usize)], b: &[(PinId, usize)]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(&(pa, na), &(pb, nb))| {
            let dp = pa.index() as f64 - pb.index() as f64;
            let dn = na as f64 - nb as f64;
            dp * dp + dn * dn
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmatch_core::DeviceClass;

    fn divider(name: &str) -> (Netlist, CircuitId) {
        let mut nl = Netlist::new();
        let res = nl.add_device_class(DeviceClass::resistor("RES"));
        let top = nl.add_circuit(name).unwrap();
        let vin = nl.add_net(top, "VIN").unwrap();
        let vout = nl.add_net(top, "VOUT").unwrap();
        let gnd = nl.add_net(top, "GND").unwrap();
        nl.add_pin(top, "VIN", Some(vin));
        nl.add_pin(top, "VOUT", Some(vout));
        nl.add_pin(top, "GND", Some(gnd));
        nl.add_device(top, "R1", res, &[Some(vin), Some(vout)]).unwrap();
        nl.add_device(top, "R2", res, &[Some(vout), Some(gnd)]).unwrap();
        (nl, top)
    }

    #[test]
    fn test_identical_dividers_match() {
        let (a, _) = divider("DIV");
        let (b, _) = divider("DIV");
        assert!(NetlistComparer::new().compare(&a, &b));
    }

    #[test]
    fn test_missing_device_is_reported() {
        let (a, _) = divider("DIV");
        let (mut b, top) = divider("DIV");
        let res = b.device_classes().next().unwrap().0;
        let vout = b.circuit(top).net_named("VOUT").unwrap();
        let gnd = b.circuit(top).net_named("GND").unwrap();
        b.add_device(top, "R3", res, &[Some(vout), Some(gnd)]).unwrap();
        assert!(!NetlistComparer::new().compare(&a, &b));
    }

    #[test]
    fn test_align_group_prefers_similar_keys() {
        let keys_a = vec![
            (vec![(PinId::new(0), 1)], SubCircuitId::new(0)),
            (vec![(PinId::new(0), 9)], SubCircuitId::new(1)),
        ];
        let keys_b = vec![
            (vec![(PinId::new(0), 9)], SubCircuitId::new(0)),
            (vec![(PinId::new(0), 1)], SubCircuitId::new(1)),
        ];
        let pairing = align_group(&keys_a, &keys_b);
        // swapped so near-identical keys line up
        assert_eq!(pairing, vec![(Some(0), Some(1)), (Some(1), Some(0))]);
    }

    #[test]
    fn test_key_distance_symmetric_groups() {
        let a = vec![(PinId::new(0), 3), (PinId::new(1), 5)];
        let b = vec![(PinId::new(0), 3), (PinId::new(1), 5)];
        assert_eq!(key_distance(&a, &b), 0.0);
    }
}
