//! The per-circuit net graph: canonical local signatures of nets.
//!
//! Every net becomes a [`NetGraphNode`] holding the sorted multiset of
//! outgoing [`Transition`]s to neighbour nets, grouped per neighbour
//! into edges. Node ordering and equality look only at the transition
//! content, never at neighbour indices, so isomorphic local
//! neighbourhoods compare equal and the deduction engine can resolve the
//! neighbours.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::debug;
use netmatch_core::{Circuit, CircuitId, NetId, Netlist, PinId, TerminalId};

use crate::categorize::{CircuitCategorizer, DeviceCategorizer};
use crate::filter::DeviceFilter;
use crate::pins::{CircuitMapper, CircuitPinMapper};

/// How many extra pins of a subcircuit each attachment links to.
///
/// Emitting all-to-all pin transitions would be quadratic per attachment
/// and indistinguishable for symmetric macros; linking a handful of
/// neighbouring pins keeps enough structure to propagate pairings. The
/// value anticipates up to four power-style pins masking a signal pin.
/// This is a tuning knob, not a derived constant.
pub const TAKE_ADDITIONAL_PINS: usize = 5;

/// One traversal through a device or a subcircuit instance, the atomic
/// element of a net's local signature.
///
/// The derived ordering is the canonical one: device transitions sort
/// before subcircuit transitions, then by category and normalized
/// from/to ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Transition {
    /// Traverses a device from one normalized terminal to another.
    Device {
        cat: usize,
        from: TerminalId,
        to: TerminalId,
    },
    /// Traverses a subcircuit instance between two normalized pins.
    SubCircuit {
        cat: usize,
        from: PinId,
        to: PinId,
    },
}

/// All transitions that lead to the same neighbour net, plus that
/// neighbour. The neighbour is recorded as a net during construction
/// and resolved to a node index by [`NetGraph::build`].
#[derive(Debug, Clone)]
pub(crate) struct Edge {
    pub transitions: Vec<Transition>,
    pub target_net: Option<NetId>,
    pub target: usize,
}

/// Pin-attachment data used to keep pin-only nets distinguishable when
/// both compared nodes have no edges at all.
#[derive(Debug, Clone)]
struct PinTiebreak {
    pin_count: usize,
    first_pin_name: Option<String>,
}

/// A net together with its sorted outgoing edges and its pairing state
/// towards the peer graph.
#[derive(Debug, Clone)]
pub(crate) struct NetGraphNode {
    net: Option<NetId>,
    other: Option<usize>,
    edges: Vec<Edge>,
    tiebreak: Option<PinTiebreak>,
}

impl NetGraphNode {
    /// The sentinel node for the null net.
    fn null() -> Self {
        Self {
            net: None,
            other: None,
            edges: Vec::new(),
            tiebreak: None,
        }
    }

    /// Build the node for one net of `circuit`.
    #[allow(clippy::too_many_arguments)]
    fn for_net(
        net_id: NetId,
        circuit: &Circuit,
        netlist: &Netlist,
        peer: &Netlist,
        device_categorizer: &mut DeviceCategorizer,
        circuit_categorizer: &mut CircuitCategorizer,
        filter: &DeviceFilter,
        circuit_map: &HashMap<CircuitId, CircuitMapper>,
        pin_mapper: &CircuitPinMapper,
    ) -> Self {
        let net = circuit.net(net_id);
        let mut edges: Vec<Edge> = Vec::new();
        let mut by_net: HashMap<Option<NetId>, usize> = HashMap::new();

        let mut push = |edges: &mut Vec<Edge>, target_net: Option<NetId>, t: Transition| {
            let slot = *by_net.entry(target_net).or_insert_with(|| {
                edges.push(Edge {
                    transitions: Vec::new(),
                    target_net,
                    target: usize::MAX,
                });
                edges.len() - 1
            });
            edges[slot].transitions.push(t);
        };

        for &(sc_id, pin_id) in net.subcircuit_pins() {
            let sc = circuit.subcircuit(sc_id);
            let inner = netlist.circuit(sc.target());
            let sc_cat = circuit_categorizer.cat_for_circuit(sc.target(), inner.name());
            let this_pin_id = pin_id;

            if inner.net_for_pin(pin_id).is_none() {
                // Abstract circuit: a self-loop towards the null net
                // makes this attachment distinguishable from no
                // attachment at all.
                push(
                    &mut edges,
                    None,
                    Transition::SubCircuit {
                        cat: sc_cat,
                        from: pin_id,
                        to: pin_id,
                    },
                );
                continue;
            }

            // No peer circuit yet; allowed for single-pin circuits.
            let Some(cm) = circuit_map.get(&sc.target()) else {
                continue;
            };
            // A pin assignment may be missing when the pin has no net.
            if cm.other_pin(pin_id).is_none() {
                continue;
            }

            // From here on, pin ids live in the canonical peer circuit's
            // pin space; pin swapping happens by normalization there.
            let canon_id = cm.other();
            let canon = resolve_circuit(netlist, peer, canon_id);
            let pin_id = pin_mapper.normalize_pin_id(
                canon_id,
                cm.other_pin(this_pin_id).expect("checked above"),
            );
            let pin_count = canon.pin_count();

            // Scan the following pins for transition targets, extending
            // the scan over pins that get skipped.
            let mut pids = Vec::with_capacity(TAKE_ADDITIONAL_PINS);
            let mut budget = TAKE_ADDITIONAL_PINS;
            let mut n = 0;
            while n < budget {
                let add = PinId::new(((pin_id.index() + n + 1) % pin_count) as u32);
                if add == pin_id {
                    break;
                }
                // Transitions to equivalent pins are intentionally left
                // out: for abstract circuits they carry no information,
                // and beyond two equivalent pins they are unpredictable.
                if cm.this_pin(add).is_some()
                    && pin_mapper.normalize_pin_id(canon_id, add) != pin_id
                {
                    pids.push(add);
                } else {
                    // skipped pins do not consume the budget
                    budget += 1;
                }
                n += 1;
            }

            for &pin2 in &pids {
                let this_pin2 = cm
                    .this_pin(pin2)
                    .expect("mapped peer pin has a local counterpart");
                if this_pin2 == this_pin_id {
                    // never traverse back to the original pin
                    continue;
                }
                let neighbour = sc.net_for_pin(this_pin2);
                push(
                    &mut edges,
                    neighbour,
                    Transition::SubCircuit {
                        cat: sc_cat,
                        from: pin_id,
                        to: pin_mapper.normalize_pin_id(canon_id, pin2),
                    },
                );
            }
        }

        for &(dev_id, term_id) in net.terminals() {
            let dev = circuit.device(dev_id);
            let class = netlist.device_class(dev.class());
            if !filter.passes(dev, class) {
                continue;
            }
            let dev_cat = device_categorizer.cat_for_class(dev.class(), class.name());
            let from = class.normalize_terminal_id(term_id);
            for t in class.terminal_ids() {
                if t != term_id {
                    push(
                        &mut edges,
                        dev.net_for_terminal(t),
                        Transition::Device {
                            cat: dev_cat,
                            from,
                            to: class.normalize_terminal_id(t),
                        },
                    );
                }
            }
        }

        for edge in &mut edges {
            edge.transitions.sort();
        }

        let tiebreak = PinTiebreak {
            pin_count: net.pin_count(),
            first_pin_name: net
                .pins()
                .first()
                .map(|&p| circuit.pin(p).name().to_string()),
        };

        Self {
            net: Some(net_id),
            other: None,
            edges,
            tiebreak: Some(tiebreak),
        }
    }

    /// The net this node stands for; `None` for the null-net sentinel.
    pub fn net(&self) -> Option<NetId> {
        self.net
    }

    /// The paired node index in the peer graph, if any.
    pub fn other(&self) -> Option<usize> {
        self.other
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Node identity: edge-by-edge equality of transition vectors, with
    /// the pin tie-break when both nodes have no edges. Neighbour
    /// indices never participate.
    pub fn content_cmp(&self, other: &Self) -> Ordering {
        match self.edges.len().cmp(&other.edges.len()) {
            Ordering::Equal => {}
            o => return o,
        }
        for (a, b) in self.edges.iter().zip(&other.edges) {
            match a.transitions.cmp(&b.transitions) {
                Ordering::Equal => {}
                o => return o,
            }
        }
        if self.edges.is_empty() {
            return self.tiebreak_cmp(other);
        }
        Ordering::Equal
    }

    fn tiebreak_cmp(&self, other: &Self) -> Ordering {
        match (&self.tiebreak, &other.tiebreak) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => {
                match a.pin_count.cmp(&b.pin_count) {
                    Ordering::Equal => {}
                    o => return o,
                }
                match (&a.first_pin_name, &b.first_pin_name) {
                    (Some(x), Some(y)) if !x.is_empty() && !y.is_empty() => x.cmp(y),
                    _ => Ordering::Equal,
                }
            }
        }
    }

    /// Targets of the maximal run of edges carrying exactly the given
    /// transition vector (binary search; edges are sorted).
    pub fn edge_group_targets(&self, transitions: &[Transition]) -> Vec<usize> {
        let start = self
            .edges
            .partition_point(|e| e.transitions.as_slice() < transitions);
        self.edges[start..]
            .iter()
            .take_while(|e| e.transitions.as_slice() == transitions)
            .map(|e| e.target)
            .collect()
    }

    fn apply_net_index(&mut self, index: &HashMap<Option<NetId>, usize>) {
        for edge in &mut self.edges {
            edge.target = *index
                .get(&edge.target_net)
                .expect("neighbour net is part of the graph");
        }
        self.edges
            .sort_by(|a, b| a.transitions.cmp(&b.transitions).then(a.target.cmp(&b.target)));
    }
}

impl PartialEq for NetGraphNode {
    fn eq(&self, other: &Self) -> bool {
        self.content_cmp(other) == Ordering::Equal
    }
}

impl Eq for NetGraphNode {}

impl PartialOrd for NetGraphNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.content_cmp(other))
    }
}

impl Ord for NetGraphNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.content_cmp(other)
    }
}

/// The net graph of one circuit, with pairing state towards a peer
/// graph. Node 0 is the sentinel for the null net.
#[derive(Debug, Clone)]
pub(crate) struct NetGraph {
    nodes: Vec<NetGraphNode>,
    net_index: HashMap<Option<NetId>, usize>,
}

impl NetGraph {
    /// Build the graph for `circuit_id` (owned by `netlist`). Nets are
    /// kept if they have at least one edge or are bound to a circuit
    /// pin; nodes are sorted so equal signatures cluster, then edge
    /// neighbours are resolved to node indices.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        netlist: &Netlist,
        peer: &Netlist,
        circuit_id: CircuitId,
        device_categorizer: &mut DeviceCategorizer,
        circuit_categorizer: &mut CircuitCategorizer,
        filter: &DeviceFilter,
        circuit_map: &HashMap<CircuitId, CircuitMapper>,
        pin_mapper: &CircuitPinMapper,
    ) -> Self {
        let circuit = netlist.circuit(circuit_id);

        let mut nodes = Vec::with_capacity(circuit.net_count() + 1);
        nodes.push(NetGraphNode::null());
        for (net_id, net) in circuit.nets() {
            let node = NetGraphNode::for_net(
                net_id,
                circuit,
                netlist,
                peer,
                device_categorizer,
                circuit_categorizer,
                filter,
                circuit_map,
                pin_mapper,
            );
            if !node.is_empty() || net.pin_count() > 0 {
                nodes.push(node);
            }
        }

        nodes.sort();

        let mut net_index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            net_index.insert(node.net(), i);
        }
        for node in &mut nodes {
            node.apply_net_index(&net_index);
        }

        debug!(
            "built net graph for circuit {}: {} nodes",
            circuit.name(),
            nodes.len()
        );

        Self { nodes, net_index }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: usize) -> &NetGraphNode {
        &self.nodes[index]
    }

    /// The node index for a net (`None` addresses the null-net node).
    pub fn node_index_for_net(&self, net: Option<NetId>) -> usize {
        *self
            .net_index
            .get(&net)
            .expect("net is part of the graph")
    }

    /// Establish an equivalence towards a node of the peer graph.
    pub fn identify(&mut self, index: usize, other_index: usize) {
        self.nodes[index].other = Some(other_index);
    }

    /// Remove the equivalence of a node.
    pub fn unidentify(&mut self, index: usize) {
        self.nodes[index].other = None;
    }
}

/// Resolve a circuit id against the netlist pair of a comparison.
pub(crate) fn resolve_circuit<'a>(a: &'a Netlist, b: &'a Netlist, id: CircuitId) -> &'a Circuit {
    if a.contains_circuit(id) {
        a.circuit(id)
    } else {
        b.circuit(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmatch_core::{DeviceClass, DeviceId};

    fn build_simple() -> (Netlist, CircuitId) {
        let mut nl = Netlist::new();
        let res = nl.add_device_class(DeviceClass::resistor("RES"));
        let c = nl.add_circuit("DIV").unwrap();
        let vin = nl.add_net(c, "VIN").unwrap();
        let vout = nl.add_net(c, "VOUT").unwrap();
        let gnd = nl.add_net(c, "GND").unwrap();
        nl.add_pin(c, "VIN", Some(vin));
        nl.add_pin(c, "VOUT", Some(vout));
        nl.add_pin(c, "GND", Some(gnd));
        nl.add_device(c, "R1", res, &[Some(vin), Some(vout)]).unwrap();
        nl.add_device(c, "R2", res, &[Some(vout), Some(gnd)]).unwrap();
        (nl, c)
    }

    fn graph_for(nl: &Netlist, c: CircuitId) -> NetGraph {
        let mut dc = DeviceCategorizer::new(false);
        let mut cc = CircuitCategorizer::new(false);
        let filter = DeviceFilter::new(-1.0, -1.0);
        let map = HashMap::new();
        let pins = CircuitPinMapper::new();
        NetGraph::build(nl, nl, c, &mut dc, &mut cc, &filter, &map, &pins)
    }

    #[test]
    fn test_transition_ordering() {
        let d = Transition::Device {
            cat: 9,
            from: TerminalId::new(0),
            to: TerminalId::new(1),
        };
        let s = Transition::SubCircuit {
            cat: 1,
            from: PinId::new(0),
            to: PinId::new(0),
        };
        // device transitions sort before subcircuit transitions
        assert!(d < s);

        let d2 = Transition::Device {
            cat: 9,
            from: TerminalId::new(0),
            to: TerminalId::new(2),
        };
        assert!(d < d2);
    }

    #[test]
    fn test_null_node_is_first() {
        let (nl, c) = build_simple();
        let g = graph_for(&nl, c);
        assert!(g.node(0).net().is_none());
        assert_eq!(g.node_index_for_net(None), 0);
    }

    #[test]
    fn test_nodes_and_edges() {
        let (nl, c) = build_simple();
        let g = graph_for(&nl, c);
        // null node + three nets
        assert_eq!(g.len(), 4);

        // VOUT touches both resistors: two edges, one per neighbour
        let vout = nl.circuit(c).net_named("VOUT").unwrap();
        let node = g.node(g.node_index_for_net(Some(vout)));
        assert_eq!(node.edges().len(), 2);
        for edge in node.edges() {
            assert_eq!(edge.transitions.len(), 1);
            assert_ne!(edge.target, usize::MAX);
        }
    }

    #[test]
    fn test_terminal_symmetry_makes_ends_equal() {
        let (nl, c) = build_simple();
        let g = graph_for(&nl, c);
        let vin = nl.circuit(c).net_named("VIN").unwrap();
        let gnd = nl.circuit(c).net_named("GND").unwrap();
        let n_vin = g.node(g.node_index_for_net(Some(vin)));
        let n_gnd = g.node(g.node_index_for_net(Some(gnd)));
        // R terminals are symmetric, so both rail nets look alike...
        assert_eq!(
            n_vin.edges()[0].transitions,
            n_gnd.edges()[0].transitions
        );
        // ...and the nodes compare equal up to the pin name tie-break,
        // which does not apply because they have edges.
        assert_eq!(n_vin.content_cmp(n_gnd), Ordering::Equal);
    }

    #[test]
    fn test_pin_only_nets_use_tiebreak() {
        let mut nl = Netlist::new();
        let c = nl.add_circuit("PINS").unwrap();
        let n1 = nl.add_net(c, "N1").unwrap();
        let n2 = nl.add_net(c, "N2").unwrap();
        nl.add_pin(c, "A", Some(n1));
        nl.add_pin(c, "B", Some(n2));

        let g = graph_for(&nl, c);
        assert_eq!(g.len(), 3);
        let i1 = g.node_index_for_net(Some(n1));
        let i2 = g.node_index_for_net(Some(n2));
        // no edges on either, the pin name decides
        assert_ne!(g.node(i1).content_cmp(g.node(i2)), Ordering::Equal);
    }

    #[test]
    fn test_abstract_subcircuit_fallback() {
        let mut nl = Netlist::new();
        let macro_c = nl.add_circuit("MACRO").unwrap();
        nl.add_pin(macro_c, "P0", None);
        nl.add_pin(macro_c, "P1", None);

        let top = nl.add_circuit("TOP").unwrap();
        let a = nl.add_net(top, "A").unwrap();
        let b = nl.add_net(top, "B").unwrap();
        nl.add_pin(top, "A", Some(a));
        nl.add_pin(top, "B", Some(b));
        nl.add_subcircuit(top, "X1", macro_c, &[Some(a), Some(b)])
            .unwrap();

        let g = graph_for(&nl, top);
        let na = g.node(g.node_index_for_net(Some(a)));
        // self-loop transition attached to the null-net node
        assert_eq!(na.edges().len(), 1);
        assert_eq!(na.edges()[0].target, 0);
        match na.edges()[0].transitions[0] {
            Transition::SubCircuit { from, to, .. } => {
                assert_eq!(from, PinId::new(0));
                assert_eq!(to, PinId::new(0));
            }
            _ => panic!("expected a subcircuit transition"),
        }
        // the two attachment pins differ, so the nets stay apart
        let nb = g.node(g.node_index_for_net(Some(b)));
        assert_ne!(na.content_cmp(nb), Ordering::Equal);
    }

    #[test]
    fn test_filtered_device_leaves_no_edges() {
        let (mut nl, c) = build_simple();
        for dev in [DeviceId::new(0), DeviceId::new(1)] {
            nl.set_device_parameter(c, dev, "R", 1e9).unwrap();
        }
        let mut dc = DeviceCategorizer::new(false);
        let mut cc = CircuitCategorizer::new(false);
        let filter = DeviceFilter::new(-1.0, 1e6);
        let map = HashMap::new();
        let pins = CircuitPinMapper::new();
        let g = NetGraph::build(&nl, &nl, c, &mut dc, &mut cc, &filter, &map, &pins);
        // nets survive through their pins, but carry no edges
        assert_eq!(g.len(), 4);
        for i in 1..g.len() {
            assert!(g.node(i).is_empty());
        }
    }
}
