//! The deduction engine: propagates net pairings from anchored nodes,
//! resolves ambiguity groups through tentative trials, and backtracks
//! with explicit rollback.
//!
//! All engine functions return `Option<usize>`: the number of new pairs
//! established, or `None` when the complexity budget is exhausted or a
//! contradiction is found. In tentative mode `None` unwinds without
//! committing anything; outside tentative mode it merely ends the
//! current propagation and the driver's iteration continues.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::ops::Range;

use log::trace;
use netmatch_core::{Circuit, Net};

use crate::equivalence::EquivalenceClasses;
use crate::graph::{NetGraph, NetGraphNode};
use crate::logger::OptLogger;

/// Shared read-only engine context for one circuit pair.
pub(crate) struct EngineEnv<'a> {
    pub circuit_a: &'a Circuit,
    pub circuit_b: &'a Circuit,
    /// Maximum backtracking recursion depth (graph jumps).
    pub max_depth: usize,
    /// Cap on the multiplicative branching factor accumulated along a
    /// deduction path.
    pub max_n_branch: usize,
}

impl<'a> EngineEnv<'a> {
    pub(crate) fn net_a(&self, node: &NetGraphNode) -> Option<&'a Net> {
        node.net().map(|id| self.circuit_a.net(id))
    }

    pub(crate) fn net_b(&self, node: &NetGraphNode) -> Option<&'a Net> {
        node.net().map(|id| self.circuit_b.net(id))
    }
}

/// Records pairings made inside a tentative scope so the scope can undo
/// them. The scope that opens a trial unwinds it explicitly, whether
/// the trial succeeded or failed; accepted pairings are re-applied
/// outside the trial.
#[derive(Debug, Default)]
pub(crate) struct TentativeLog {
    pairs: Vec<(usize, usize)>,
}

impl TentativeLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, n1: usize, n2: usize) {
        self.pairs.push((n1, n2));
    }

    /// Undo every recorded pairing on both graphs.
    pub fn unwind(self, g1: &mut NetGraph, g2: &mut NetGraph) {
        for (n1, n2) in self.pairs {
            g1.unidentify(n1);
            g2.unidentify(n2);
        }
    }
}

/// Establish a pairing on both graphs, recording it in the tentative
/// scope if one is active.
pub(crate) fn map_pair(
    g1: &mut NetGraph,
    g2: &mut NetGraph,
    n1: usize,
    n2: usize,
    tentative: Option<&mut TentativeLog>,
) {
    g1.identify(n1, n2);
    g2.identify(n2, n1);
    if let Some(log) = tentative {
        log.record(n1, n2);
    }
}

/// Derive new pairings from the already-paired node `net_index` of `g1`.
///
/// Walks the node's edges in maximal runs sharing one transition vector,
/// collects the neighbours reached through that run on both sides, and
/// hands the two candidate sets to
/// [`derive_node_identities_from_node_set`]. In tentative mode the two
/// sets must agree in size, and for groups larger than one also
/// element-wise in content, or the trial fails.
pub(crate) fn derive_node_identities(
    env: &EngineEnv<'_>,
    g1: &mut NetGraph,
    g2: &mut NetGraph,
    net_index: usize,
    depth: usize,
    n_branch: usize,
    logger: &mut OptLogger<'_, '_>,
    mut tentative: Option<&mut TentativeLog>,
    with_ambiguous: bool,
) -> Option<usize> {
    let other_index = g1
        .node(net_index)
        .other()
        .expect("deriving from an unpaired node");

    let mut new_nodes = 0;

    // Snapshot the edge groups up front; pairing mutates the graphs
    // while we walk.
    let groups: Vec<(Vec<crate::graph::Transition>, Vec<usize>)> = {
        let node = g1.node(net_index);
        let edges = node.edges();
        let mut groups = Vec::new();
        let mut i = 0;
        while i < edges.len() {
            let mut j = i + 1;
            while j < edges.len() && edges[j].transitions == edges[i].transitions {
                j += 1;
            }
            groups.push((
                edges[i].transitions.clone(),
                edges[i..j].iter().map(|e| e.target).collect(),
            ));
            i = j;
        }
        groups
    };

    for (transitions, mut nodes_a) in groups {
        let mut nodes_b = g2.node(other_index).edge_group_targets(&transitions);

        if nodes_a.is_empty() && nodes_b.is_empty() {
            continue;
        }

        nodes_a.sort_by(|&x, &y| g1.node(x).content_cmp(g1.node(y)));
        nodes_b.sort_by(|&x, &y| g2.node(x).content_cmp(g2.node(y)));

        if tentative.is_some() {
            if nodes_a.len() != nodes_b.len() {
                return None;
            }
            if nodes_a.len() > 1 {
                for (&x, &y) in nodes_a.iter().zip(&nodes_b) {
                    if g1.node(x).content_cmp(g2.node(y)) != Ordering::Equal {
                        return None;
                    }
                }
            }
        }

        match derive_node_identities_from_node_set(
            env,
            g1,
            g2,
            nodes_a,
            nodes_b,
            depth,
            n_branch,
            logger,
            tentative.as_deref_mut(),
            with_ambiguous,
        ) {
            Some(count) => new_nodes += count,
            None => {
                if tentative.is_some() {
                    return None;
                }
            }
        }
    }

    Some(new_nodes)
}

/// An interval of topologically identical, unpaired nodes on both
/// sides. Positions index into the candidate vectors.
struct NodeRange {
    num: usize,
    a: Range<usize>,
    b: Range<usize>,
}

/// Pair up two candidate node sets.
///
/// Both sets must be sorted by node content. Singleton candidates pair
/// directly and recurse; groups of identical nodes are resolved through
/// tentative trials when ambiguity resolution is enabled. Smaller
/// groups are processed first to maximize early constraint propagation.
#[allow(clippy::too_many_arguments)]
pub(crate) fn derive_node_identities_from_node_set(
    env: &EngineEnv<'_>,
    g1: &mut NetGraph,
    g2: &mut NetGraph,
    nodes_a: Vec<usize>,
    nodes_b: Vec<usize>,
    depth: usize,
    n_branch: usize,
    logger: &mut OptLogger<'_, '_>,
    mut tentative: Option<&mut TentativeLog>,
    with_ambiguous: bool,
) -> Option<usize> {
    if depth > env.max_depth {
        trace!("max depth exhausted ({} > {})", depth, env.max_depth);
        return None;
    }

    let mut new_nodes = 0;

    if nodes_a.len() == 1 && nodes_b.len() == 1 {
        let (i1, i2) = (nodes_a[0], nodes_b[0]);
        match (g1.node(i1).other(), g2.node(i2).other()) {
            (None, None) => {
                // A single candidate: take it. This may produce inexact
                // matches but keeps the pairing propagating.
                map_pair(g1, g2, i1, i2, tentative.as_deref_mut());
                if tentative.is_none() {
                    if let Some(lg) = logger.as_deref_mut() {
                        if g1.node(i1).content_cmp(g2.node(i2)) == Ordering::Equal {
                            lg.match_nets(env.net_a(g1.node(i1)), env.net_b(g2.node(i2)));
                        } else {
                            lg.net_mismatch(env.net_a(g1.node(i1)), env.net_b(g2.node(i2)));
                        }
                    }
                }
                match derive_node_identities(
                    env,
                    g1,
                    g2,
                    i1,
                    depth + 1,
                    n_branch,
                    logger,
                    tentative.as_deref_mut(),
                    with_ambiguous,
                ) {
                    Some(count) => new_nodes += count,
                    None => {
                        if tentative.is_some() {
                            return None;
                        }
                    }
                }
                new_nodes += 1;
            }
            (Some(o1), _) => {
                // contradiction?
                if o1 != i2 {
                    return None;
                }
            }
            (None, Some(_)) => {
                // mismatch of assignment state
                return None;
            }
        }
        return Some(new_nodes);
    }

    // Partition both sets into ranges of mutually identical, unpaired
    // nodes.
    let mut ranges: Vec<NodeRange> = Vec::new();
    let (mut p1, mut p2) = (0, 0);
    while p1 < nodes_a.len() && p2 < nodes_b.len() {
        if g1.node(nodes_a[p1]).other().is_some() {
            p1 += 1;
            continue;
        }
        if g2.node(nodes_b[p2]).other().is_some() {
            p2 += 1;
            continue;
        }
        match g1.node(nodes_a[p1]).content_cmp(g2.node(nodes_b[p2])) {
            Ordering::Less => {
                p1 += 1;
                continue;
            }
            Ordering::Greater => {
                p2 += 1;
                continue;
            }
            Ordering::Equal => {}
        }

        let (mut q1, mut q2) = (p1 + 1, p2 + 1);
        let mut num = 1;
        while q1 < nodes_a.len() && q2 < nodes_b.len() {
            if g1.node(nodes_a[q1]).other().is_some() {
                q1 += 1;
            } else if g2.node(nodes_b[q2]).other().is_some() {
                q2 += 1;
            } else if g1.node(nodes_a[q1]).content_cmp(g1.node(nodes_a[p1])) != Ordering::Equal
                || g2.node(nodes_b[q2]).content_cmp(g2.node(nodes_b[p2])) != Ordering::Equal
            {
                break;
            } else {
                num += 1;
                q1 += 1;
                q2 += 1;
            }
        }

        if num == 1 || with_ambiguous {
            ranges.push(NodeRange {
                num,
                a: p1..q1,
                b: p2..q2,
            });
        }
        // ambiguous nodes never match in tentative mode unless the
        // ambiguity pass allows them
        if num > 1 && tentative.is_some() && !with_ambiguous {
            return None;
        }

        p1 = q1;
        p2 = q2;
    }

    if with_ambiguous {
        // smallest groups first
        ranges.sort_by_key(|r| r.num);
    }

    for range in ranges {
        // Earlier ranges may have assigned some members; skip leading
        // assigned pairs and recount.
        let mut a_cur = range.a.start;
        let mut b_cur = range.b.start;
        while a_cur < range.a.end && b_cur < range.b.end {
            if g1.node(nodes_a[a_cur]).other().is_some() {
                a_cur += 1;
            } else if g2.node(nodes_b[b_cur]).other().is_some() {
                b_cur += 1;
            } else {
                break;
            }
        }

        let mut num = 0;
        {
            let (mut i1, mut i2) = (a_cur, b_cur);
            while i1 < range.a.end && i2 < range.b.end {
                if g1.node(nodes_a[i1]).other().is_some() {
                    i1 += 1;
                } else if g2.node(nodes_b[i2]).other().is_some() {
                    i2 += 1;
                } else {
                    num += 1;
                    i1 += 1;
                    i2 += 1;
                }
            }
        }

        if num < 1 {
            // obsolete by now
            continue;
        }

        if num == 1 {
            let (i1, i2) = (nodes_a[a_cur], nodes_b[b_cur]);
            match (g1.node(i1).other(), g2.node(i2).other()) {
                (None, None) => {
                    map_pair(g1, g2, i1, i2, tentative.as_deref_mut());
                    if tentative.is_none() {
                        if let Some(lg) = logger.as_deref_mut() {
                            if g1.node(i1).content_cmp(g2.node(i2)) == Ordering::Equal {
                                lg.match_nets(env.net_a(g1.node(i1)), env.net_b(g2.node(i2)));
                            } else {
                                lg.net_mismatch(env.net_a(g1.node(i1)), env.net_b(g2.node(i2)));
                            }
                        }
                    }
                    match derive_node_identities(
                        env,
                        g1,
                        g2,
                        i1,
                        depth + 1,
                        n_branch,
                        logger,
                        tentative.as_deref_mut(),
                        with_ambiguous,
                    ) {
                        Some(count) => new_nodes += count + 1,
                        None => {
                            if tentative.is_some() {
                                return None;
                            }
                        }
                    }
                }
                (Some(o1), _) => {
                    if o1 != i2 {
                        return None;
                    }
                }
                (None, Some(_)) => {
                    return None;
                }
            }
        } else if num * n_branch > env.max_n_branch {
            trace!(
                "max branch complexity exhausted ({} * {} > {})",
                num,
                n_branch,
                env.max_n_branch
            );
            return None;
        } else {
            trace!("analyzing ambiguity group with {} members", num);

            let mut pairs: Vec<(usize, usize)> = Vec::new();
            let mut equivalent_b: EquivalenceClasses<usize> = EquivalenceClasses::new();
            let mut seen: HashSet<usize> = HashSet::new();

            for pa in a_cur..range.a.end {
                let i1 = nodes_a[pa];
                if g1.node(i1).other().is_some() {
                    continue;
                }

                let mut any = false;
                for pb in b_cur..range.b.end {
                    let i2 = nodes_b[pb];
                    if g2.node(i2).other().is_some() {
                        continue;
                    }
                    if seen.contains(&i2) {
                        continue;
                    }

                    // Trial in a fresh tentative scope; always unwound,
                    // accepted pairs are committed below.
                    let mut trial = TentativeLog::new();
                    map_pair(g1, g2, i1, i2, Some(&mut trial));
                    let outcome = derive_node_identities(
                        env,
                        g1,
                        g2,
                        i1,
                        depth + 1,
                        num * n_branch,
                        logger,
                        Some(&mut trial),
                        with_ambiguous,
                    );
                    trial.unwind(g1, g2);

                    if let Some(count) = outcome {
                        if any {
                            // a second workable candidate: remember the
                            // equivalence, keep the first pairing
                            equivalent_b.merge(i2, pairs.last().expect("paired before").1);
                        } else {
                            new_nodes += count + 1;
                            pairs.push((i1, i2));
                            seen.insert(i2);
                            any = true;
                        }
                    }
                }

                if !any && tentative.is_some() {
                    return None;
                }
            }

            if tentative.is_none() {
                for &(i1, i2) in &pairs {
                    map_pair(g1, g2, i1, i2, None);
                    if let Some(lg) = logger.as_deref_mut() {
                        let a = env.net_a(g1.node(i1));
                        let b = env.net_b(g2.node(i2));
                        if equivalent_b.contains(i2) {
                            lg.match_ambiguous_nets(a, b);
                        } else {
                            lg.match_nets(a, b);
                        }
                    }
                }
                // and seek further from the committed pairs
                for &(i1, _) in &pairs {
                    let outcome = derive_node_identities(
                        env,
                        g1,
                        g2,
                        i1,
                        depth + 1,
                        num * n_branch,
                        logger,
                        None,
                        with_ambiguous,
                    );
                    debug_assert!(
                        outcome.is_some(),
                        "committed pairing must re-derive after a successful trial"
                    );
                }
            } else {
                for &(i1, i2) in &pairs {
                    map_pair(g1, g2, i1, i2, tentative.as_deref_mut());
                }
            }
        }
    }

    Some(new_nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::{CircuitCategorizer, DeviceCategorizer};
    use crate::filter::DeviceFilter;
    use crate::pins::CircuitPinMapper;
    use netmatch_core::{CircuitId, DeviceClass, Netlist};
    use std::collections::HashMap;

    fn chain(nl: &mut Netlist, name: &str) -> CircuitId {
        // P0 - R - n1 - R - n2 - C - P1, asymmetric enough to be unique
        let res = nl.add_device_class(DeviceClass::resistor("RES"));
        let cap = nl.add_device_class(DeviceClass::capacitor("CAP"));
        let c = nl.add_circuit(name).unwrap();
        let p0 = nl.add_net(c, "P0").unwrap();
        let n1 = nl.add_net(c, "N1").unwrap();
        let n2 = nl.add_net(c, "N2").unwrap();
        let p1 = nl.add_net(c, "P1").unwrap();
        nl.add_pin(c, "P0", Some(p0));
        nl.add_pin(c, "P1", Some(p1));
        nl.add_device(c, "R1", res, &[Some(p0), Some(n1)]).unwrap();
        nl.add_device(c, "R2", res, &[Some(n1), Some(n2)]).unwrap();
        nl.add_device(c, "C1", cap, &[Some(n2), Some(p1)]).unwrap();
        c
    }

    fn build_pair(a: &Netlist, b: &Netlist, ca: CircuitId, cb: CircuitId) -> (NetGraph, NetGraph) {
        let mut dc = DeviceCategorizer::new(false);
        let mut cc = CircuitCategorizer::new(false);
        let filter = DeviceFilter::new(-1.0, -1.0);
        let map = HashMap::new();
        let pins = CircuitPinMapper::new();
        let g1 = NetGraph::build(a, b, ca, &mut dc, &mut cc, &filter, &map, &pins);
        let g2 = NetGraph::build(b, a, cb, &mut dc, &mut cc, &filter, &map, &pins);
        (g1, g2)
    }

    #[test]
    fn test_derive_propagates_along_chain() {
        let mut a = Netlist::new();
        let mut b = Netlist::new();
        let ca = chain(&mut a, "CHAIN");
        let cb = chain(&mut b, "CHAIN");
        let (mut g1, mut g2) = build_pair(&a, &b, ca, cb);

        // seed the two endpoint nets and the null node
        g1.identify(0, 0);
        g2.identify(0, 0);
        let s1 = g1.node_index_for_net(Some(a.circuit(ca).net_named("P0").unwrap()));
        let s2 = g2.node_index_for_net(Some(b.circuit(cb).net_named("P0").unwrap()));
        map_pair(&mut g1, &mut g2, s1, s2, None);

        let env = EngineEnv {
            circuit_a: a.circuit(ca),
            circuit_b: b.circuit(cb),
            max_depth: 8,
            max_n_branch: 100,
        };
        let mut logger: OptLogger<'_, '_> = None;
        let derived = derive_node_identities(
            &env, &mut g1, &mut g2, s1, 0, 1, &mut logger, None, false,
        );
        // N1, N2 and P1 are all uniquely reachable from P0
        assert_eq!(derived, Some(3));

        // symmetric pairing invariant
        for i in 0..g1.len() {
            if let Some(j) = g1.node(i).other() {
                assert_eq!(g2.node(j).other(), Some(i));
            }
        }
    }

    #[test]
    fn test_tentative_rollback_is_exact() {
        let mut a = Netlist::new();
        let mut b = Netlist::new();
        let ca = chain(&mut a, "CHAIN");
        let cb = chain(&mut b, "CHAIN");
        let (mut g1, mut g2) = build_pair(&a, &b, ca, cb);

        g1.identify(0, 0);
        g2.identify(0, 0);
        let before_1: Vec<Option<usize>> = (0..g1.len()).map(|i| g1.node(i).other()).collect();
        let before_2: Vec<Option<usize>> = (0..g2.len()).map(|i| g2.node(i).other()).collect();

        let s1 = g1.node_index_for_net(Some(a.circuit(ca).net_named("P0").unwrap()));
        let s2 = g2.node_index_for_net(Some(b.circuit(cb).net_named("P0").unwrap()));

        let env = EngineEnv {
            circuit_a: a.circuit(ca),
            circuit_b: b.circuit(cb),
            max_depth: 8,
            max_n_branch: 100,
        };
        let mut logger: OptLogger<'_, '_> = None;
        let mut trial = TentativeLog::new();
        map_pair(&mut g1, &mut g2, s1, s2, Some(&mut trial));
        let outcome = derive_node_identities(
            &env, &mut g1, &mut g2, s1, 0, 1, &mut logger, Some(&mut trial), false,
        );
        assert!(outcome.is_some());
        trial.unwind(&mut g1, &mut g2);

        let after_1: Vec<Option<usize>> = (0..g1.len()).map(|i| g1.node(i).other()).collect();
        let after_2: Vec<Option<usize>> = (0..g2.len()).map(|i| g2.node(i).other()).collect();
        assert_eq!(before_1, after_1);
        assert_eq!(before_2, after_2);
    }

    #[test]
    fn test_depth_budget_fails_cleanly() {
        let mut a = Netlist::new();
        let mut b = Netlist::new();
        let ca = chain(&mut a, "CHAIN");
        let cb = chain(&mut b, "CHAIN");
        let (mut g1, mut g2) = build_pair(&a, &b, ca, cb);

        g1.identify(0, 0);
        g2.identify(0, 0);
        let s1 = g1.node_index_for_net(Some(a.circuit(ca).net_named("P0").unwrap()));
        let s2 = g2.node_index_for_net(Some(b.circuit(cb).net_named("P0").unwrap()));

        let env = EngineEnv {
            circuit_a: a.circuit(ca),
            circuit_b: b.circuit(cb),
            max_depth: 0,
            max_n_branch: 100,
        };
        let mut logger: OptLogger<'_, '_> = None;
        let mut trial = TentativeLog::new();
        map_pair(&mut g1, &mut g2, s1, s2, Some(&mut trial));
        let outcome = derive_node_identities(
            &env, &mut g1, &mut g2, s1, 0, 1, &mut logger, Some(&mut trial), false,
        );
        assert_eq!(outcome, None);
        trial.unwind(&mut g1, &mut g2);

        for i in 0..g1.len() {
            assert_eq!(g1.node(i).other(), if i == 0 { Some(0) } else { None });
        }
    }
}
