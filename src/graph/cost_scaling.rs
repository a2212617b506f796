//! Goldberg-Tarjan cost-scaling push/relabel minimum-cost flow.
//!
//! See Goldberg & Tarjan, "Finding Minimum-Cost Circulations by Successive
//! Approximation", Math. of Op. Research, Vol. 15, No. 3 (Aug. 1990).
//!
//! The reduced cost here is deliberately **not** the same convention as
//! [`super::search`]/[`super::flow`]: this module uses
//! `c̄(a) = cost[a] + potential[head(a)] - potential[tail(a)]`, the
//! Goldberg-Tarjan form, while the successive-shortest-path code uses
//! `cost[a] - potential[tail(a)] + potential[head(a)]`. They differ only in
//! the potential's sign, but mixing them up silently produces wrong answers,
//! so the two modules are kept independent rather than sharing one
//! `reduced_cost` helper.

use std::collections::VecDeque;
use tracing::{debug, trace};

use super::{ArcId, Graph, NodeId};
use crate::error::NetflowError;

/// Tunable heuristics for [`goldberg_tarjan_mcf_with_options`]. Defaults
/// match the reference implementation's hardcoded behavior (every heuristic
/// enabled, refinement factor 8).
#[derive(Debug, Clone, Copy)]
pub struct CostScalingOptions {
    /// Divisor applied to epsilon between successive refine phases.
    pub refinement_factor: i64,
    /// Relabel a neighbor lacking an admissible arc before pushing to it.
    /// Only helps when combined with `max_relabel`.
    pub lookahead: bool,
    /// When relabeling, jump directly to the largest epsilon-admissible
    /// potential instead of incrementing by epsilon.
    pub max_relabel: bool,
    /// Periodically relabel the whole "cannot reach a sink" node set at
    /// once (price update / set-relabel), instead of one node at a time.
    pub price_update: bool,
}

impl Default for CostScalingOptions {
    fn default() -> Self {
        Self {
            refinement_factor: 8,
            lookahead: true,
            max_relabel: true,
            price_update: true,
        }
    }
}

#[inline]
fn gt_reduced_cost(cost: &[i64], potential: &[i64], arc_idx: usize, from: usize, to: usize) -> i64 {
    cost[arc_idx] + potential[to] - potential[from]
}

fn gt_push(graph: &Graph, a: ArcId, flow: i64, residual_capacity: &mut [i64], excess: &mut [i64]) {
    let dual = graph.dual(a);
    let from = graph.tail(a);
    let to = graph.head(a);
    residual_capacity[a.index()] -= flow;
    residual_capacity[dual.index()] += flow;
    excess[from.index()] -= flow;
    excess[to.index()] += flow;
}

/// Push/relabel auxiliary for the feasibility phase: relabels by potential-1
/// steps, capped at `max_label`, which bounds the work at `O(V^2 E)`.
fn gt_discharge_feasible(
    graph: &Graph,
    nodeidx: u32,
    residual_capacity: &mut [i64],
    excess: &mut [i64],
    potential: &mut [i64],
    active: &mut VecDeque<u32>,
    max_label: i64,
) {
    let node = NodeId(nodeidx);
    while potential[nodeidx as usize] < max_label && excess[nodeidx as usize] > 0 {
        let mut min_label = i64::MAX;

        for a in graph.adjacency(node) {
            if excess[nodeidx as usize] <= 0 {
                break;
            }
            let next = graph.head(a);
            if residual_capacity[a.index()] <= 0 {
                continue;
            }
            if potential[nodeidx as usize] > potential[next.index()] {
                let flow = excess[nodeidx as usize].min(residual_capacity[a.index()]);
                let old_excess = excess[next.index()];
                gt_push(graph, a, flow, residual_capacity, excess);

                if excess[next.index()] > 0 && old_excess <= 0 && potential[next.index()] < max_label {
                    active.push_back(next.0);
                }
            } else {
                min_label = min_label.min(potential[next.index()]);
            }
        }

        if excess[nodeidx as usize] > 0 {
            if min_label < i64::MAX && min_label >= potential[nodeidx as usize] {
                potential[nodeidx as usize] = min_label + 1;
            } else {
                potential[nodeidx as usize] += 1;
            }
        }
    }
}

/// Finds a feasible flow satisfying `supply` via push/relabel (no cost
/// involved), writing the result into `residual_capacity`. `supply[i] > 0`
/// marks a source, `supply[i] < 0` a sink; on success every entry is zeroed.
/// Returns false, with `supply` left non-zero at some node, if no feasible
/// flow exists.
pub fn goldberg_tarjan_feasible(graph: &Graph, supply: &mut [i64], residual_capacity: &mut [i64]) -> bool {
    assert_eq!(supply.len(), graph.max_nodes());
    assert_eq!(residual_capacity.len(), graph.max_arcs());

    let max_num_nodes = graph.max_nodes();
    let mut potential = vec![0i64; max_num_nodes];
    let mut active: VecDeque<u32> = VecDeque::new();
    let max_label = max_num_nodes as i64;

    for node_id in 0..max_num_nodes as u32 {
        if supply[node_id as usize] > 0 {
            potential[node_id as usize] = 1;
            active.push_back(node_id);
        }
    }

    while let Some(node) = active.pop_front() {
        gt_discharge_feasible(graph, node, residual_capacity, supply, &mut potential, &mut active, max_label);
    }

    let solved = supply.iter().all(|&e| e == 0);
    trace!(solved, "goldberg_tarjan_feasible finished");
    solved
}

fn gt_has_admissible_arc(
    graph: &Graph,
    nodeidx: u32,
    residual_capacity: &[i64],
    cost: &[i64],
    potential: &[i64],
    current_arc: &mut [ArcId],
) -> bool {
    for a in graph.adjacency_from(current_arc[nodeidx as usize]) {
        let next = graph.head(a);
        let rcost = gt_reduced_cost(cost, potential, a.index(), nodeidx as usize, next.index());
        if residual_capacity[a.index()] > 0 && rcost < 0 {
            current_arc[nodeidx as usize] = a;
            return true;
        }
    }
    false
}

#[allow(clippy::too_many_arguments)]
fn gt_mcf_relabel(
    graph: &Graph,
    nodeidx: u32,
    epsilon: i64,
    residual_capacity: &[i64],
    cost: &[i64],
    potential: &mut [i64],
    current_arc: &mut [ArcId],
    max_relabel: bool,
) {
    let node = NodeId(nodeidx);
    potential[nodeidx as usize] += epsilon;
    current_arc[nodeidx as usize] = graph.adjacency(node).next().unwrap_or(ArcId::INVALID);

    if !max_relabel {
        return;
    }

    let mut smallest_cost = i64::MAX;
    let mut first_residual_arc = ArcId::INVALID;
    for a in graph.adjacency(node) {
        if residual_capacity[a.index()] <= 0 {
            continue;
        }
        let next = graph.head(a);
        let rcost = cost[a.index()] + potential[next.index()];

        if smallest_cost == i64::MAX {
            first_residual_arc = a;
        }
        if rcost < potential[nodeidx as usize] {
            current_arc[nodeidx as usize] = a;
            return;
        }
        smallest_cost = smallest_cost.min(rcost);
    }

    if smallest_cost < i64::MAX {
        potential[nodeidx as usize] = smallest_cost + epsilon;
        current_arc[nodeidx as usize] = first_residual_arc;
    }
}

#[allow(clippy::too_many_arguments)]
fn gt_mcf_discharge(
    graph: &Graph,
    nodeidx: u32,
    epsilon: i64,
    residual_capacity: &mut [i64],
    excess: &mut [i64],
    cost: &[i64],
    potential: &mut [i64],
    current_arc: &mut [ArcId],
    active: &mut VecDeque<u32>,
    options: &CostScalingOptions,
) -> u32 {
    let mut num_relabels = 0u32;

    while excess[nodeidx as usize] > 0 {
        let mut last_arc = ArcId::INVALID;

        for a in graph.adjacency_from(current_arc[nodeidx as usize]) {
            if excess[nodeidx as usize] <= 0 {
                last_arc = a;
                break;
            }
            let next = graph.head(a);
            if residual_capacity[a.index()] <= 0 {
                last_arc = ArcId::INVALID;
                continue;
            }
            let mut rcost = gt_reduced_cost(cost, potential, a.index(), nodeidx as usize, next.index());
            if rcost >= 0 {
                last_arc = ArcId::INVALID;
                continue;
            }

            let flow = excess[nodeidx as usize].min(residual_capacity[a.index()]);
            assert!(flow > 0, "gt_mcf_discharge: non-positive admissible flow");
            let old_excess = excess[next.index()];

            if options.lookahead
                && old_excess >= 0
                && !gt_has_admissible_arc(graph, next.0, residual_capacity, cost, potential, current_arc)
            {
                num_relabels += 1;
                gt_mcf_relabel(graph, next.0, epsilon, residual_capacity, cost, potential, current_arc, options.max_relabel);
                rcost = gt_reduced_cost(cost, potential, a.index(), nodeidx as usize, next.index());
                if rcost >= 0 {
                    last_arc = ArcId::INVALID;
                    continue;
                }
            }

            gt_push(graph, a, flow, residual_capacity, excess);
            if excess[next.index()] > 0 && old_excess <= 0 {
                active.push_back(next.0);
            }

            if excess[nodeidx as usize] == 0 {
                last_arc = a;
                break;
            }
            last_arc = ArcId::INVALID;
        }

        current_arc[nodeidx as usize] = if last_arc.is_valid() { last_arc } else { ArcId::INVALID };

        if excess[nodeidx as usize] > 0 {
            num_relabels += 1;
            gt_mcf_relabel(graph, nodeidx, epsilon, residual_capacity, cost, potential, current_arc, options.max_relabel);
        }
    }
    num_relabels
}

/// Relabels every node that cannot reach a deficit node by an admissible
/// path in one pass, instead of one relabel at a time. Returns true iff any
/// node was relabeled.
fn gt_set_relabel(
    graph: &Graph,
    epsilon: i64,
    residual_capacity: &[i64],
    excess: &[i64],
    cost: &[i64],
    potential: &mut [i64],
    current_arc: &mut [ArcId],
) -> bool {
    let max_num_nodes = graph.max_nodes();
    let mut visited = vec![false; max_num_nodes];
    let mut pending: VecDeque<u32> = VecDeque::new();
    let mut set_excess = 0i64;

    for nodeidx in 0..max_num_nodes as u32 {
        if excess[nodeidx as usize] < 0 {
            visited[nodeidx as usize] = true;
            pending.push_back(nodeidx);
            set_excess += excess[nodeidx as usize];
        }
    }

    while let Some(nodeidx) = pending.pop_front() {
        if set_excess >= 0 {
            break;
        }
        let node = NodeId(nodeidx);
        for a in graph.adjacency(node) {
            let dual = graph.dual(a);
            let next = graph.head(a);
            let rcost = gt_reduced_cost(cost, potential, dual.index(), next.index(), nodeidx as usize);

            if residual_capacity[dual.index()] <= 0 || rcost >= 0 {
                continue;
            }
            if !visited[next.index()] {
                visited[next.index()] = true;
                pending.push_back(next.0);
                set_excess += excess[next.index()];
            }
        }
    }
    assert!(set_excess <= 0, "gt_set_relabel: visited set has positive excess");

    if set_excess == 0 {
        return false;
    }

    let mut did_relabel = false;
    for nodeidx in 0..max_num_nodes as u32 {
        if !visited[nodeidx as usize] {
            potential[nodeidx as usize] += epsilon;
            did_relabel = true;
            current_arc[nodeidx as usize] = graph.adjacency(NodeId(nodeidx)).next().unwrap_or(ArcId::INVALID);
        }
    }
    did_relabel
}

#[allow(clippy::too_many_arguments)]
fn gt_refine(
    graph: &Graph,
    epsilon: i64,
    residual_capacity: &mut [i64],
    excess: &mut [i64],
    cost: &[i64],
    potential: &mut [i64],
    current_arc: &mut [ArcId],
    options: &CostScalingOptions,
) {
    let max_num_nodes = graph.max_nodes();
    let mut active: VecDeque<u32> = VecDeque::new();

    for nodeidx in 0..max_num_nodes as u32 {
        current_arc[nodeidx as usize] = graph.adjacency(NodeId(nodeidx)).next().unwrap_or(ArcId::INVALID);
    }

    for i in 0..graph.max_arcs() {
        let a = ArcId(i as u32);
        if !graph.arc_enabled(a) {
            continue;
        }
        let to = graph.head(a);
        let from = graph.tail(a);
        let rcost = gt_reduced_cost(cost, potential, i, from.index(), to.index());
        let flow = residual_capacity[i];
        if rcost < 0 && flow > 0 {
            gt_push(graph, a, flow, residual_capacity, excess);
        }
    }

    for nodeidx in 0..max_num_nodes as u32 {
        if excess[nodeidx as usize] > 0 {
            active.push_back(nodeidx);
        }
    }

    let mut num_relabels = 0u32;
    while let Some(nodeidx) = active.pop_front() {
        if options.price_update && num_relabels >= max_num_nodes as u32 {
            num_relabels = 0;
            while gt_set_relabel(graph, epsilon, residual_capacity, excess, cost, potential, current_arc) {}
        }
        num_relabels += gt_mcf_discharge(
            graph, nodeidx, epsilon, residual_capacity, excess, cost, potential, current_arc, &mut active, options,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn goldberg_tarjan_circulation(
    graph: &Graph,
    mut epsilon: i64,
    residual_capacity: &mut [i64],
    excess: &mut [i64],
    cost: &[i64],
    potential: &mut [i64],
    current_arc: &mut [ArcId],
    options: &CostScalingOptions,
) {
    while epsilon > 1 {
        epsilon /= options.refinement_factor;
        epsilon = epsilon.max(1);
        debug!(epsilon, "goldberg_tarjan: refine phase");
        gt_refine(graph, epsilon, residual_capacity, excess, cost, potential, current_arc, options);
    }
}

/// Minimum-cost flow via cost-scaling push/relabel. `supply[i] > 0` marks a
/// source, `supply[i] < 0` a sink; `cost[dual(a)]` must equal `-cost[a]` for
/// every enabled arc. Writes the solution into `residual_capacity` and
/// zeroes `supply` on success.
///
/// Returns false if no feasible flow exists; the cost-scaling phase itself
/// never fails once feasibility is established.
pub fn goldberg_tarjan_mcf(graph: &Graph, supply: &mut [i64], residual_capacity: &mut [i64], cost: &[i64]) -> bool {
    goldberg_tarjan_mcf_with_options(graph, supply, residual_capacity, cost, &CostScalingOptions::default())
}

/// As [`goldberg_tarjan_mcf`], with explicit heuristic tuning.
///
/// # Panics
///
/// Panics if scaling the largest arc cost by `max_num_nodes` would overflow
/// `i64`.
pub fn goldberg_tarjan_mcf_with_options(
    graph: &Graph,
    supply: &mut [i64],
    residual_capacity: &mut [i64],
    cost: &[i64],
    options: &CostScalingOptions,
) -> bool {
    assert_eq!(supply.len(), graph.max_nodes());
    assert_eq!(residual_capacity.len(), graph.max_arcs());
    assert_eq!(cost.len(), graph.max_arcs());

    if !goldberg_tarjan_feasible(graph, supply, residual_capacity) {
        return false;
    }

    let max_num_nodes = graph.max_nodes();
    let max_num_arcs = graph.max_arcs();
    let scale_factor = max_num_nodes as i64;

    let mut scaled_cost = vec![0i64; max_num_arcs];
    let mut max_epsilon = 0i64;
    for i in 0..max_num_arcs {
        let a = ArcId(i as u32);
        if graph.arc_enabled(a) {
            max_epsilon = max_epsilon.max(cost[i]);
            scaled_cost[i] = cost[i].checked_mul(scale_factor).expect("cost scaling overflow");
        }
    }
    let epsilon0 = max_epsilon
        .checked_mul(scale_factor)
        .expect("epsilon0 overflow: arc costs too large relative to node count");

    let mut potential = vec![0i64; max_num_nodes];
    let mut current_arc = vec![ArcId::INVALID; max_num_nodes];

    goldberg_tarjan_circulation(
        graph, epsilon0, residual_capacity, supply, &scaled_cost, &mut potential, &mut current_arc, options,
    );

    debug!("goldberg_tarjan_mcf: circulation complete");
    true
}

/// Validating wrapper around [`goldberg_tarjan_mcf`]. Returns
/// [`NetflowError::InvalidInput`] on array-length mismatch and
/// [`NetflowError::Infeasible`] if no feasible flow exists.
pub fn goldberg_tarjan_mcf_checked(
    graph: &Graph,
    supply: &mut [i64],
    residual_capacity: &mut [i64],
    cost: &[i64],
) -> Result<(), NetflowError> {
    if supply.len() != graph.max_nodes() || residual_capacity.len() != graph.max_arcs() || cost.len() != graph.max_arcs() {
        return Err(NetflowError::InvalidInput("array length disagrees with graph size".into()));
    }
    if goldberg_tarjan_mcf(graph, supply, residual_capacity, cost) {
        Ok(())
    } else {
        Err(NetflowError::Infeasible)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn seed_dag() -> (Graph, Vec<i64>) {
        let mut g = Graph::new(7, 32, 4);
        let arcs = [
            (1, 2), (1, 3), (1, 6),
            (2, 3), (2, 4),
            (3, 4), (3, 6),
            (4, 5),
            (5, 6),
        ];
        for (i, &(u, v)) in arcs.iter().enumerate() {
            g.add_arc(ArcId(i as u32), NodeId(u), NodeId(v));
        }
        let mut cost = vec![0i64; 32];
        let costs = [7, 9, 14, 10, 15, 11, 2, 6, 9];
        for (i, &c) in costs.iter().enumerate() {
            cost[i] = c;
            cost[g.dual(ArcId(i as u32)).index()] = -c;
        }
        (g, cost)
    }

    fn forward_capacity(value: i64) -> Vec<i64> {
        let mut capacity = vec![0i64; 32];
        capacity[0..9].fill(value);
        capacity
    }

    #[test]
    fn feasible_flow_zeroes_supply_on_success() {
        let (g, _) = seed_dag();
        let mut residual_capacity = vec![10i64; 32];
        let mut supply = vec![0i64; g.max_nodes()];
        supply[1] = 4;
        supply[6] = -4;

        assert!(goldberg_tarjan_feasible(&g, &mut supply, &mut residual_capacity));
        assert!(supply.iter().all(|&e| e == 0));
    }

    #[test]
    fn feasible_flow_fails_when_capacity_insufficient() {
        let (g, _) = seed_dag();
        let mut residual_capacity = vec![0i64; 32];
        residual_capacity[2] = 1; // 1->6 direct, only 1 unit
        let mut supply = vec![0i64; g.max_nodes()];
        supply[1] = 4;
        supply[6] = -4;

        assert!(!goldberg_tarjan_feasible(&g, &mut supply, &mut residual_capacity));
    }

    #[test]
    fn mcf_matches_ssp_optimal_cost() {
        let (g, cost) = seed_dag();
        let mut residual_capacity = forward_capacity(10);
        let mut supply = vec![0i64; g.max_nodes()];
        supply[1] = 1;
        supply[6] = -1;

        assert!(goldberg_tarjan_mcf(&g, &mut supply, &mut residual_capacity, &cost));
        assert_eq!(super::super::flow::flow_cost(&g, &residual_capacity, &cost), 11);
    }

    #[test]
    fn mcf_handles_multi_unit_demand() {
        let (g, cost) = seed_dag();
        let mut residual_capacity = forward_capacity(10);
        let mut supply = vec![0i64; g.max_nodes()];
        supply[1] = 3;
        supply[6] = -3;

        assert!(goldberg_tarjan_mcf(&g, &mut supply, &mut residual_capacity, &cost));
        assert_eq!(super::super::flow::flow_cost(&g, &residual_capacity, &cost), 3 * 11);
    }
}
