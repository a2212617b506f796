//! Fixed-Charge Network-Flow Problem (FCNFP): minimum-cost flow where every
//! arc with positive flow also pays a fixed charge, independent of the
//! amount routed. Exact FCNFP is NP-hard; [`solve_fcnfp_approximate`] uses
//! dynamic slope scaling (Kim & Pardalos, 1999) to find a good, not
//! necessarily optimal, solution in polynomial time.

use tracing::{debug, trace, warn};

use super::flow::mcf_refinement;
use super::{ArcId, Graph};
use crate::error::NetflowError;

/// Tunables for [`solve_fcnfp_approximate_with_options`]. The default cap
/// matches the original reference solver's iteration budget for the first
/// linearization round.
#[derive(Debug, Clone, Copy)]
pub struct FcnfpOptions {
    /// Maximum number of re-linearize-and-resolve rounds.
    pub max_iterations: usize,
}

impl Default for FcnfpOptions {
    fn default() -> Self {
        Self { max_iterations: 100 }
    }
}

/// Arc-count ceiling for [`solve_fcnfp_exact`]: `2^n` subset enumeration is
/// only tractable for small `n`.
pub const FCNFP_EXACT_ARC_CAP: usize = 20;

/// Approximately solves the FCNFP for the supply/demand in `excess`, by
/// repeatedly linearizing `cost + charge/flow` around the previous
/// iteration's flow and re-solving the resulting MCF with
/// [`mcf_refinement`], until the flow stabilizes (residual capacities stop
/// changing) or `max_iterations` is reached.
///
/// Returns false iff the very first linearization round is already
/// infeasible (a later round becoming infeasible is an internal
/// contradiction, since feasibility only depends on `excess`/`capacity`, not
/// on cost).
pub fn solve_fcnfp_approximate(
    graph: &Graph,
    excess: &mut [i64],
    capacity: &mut [i64],
    cost: &[i64],
    charge: &[i64],
) -> bool {
    solve_fcnfp_approximate_with_options(graph, excess, capacity, cost, charge, &FcnfpOptions::default())
}

/// As [`solve_fcnfp_approximate`], with an explicit iteration cap.
pub fn solve_fcnfp_approximate_with_options(
    graph: &Graph,
    excess: &mut [i64],
    capacity: &mut [i64],
    cost: &[i64],
    charge: &[i64],
    options: &FcnfpOptions,
) -> bool {
    let max_num_arcs = graph.max_arcs();
    let max_num_nodes = graph.max_nodes();

    let mut potential = vec![0i64; max_num_nodes];
    let mut mod_cost = vec![0i64; max_num_arcs];
    let mut prev_capacity = vec![0i64; max_num_arcs];
    let mut last_nonzero_cost = vec![0i64; max_num_arcs];

    for i in 0..max_num_arcs {
        let a = ArcId(i as u32);
        if !graph.arc_enabled(a) || graph.is_dual(a) {
            continue;
        }
        let dual = graph.dual(a);
        let mut cap = capacity[i] + capacity[dual.index()];
        if cap == 0 {
            cap = 1;
        }
        let x = capacity[dual.index()];
        mod_cost[i] = if x > 0 {
            cost[i] + charge[i] / x
        } else {
            cost[i] + charge[i] / cap
        };
        last_nonzero_cost[i] = cost[i];
        mod_cost[dual.index()] = -mod_cost[i];
    }

    let mut solved = false;
    for iteration in 0..options.max_iterations {
        if !mcf_refinement(graph, excess, capacity, &mod_cost, &mut potential) {
            assert_eq!(iteration, 0, "solve_fcnfp_approximate: became infeasible after the first round");
            warn!("solve_fcnfp_approximate: infeasible");
            return false;
        }
        solved = true;

        if prev_capacity == *capacity {
            trace!(iteration, "solve_fcnfp_approximate: converged");
            break;
        }
        prev_capacity.copy_from_slice(capacity);

        for i in 0..max_num_arcs {
            let a = ArcId(i as u32);
            if !graph.arc_enabled(a) || graph.is_dual(a) {
                continue;
            }
            let dual = graph.dual(a);
            let x = capacity[dual.index()];
            if x > 0 {
                mod_cost[i] = cost[i] + charge[i] / x;
                last_nonzero_cost[i] = mod_cost[i];
            } else {
                mod_cost[i] = last_nonzero_cost[i];
            }
            mod_cost[dual.index()] = -mod_cost[i];
        }
        debug!(iteration, "solve_fcnfp_approximate: re-linearized");
    }
    solved
}

/// Validating wrapper around [`solve_fcnfp_approximate`]. Returns
/// [`NetflowError::InvalidInput`] on array-length mismatch and
/// [`NetflowError::Infeasible`] if the first linearization round is already
/// infeasible.
pub fn solve_fcnfp_checked(
    graph: &Graph,
    excess: &mut [i64],
    capacity: &mut [i64],
    cost: &[i64],
    charge: &[i64],
) -> Result<(), NetflowError> {
    if excess.len() != graph.max_nodes()
        || capacity.len() != graph.max_arcs()
        || cost.len() != graph.max_arcs()
        || charge.len() != graph.max_arcs()
    {
        return Err(NetflowError::InvalidInput("array length disagrees with graph size".into()));
    }
    if solve_fcnfp_approximate(graph, excess, capacity, cost, charge) {
        Ok(())
    } else {
        Err(NetflowError::Infeasible)
    }
}

/// Exhaustively solves the FCNFP by enumerating which of the (at most
/// [`FCNFP_EXACT_ARC_CAP`]) forward arcs carry flow, solving the induced
/// linear MCF for each subset with [`mcf_refinement`], and keeping the
/// cheapest feasible one. Reference/validation tool only — `O(2^n)` in the
/// number of enabled forward arcs.
///
/// Returns `None` if no subset yields a feasible flow.
///
/// # Panics
///
/// Panics if more than [`FCNFP_EXACT_ARC_CAP`] forward arcs are enabled.
#[cfg(any(test, feature = "exact-fcnfp"))]
pub fn solve_fcnfp_exact(
    graph: &Graph,
    excess: &[i64],
    capacity: &[i64],
    cost: &[i64],
    charge: &[i64],
) -> Option<(Vec<i64>, i64)> {
    use super::flow::flow_cost_with_charge;

    let forward_arcs: Vec<ArcId> = (0..graph.max_arcs())
        .map(|i| ArcId(i as u32))
        .filter(|&a| graph.arc_enabled(a) && !graph.is_dual(a))
        .collect();
    assert!(
        forward_arcs.len() <= FCNFP_EXACT_ARC_CAP,
        "solve_fcnfp_exact: {} forward arcs exceeds the cap of {FCNFP_EXACT_ARC_CAP}",
        forward_arcs.len(),
    );

    let mut best: Option<(Vec<i64>, i64)> = None;
    let subsets = 1u32 << forward_arcs.len();

    for mask in 0..subsets {
        let mut trial_capacity = capacity.to_vec();
        for (bit, &a) in forward_arcs.iter().enumerate() {
            if mask & (1 << bit) == 0 {
                // Disable this arc for this subset: zero out both directions.
                let dual = graph.dual(a);
                trial_capacity[a.index()] = 0;
                trial_capacity[dual.index()] = 0;
            }
        }

        let mut trial_excess = excess.to_vec();
        let mut potential = vec![0i64; graph.max_nodes()];
        if !mcf_refinement(graph, &mut trial_excess, &mut trial_capacity, cost, &mut potential) {
            continue;
        }

        let total = flow_cost_with_charge(graph, &trial_capacity, cost, Some(charge));
        if best.as_ref().is_none_or(|(_, best_cost)| total < *best_cost) {
            best = Some((trial_capacity, total));
        }
    }
    best
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::NodeId;

    // Seed scenario 5: a diamond with one cheap-but-charged shortcut arc.
    fn diamond() -> (Graph, Vec<i64>, Vec<i64>) {
        let mut g = Graph::new(4, 16, 3);
        // 0->1, 0->2, 1->3, 2->3, 0->3 (direct, charged shortcut)
        let arcs = [(0, 1), (0, 2), (1, 3), (2, 3), (0, 3)];
        for (i, &(u, v)) in arcs.iter().enumerate() {
            g.add_arc(ArcId(i as u32), NodeId(u), NodeId(v));
        }
        let mut cost = vec![0i64; 16];
        let mut charge = vec![0i64; 16];
        let costs = [1, 1, 1, 1, 1];
        for (i, &c) in costs.iter().enumerate() {
            cost[i] = c;
            cost[g.dual(ArcId(i as u32)).index()] = -c;
        }
        charge[4] = 50; // the direct arc is cheap per-unit but has a large fixed charge
        (g, cost, charge)
    }

    fn forward_capacity(value: i64) -> Vec<i64> {
        let mut capacity = vec![0i64; 16];
        capacity[0..5].fill(value);
        capacity
    }

    #[test]
    fn approximate_solver_finds_a_feasible_circulation() {
        let (g, cost, charge) = diamond();
        let mut capacity = forward_capacity(5);
        let mut excess = vec![0i64; g.max_nodes()];
        excess[0] = 3;
        excess[3] = -3;

        assert!(solve_fcnfp_approximate(&g, &mut excess, &mut capacity, &cost, &charge));
        assert!(excess.iter().all(|&e| e == 0));
    }

    #[test]
    fn exact_solver_avoids_the_charged_shortcut_for_small_demand() {
        let (g, cost, charge) = diamond();
        let capacity = forward_capacity(5);
        let mut excess = vec![0i64; g.max_nodes()];
        excess[0] = 1;
        excess[3] = -1;

        let (best_capacity, best_cost) =
            solve_fcnfp_exact(&g, &excess, &capacity, &cost, &charge).expect("expected a feasible solution");
        // Routing 1 unit via 0->1->3 or 0->2->3 costs 2 with no charge;
        // the direct arc costs 1 + 50.
        assert_eq!(best_cost, 2);
        assert_eq!(best_capacity[g.dual(ArcId(4)).index()], 0); // direct arc carries no flow
    }
}
