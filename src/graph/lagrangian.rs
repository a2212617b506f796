//! Constrained FCNFP via Lagrangian relaxation: minimizes the objective
//! `cost[0] + charge[0]` subject to `cost[k] + charge[k] <= bound[k]` for
//! `k = 1..num_constraints`, by repeatedly solving an unconstrained FCNFP on
//! a linear combination of the cost functions and adjusting multipliers.

use tracing::{debug, trace};

use super::fcnfp::{solve_fcnfp_approximate_with_options, FcnfpOptions};
use super::flow::flow_cost_with_charge;
use super::{ArcId, Graph};
use crate::error::NetflowError;

/// Tunables matching the reference implementation's hardcoded constants.
#[derive(Debug, Clone, Copy)]
pub struct LagrangianOptions {
    /// Iteration budget for the unconstrained FCNFP subproblem solved at
    /// every Lagrangian iteration after the first.
    pub fcnfp_iterations: usize,
    /// Iteration budget for the first (unconstrained feasibility) FCNFP
    /// solve, which needs more room to converge from a cold start.
    pub first_round_fcnfp_iterations: usize,
    /// Exponent in the multiplier step size's `1 / i^decay_exponent` decay.
    pub decay_exponent: f64,
}

impl Default for LagrangianOptions {
    fn default() -> Self {
        Self {
            fcnfp_iterations: 10,
            first_round_fcnfp_iterations: 100,
            decay_exponent: 0.5,
        }
    }
}

fn flow_satisfies_constraints(graph: &Graph, capacity: &[i64], cost: &[&[i64]], charge: &[&[i64]], bound: &[i64]) -> usize {
    let mut count_ok = 0;
    for k in 0..cost.len() {
        let f = flow_cost_with_charge(graph, capacity, cost[k], Some(charge[k]));
        if f <= bound[k] {
            count_ok += 1;
        }
    }
    count_ok
}

fn compute_modified_cost(
    graph: &Graph,
    out_cost: &mut [i64],
    out_charge: &mut [i64],
    cost: &[&[i64]],
    charge: &[&[i64]],
    multiplier: &[f64],
) {
    for i in 0..graph.max_arcs() {
        let a = ArcId(i as u32);
        if !graph.arc_enabled(a) || graph.is_dual(a) {
            continue;
        }
        let dual = graph.dual(a);

        let mut c = 0f64;
        let mut ch = 0f64;
        for k in 0..cost.len() {
            c += cost[k][i] as f64 * multiplier[k];
            ch += charge[k][i] as f64 * multiplier[k];
        }
        out_cost[i] = c as i64;
        out_charge[i] = ch as i64;
        out_cost[dual.index()] = -out_cost[i];
        out_charge[dual.index()] = 0;
    }
}

/// Solves the constrained FCNFP for the supply/demand in `excess`.
/// `cost[0]`/`charge[0]` define the objective to minimize; `cost[k]`/
/// `charge[k]`/`bound[k]` for `k >= 1` define the side constraints. Writes
/// the best feasible solution found into `capacity` (or, if no constrained
/// feasible solution is ever found, leaves the last unconstrained attempt in
/// place).
///
/// Returns false iff the unconstrained problem itself is infeasible;
/// failing to satisfy the side constraints within `max_num_iterations` is
/// not reported as failure — the caller must check the returned solution
/// against `bound` if an optimality certificate is required.
///
/// # Panics
///
/// Panics if `cost`, `charge`, and `bound` do not all have `num_constraints`
/// entries, or if `num_constraints == 0`.
#[allow(clippy::too_many_arguments)]
pub fn solve_constrained_fcnfp(
    graph: &Graph,
    excess: &mut [i64],
    capacity: &mut [i64],
    cost: &[&[i64]],
    charge: &[&[i64]],
    bound: &[i64],
    tolerance: f64,
    max_num_iterations: usize,
) -> bool {
    solve_constrained_fcnfp_with_options(
        graph, excess, capacity, cost, charge, bound, tolerance, max_num_iterations, &LagrangianOptions::default(),
    )
}

/// As [`solve_constrained_fcnfp`], with explicit tuning.
#[allow(clippy::too_many_arguments)]
pub fn solve_constrained_fcnfp_with_options(
    graph: &Graph,
    excess: &mut [i64],
    capacity: &mut [i64],
    cost: &[&[i64]],
    charge: &[&[i64]],
    bound: &[i64],
    tolerance: f64,
    max_num_iterations: usize,
    options: &LagrangianOptions,
) -> bool {
    let num_constraints = cost.len();
    assert!(num_constraints > 0, "solve_constrained_fcnfp: at least one cost function required");
    assert_eq!(charge.len(), num_constraints);
    assert_eq!(bound.len(), num_constraints);

    let max_num_arcs = graph.max_arcs();

    let first_round_options = FcnfpOptions { max_iterations: options.first_round_fcnfp_iterations };
    let is_feasible =
        solve_fcnfp_approximate_with_options(graph, excess, capacity, cost[0], charge[0], &first_round_options);
    if !is_feasible {
        return false;
    }

    let mut solution_lower_bound = flow_cost_with_charge(graph, capacity, cost[0], Some(charge[0]));
    let solution_lower_bound_0 = solution_lower_bound;

    if flow_satisfies_constraints(graph, capacity, cost, charge, bound) == num_constraints {
        trace!("solve_constrained_fcnfp: unconstrained optimum already satisfies every constraint");
        return true;
    }

    let mut multiplier = vec![0f64; num_constraints];
    let mut mod_cost = vec![0i64; max_num_arcs];
    let mut mod_charge = vec![0i64; max_num_arcs];

    let mut have_best_solution = false;
    let mut best_solution = i64::MAX;
    let mut best_capacity = vec![0i64; max_num_arcs];

    let round_options = FcnfpOptions { max_iterations: options.fcnfp_iterations };

    for i in 1..max_num_iterations {
        multiplier[0] = 1.0;
        for k in 1..num_constraints {
            let scale_factor = solution_lower_bound_0 as f64 / bound[k] as f64;
            let feature_cost = flow_cost_with_charge(graph, capacity, cost[k], Some(charge[k]));
            let delta = if feature_cost > bound[k] { 2.0 } else { -1.0 };

            multiplier[k] += scale_factor * delta / (i as f64).powf(options.decay_exponent);
            multiplier[k] = multiplier[k].max(0.0);
        }

        compute_modified_cost(graph, &mut mod_cost, &mut mod_charge, cost, charge, &multiplier);
        let ret = solve_fcnfp_approximate_with_options(graph, excess, capacity, &mod_cost, &mod_charge, &round_options);
        assert!(ret, "solve_constrained_fcnfp: relaxed subproblem became infeasible");

        let total_cost = flow_cost_with_charge(graph, capacity, cost[0], Some(charge[0]));

        let mut mod_total_cost = flow_cost_with_charge(graph, capacity, &mod_cost, Some(&mod_charge));
        for k in 1..num_constraints {
            mod_total_cost -= (multiplier[k] * bound[k] as f64) as i64;
        }
        solution_lower_bound = solution_lower_bound.max(mod_total_cost);

        if flow_satisfies_constraints(graph, capacity, cost, charge, bound) == num_constraints
            && (!have_best_solution || best_solution > total_cost)
        {
            best_solution = total_cost;
            have_best_solution = true;
            best_capacity.copy_from_slice(capacity);
        }

        if have_best_solution
            && (best_solution - solution_lower_bound) as f64 / solution_lower_bound as f64 <= tolerance
        {
            debug!(iteration = i, best_solution, solution_lower_bound, "solve_constrained_fcnfp: within tolerance");
            break;
        }
    }

    if have_best_solution {
        capacity.copy_from_slice(&best_capacity);
    }
    true
}

/// Validating wrapper around [`solve_constrained_fcnfp`]. Returns
/// [`NetflowError::InvalidInput`] if `cost`/`charge`/`bound` disagree in
/// length, are empty, or an array length disagrees with the graph, and
/// [`NetflowError::Infeasible`] if the unconstrained problem is infeasible.
#[allow(clippy::too_many_arguments)]
pub fn solve_constrained_fcnfp_checked(
    graph: &Graph,
    excess: &mut [i64],
    capacity: &mut [i64],
    cost: &[&[i64]],
    charge: &[&[i64]],
    bound: &[i64],
    tolerance: f64,
    max_num_iterations: usize,
) -> Result<(), NetflowError> {
    if cost.is_empty() || cost.len() != charge.len() || cost.len() != bound.len() {
        return Err(NetflowError::InvalidInput("cost/charge/bound must have matching, non-zero length".into()));
    }
    if excess.len() != graph.max_nodes() || capacity.len() != graph.max_arcs() {
        return Err(NetflowError::InvalidInput("array length disagrees with graph size".into()));
    }
    if solve_constrained_fcnfp(graph, excess, capacity, cost, charge, bound, tolerance, max_num_iterations) {
        Ok(())
    } else {
        Err(NetflowError::Infeasible)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::NodeId;

    // Seed scenario 6: two parallel paths, a cheap-but-heavy one and a
    // pricier-but-light one, constrained on total "weight".
    fn two_path_graph() -> (Graph, Vec<i64>, Vec<i64>, Vec<i64>) {
        let mut g = Graph::new(2, 8, 2);
        g.add_arc(ArcId(0), NodeId(0), NodeId(1)); // cheap, heavy
        g.add_arc(ArcId(1), NodeId(0), NodeId(1)); // pricier, light

        let mut cost = vec![0i64; 8];
        cost[0] = 1;
        cost[g.dual(ArcId(0)).index()] = -1;
        cost[1] = 3;
        cost[g.dual(ArcId(1)).index()] = -3;

        let charge = vec![0i64; 8];

        let mut weight = vec![0i64; 8];
        weight[0] = 10; // heavy per-unit weight
        weight[g.dual(ArcId(0)).index()] = -10;
        weight[1] = 1; // light
        weight[g.dual(ArcId(1)).index()] = -1;

        (g, cost, charge, weight)
    }

    fn forward_capacity(value: i64) -> Vec<i64> {
        let mut capacity = vec![0i64; 8];
        capacity[0..2].fill(value);
        capacity
    }

    #[test]
    fn constrained_solver_respects_a_tight_weight_bound() {
        let (g, cost, charge, weight) = two_path_graph();
        let mut capacity = forward_capacity(5);
        let mut excess = vec![0i64; g.max_nodes()];
        excess[0] = 4;
        excess[1] = -4;

        let weight_charge = vec![0i64; 8];
        let cost_fns: Vec<&[i64]> = vec![&cost, &weight];
        let charge_fns: Vec<&[i64]> = vec![&charge, &weight_charge];
        let bound = vec![i64::MAX, 8]; // cap total weight well below the all-heavy-path solution

        let feasible = solve_constrained_fcnfp(&g, &mut excess, &mut capacity, &cost_fns, &charge_fns, &bound, 0.05, 30);
        assert!(feasible);

        let total_weight = flow_cost_with_charge(&g, &capacity, &weight, Some(&weight_charge));
        assert!(total_weight <= bound[1], "expected total weight <= {}, got {total_weight}", bound[1]);
    }

    #[test]
    fn constrained_solver_reports_infeasible_when_unconstrained_problem_is() {
        let (g, cost, charge, weight) = two_path_graph();
        let mut capacity = vec![0i64; 8]; // no capacity at all
        let mut excess = vec![0i64; g.max_nodes()];
        excess[0] = 4;
        excess[1] = -4;

        let weight_charge = vec![0i64; 8];
        let cost_fns: Vec<&[i64]> = vec![&cost, &weight];
        let charge_fns: Vec<&[i64]> = vec![&charge, &weight_charge];
        let bound = vec![i64::MAX, 8];

        assert!(!solve_constrained_fcnfp(&g, &mut excess, &mut capacity, &cost_fns, &charge_fns, &bound, 0.05, 30));
    }
}
