//! Flow primitives and successive-shortest-path minimum-cost flow.

use tracing::{debug, warn};

use super::search::{bfs_path, dijkstra_nearest_sink};
use super::{ArcId, Graph, NodeId};
use crate::error::NetflowError;

/// Reduced cost under the successive-shortest-path sign convention, see
/// [`super::search`].
#[inline]
fn reduced_cost(graph: &Graph, a: ArcId, cost: &[i64], potential: &[i64]) -> i64 {
    cost[a.index()] - potential[graph.tail(a).index()] + potential[graph.head(a).index()]
}

/// The maximum flow that can be sent from `source` to `target` along the
/// path recorded in `prev` (as written by [`super::search::bfs_path`] or
/// [`super::search::dijkstra_path`]): the minimum residual capacity over the
/// path's arcs.
///
/// # Panics
///
/// Panics if `prev` does not encode a simple path of length `< max_nodes`
/// from `source` to `target`, or if the path carries zero capacity.
pub fn augmenting_flow_capacity(
    graph: &Graph,
    source: NodeId,
    target: NodeId,
    capacity: &[i64],
    prev: &[ArcId],
) -> i64 {
    let mut flow = i64::MAX;
    let mut cur = target;
    let mut path_length = 0usize;

    while cur != source {
        let a = prev[cur.index()];
        assert!(a.is_valid(), "augmenting_flow_capacity: prev does not reach source");
        flow = flow.min(capacity[a.index()]);
        cur = graph.tail(a);

        path_length += 1;
        assert!(
            path_length < graph.max_nodes(),
            "augmenting_flow_capacity: path too long, prev has a cycle"
        );
    }

    assert!(flow > 0 && flow < i64::MAX, "augmenting_flow_capacity: degenerate path");
    flow
}

/// Sends `flow` through a single arc: debits the arc's capacity, credits its
/// dual's, and (if `node_balance` is given) updates the endpoints' balances.
#[inline]
pub fn send_flow(graph: &Graph, a: ArcId, flow: i64, capacity: &mut [i64], node_balance: Option<&mut [i64]>) {
    let dual = graph.dual(a);
    capacity[a.index()] -= flow;
    capacity[dual.index()] += flow;

    if let Some(balance) = node_balance {
        let src = graph.tail(a);
        let dst = graph.tail(dual);
        balance[src.index()] -= flow;
        balance[dst.index()] += flow;
    }
}

/// Augments `flow` units along the path recorded in `prev`, from `source` to
/// `target`, via repeated [`send_flow`] calls.
///
/// # Panics
///
/// Panics under the same conditions as [`augmenting_flow_capacity`].
pub fn augment_flow(
    graph: &Graph,
    source: NodeId,
    target: NodeId,
    prev: &[ArcId],
    mut excess: Option<&mut [i64]>,
    capacity: &mut [i64],
    flow: i64,
) {
    let mut cur = target;
    let mut path_length = 0usize;

    while cur != source {
        let a = prev[cur.index()];
        assert!(a.is_valid(), "augment_flow: prev does not reach source");
        send_flow(graph, a, flow, capacity, excess.as_deref_mut());
        cur = graph.tail(a);

        path_length += 1;
        assert!(path_length < graph.max_nodes(), "augment_flow: path too long, prev has a cycle");
    }
}

/// The net flow balance at `node`: the sum, over every dual arc leaving
/// `node`, of that dual's capacity, minus the sum over forward arcs of their
/// dual's capacity. Zero for an unsaturated node in a circulation.
pub fn node_balance(graph: &Graph, node: NodeId, capacity: &[i64]) -> i64 {
    let mut balance = 0i64;
    for a in graph.adjacency(node) {
        if graph.is_dual(a) {
            balance += capacity[a.index()];
        } else {
            balance -= capacity[graph.dual(a).index()];
        }
    }
    balance
}

/// Sends `amount` units of flow from `source` to `destination` along
/// shortest-hop-count (BFS) augmenting paths, ignoring cost. Returns true iff
/// the full `amount` was routed; on partial failure the already-sent flow is
/// left in place (this mirrors the original's "best effort" semantics, it is
/// not rolled back).
///
/// # Panics
///
/// Panics if `amount <= 0`.
pub fn simple_feasible_flow(
    graph: &Graph,
    source: NodeId,
    destination: NodeId,
    capacity: &mut [i64],
    amount: i64,
) -> bool {
    assert!(amount > 0, "simple_feasible_flow: amount must be positive");

    let mut prev = vec![ArcId::INVALID; graph.max_nodes()];
    let mut remaining = amount;

    while remaining > 0 {
        if !bfs_path(graph, source, destination, capacity, 1, &mut prev) {
            break;
        }
        let delta = augmenting_flow_capacity(graph, source, destination, capacity, &prev).min(remaining);
        augment_flow(graph, source, destination, &prev, None, capacity, delta);
        remaining -= delta;
    }
    remaining == 0
}

/// Rebuilds a minimum-cost flow satisfying `excess` from a (possibly
/// infeasible, possibly suboptimal) starting `capacity`/`potential` state, by
/// repeatedly enforcing the complementary-slackness optimality condition
/// (`reduced_cost(a) < 0 => capacity[a] = 0`) and then routing excess to the
/// nearest deficit node.
///
/// Returns false, without a meaningful final state, if total excess is
/// non-zero (supply/demand mismatch) or if some excess node cannot reach any
/// deficit node.
///
/// # Panics
///
/// Panics if array lengths disagree with the graph's node/arc counts, or if
/// an internal invariant (augmenting delta computation, distance bookkeeping)
/// is violated — these indicate a caller bug in the supplied arrays, not an
/// ordinary infeasibility.
pub fn mcf_refinement(
    graph: &Graph,
    excess: &mut [i64],
    capacity: &mut [i64],
    cost: &[i64],
    potential: &mut [i64],
) -> bool {
    assert_eq!(excess.len(), graph.max_nodes());
    assert_eq!(capacity.len(), graph.max_arcs());
    assert_eq!(cost.len(), graph.max_arcs());
    assert_eq!(potential.len(), graph.max_nodes());

    let total_excess: i64 = excess.iter().sum();
    if total_excess != 0 {
        warn!(total_excess, "mcf_refinement: supply does not match demand");
        return false;
    }

    for i in 0..graph.max_arcs() {
        let a = ArcId(i as u32);
        if !graph.arc_enabled(a) {
            continue;
        }
        let r = capacity[i];
        if r > 0 && reduced_cost(graph, a, cost, potential) < 0 {
            send_flow(graph, a, r, capacity, Some(excess));
        }
    }

    let mut prev = vec![ArcId::INVALID; graph.max_nodes()];
    let mut distance = vec![0i64; graph.max_nodes()];

    for node_id in 0..graph.max_nodes() {
        let src = NodeId(node_id as u32);
        while excess[src.index()] > 0 {
            let dst = dijkstra_nearest_sink(
                graph, src, excess, capacity, 1, cost, potential, &mut prev, &mut distance,
            );
            if !dst.is_valid() {
                warn!(?src, "mcf_refinement: no reachable deficit node");
                return false;
            }

            let mut delta = augmenting_flow_capacity(graph, src, dst, capacity, &prev);
            delta = delta.min(excess[src.index()]).min(-excess[dst.index()]);
            assert!(delta > 0, "mcf_refinement: non-positive augmenting delta");

            augment_flow(graph, src, dst, &prev, Some(excess), capacity, delta);

            for n in 0..graph.max_nodes() {
                potential[n] -= distance[dst.index()].min(distance[n]);
            }
        }
    }

    debug_assert!(excess.iter().all(|&e| e == 0));
    debug_assert!((0..graph.max_arcs()).all(|i| {
        let a = ArcId(i as u32);
        !graph.arc_enabled(a) || {
            let cap = capacity[i];
            cap >= 0 && !(reduced_cost(graph, a, cost, potential) < 0 && cap != 0)
        }
    }));

    debug!("mcf_refinement: solved");
    true
}

/// Routes `amount` units of minimum-cost flow from `source` to
/// `destination`, starting from zero potentials and a zero excess vector.
/// Returns false if no feasible MCF exists.
///
/// # Panics
///
/// Panics if `amount <= 0`.
pub fn simple_mcf(
    graph: &Graph,
    source: NodeId,
    destination: NodeId,
    capacity: &mut [i64],
    amount: i64,
    cost: &[i64],
) -> bool {
    assert!(amount > 0, "simple_mcf: amount must be positive");

    let mut potential = vec![0i64; graph.max_nodes()];
    let mut excess = vec![0i64; graph.max_nodes()];
    excess[source.index()] = amount;
    excess[destination.index()] = -amount;

    mcf_refinement(graph, &mut excess, capacity, cost, &mut potential)
}

/// Validating wrapper around [`simple_mcf`] for callers that would rather
/// handle an error than check a `bool`. Returns [`NetflowError::InvalidInput`]
/// if `amount <= 0` or an array length disagrees with the graph, and
/// [`NetflowError::Infeasible`] if no such flow exists.
pub fn mcf_checked(
    graph: &Graph,
    source: NodeId,
    destination: NodeId,
    capacity: &mut [i64],
    amount: i64,
    cost: &[i64],
) -> Result<(), NetflowError> {
    if amount <= 0 {
        return Err(NetflowError::InvalidInput("amount must be positive".into()));
    }
    if capacity.len() != graph.max_arcs() || cost.len() != graph.max_arcs() {
        return Err(NetflowError::InvalidInput("capacity/cost length must equal max_arcs".into()));
    }
    if simple_mcf(graph, source, destination, capacity, amount, cost) {
        Ok(())
    } else {
        Err(NetflowError::Infeasible)
    }
}

/// Total cost of the flow encoded in `capacity`: for every forward arc, its
/// flow (the dual's residual capacity) times its cost.
pub fn flow_cost(graph: &Graph, capacity: &[i64], cost: &[i64]) -> i64 {
    let mut total = 0i64;
    for i in 0..graph.max_arcs() {
        let a = ArcId(i as u32);
        if graph.is_dual(a) {
            continue;
        }
        total += capacity[graph.dual(a).index()] * cost[a.index()];
    }
    total
}

/// Total cost of the flow encoded in `capacity`, including a fixed `charge`
/// on every forward arc that carries positive flow (an arc with zero flow
/// pays no charge). `charge` of `None` behaves like [`flow_cost`].
pub fn flow_cost_with_charge(graph: &Graph, capacity: &[i64], cost: &[i64], charge: Option<&[i64]>) -> i64 {
    let mut total = 0i64;
    for i in 0..graph.max_arcs() {
        let a = ArcId(i as u32);
        if graph.is_dual(a) || !graph.arc_enabled(a) {
            continue;
        }
        let flow = capacity[graph.dual(a).index()];
        total += flow * cost[a.index()];
        if let Some(charge) = charge {
            if flow > 0 {
                total += charge[i];
            }
        }
    }
    total
}

#[cfg(test)]
mod test {
    use super::*;

    fn seed_dag() -> Graph {
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
        g
    }

    /// Capacity array with every one of the 9 forward arcs set to `value`
    /// and every dual left at zero, as in a freshly built flow network.
    fn forward_capacity(value: i64) -> Vec<i64> {
        let mut capacity = vec![0i64; 32];
        capacity[0..9].fill(value);
        capacity
    }

    #[test]
    fn simple_feasible_flow_routes_full_amount_when_capacity_allows() {
        let g = seed_dag();
        let mut capacity = forward_capacity(3);
        assert!(simple_feasible_flow(&g, NodeId(1), NodeId(6), &mut capacity, 5));
        assert_eq!(node_balance(&g, NodeId(1), &capacity), -5);
        assert_eq!(node_balance(&g, NodeId(6), &capacity), 5);
    }

    #[test]
    fn simple_feasible_flow_fails_when_capacity_insufficient() {
        let g = seed_dag();
        let mut capacity = vec![0i64; 32];
        capacity[2] = 2; // arc 1->6 directly, only 2 units available
        assert!(!simple_feasible_flow(&g, NodeId(1), NodeId(6), &mut capacity, 5));
    }

    #[test]
    fn simple_mcf_finds_cheapest_path_cost() {
        let g = seed_dag();
        let mut capacity = forward_capacity(10);
        let mut cost = vec![0i64; 32];
        let costs = [7, 9, 14, 10, 15, 11, 2, 6, 9];
        for (i, &c) in costs.iter().enumerate() {
            cost[i] = c;
            cost[g.dual(ArcId(i as u32)).index()] = -c;
        }

        assert!(simple_mcf(&g, NodeId(1), NodeId(6), &mut capacity, 1, &cost));
        assert_eq!(flow_cost(&g, &capacity, &cost), 11);
    }

    #[test]
    fn flow_cost_with_charge_counts_fixed_charge_once_per_used_arc() {
        let g = seed_dag();
        let mut cost = vec![0i64; 32];
        let mut charge = vec![0i64; 32];
        cost[2] = 5;
        cost[g.dual(ArcId(2)).index()] = -5;
        charge[2] = 100;

        // 2 units already routed through the direct 1->6 arc (idx 2): its
        // dual slot carries the flow, the rest of the network is untouched.
        let mut capacity = forward_capacity(10);
        capacity[2] -= 2;
        capacity[g.dual(ArcId(2)).index()] += 2;

        assert_eq!(flow_cost_with_charge(&g, &capacity, &cost, Some(&charge)), 2 * 5 + 100);
    }

    #[test]
    fn mcf_refinement_rejects_mismatched_supply_and_demand() {
        let g = seed_dag();
        let mut capacity = forward_capacity(10);
        let cost = vec![0i64; 32];
        let mut potential = vec![0i64; g.max_nodes()];
        let mut excess = vec![0i64; g.max_nodes()];
        excess[1] = 5;
        excess[6] = -3; // mismatched

        assert!(!mcf_refinement(&g, &mut excess, &mut capacity, &cost, &mut potential));
    }
}
