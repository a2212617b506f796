//! A compact directed graph with an implicit dual (residual) arc for every
//! forward arc.
//!
//! # Panics
//!
//! All methods will panic if given an out-of-bounds node or arc index, or if
//! a documented invariant (see [`Graph::add_arc`]) is violated by the caller.
pub mod pqueue;
pub mod search;
pub mod flow;
pub mod cost_scaling;
pub mod fcnfp;
pub mod lagrangian;

use std::fmt;

/// Sentinel denoting "no node"/"no arc".
pub const INVALID_INDEX: u32 = u32::MAX;

macro_rules! index_type {
    ($name:ident) => {
        #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            pub const INVALID: Self = Self(INVALID_INDEX);

            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != INVALID_INDEX
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                Self(v)
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self(v as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}", self.0)
                } else {
                    write!(f, "-")
                }
            }
        }
    };
}

index_type!(NodeId);
index_type!(ArcId);

/// A graph's topology: nodes, arcs, and their implicit duals.
///
/// Every arc emanates from a node, the tail; the head of the arc is the tail
/// of its dual. The arc index space is split by [`Graph::dual_bit`]: forward
/// arc `a` (bit `D` clear) and its dual `a ^ (1 << D)` (bit `D` set) share no
/// other storage, so reversing an arc is a bit-flip rather than a lookup.
#[derive(Debug, Clone)]
pub struct Graph {
    max_nodes: usize,
    max_arcs: usize,
    dual_bit: u32,
    arc_tail: Vec<NodeId>,
    adjacency_first: Vec<ArcId>,
    adjacency_next: Vec<ArcId>,
}

impl Graph {
    /// Initializes a graph with `max_nodes` nodes and an arc array sized for
    /// `max_arcs` slots (forward and dual arcs share this array).
    ///
    /// # Panics
    ///
    /// Panics unless `max_arcs > (1 << dual_bit)`, which is required so every
    /// forward arc id has room for a distinct dual id.
    pub fn new(max_nodes: usize, max_arcs: usize, dual_bit: u32) -> Self {
        assert!(
            max_arcs > (1usize << dual_bit),
            "max_arcs must exceed 1<<dual_bit so every forward arc has a dual slot"
        );
        Self {
            max_nodes,
            max_arcs,
            dual_bit,
            arc_tail: vec![NodeId::INVALID; max_arcs],
            adjacency_first: vec![ArcId::INVALID; max_nodes],
            adjacency_next: vec![ArcId::INVALID; max_arcs],
        }
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    pub fn max_arcs(&self) -> usize {
        self.max_arcs
    }

    pub fn dual_bit(&self) -> u32 {
        self.dual_bit
    }

    /// The dual of an arc: bit-flip of the dual bit. `dual(dual(a)) == a`.
    #[inline]
    pub fn dual(&self, a: ArcId) -> ArcId {
        ArcId(a.0 ^ (1u32 << self.dual_bit))
    }

    /// True if `a`'s dual bit is set, i.e. `a` is itself a dual (residual) arc.
    #[inline]
    pub fn is_dual(&self, a: ArcId) -> bool {
        (a.0 >> self.dual_bit) & 1 != 0
    }

    /// The tail node of an arc.
    #[inline]
    pub fn tail(&self, a: ArcId) -> NodeId {
        self.arc_tail[a.index()]
    }

    /// The head node of an arc: the tail of its dual.
    #[inline]
    pub fn head(&self, a: ArcId) -> NodeId {
        self.arc_tail[self.dual(a).index()]
    }

    /// An arc is enabled iff it was added via [`Graph::add_arc`]; all other
    /// slots in the arc array (including never-used dual-bit positions) are
    /// logically absent.
    #[inline]
    pub fn arc_enabled(&self, a: ArcId) -> bool {
        self.arc_tail[a.index()].is_valid()
    }

    /// Adds a forward arc `a` from `from` to `to`, and links its dual into
    /// `to`'s adjacency list pointing back at `from`. Pushes onto the head of
    /// both adjacency lists, so traversal order is the reverse of insertion
    /// order within a node.
    ///
    /// # Panics
    ///
    /// Panics if `a`'s dual bit is set (callers must use forward arc ids), or
    /// if `a`, `from`, or `to` are out of range. Re-adding an already-enabled
    /// arc id is a usage error and is not detected here; it will corrupt the
    /// adjacency list silently, exactly as in the source this module is
    /// ported from.
    pub fn add_arc(&mut self, a: ArcId, from: NodeId, to: NodeId) {
        assert!(!self.is_dual(a), "add_arc must be called with a forward arc id");
        assert!(from.index() < self.max_nodes, "tail node out of range");
        assert!(to.index() < self.max_nodes, "head node out of range");
        assert!(a.index() < self.max_arcs, "arc id out of range");

        self.push_outbound(a, from);
        self.push_outbound(self.dual(a), to);
    }

    fn push_outbound(&mut self, a: ArcId, node: NodeId) {
        self.arc_tail[a.index()] = node;
        let first = self.adjacency_first[node.index()];
        self.adjacency_next[a.index()] = first;
        self.adjacency_first[node.index()] = a;
    }

    /// Iterates the arcs exiting `node`, forward and dual arcs alike, in
    /// O(1) amortized per arc.
    #[inline]
    pub fn adjacency(&self, node: NodeId) -> AdjacentArcs<'_> {
        AdjacentArcs {
            graph: self,
            cur: self.adjacency_first[node.index()],
        }
    }

    /// Resumes adjacency iteration starting at `arc` (inclusive), for
    /// algorithms that keep a "current arc" cursor per node across calls
    /// (cost-scaling push/relabel's current-arc heuristic).
    #[inline]
    pub fn adjacency_from(&self, arc: ArcId) -> AdjacentArcs<'_> {
        AdjacentArcs { graph: self, cur: arc }
    }
}

/// Iterator over the arcs leaving a node, following the intrusive
/// singly-linked adjacency list until [`INVALID_INDEX`].
pub struct AdjacentArcs<'g> {
    graph: &'g Graph,
    cur: ArcId,
}

impl<'g> Iterator for AdjacentArcs<'g> {
    type Item = ArcId;

    fn next(&mut self) -> Option<ArcId> {
        if !self.cur.is_valid() {
            return None;
        }
        let a = self.cur;
        self.cur = self.graph.adjacency_next[a.index()];
        Some(a)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn small_graph() -> Graph {
        // dual_bit = 4 gives 16 forward arc slots [0,16) and their duals
        // at [16,32); we only use 9 forward arcs here.
        let mut g = Graph::new(6, 32, 4);
        let arcs = [
            (0, 1), (0, 2), (0, 5),
            (1, 2), (1, 3),
            (2, 3), (2, 5),
            (3, 4),
            (4, 5),
        ];
        for (i, &(u, v)) in arcs.iter().enumerate() {
            g.add_arc(ArcId(i as u32), NodeId(u), NodeId(v));
        }
        g
    }

    #[test]
    fn dual_is_involution() {
        let g = small_graph();
        for i in 0..9u32 {
            let a = ArcId(i);
            assert_eq!(g.dual(g.dual(a)), a);
            assert!(!g.is_dual(a));
            assert!(g.is_dual(g.dual(a)));
        }
    }

    #[test]
    fn add_arc_sets_tail_and_head() {
        let g = small_graph();
        assert_eq!(g.tail(ArcId(3)), NodeId(1));
        assert_eq!(g.head(ArcId(3)), NodeId(2));
        assert_eq!(g.tail(g.dual(ArcId(3))), NodeId(2));
        assert_eq!(g.head(g.dual(ArcId(3))), NodeId(1));
    }

    #[test]
    fn adjacency_visits_each_outgoing_arc_once() {
        let g = small_graph();
        let mut out: Vec<_> = g.adjacency(NodeId(0)).collect();
        out.sort_by_key(|a| a.0);
        assert_eq!(out, vec![ArcId(0), ArcId(1), ArcId(2)]);
    }

    #[test]
    fn disabled_arcs_are_not_enabled() {
        let g = small_graph();
        assert!(g.arc_enabled(ArcId(0)));
        // slot 9 was never added, but sits below max_arcs
        assert!(!g.arc_enabled(ArcId(9)));
    }
}
