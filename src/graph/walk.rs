//! Random walk over the fast-walk contract
//!
//! Each step picks a uniformly random entry of the current node's
//! [`FastWalk::neighbors_fast`] list, so neighbours joined by parallel links
//! are proportionally more likely. The walk ends early at a node with no
//! neighbours.

use super::error::GraphResult;
use super::traits::{node_ref, FastWalk, Graph};
use super::types::NodeRef;
use rand::Rng;

/// Iterator over the nodes visited by a random walk, start node first
pub struct RandomWalk<'a, G: Graph + ?Sized, R: Rng> {
    graph: &'a G,
    rng: R,
    current: Option<NodeRef>,
    remaining: usize,
}

impl<'a, G: Graph + ?Sized, R: Rng> RandomWalk<'a, G, R> {
    /// Walk of at most `steps` hops from `start`
    pub fn new(graph: &'a G, start: NodeRef, steps: usize, rng: R) -> GraphResult<Self> {
        graph.validate(start)?;
        Ok(RandomWalk {
            graph,
            rng,
            current: Some(start),
            remaining: steps.saturating_add(1),
        })
    }
}

impl<'a, G: Graph + ?Sized, R: Rng> Iterator for RandomWalk<'a, G, R> {
    type Item = GraphResult<NodeRef>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.current.take()?;
        self.remaining -= 1;

        if self.remaining > 0 {
            let neighbors = match self.graph.neighbors_fast(node) {
                Ok(neighbors) => neighbors,
                Err(err) => {
                    self.remaining = 0;
                    return Some(Err(err));
                }
            };
            if !neighbors.is_empty() {
                let pick = neighbors[self.rng.gen_range(0..neighbors.len())];
                self.current = Some(node_ref(self.graph, pick));
            }
        }
        Some(Ok(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ArrayDirectedGraph, ArrayUndirectedGraph, GraphError};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_walk_follows_links() {
        let mut graph: ArrayUndirectedGraph<u32> = ArrayUndirectedGraph::new();
        let nodes: Vec<_> = (0..4).map(|i| graph.add(Some(i)).unwrap()).collect();
        for pair in nodes.windows(2) {
            graph.connect(pair[0], pair[1]).unwrap();
        }

        let walk: Vec<NodeRef> = RandomWalk::new(&graph, nodes[0], 20, StdRng::seed_from_u64(7))
            .unwrap()
            .collect::<GraphResult<_>>()
            .unwrap();
        assert_eq!(walk.len(), 21);
        assert_eq!(walk[0], nodes[0]);
        for step in walk.windows(2) {
            assert!(graph.connected(step[0], step[1]).unwrap());
        }
    }

    #[test]
    fn test_walk_stops_at_isolated_node() {
        let mut graph: ArrayDirectedGraph<u32> = ArrayDirectedGraph::new();
        let a = graph.add(None).unwrap();
        let walk: Vec<_> = RandomWalk::new(&graph, a, 10, StdRng::seed_from_u64(1))
            .unwrap()
            .collect();
        assert_eq!(walk.len(), 1);
    }

    #[test]
    fn test_walk_uses_both_directions() {
        let mut graph: ArrayDirectedGraph<u32> = ArrayDirectedGraph::new();
        let a = graph.add(None).unwrap();
        let b = graph.add(None).unwrap();
        graph.connect(a, b).unwrap();

        // b has no successors, but the walk may go back along the incoming link.
        let walk: Vec<NodeRef> = RandomWalk::new(&graph, b, 3, StdRng::seed_from_u64(3))
            .unwrap()
            .collect::<GraphResult<_>>()
            .unwrap();
        assert_eq!(walk, vec![b, a, b, a]);
    }

    #[test]
    fn test_walk_rejects_stale_start() {
        let mut graph: ArrayDirectedGraph<u32> = ArrayDirectedGraph::new();
        let a = graph.add(None).unwrap();
        let b = graph.add(None).unwrap();
        graph.remove_node(a).unwrap();
        let result = RandomWalk::new(&graph, b, 1, StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(GraphError::StaleHandle { .. })));
    }

    #[test]
    fn test_unbounded_walk() {
        let mut graph: ArrayUndirectedGraph<u32> = ArrayUndirectedGraph::new();
        let a = graph.add(None).unwrap();
        let b = graph.add(None).unwrap();
        graph.connect(a, b).unwrap();

        let walk: Vec<NodeRef> = RandomWalk::new(&graph, a, usize::MAX, StdRng::seed_from_u64(5))
            .unwrap()
            .take(6)
            .collect::<GraphResult<_>>()
            .unwrap();
        assert_eq!(walk, vec![a, b, a, b, a, b]);
    }
}
