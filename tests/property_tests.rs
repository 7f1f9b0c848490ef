use proptest::prelude::*;
use samyama_adjacency::graph::{
    structurally_equal, ArrayDirectedGraph, ArrayUndirectedGraph, Graph, GraphResult, LinkRef,
};
use samyama_adjacency::loader::LoadConfig;
use samyama_adjacency::persistence::{DiskConfig, DiskDirectedGraph, DiskUndirectedGraph};
use std::fs;

#[derive(Debug, Clone)]
enum Operation {
    Add(Option<u8>),
    Connect(usize, usize),
    Disconnect(usize, usize),
    RemoveNode(usize),
    RemoveLink(usize),
}

fn arb_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        prop::option::of(0u8..4).prop_map(Operation::Add),
        (0usize..16, 0usize..16).prop_map(|(a, b)| Operation::Connect(a, b)),
        (0usize..16, 0usize..16).prop_map(|(a, b)| Operation::Disconnect(a, b)),
        (0usize..16).prop_map(Operation::RemoveNode),
        (0usize..32).prop_map(Operation::RemoveLink),
    ]
}

/// A small graph: labels per node and edges as index pairs into them
fn arb_graph() -> impl Strategy<Value = (Vec<Option<u8>>, Vec<(usize, usize)>)> {
    prop::collection::vec(prop::option::of(0u8..3), 1..=8).prop_flat_map(|labels| {
        let n = labels.len();
        let edges = prop::collection::vec((0..n, 0..n), 0..=12);
        (Just(labels), edges)
    })
}

fn build<G: Graph<Label = u8>>(graph: &mut G, labels: &[Option<u8>], edges: &[(usize, usize)]) {
    let nodes: Vec<_> = labels.iter().map(|&l| graph.add(l).unwrap()).collect();
    for &(from, to) in edges {
        graph.connect(nodes[from], nodes[to]).unwrap();
    }
}

/// Apply one operation; node and link positions wrap around the current size.
fn apply<G: Graph<Label = u8>>(graph: &mut G, op: &Operation) -> GraphResult<()> {
    let size = graph.size();
    match *op {
        Operation::Add(label) => {
            graph.add(label)?;
        }
        Operation::Connect(a, b) if size > 0 => {
            let (a, b) = (graph.get(a % size)?, graph.get(b % size)?);
            graph.connect(a, b)?;
        }
        Operation::Disconnect(a, b) if size > 0 => {
            let (a, b) = (graph.get(a % size)?, graph.get(b % size)?);
            graph.disconnect(a, b)?;
        }
        Operation::RemoveNode(i) if size > 0 => {
            let epoch = graph.index_epoch();
            graph.remove_node(graph.get(i % size)?)?;
            assert_eq!(graph.index_epoch(), epoch + 1);
        }
        Operation::RemoveLink(i) => {
            let links: Vec<LinkRef> = graph.links().collect::<GraphResult<_>>()?;
            if !links.is_empty() {
                graph.remove_link(links[i % links.len()])?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn check_invariants<G: Graph<Label = u8>>(graph: &G) {
    let enumerated = graph.links().collect::<GraphResult<Vec<_>>>().unwrap();
    assert_eq!(enumerated.len() as u64, graph.num_links());
    for (i, node) in graph.nodes().enumerate() {
        assert_eq!(graph.index(node).unwrap(), i);
    }
}

proptest! {
    #[test]
    fn prop_link_count_conserved_directed(ops in prop::collection::vec(arb_operation(), 1..60)) {
        let mut graph: ArrayDirectedGraph<u8> = ArrayDirectedGraph::new();
        for op in &ops {
            apply(&mut graph, op).unwrap();
            check_invariants(&graph);
        }
    }

    #[test]
    fn prop_link_count_conserved_undirected(ops in prop::collection::vec(arb_operation(), 1..60)) {
        let mut graph: ArrayUndirectedGraph<u8> = ArrayUndirectedGraph::new();
        for op in &ops {
            apply(&mut graph, op).unwrap();
            check_invariants(&graph);
        }
    }

    #[test]
    fn prop_epoch_unaffected_by_links(generated in arb_graph()) {
        let (labels, edges) = generated;
        let mut graph: ArrayDirectedGraph<u8> = ArrayDirectedGraph::new();
        build(&mut graph, &labels, &edges);
        prop_assert_eq!(graph.index_epoch(), 0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_array_and_disk_equal_directed(generated in arb_graph()) {
        let (labels, edges) = generated;
        let dir = tempfile::TempDir::new().unwrap();
        let mut array: ArrayDirectedGraph<u8> = ArrayDirectedGraph::new();
        let mut disk: DiskDirectedGraph<u8> =
            DiskDirectedGraph::create(dir.path().join("graph"), DiskConfig::default()).unwrap();
        build(&mut array, &labels, &edges);
        build(&mut disk, &labels, &edges);

        prop_assert!(structurally_equal(&array, &disk).unwrap());
        prop_assert_eq!(array.to_string(), disk.to_string());
    }

    #[test]
    fn prop_array_and_disk_equal_undirected(generated in arb_graph()) {
        let (labels, edges) = generated;
        let dir = tempfile::TempDir::new().unwrap();
        let mut array: ArrayUndirectedGraph<u8> = ArrayUndirectedGraph::new();
        let mut disk: DiskUndirectedGraph<u8> =
            DiskUndirectedGraph::create(dir.path().join("graph"), DiskConfig::default()).unwrap();
        build(&mut array, &labels, &edges);
        build(&mut disk, &labels, &edges);

        prop_assert!(structurally_equal(&array, &disk).unwrap());
    }

    #[test]
    fn prop_same_operations_same_structure(ops in prop::collection::vec(arb_operation(), 1..30)) {
        let dir = tempfile::TempDir::new().unwrap();
        let mut array: ArrayDirectedGraph<u8> = ArrayDirectedGraph::new();
        let mut disk: DiskDirectedGraph<u8> =
            DiskDirectedGraph::create(dir.path().join("graph"), DiskConfig::default()).unwrap();
        for op in &ops {
            apply(&mut array, op).unwrap();
            apply(&mut disk, op).unwrap();
        }
        prop_assert!(structurally_equal(&array, &disk).unwrap());
    }

    #[test]
    fn prop_bulk_load_matches_incremental(edges in prop::collection::vec((0u32..10, 0u32..10), 1..40)) {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("edges.txt");
        let text: String = edges.iter().map(|(s, t)| format!("{} {}\n", s, t)).collect();
        fs::write(&input, text).unwrap();

        let config = LoadConfig { chunk_edges: 4, merge_fan_in: 3, ..LoadConfig::default() };
        let loaded: DiskDirectedGraph<u8> =
            DiskDirectedGraph::from_file(&input, dir.path().join("graph"), &config).unwrap();

        let size = edges.iter().map(|&(s, t)| s.max(t)).max().unwrap_or(0) as usize + 1;
        let mut array: ArrayDirectedGraph<u8> = ArrayDirectedGraph::new();
        let labels = vec![None; size];
        let pairs: Vec<(usize, usize)> = edges.iter().map(|&(s, t)| (s as usize, t as usize)).collect();
        build(&mut array, &labels, &pairs);

        prop_assert_eq!(loaded.num_links(), edges.len() as u64);
        prop_assert!(structurally_equal(&array, &loaded).unwrap());
    }

    #[test]
    fn prop_undirected_bulk_load_matches_incremental(
        edges in prop::collection::vec(
            prop_oneof![(0u32..8, 0u32..8), (0u32..8).prop_map(|n| (n, n))],
            1..40,
        )
    ) {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("edges.txt");
        let text: String = edges.iter().map(|(s, t)| format!("{} {}\n", s, t)).collect();
        fs::write(&input, text).unwrap();

        let config = LoadConfig { chunk_edges: 4, merge_fan_in: 3, ..LoadConfig::default() };
        let loaded: DiskUndirectedGraph<u8> =
            DiskUndirectedGraph::from_file(&input, dir.path().join("graph"), &config).unwrap();

        let size = edges.iter().map(|&(s, t)| s.max(t)).max().unwrap_or(0) as usize + 1;
        let mut array: ArrayUndirectedGraph<u8> = ArrayUndirectedGraph::new();
        let labels = vec![None; size];
        let pairs: Vec<(usize, usize)> = edges.iter().map(|&(s, t)| (s as usize, t as usize)).collect();
        build(&mut array, &labels, &pairs);

        prop_assert_eq!(loaded.num_links(), edges.len() as u64);
        prop_assert_eq!(loaded.links().count(), edges.len());
        prop_assert!(structurally_equal(&array, &loaded).unwrap());
    }
}
