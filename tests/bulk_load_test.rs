//! Integration tests for bulk loading from edge-list files

use samyama_adjacency::graph::{DirectedGraph, Graph, GraphError, Limits};
use samyama_adjacency::loader::{load_directed, load_undirected, LoadConfig};
use samyama_adjacency::persistence::{DiskConfig, DiskDirectedGraph, DiskUndirectedGraph};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn write_edges(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("edges.txt");
    fs::write(&path, text).unwrap();
    path
}

/// Small chunks force many sort runs and several merge levels.
fn tiny_chunks() -> LoadConfig {
    LoadConfig {
        chunk_edges: 3,
        merge_fan_in: 2,
        ..LoadConfig::default()
    }
}

fn sorted_out(graph: &DiskDirectedGraph<u32>, index: usize) -> Vec<u32> {
    let mut list = graph.out_fast(graph.get(index).unwrap()).unwrap().into_owned();
    list.sort_unstable();
    list
}

#[test]
fn test_scenario_c() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let input = write_edges(&dir, "0 1\n1 2\n2 0\n0 2\n");
    let graph: DiskDirectedGraph<u32> =
        DiskDirectedGraph::from_file(&input, dir.path().join("graph"), &LoadConfig::default()).unwrap();

    assert_eq!(graph.size(), 3);
    assert_eq!(graph.num_links(), 4);
    assert_eq!(sorted_out(&graph, 0), vec![1, 2]);
    assert!(graph.is_null_labels());
}

#[test]
fn test_round_trip_with_many_runs() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let edges = [(5, 1), (0, 3), (3, 3), (1, 0), (5, 1), (2, 4), (0, 5), (4, 2), (1, 5), (3, 0)];
    let text: String = edges.iter().map(|(s, t)| format!("{} {}\n", s, t)).collect();
    let input = write_edges(&dir, &format!("# generated\n{}\n% trailer\n", text));

    let graph: DiskDirectedGraph<u32> =
        DiskDirectedGraph::from_file(&input, dir.path().join("graph"), &tiny_chunks()).unwrap();
    assert_eq!(graph.size(), 6);
    assert_eq!(graph.num_links(), edges.len() as u64);

    let mut expected: BTreeMap<(u32, u32), usize> = BTreeMap::new();
    for &edge in &edges {
        *expected.entry(edge).or_default() += 1;
    }
    let mut from_out: BTreeMap<(u32, u32), usize> = BTreeMap::new();
    let mut from_in: BTreeMap<(u32, u32), usize> = BTreeMap::new();
    for node in graph.nodes() {
        let index = node.raw_index();
        for &target in graph.out_fast(node).unwrap().iter() {
            *from_out.entry((index, target)).or_default() += 1;
        }
        for &source in graph.in_fast(node).unwrap().iter() {
            *from_in.entry((source, index)).or_default() += 1;
        }
    }
    assert_eq!(from_out, expected);
    assert_eq!(from_in, expected);
}

#[test]
fn test_gaps_become_isolated_nodes() {
    let dir = TempDir::new().unwrap();
    let input = write_edges(&dir, "0 1\n4 1\n");
    let graph: DiskDirectedGraph<u32> =
        DiskDirectedGraph::from_file(&input, dir.path().join("graph"), &LoadConfig::default()).unwrap();

    assert_eq!(graph.size(), 5);
    for index in [2, 3] {
        assert_eq!(graph.degree(graph.get(index).unwrap()).unwrap(), 0);
    }
    assert_eq!(graph.in_degree(graph.get(1).unwrap()).unwrap(), 2);
    // Node 4 has outgoing links only; its incoming list was padded.
    assert_eq!(graph.in_degree(graph.get(4).unwrap()).unwrap(), 0);
}

#[test]
fn test_target_only_nodes_padded() {
    let dir = TempDir::new().unwrap();
    let input = write_edges(&dir, "0 7\n");
    let graph: DiskDirectedGraph<u32> =
        DiskDirectedGraph::from_file(&input, dir.path().join("graph"), &LoadConfig::default()).unwrap();
    assert_eq!(graph.size(), 8);
    assert_eq!(graph.out_degree(graph.get(7).unwrap()).unwrap(), 0);
    assert_eq!(graph.in_degree(graph.get(7).unwrap()).unwrap(), 1);
}

#[test]
fn test_undirected_load() {
    let dir = TempDir::new().unwrap();
    let input = write_edges(&dir, "2 0\n0 1\n1 1\n2 0\n3 2\n");
    let graph: DiskUndirectedGraph<u32> =
        DiskUndirectedGraph::from_file(&input, dir.path().join("graph"), &tiny_chunks()).unwrap();

    assert_eq!(graph.size(), 4);
    assert_eq!(graph.num_links(), 5);
    assert_eq!(graph.links().count(), 5);
    let node = |i: usize| graph.get(i).unwrap();
    assert_eq!(graph.degree(node(0)).unwrap(), 3);
    assert_eq!(graph.degree(node(1)).unwrap(), 2);
    assert_eq!(graph.degree(node(2)).unwrap(), 3);
    assert_eq!(graph.links_between(node(0), node(2)).unwrap().len(), 2);
}

#[test]
fn test_malformed_line_leaves_no_store() {
    let dir = TempDir::new().unwrap();
    let input = write_edges(&dir, "0 1\n1 2 3\n");
    let target = dir.path().join("graph");

    let err = DiskDirectedGraph::<u32>::from_file(&input, &target, &LoadConfig::default()).unwrap_err();
    match err {
        GraphError::MalformedInput(msg) => assert!(msg.contains("line 2")),
        other => panic!("unexpected error: {}", other),
    }
    assert!(!target.exists());
}

#[test]
fn test_degree_limit_applies_to_load() {
    let dir = TempDir::new().unwrap();
    let input = write_edges(&dir, "0 1\n0 2\n0 3\n");
    let config = LoadConfig {
        disk: DiskConfig {
            limits: Limits {
                max_degree: 2,
                ..Limits::default()
            },
            ..DiskConfig::unlabeled()
        },
        ..LoadConfig::default()
    };
    let target = dir.path().join("graph");
    let err = load_directed(&input, &target, &config).unwrap_err();
    assert!(matches!(err, GraphError::CapacityExceeded { .. }));
    assert!(!target.exists());
}

fn node_limit(max_nodes: u32) -> LoadConfig {
    LoadConfig {
        disk: DiskConfig {
            limits: Limits {
                max_nodes,
                ..Limits::default()
            },
            ..DiskConfig::unlabeled()
        },
        ..LoadConfig::default()
    }
}

#[test]
fn test_node_limit_checked_before_padding() {
    let dir = TempDir::new().unwrap();
    // Padding up to this index would write billions of empty lists.
    let input = write_edges(&dir, "0 4000000000\n");
    let config = node_limit(4);

    let target = dir.path().join("directed");
    let err = load_directed(&input, &target, &config).unwrap_err();
    assert!(matches!(err, GraphError::CapacityExceeded { what: "node count", limit: 4 }));
    assert!(!target.exists());

    let target = dir.path().join("undirected");
    let err = load_undirected(&input, &target, &config).unwrap_err();
    assert!(matches!(err, GraphError::CapacityExceeded { what: "node count", limit: 4 }));
    assert!(!target.exists());
}

#[test]
fn test_node_limit_allows_exact_fit() {
    let dir = TempDir::new().unwrap();
    let input = write_edges(&dir, "0 3\n");
    let summary = load_directed(&input, &dir.path().join("graph"), &node_limit(4)).unwrap();
    assert_eq!(summary.nodes, 4);
    assert_eq!(summary.links, 1);
}

#[test]
fn test_largest_index_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_edges(&dir, "0 1\n4294967295 0\n");
    let target = dir.path().join("graph");
    let err = load_directed(&input, &target, &LoadConfig::default()).unwrap_err();
    assert!(matches!(err, GraphError::MalformedInput(ref msg) if msg.contains("line 2")));
    assert!(!target.exists());
}

#[test]
fn test_loaded_store_is_mutable() {
    let dir = TempDir::new().unwrap();
    let input = write_edges(&dir, "0 1\n1 2\n");
    let path = dir.path().join("graph");
    let mut graph: DiskDirectedGraph<u32> =
        DiskDirectedGraph::from_file(&input, &path, &LoadConfig::default()).unwrap();

    let extra = graph.add(Some(9)).unwrap();
    assert_eq!(graph.label(extra).unwrap(), None);
    graph.connect(extra, graph.get(0).unwrap()).unwrap();
    graph.remove_node(graph.get(1).unwrap()).unwrap();
    assert_eq!(graph.num_links(), 1);
    graph.close().unwrap();

    let reopened: DiskDirectedGraph<u32> = DiskDirectedGraph::open(&path, DiskConfig::default()).unwrap();
    assert_eq!(reopened.size(), 3);
    assert_eq!(reopened.num_links(), 1);
    assert_eq!(reopened.to_string(), "[2 -> 0, 1]");
}
