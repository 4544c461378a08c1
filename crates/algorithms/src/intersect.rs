//! Intersection engine: re-cut edges at shared junction vertices
//!
//! A vertex that occurs in more than one chain position across the
//! graph is a junction. Every edge passing through a junction strictly
//! inside its chain is cut there, so that no edge crosses another
//! edge's junction uncut. Sub-chains concatenate back to the original
//! geometry exactly.

use std::collections::HashSet;

use netgis_core::config::SpatialConfig;
use netgis_core::geometry::NodeKey;
use netgis_core::graph::{Edge, LineGraph};

use crate::metrics;

/// Vertices occurring more than once across all edge chains.
fn junctions(graph: &LineGraph, decimals: u32) -> HashSet<NodeKey> {
    let mut seen = HashSet::new();
    let mut shared = HashSet::new();
    for edge in graph.edges() {
        for p in &edge.chain {
            let key = p.key(decimals);
            if !seen.insert(key) {
                shared.insert(key);
            }
        }
    }
    shared
}

/// Cut every edge at each junction vertex strictly interior to its
/// chain and return the re-cut graph.
///
/// New edges get fresh sequential ids and no attributes; distance is
/// recomputed on the output. Applying the operation twice yields no
/// further cuts.
pub fn by_geometry(graph: &LineGraph, cfg: &SpatialConfig) -> LineGraph {
    let junctions = junctions(graph, cfg.decimals);

    let mut out = LineGraph::new(cfg.decimals);
    let mut next_id: i64 = 0;

    for edge in graph.edges() {
        if edge.chain.len() < 2 {
            continue;
        }
        let mut cuts: Vec<usize> = vec![0];
        for (i, p) in edge.chain.iter().enumerate().skip(1) {
            if i == edge.chain.len() - 1 {
                break;
            }
            if junctions.contains(&p.key(cfg.decimals)) {
                cuts.push(i);
            }
        }
        cuts.push(edge.chain.len() - 1);

        for w in cuts.windows(2) {
            let sub_chain = edge.chain[w[0]..=w[1]].to_vec();
            for &p in &sub_chain {
                out.add_node(p);
            }
            out.insert_edge(Edge::new(next_id, sub_chain, cfg.decimals));
            next_id += 1;
        }
    }

    metrics::add_distance(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgis_core::geometry::Point;

    fn chain(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn crossing_graph() -> LineGraph {
        // Horizontal edge passing through (4, 0) as an interior vertex,
        // crossed by a vertical edge that also has (4, 0) interior.
        let mut g = LineGraph::new(6);
        g.insert_edge(Edge::new(
            0,
            chain(&[(0.0, 0.0), (4.0, 0.0), (10.0, 0.0)]),
            6,
        ));
        g.insert_edge(Edge::new(
            1,
            chain(&[(4.0, -5.0), (4.0, 0.0), (4.0, 5.0)]),
            6,
        ));
        g
    }

    #[test]
    fn test_cuts_both_edges_at_shared_vertex() {
        let out = by_geometry(&crossing_graph(), &SpatialConfig::default());
        assert_eq!(out.edge_count(), 4);
        let mut lens: Vec<f64> = out.edges().map(|e| e.length).collect();
        lens.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(lens, vec![4.0, 5.0, 5.0, 6.0]);
    }

    #[test]
    fn test_geometry_is_preserved() {
        let out = by_geometry(&crossing_graph(), &SpatialConfig::default());
        let total: f64 = out.edges().map(|e| e.length).sum();
        assert!((total - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_shared_endpoints_do_not_cut() {
        // Two edges meeting at a shared endpoint stay whole.
        let mut g = LineGraph::new(6);
        g.insert_edge(Edge::new(0, chain(&[(0.0, 0.0), (5.0, 0.0)]), 6));
        g.insert_edge(Edge::new(1, chain(&[(5.0, 0.0), (10.0, 0.0)]), 6));
        let out = by_geometry(&g, &SpatialConfig::default());
        assert_eq!(out.edge_count(), 2);
    }

    #[test]
    fn test_idempotent() {
        let once = by_geometry(&crossing_graph(), &SpatialConfig::default());
        let twice = by_geometry(&once, &SpatialConfig::default());
        assert_eq!(once.edge_count(), twice.edge_count());
        let mut a: Vec<f64> = once.edges().map(|e| e.length).collect();
        let mut b: Vec<f64> = twice.edges().map(|e| e.length).collect();
        a.sort_by(|x, y| x.total_cmp(y));
        b.sort_by(|x, y| x.total_cmp(y));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fresh_sequential_ids() {
        let out = by_geometry(&crossing_graph(), &SpatialConfig::default());
        let mut ids: Vec<i64> = out.edges().map(|e| e.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
}
