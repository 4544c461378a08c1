//! Metric annotation: per-edge length and mid-length center point
//!
//! Both annotators augment the graph in place and must be re-run after
//! any topology change that alters an edge's chain.

use netgis_core::config::SpatialConfig;
use netgis_core::geometry::{line_length, points_at_distance};
use netgis_core::graph::LineGraph;

/// Set each edge's `length` to the sum of its consecutive vertex
/// distances.
pub fn add_distance(graph: &mut LineGraph) {
    for edge in graph.edges_mut() {
        edge.length = edge.chain_length();
    }
}

/// Set each edge's `center` to the point at half its chain length,
/// measured along the chain (not straight-line), rounded to the
/// configured precision.
///
/// A zero-length edge takes its first vertex as center.
pub fn add_center(graph: &mut LineGraph, cfg: &SpatialConfig) {
    for edge in graph.edges_mut() {
        if edge.chain.is_empty() {
            continue;
        }
        let mut to_go = edge.chain_length() / 2.0;
        let mut center = edge.chain[0];
        for w in edge.chain.windows(2) {
            let (prev, curr) = (w[0], w[1]);
            let seg = line_length(prev, curr);
            if to_go > seg {
                to_go -= seg;
                center = curr;
            } else {
                center = points_at_distance(prev, curr, to_go)
                    .into_iter()
                    .next()
                    .unwrap_or(prev);
                break;
            }
        }
        edge.center = Some(center.rounded(cfg.decimals));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgis_core::geometry::Point;
    use netgis_core::graph::Edge;

    fn graph_with_chain(coords: &[(f64, f64)]) -> LineGraph {
        let mut g = LineGraph::new(6);
        let chain = coords.iter().map(|&(x, y)| Point::new(x, y)).collect();
        g.insert_edge(Edge::new(0, chain, 6));
        g
    }

    #[test]
    fn test_add_distance_sums_chain() {
        let mut g = graph_with_chain(&[(0.0, 0.0), (3.0, 4.0), (3.0, 14.0)]);
        add_distance(&mut g);
        let e = g.edges().next().unwrap();
        assert!((e.length - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_center_at_half_length_straight() {
        let mut g = graph_with_chain(&[(0.0, 0.0), (10.0, 0.0)]);
        add_distance(&mut g);
        add_center(&mut g, &SpatialConfig::default());
        let e = g.edges().next().unwrap();
        assert_eq!(e.center, Some(Point::new(5.0, 0.0)));
    }

    #[test]
    fn test_center_measured_along_chain() {
        // L-shape of total length 10; half length 5 lands at the bend.
        let mut g = graph_with_chain(&[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)]);
        add_distance(&mut g);
        add_center(&mut g, &SpatialConfig::default());
        let e = g.edges().next().unwrap();
        let c = e.center.unwrap();
        assert!((c.x - 5.0).abs() < 1e-9);
        assert!(c.y.abs() < 1e-9);
    }

    #[test]
    fn test_center_inside_later_segment() {
        // Lengths 2 then 8; half length 5 is 3 into the second segment.
        let mut g = graph_with_chain(&[(0.0, 0.0), (2.0, 0.0), (2.0, 8.0)]);
        add_distance(&mut g);
        add_center(&mut g, &SpatialConfig::default());
        let c = g.edges().next().unwrap().center.unwrap();
        assert_eq!(c, Point::new(2.0, 3.0));
    }

    #[test]
    fn test_center_of_zero_length_edge() {
        let mut g = graph_with_chain(&[(1.0, 1.0), (1.0, 1.0)]);
        add_distance(&mut g);
        add_center(&mut g, &SpatialConfig::default());
        let e = g.edges().next().unwrap();
        assert_eq!(e.length, 0.0);
        assert_eq!(e.center, Some(Point::new(1.0, 1.0)));
    }
}
