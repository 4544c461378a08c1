//! Spatial join engine: match point features to their nearest edge
//!
//! Candidates come from the bounding-box index and are refined with
//! exact geometry: distance to the edge's start node, end node, and
//! every on-segment orthogonal projection. An optional attribute
//! criterion restricts candidates to edges sharing the point's value;
//! an optional threshold caps the accepted distance. A point with no
//! surviving candidate is unmatched and excluded from counts.

use std::collections::{BTreeMap, HashMap};

use log::info;
use rayon::prelude::*;

use netgis_core::config::SpatialConfig;
use netgis_core::error::Result;
use netgis_core::geometry::{is_point_on_line, line_length, nearest_point_on_line, Point};
use netgis_core::graph::{AttributeValue, Edge, LineGraph, PointFeature, PointGraph};

use crate::index::EdgeIndex;

/// Sentinel edge id assigned to unmatched points.
pub const UNMATCHED: i64 = -1;

/// Parameters for the spatial join.
#[derive(Debug, Clone, Default)]
pub struct JoinParams {
    /// Attribute name that must hold equal values on the point and the
    /// edge for the edge to be a candidate. `None` means no filter;
    /// a named attribute missing on either side is a hard error.
    pub criterion: Option<String>,
    /// Maximum accepted distance. `None` means unbounded.
    pub threshold: Option<f64>,
}

/// Result of the core spatial join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Point id to nearest edge id, [`UNMATCHED`] when nothing survived.
    pub nearest_edge: BTreeMap<i64, i64>,
    /// Edge id to number of points assigned to it; every edge is
    /// present, zero-matched edges included.
    pub match_counts: BTreeMap<i64, u64>,
}

fn keep(best: &mut Option<(f64, i64)>, d: f64, edge_id: i64, threshold: Option<f64>) {
    if let Some(t) = threshold {
        if d > t {
            return;
        }
    }
    match best {
        Some((bd, _)) if *bd <= d => {}
        _ => *best = Some((d, edge_id)),
    }
}

/// Distances from `p` worth considering for one candidate edge:
/// start node, end node, and each on-segment projection.
fn candidate_distances(
    p: Point,
    edge: &Edge,
    threshold: Option<f64>,
    cfg: &SpatialConfig,
    best: &mut Option<(f64, i64)>,
) {
    if let Some(&start) = edge.chain.first() {
        keep(best, line_length(p, start), edge.id, threshold);
    }
    if let Some(&end) = edge.chain.last() {
        keep(best, line_length(p, end), edge.id, threshold);
    }
    for (prev, curr) in edge.segments() {
        let proj = nearest_point_on_line(prev, curr, p);
        if is_point_on_line(prev, curr, proj, cfg.line_tolerance) {
            keep(best, line_length(p, proj), edge.id, threshold);
        }
    }
}

fn match_point(
    feature: &PointFeature,
    edges_by_id: &HashMap<i64, &Edge>,
    index: &EdgeIndex,
    params: &JoinParams,
    cfg: &SpatialConfig,
) -> Result<i64> {
    let mut best: Option<(f64, i64)> = None;
    for edge_id in index.nearest(feature.position, cfg.nearest_fanout) {
        let Some(edge) = edges_by_id.get(&edge_id) else {
            continue;
        };
        if let Some(name) = &params.criterion {
            if edge.attribute(name)? != feature.attribute(name)? {
                continue;
            }
        }
        candidate_distances(feature.position, edge, params.threshold, cfg, &mut best);
    }
    Ok(best.map(|(_, id)| id).unwrap_or(UNMATCHED))
}

/// Match every point to its nearest edge.
///
/// The per-point loop is parallel; the index and the graphs are
/// read-only throughout.
pub fn spatial_join(
    points: &PointGraph,
    lines: &LineGraph,
    params: &JoinParams,
    cfg: &SpatialConfig,
) -> Result<JoinOutcome> {
    let index = EdgeIndex::build(lines);
    let edges_by_id: HashMap<i64, &Edge> = lines.edges().map(|e| (e.id, e)).collect();

    let features: Vec<&PointFeature> = points.points().collect();
    let matches: Vec<(i64, i64)> = features
        .par_iter()
        .map(|f| match_point(f, &edges_by_id, &index, params, cfg).map(|id| (f.id, id)))
        .collect::<Result<_>>()?;

    let mut outcome = JoinOutcome {
        nearest_edge: BTreeMap::new(),
        match_counts: lines.edges().map(|e| (e.id, 0)).collect(),
    };
    for (point_id, edge_id) in matches {
        outcome.nearest_edge.insert(point_id, edge_id);
        if edge_id != UNMATCHED {
            *outcome.match_counts.entry(edge_id).or_insert(0) += 1;
        }
    }
    Ok(outcome)
}

/// Copy of the point graph with the nearest edge id attached to each
/// point as `nearEdge`.
pub fn nearest(
    points: &PointGraph,
    lines: &LineGraph,
    params: &JoinParams,
    cfg: &SpatialConfig,
) -> Result<PointGraph> {
    let outcome = spatial_join(points, lines, params, cfg)?;
    let mut out = points.clone();
    for feature in out.points_mut() {
        let id = outcome.nearest_edge.get(&feature.id).copied().unwrap_or(UNMATCHED);
        feature
            .attributes
            .insert("nearEdge".to_string(), AttributeValue::Int(id));
    }
    info!("nearest edge id attached to {} points", out.len());
    Ok(out)
}

/// Copy of the line graph with the per-edge match count attached as
/// `joinCount`.
pub fn join_count(
    points: &PointGraph,
    lines: &LineGraph,
    params: &JoinParams,
    cfg: &SpatialConfig,
) -> Result<LineGraph> {
    let outcome = spatial_join(points, lines, params, cfg)?;
    let mut out = lines.clone();
    for edge in out.edges_mut() {
        let count = outcome.match_counts.get(&edge.id).copied().unwrap_or(0);
        edge.attributes
            .insert("joinCount".to_string(), AttributeValue::Int(count as i64));
    }
    info!("join count attached to {} edges", out.edge_count());
    Ok(out)
}

/// Move every point onto the closest location on the network: the
/// nearest edge node or on-segment projection under the same
/// criterion/threshold rules. Unmatched points are dropped.
pub fn snap_to_network(
    points: &PointGraph,
    lines: &LineGraph,
    params: &JoinParams,
    cfg: &SpatialConfig,
) -> Result<PointGraph> {
    let index = EdgeIndex::build(lines);
    let edges_by_id: HashMap<i64, &Edge> = lines.edges().map(|e| (e.id, e)).collect();

    let mut out = PointGraph::new(points.decimals());
    for feature in points.points() {
        let p = feature.position;
        let mut best: Option<(f64, Point)> = None;
        for edge_id in index.nearest(p, cfg.nearest_fanout) {
            let Some(edge) = edges_by_id.get(&edge_id) else {
                continue;
            };
            if let Some(name) = &params.criterion {
                if edge.attribute(name)? != feature.attribute(name)? {
                    continue;
                }
            }
            let mut keep_pos = |d: f64, candidate: Point| {
                if let Some(t) = params.threshold {
                    if d > t {
                        return;
                    }
                }
                match best {
                    Some((bd, _)) if bd <= d => {}
                    _ => best = Some((d, candidate)),
                }
            };
            if let Some(&start) = edge.chain.first() {
                keep_pos(line_length(p, start), start);
            }
            if let Some(&end) = edge.chain.last() {
                keep_pos(line_length(p, end), end);
            }
            for (prev, curr) in edge.segments() {
                let proj = nearest_point_on_line(prev, curr, p);
                if is_point_on_line(prev, curr, proj, cfg.line_tolerance) {
                    keep_pos(line_length(p, proj), proj);
                }
            }
        }
        if let Some((_, snapped)) = best {
            let mut moved = feature.clone();
            moved.position = snapped;
            out.insert(moved);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgis_core::error::Error;

    fn line(id: i64, coords: &[(f64, f64)]) -> Edge {
        Edge::new(
            id,
            coords.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            6,
        )
    }

    fn single_line_graph() -> LineGraph {
        let mut g = LineGraph::new(6);
        g.insert_edge(line(0, &[(0.0, 0.0), (10.0, 0.0)]));
        g
    }

    fn point(id: i64, x: f64, y: f64) -> PointFeature {
        PointFeature::new(id, Point::new(x, y))
    }

    #[test]
    fn test_point_near_edge_matches() {
        let lines = single_line_graph();
        let mut points = PointGraph::new(6);
        points.insert(point(0, 5.0, 0.01));
        let params = JoinParams {
            criterion: None,
            threshold: Some(1.0),
        };
        let outcome = spatial_join(&points, &lines, &params, &SpatialConfig::default()).unwrap();
        assert_eq!(outcome.nearest_edge.get(&0), Some(&0));
        assert_eq!(outcome.match_counts.get(&0), Some(&1));
    }

    #[test]
    fn test_threshold_excludes_far_point() {
        let lines = single_line_graph();
        let mut points = PointGraph::new(6);
        points.insert(point(0, 5.0, 50.0));
        let params = JoinParams {
            criterion: None,
            threshold: Some(1.0),
        };
        let outcome = spatial_join(&points, &lines, &params, &SpatialConfig::default()).unwrap();
        assert_eq!(outcome.nearest_edge.get(&0), Some(&UNMATCHED));
        assert_eq!(outcome.match_counts.get(&0), Some(&0));
    }

    #[test]
    fn test_unbounded_threshold_matches_far_point() {
        let lines = single_line_graph();
        let mut points = PointGraph::new(6);
        points.insert(point(0, 5.0, 50.0));
        let outcome = spatial_join(
            &points,
            &lines,
            &JoinParams::default(),
            &SpatialConfig::default(),
        )
        .unwrap();
        assert_eq!(outcome.nearest_edge.get(&0), Some(&0));
    }

    #[test]
    fn test_criterion_filters_candidates() {
        let mut lines = LineGraph::new(6);
        let mut near = line(0, &[(0.0, 0.0), (10.0, 0.0)]);
        near.attributes
            .insert("route".into(), AttributeValue::Str("A".into()));
        let mut far = line(1, &[(0.0, 5.0), (10.0, 5.0)]);
        far.attributes
            .insert("route".into(), AttributeValue::Str("B".into()));
        lines.insert_edge(near);
        lines.insert_edge(far);

        let mut points = PointGraph::new(6);
        let mut pf = point(0, 5.0, 1.0);
        pf.attributes
            .insert("route".into(), AttributeValue::Str("B".into()));
        points.insert(pf);

        let params = JoinParams {
            criterion: Some("route".into()),
            threshold: None,
        };
        let outcome = spatial_join(&points, &lines, &params, &SpatialConfig::default()).unwrap();
        // The geometrically closer edge is filtered out by the
        // criterion; the matching edge wins.
        assert_eq!(outcome.nearest_edge.get(&0), Some(&1));
    }

    #[test]
    fn test_missing_criterion_attribute_is_hard_error() {
        let lines = single_line_graph();
        let mut points = PointGraph::new(6);
        points.insert(point(0, 5.0, 0.0));
        let params = JoinParams {
            criterion: Some("route".into()),
            threshold: None,
        };
        let err = spatial_join(&points, &lines, &params, &SpatialConfig::default());
        assert!(matches!(err, Err(Error::MissingAttribute { .. })));
    }

    #[test]
    fn test_counts_sum_to_matched_points() {
        let mut lines = LineGraph::new(6);
        lines.insert_edge(line(0, &[(0.0, 0.0), (10.0, 0.0)]));
        lines.insert_edge(line(1, &[(0.0, 10.0), (10.0, 10.0)]));

        let mut points = PointGraph::new(6);
        points.insert(point(0, 2.0, 0.5));
        points.insert(point(1, 8.0, 0.5));
        points.insert(point(2, 5.0, 9.5));
        points.insert(point(3, 5.0, 500.0)); // unmatched under threshold

        let params = JoinParams {
            criterion: None,
            threshold: Some(2.0),
        };
        let outcome = spatial_join(&points, &lines, &params, &SpatialConfig::default()).unwrap();
        let matched: u64 = outcome.match_counts.values().sum();
        let unmatched = outcome
            .nearest_edge
            .values()
            .filter(|&&id| id == UNMATCHED)
            .count();
        assert_eq!(matched as usize + unmatched, 4);
        assert_eq!(outcome.match_counts.get(&0), Some(&2));
        assert_eq!(outcome.match_counts.get(&1), Some(&1));
    }

    #[test]
    fn test_join_count_attaches_zero_for_unmatched_edges() {
        let mut lines = LineGraph::new(6);
        lines.insert_edge(line(0, &[(0.0, 0.0), (10.0, 0.0)]));
        lines.insert_edge(line(1, &[(0.0, 100.0), (10.0, 100.0)]));
        let mut points = PointGraph::new(6);
        points.insert(point(0, 5.0, 0.0));

        let out = join_count(
            &points,
            &lines,
            &JoinParams::default(),
            &SpatialConfig::default(),
        )
        .unwrap();
        let counts: Vec<i64> = out
            .edges()
            .map(|e| match e.attributes.get("joinCount") {
                Some(AttributeValue::Int(c)) => *c,
                other => panic!("missing joinCount: {:?}", other),
            })
            .collect();
        let mut sorted = counts.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1]);
    }

    #[test]
    fn test_nearest_attaches_sentinel() {
        let lines = single_line_graph();
        let mut points = PointGraph::new(6);
        points.insert(point(0, 5.0, 50.0));
        let params = JoinParams {
            criterion: None,
            threshold: Some(1.0),
        };
        let out = nearest(&points, &lines, &params, &SpatialConfig::default()).unwrap();
        let pf = out.points().next().unwrap();
        assert_eq!(
            pf.attributes.get("nearEdge"),
            Some(&AttributeValue::Int(UNMATCHED))
        );
    }

    #[test]
    fn test_snap_moves_point_to_projection() {
        let lines = single_line_graph();
        let mut points = PointGraph::new(6);
        points.insert(point(0, 5.0, 2.0));
        let out = snap_to_network(
            &points,
            &lines,
            &JoinParams::default(),
            &SpatialConfig::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        let snapped = out.points().next().unwrap();
        assert!((snapped.position.x - 5.0).abs() < 1e-9);
        assert!(snapped.position.y.abs() < 1e-9);
    }

    #[test]
    fn test_snap_drops_unmatched_points() {
        let lines = single_line_graph();
        let mut points = PointGraph::new(6);
        points.insert(point(0, 5.0, 50.0));
        let params = JoinParams {
            criterion: None,
            threshold: Some(1.0),
        };
        let out = snap_to_network(&points, &lines, &params, &SpatialConfig::default()).unwrap();
        assert!(out.is_empty());
    }
}
