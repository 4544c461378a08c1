//! Split engine: cut polyline edges at arc-length intervals or at
//! externally supplied points
//!
//! Both operations are copy-on-write: they leave the input graph
//! untouched and return a brand-new graph with fresh metric
//! annotations.

use std::collections::BTreeMap;

use log::debug;

use netgis_core::config::SpatialConfig;
use netgis_core::error::{Error, Result};
use netgis_core::geometry::{
    is_point_on_line, line_length, nearest_point_on_line, points_at_distance, NodeKey, Point,
};
use netgis_core::graph::{AttributeValue, Edge, LineGraph, PointGraph};

use crate::metrics;

/// Split every edge of `graph` at fixed arc-length intervals.
///
/// Split points are spaced `distance` apart cumulatively along each
/// edge's chain, carrying the remainder across chain vertices so the
/// spacing is exact rather than per-segment. The final partial piece
/// before the end node gets no extra split point. Attributes named in
/// `carry_attrs` are copied verbatim onto every sub-edge; a missing
/// name is a schema violation. Zero-length sub-edges are discarded.
/// The output graph is re-annotated with distance and center.
pub fn by_distance(
    graph: &LineGraph,
    distance: f64,
    carry_attrs: &[&str],
    cfg: &SpatialConfig,
) -> Result<LineGraph> {
    if !(distance > 0.0 && distance.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "distance",
            value: distance.to_string(),
            reason: "split interval must be positive and finite".into(),
        });
    }

    let split_nodes = split_nodes(graph, distance, cfg);

    let mut out = LineGraph::new(cfg.decimals);
    for &p in split_nodes.values() {
        out.add_node(p);
    }

    let mut next_id: i64 = 0;
    for edge in graph.edges() {
        // Order every vertex of the edge, original vertices and split
        // nodes alike, by cumulative distance along the chain.
        let mut ordered: Vec<(f64, Point)> = Vec::new();
        let mut cumul = 0.0;
        if let Some(&first) = edge.chain.first() {
            ordered.push((0.0, first));
        }
        for (prev, curr) in edge.segments() {
            for &node in split_nodes.values() {
                if is_point_on_line(prev, curr, node, cfg.line_tolerance) {
                    ordered.push((cumul + line_length(prev, node), node));
                }
            }
            cumul += line_length(prev, curr);
            ordered.push((cumul, curr));
        }
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));
        ordered.dedup_by(|b, a| b.0 == a.0 && b.1 == a.1);

        // Cut at every ordered vertex that is a split node.
        let mut start_idx = 0usize;
        for (i, &(_, v)) in ordered.iter().enumerate() {
            if !split_nodes.contains_key(&v.key(cfg.decimals)) {
                continue;
            }
            let start_v = ordered[start_idx].1;
            if start_v.key(cfg.decimals) == v.key(cfg.decimals) {
                continue;
            }
            let chain: Vec<Point> = ordered[start_idx..=i].iter().map(|&(_, p)| p).collect();
            let mut sub = Edge::new(next_id, chain, cfg.decimals);
            for &attr in carry_attrs {
                sub.attributes
                    .insert(attr.to_string(), edge.attribute(attr)?.clone());
            }
            out.insert_edge(sub);
            start_idx = i;
            next_id += 1;
        }
    }

    metrics::add_distance(&mut out);
    metrics::add_center(&mut out, cfg);
    debug!(
        "split {} edges into {} at interval {}",
        graph.edge_count(),
        out.edge_count(),
        distance
    );
    Ok(out)
}

/// Walk every edge collecting its endpoints plus a split node every
/// `distance` of arc length, with the remainder carried across chain
/// vertices.
fn split_nodes(graph: &LineGraph, distance: f64, cfg: &SpatialConfig) -> BTreeMap<NodeKey, Point> {
    let mut nodes: BTreeMap<NodeKey, Point> = BTreeMap::new();
    let mut add = |p: Point| {
        let r = p.rounded(cfg.decimals);
        nodes.insert(r.key(cfg.decimals), r);
    };

    for edge in graph.edges() {
        if let Some(&first) = edge.chain.first() {
            add(first);
        }

        if edge.chain_length() >= distance {
            let mut remain = 0.0;
            let mut to_go = distance;
            for (prev, curr) in edge.segments() {
                let mut cursor = prev;
                let mut first_pass = true;
                loop {
                    if !first_pass {
                        to_go = distance;
                    }
                    to_go -= remain;
                    first_pass = false;

                    let seg = line_length(cursor, curr);
                    if seg < to_go {
                        // Segment exhausted; carry what it consumed.
                        remain = seg;
                        break;
                    }
                    // The split point may coincide with the segment's
                    // end vertex; it still marks a cut, and the next
                    // interval starts fresh from there.
                    let split = points_at_distance(cursor, curr, to_go)
                        .into_iter()
                        .next()
                        .unwrap_or(curr);
                    add(split);
                    remain = 0.0;
                    cursor = split;
                }
            }
        }

        if let Some(&last) = edge.chain.last() {
            add(last);
        }
    }
    nodes
}

/// Split edges of `line_graph` at each point of `point_graph`.
///
/// A point cuts the first sub-segment that both passes the coarse
/// on-line test and lies within `snap_tolerance` of the point's
/// orthogonal projection; first found wins. The two halves inherit all
/// attributes of the original edge, and each end additionally receives
/// `node1_<attr>`/`node2_<attr>` values from the point graph when the
/// rounded end coordinate is one of its nodes. `node_attrs` pairs each
/// attribute name with the default every edge is pre-initialized with.
/// Zero-length halves are silently dropped; distances are recomputed
/// over the whole output at the end.
pub fn at_points(
    line_graph: &LineGraph,
    point_graph: &PointGraph,
    node_attrs: &[(&str, AttributeValue)],
    cfg: &SpatialConfig,
) -> Result<LineGraph> {
    let mut out = line_graph.clone();

    for edge in out.edges_mut() {
        for (name, default) in node_attrs {
            edge.attributes
                .insert(format!("node1_{name}"), default.clone());
            edge.attributes
                .insert(format!("node2_{name}"), default.clone());
        }
    }

    let mut next_id = point_graph.len() as i64;

    for feature in point_graph.points() {
        let p = feature.position;
        'scan: for key in out.edge_keys() {
            let Some(edge) = out.edge(key) else { continue };
            for i in 1..edge.chain.len() {
                let prev = edge.chain[i - 1];
                let curr = edge.chain[i];
                if !is_point_on_line(prev, curr, p, cfg.line_tolerance) {
                    continue;
                }
                let near = nearest_point_on_line(prev, curr, p);
                // The on-line test is coarse; require the projection to
                // actually coincide with the point before cutting.
                if line_length(near, p) >= cfg.snap_tolerance {
                    continue;
                }

                let mut chain1: Vec<Point> = edge.chain[..i].to_vec();
                chain1.push(near);
                let mut chain2: Vec<Point> = vec![near];
                chain2.extend_from_slice(&edge.chain[i..]);

                let parent_attrs = edge.attributes.clone();
                let removed = out.remove_edge(key);
                debug_assert!(removed.is_some());

                for chain in [chain1, chain2] {
                    let mut half = Edge::new(next_id, chain, cfg.decimals);
                    if half.start == half.end {
                        continue;
                    }
                    half.attributes = parent_attrs.clone();
                    for (name, _) in node_attrs {
                        for (slot, key) in [("node1", half.start), ("node2", half.end)] {
                            if let Some(pf) = point_graph.get(key) {
                                half.attributes
                                    .insert(format!("{slot}_{name}"), pf.attribute(name)?.clone());
                            }
                        }
                    }
                    out.insert_edge(half);
                    next_id += 1;
                }
                break 'scan;
            }
        }
    }

    metrics::add_distance(&mut out);
    Ok(out)
}
