//! Network kernel density estimation
//!
//! Density is estimated per lixel (a short, near-uniform sub-segment
//! produced by the split engine) from event counts spatially joined
//! onto the lixels. Distance between lixels is measured as shortest
//! path along a "center graph" connecting the lixel center points,
//! with edge weights equal to network distance. Contributions that
//! pass a junction are optionally discounted by a divergence weight so
//! flow that forks at a branch point is not double-counted.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use log::debug;
use rayon::prelude::*;

use netgis_core::config::SpatialConfig;
use netgis_core::error::{Error, Result};
use netgis_core::geometry::{NodeKey, Point};
use netgis_core::graph::{AttributeValue, LineGraph};

/// Kernel function kind. Only the Gaussian kernel is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kernel {
    #[default]
    Gaussian,
}

/// Parameters for network KDE.
#[derive(Debug, Clone)]
pub struct KdeParams {
    /// Search bandwidth in network distance units. Centers farther
    /// than this along the network contribute nothing.
    pub bandwidth: f64,
    pub kernel: Kernel,
    /// Discount contributions by how often the network forks between
    /// the source and the contributing center.
    pub diverge: bool,
}

impl Default for KdeParams {
    fn default() -> Self {
        Self {
            bandwidth: 1000.0,
            kernel: Kernel::Gaussian,
            diverge: true,
        }
    }
}

/// Gaussian kernel value at network distance `d` for bandwidth `h`.
pub fn gaussian_kernel(h: f64, d: f64) -> f64 {
    (1.0 / (2.0 * std::f64::consts::PI).sqrt()) * (-0.5 * (d / h).powi(2)).exp()
}

/// Undirected adjacency and degree view of the center graph.
struct CenterNet {
    adjacency: HashMap<NodeKey, Vec<(NodeKey, f64)>>,
    /// Node degree with degree-1 ends clamped to 2, so a dangling end
    /// never zeroes a divergence product.
    degree: HashMap<NodeKey, usize>,
}

impl CenterNet {
    fn build(centers: &LineGraph) -> Self {
        let mut adjacency: HashMap<NodeKey, Vec<(NodeKey, f64)>> = HashMap::new();
        for edge in centers.edges() {
            let w = edge.chain_length();
            adjacency.entry(edge.start).or_default().push((edge.end, w));
            adjacency.entry(edge.end).or_default().push((edge.start, w));
        }
        let degree = adjacency
            .iter()
            .map(|(&k, nbrs)| {
                let distinct: HashSet<NodeKey> = nbrs.iter().map(|&(n, _)| n).collect();
                (k, distinct.len().max(2))
            })
            .collect();
        Self { adjacency, degree }
    }
}

/// Priority-queue entry (min-heap via reversed ordering).
#[derive(Debug, Clone, Copy, PartialEq)]
struct State {
    cost: f64,
    node: NodeKey,
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.node.cmp(&other.node))
    }
}

/// Single-source shortest paths with predecessors over the center
/// graph. A source absent from the graph yields only itself at
/// distance zero.
fn shortest_paths(
    net: &CenterNet,
    source: NodeKey,
) -> (HashMap<NodeKey, f64>, HashMap<NodeKey, NodeKey>) {
    let mut dist: HashMap<NodeKey, f64> = HashMap::new();
    let mut pred: HashMap<NodeKey, NodeKey> = HashMap::new();
    let mut heap = BinaryHeap::new();

    dist.insert(source, 0.0);
    heap.push(State {
        cost: 0.0,
        node: source,
    });

    while let Some(State { cost, node }) = heap.pop() {
        if cost > dist.get(&node).copied().unwrap_or(f64::MAX) {
            continue;
        }
        let Some(neighbors) = net.adjacency.get(&node) else {
            continue;
        };
        for &(next, weight) in neighbors {
            let candidate = cost + weight;
            if candidate < dist.get(&next).copied().unwrap_or(f64::MAX) {
                dist.insert(next, candidate);
                pred.insert(next, node);
                heap.push(State {
                    cost: candidate,
                    node: next,
                });
            }
        }
    }
    (dist, pred)
}

/// Divergence weight for one contributing center: the product of
/// `degree - 1` over every node on the path from the neighbor back to
/// the source, the source included, the neighbor itself excluded.
///
/// The predecessor walk is guarded by a visited set so malformed
/// predecessor data cannot loop forever.
fn divergence_weight(
    net: &CenterNet,
    pred: &HashMap<NodeKey, NodeKey>,
    neighbor: NodeKey,
) -> f64 {
    let mut weight = 1.0;
    let mut visited = HashSet::new();
    let mut current = neighbor;
    while let Some(&parent) = pred.get(&current) {
        if !visited.insert(current) {
            break;
        }
        let deg = net.degree.get(&parent).copied().unwrap_or(2);
        weight *= (deg - 1) as f64;
        current = parent;
    }
    weight
}

/// Kernel density per lixel center.
///
/// `lixels` must carry a center point (metric annotator) and a
/// `joinCount` event count (spatial join engine) per edge. `centers`
/// connects the lixel center points with edges whose chains measure
/// the original network distance. Returns one `(center, density)`
/// pair per lixel edge; the per-lixel loop runs in parallel.
pub fn network_kde(
    lixels: &LineGraph,
    centers: &LineGraph,
    params: &KdeParams,
    cfg: &SpatialConfig,
) -> Result<Vec<(Point, f64)>> {
    if !(params.bandwidth > 0.0 && params.bandwidth.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "bandwidth",
            value: params.bandwidth.to_string(),
            reason: "bandwidth must be positive and finite".into(),
        });
    }

    // Event count per lixel center.
    let mut events: HashMap<NodeKey, f64> = HashMap::new();
    let mut lixel_centers: Vec<Point> = Vec::with_capacity(lixels.edge_count());
    for edge in lixels.edges() {
        let center = edge.center.ok_or(Error::MissingCenter { id: edge.id })?;
        let count = edge.numeric_attribute("joinCount")?;
        events.insert(center.key(cfg.decimals), count);
        lixel_centers.push(center);
    }

    let net = CenterNet::build(centers);
    debug!(
        "network kde over {} lixels, {} center nodes, bandwidth {}",
        lixel_centers.len(),
        net.adjacency.len(),
        params.bandwidth
    );

    let densities = lixel_centers
        .into_par_iter()
        .map(|center| {
            let source = center.key(cfg.decimals);
            let (dist, pred) = shortest_paths(&net, source);

            let mut reachable: Vec<(NodeKey, f64)> = dist.into_iter().collect();
            reachable.sort_by(|a, b| a.1.total_cmp(&b.1));

            let mut density = 0.0;
            for &(node, d) in reachable.iter().take_while(|&&(_, d)| d <= params.bandwidth) {
                let Some(&count) = events.get(&node) else {
                    // Center-graph nodes that are not lixel centers
                    // (junctions, dangling ends) carry no events.
                    continue;
                };
                let weight = if params.diverge {
                    divergence_weight(&net, &pred, node)
                } else {
                    1.0
                };
                let kernel = match params.kernel {
                    Kernel::Gaussian => gaussian_kernel(params.bandwidth, d),
                };
                density += count * kernel / weight;
            }
            (center, density)
        })
        .collect();

    Ok(densities)
}

/// Copy of the lixel graph with densities attached as a `KDE`
/// attribute, matched by center point.
pub fn attach_density(
    lixels: &LineGraph,
    densities: &[(Point, f64)],
    cfg: &SpatialConfig,
) -> LineGraph {
    let by_center: HashMap<NodeKey, f64> = densities
        .iter()
        .map(|&(p, kd)| (p.key(cfg.decimals), kd))
        .collect();
    let mut out = lixels.clone();
    for edge in out.edges_mut() {
        if let Some(center) = edge.center {
            if let Some(&kd) = by_center.get(&center.key(cfg.decimals)) {
                edge.attributes
                    .insert("KDE".to_string(), AttributeValue::Float(kd));
            }
        }
    }
    out
}
