//! Bounding-box spatial index over polyline edges
//!
//! One axis-aligned rectangle per edge, built from the min/max of its
//! vertex chain and keyed by edge id. Nearest queries are ordered by
//! rectangle distance, which is only an approximation: the caller must
//! refine candidates with exact point-to-line distance and should ask
//! for more candidates than it strictly needs.

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;

use netgis_core::geometry::Point;
use netgis_core::graph::LineGraph;

type EdgeRect = GeomWithData<Rectangle<[f64; 2]>, i64>;

/// Ephemeral R-tree over one graph's current edges.
///
/// The index is read-only after construction and safe to share across
/// parallel queries; rebuild it after any topology change.
pub struct EdgeIndex {
    tree: RTree<EdgeRect>,
}

impl EdgeIndex {
    /// Build the index from a graph's edges. Edges with an empty chain
    /// are skipped.
    pub fn build(graph: &LineGraph) -> Self {
        let items: Vec<EdgeRect> = graph
            .edges()
            .filter(|e| !e.chain.is_empty())
            .map(|e| {
                let mut min = [f64::INFINITY, f64::INFINITY];
                let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
                for p in &e.chain {
                    min[0] = min[0].min(p.x);
                    min[1] = min[1].min(p.y);
                    max[0] = max[0].max(p.x);
                    max[1] = max[1].max(p.y);
                }
                GeomWithData::new(Rectangle::from_corners(min, max), e.id)
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// Up to `k` edge ids ordered by bounding-box proximity to `p`.
    pub fn nearest(&self, p: Point, k: usize) -> Vec<i64> {
        self.tree
            .nearest_neighbor_iter(&[p.x, p.y])
            .take(k)
            .map(|item| item.data)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
