//! Attributed polyline graph types
//!
//! A [`LineGraph`] holds edges keyed by their rounded endpoint
//! coordinates; each edge carries an ordered vertex chain, a free-form
//! attribute map and derived length/center fields. A [`PointGraph`]
//! holds point features keyed the same way. External readers build
//! these from spatial file formats; external writers serialize them
//! back. Conversions to and from `geo-types` form that boundary.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{line_length, NodeKey, Point};

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl AttributeValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            AttributeValue::Int(v) => Some(v as f64),
            AttributeValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

/// A directed polyline edge with attributes.
///
/// Invariant: the chain has at least two vertices, and its first and
/// last vertices round to `start` and `end`. `length` and `center`
/// are derived by the metric annotator and recomputed after any
/// topology change; [`Edge::chain_length`] is always fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: i64,
    pub start: NodeKey,
    pub end: NodeKey,
    pub chain: Vec<Point>,
    pub attributes: HashMap<String, AttributeValue>,
    pub length: f64,
    pub center: Option<Point>,
}

impl Edge {
    /// Build an edge from its vertex chain; endpoints are derived from
    /// the first and last vertices rounded to `decimals`.
    pub fn new(id: i64, chain: Vec<Point>, decimals: u32) -> Self {
        let start = chain.first().copied().unwrap_or_default().key(decimals);
        let end = chain.last().copied().unwrap_or_default().key(decimals);
        Self {
            id,
            start,
            end,
            chain,
            attributes: HashMap::new(),
            length: 0.0,
            center: None,
        }
    }

    /// Sum of consecutive vertex distances along the chain.
    pub fn chain_length(&self) -> f64 {
        self.chain
            .windows(2)
            .map(|w| line_length(w[0], w[1]))
            .sum()
    }

    /// Consecutive vertex pairs of the chain.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.chain.windows(2).map(|w| (w[0], w[1]))
    }

    /// Attribute lookup; absence is a schema violation.
    pub fn attribute(&self, name: &str) -> Result<&AttributeValue> {
        self.attributes.get(name).ok_or_else(|| Error::MissingAttribute {
            name: name.to_string(),
            id: self.id,
        })
    }

    /// Numeric attribute lookup.
    pub fn numeric_attribute(&self, name: &str) -> Result<f64> {
        self.attribute(name)?
            .as_f64()
            .ok_or_else(|| Error::NonNumericAttribute {
                name: name.to_string(),
                id: self.id,
            })
    }

    pub fn to_line_string(&self) -> geo_types::LineString<f64> {
        geo_types::LineString::from(
            self.chain.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>(),
        )
    }

    /// Build from a `geo-types` line string; `None` if it has fewer
    /// than two coordinates.
    pub fn from_line_string(
        id: i64,
        line: &geo_types::LineString<f64>,
        decimals: u32,
    ) -> Option<Self> {
        if line.0.len() < 2 {
            return None;
        }
        let chain: Vec<Point> = line.0.iter().map(|c| Point::from(*c).rounded(decimals)).collect();
        Some(Edge::new(id, chain, decimals))
    }
}

/// A polyline graph: unique rounded nodes plus edges keyed by their
/// (start, end) node pair.
///
/// The edge map is ordered, so iteration is deterministic. Inserting
/// an edge with an existing key replaces the previous edge, matching
/// the digraph semantics the readers produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineGraph {
    decimals: u32,
    nodes: BTreeMap<NodeKey, Point>,
    edges: BTreeMap<(NodeKey, NodeKey), Edge>,
}

impl LineGraph {
    pub fn new(decimals: u32) -> Self {
        Self {
            decimals,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// Register a node; the stored point is rounded.
    pub fn add_node(&mut self, p: Point) -> NodeKey {
        let key = p.key(self.decimals);
        self.nodes.insert(key, p.rounded(self.decimals));
        key
    }

    /// Insert an edge, registering both endpoints as nodes.
    pub fn insert_edge(&mut self, edge: Edge) {
        if let Some(&first) = edge.chain.first() {
            self.add_node(first);
        }
        if let Some(&last) = edge.chain.last() {
            self.add_node(last);
        }
        self.edges.insert((edge.start, edge.end), edge);
    }

    pub fn remove_edge(&mut self, key: (NodeKey, NodeKey)) -> Option<Edge> {
        self.edges.remove(&key)
    }

    pub fn edge(&self, key: (NodeKey, NodeKey)) -> Option<&Edge> {
        self.edges.get(&key)
    }

    pub fn node(&self, key: NodeKey) -> Option<Point> {
        self.nodes.get(&key).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeKey, &Point)> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.values_mut()
    }

    pub fn edge_keys(&self) -> Vec<(NodeKey, NodeKey)> {
        self.edges.keys().copied().collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// A point feature: position plus attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointFeature {
    pub id: i64,
    pub position: Point,
    pub attributes: HashMap<String, AttributeValue>,
}

impl PointFeature {
    pub fn new(id: i64, position: Point) -> Self {
        Self {
            id,
            position,
            attributes: HashMap::new(),
        }
    }

    /// Attribute lookup; absence is a schema violation.
    pub fn attribute(&self, name: &str) -> Result<&AttributeValue> {
        self.attributes.get(name).ok_or_else(|| Error::MissingAttribute {
            name: name.to_string(),
            id: self.id,
        })
    }
}

impl From<geo_types::Point<f64>> for PointFeature {
    fn from(p: geo_types::Point<f64>) -> Self {
        PointFeature::new(0, p.into())
    }
}

impl From<&PointFeature> for geo_types::Point<f64> {
    fn from(f: &PointFeature) -> Self {
        f.position.into()
    }
}

/// A point graph: point features keyed by rounded coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointGraph {
    decimals: u32,
    points: BTreeMap<NodeKey, PointFeature>,
}

impl PointGraph {
    pub fn new(decimals: u32) -> Self {
        Self {
            decimals,
            points: BTreeMap::new(),
        }
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn insert(&mut self, feature: PointFeature) -> NodeKey {
        let key = feature.position.key(self.decimals);
        self.points.insert(key, feature);
        key
    }

    pub fn get(&self, key: NodeKey) -> Option<&PointFeature> {
        self.points.get(&key)
    }

    pub fn remove(&mut self, key: NodeKey) -> Option<PointFeature> {
        self.points.remove(&key)
    }

    pub fn points(&self) -> impl Iterator<Item = &PointFeature> {
        self.points.values()
    }

    pub fn points_mut(&mut self) -> impl Iterator<Item = &mut PointFeature> {
        self.points.values_mut()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn test_edge_endpoints_from_chain() {
        let e = Edge::new(0, chain(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]), 6);
        assert_eq!(e.start, Point::new(0.0, 0.0).key(6));
        assert_eq!(e.end, Point::new(10.0, 0.0).key(6));
        assert_eq!(e.chain_length(), 10.0);
    }

    #[test]
    fn test_edge_chain_length_follows_chain_not_chord() {
        // L-shaped chain: chord is sqrt(50), arc is 10.
        let e = Edge::new(0, chain(&[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)]), 6);
        assert_eq!(e.chain_length(), 10.0);
    }

    #[test]
    fn test_missing_attribute_is_hard_error() {
        let e = Edge::new(7, chain(&[(0.0, 0.0), (1.0, 0.0)]), 6);
        match e.attribute("speed") {
            Err(Error::MissingAttribute { name, id }) => {
                assert_eq!(name, "speed");
                assert_eq!(id, 7);
            }
            other => panic!("expected MissingAttribute, got {:?}", other),
        }
    }

    #[test]
    fn test_graph_node_identity_by_rounding() {
        let mut g = LineGraph::new(6);
        let k1 = g.add_node(Point::new(1.0000004, 2.0));
        let k2 = g.add_node(Point::new(0.9999996, 2.0));
        assert_eq!(k1, k2);
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_insert_edge_registers_nodes() {
        let mut g = LineGraph::new(6);
        g.insert_edge(Edge::new(0, chain(&[(0.0, 0.0), (1.0, 1.0)]), 6));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_duplicate_edge_key_replaces() {
        let mut g = LineGraph::new(6);
        let mut a = Edge::new(0, chain(&[(0.0, 0.0), (1.0, 0.0)]), 6);
        a.attributes.insert("tag".into(), AttributeValue::Int(1));
        let mut b = Edge::new(1, chain(&[(0.0, 0.0), (1.0, 0.0)]), 6);
        b.attributes.insert("tag".into(), AttributeValue::Int(2));
        g.insert_edge(a);
        g.insert_edge(b);
        assert_eq!(g.edge_count(), 1);
        let kept = g.edges().next().unwrap();
        assert_eq!(kept.id, 1);
    }

    #[test]
    fn test_line_string_round_trip() {
        let e = Edge::new(0, chain(&[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)]), 6);
        let ls = e.to_line_string();
        let back = Edge::from_line_string(0, &ls, 6).unwrap();
        assert_eq!(back.chain, e.chain);
    }

    #[test]
    fn test_from_line_string_too_short() {
        let ls = geo_types::LineString::from(vec![(0.0, 0.0)]);
        assert!(Edge::from_line_string(0, &ls, 6).is_none());
    }

    #[test]
    fn test_point_graph_keys_round() {
        let mut g = PointGraph::new(6);
        let key = g.insert(PointFeature::new(0, Point::new(3.0000001, 4.0)));
        assert_eq!(key, Point::new(3.0, 4.0).key(6));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_attribute_value_as_f64() {
        assert_eq!(AttributeValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(AttributeValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(AttributeValue::Str("x".into()).as_f64(), None);
    }
}
