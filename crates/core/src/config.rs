//! Configuration shared by all network algorithms
//!
//! Rounding precision, on-line tolerances and nearest-neighbor
//! fan-out live in one explicit struct that is threaded through every
//! call instead of being globals.

use serde::{Deserialize, Serialize};

/// Tolerances and precision settings threaded through the engines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialConfig {
    /// Decimal places coordinates are rounded to before being used as
    /// node identity. Stable node identity despite floating-point
    /// arithmetic depends on this.
    pub decimals: u32,
    /// Absolute residual tolerance of the point-on-line test for
    /// sloped lines. Absolute, not proportional: unsuitable for
    /// coordinates at very different magnitudes.
    pub line_tolerance: f64,
    /// Tight tolerance on the orthogonal-projection distance used when
    /// splitting an edge at an external point. Deliberately much
    /// tighter than `line_tolerance`; the two are kept independent.
    pub snap_tolerance: f64,
    /// Number of R-tree candidates fetched per nearest-edge query.
    /// Bounding-box nearest is approximate, so this should be chosen
    /// generously rather than exactly.
    pub nearest_fanout: usize,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            decimals: 6,
            line_tolerance: 0.05,
            snap_tolerance: 1e-4,
            nearest_fanout: 3,
        }
    }
}
