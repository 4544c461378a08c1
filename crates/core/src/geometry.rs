//! 2D geometry primitives for polyline networks
//!
//! Line classification, length, point containment, orthogonal
//! projection and arc-distance point search. All primitives are total:
//! degenerate inputs (identical endpoints, zero-length segments)
//! produce sentinel or empty results, never a panic or an error.

use serde::{Deserialize, Serialize};

/// A 2D point.
///
/// Node identity is by value after rounding to a fixed decimal
/// precision; see [`Point::key`]. Raw coordinates are kept as given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Coordinate quantized to an integer grid at a fixed decimal
/// precision. This is the only key ever used for node identity, so
/// raw floats never end up in a hash map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct NodeKey(pub i64, pub i64);

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Round both coordinates to `decimals` places.
    pub fn rounded(self, decimals: u32) -> Point {
        let f = 10f64.powi(decimals as i32);
        Point::new((self.x * f).round() / f, (self.y * f).round() / f)
    }

    /// Quantized grid key at `decimals` places.
    pub fn key(self, decimals: u32) -> NodeKey {
        let f = 10f64.powi(decimals as i32);
        NodeKey((self.x * f).round() as i64, (self.y * f).round() as i64)
    }
}

impl From<Point> for geo_types::Point<f64> {
    fn from(p: Point) -> Self {
        geo_types::Point::new(p.x, p.y)
    }
}

impl From<geo_types::Point<f64>> for Point {
    fn from(p: geo_types::Point<f64>) -> Self {
        Point::new(p.x(), p.y())
    }
}

impl From<geo_types::Coord<f64>> for Point {
    fn from(c: geo_types::Coord<f64>) -> Self {
        Point::new(c.x, c.y)
    }
}

/// Classification of the line through two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSpec {
    /// Both points identical. Length is signaled as -1 so callers must
    /// special-case it instead of dividing by zero.
    Degenerate,
    /// Parallel to the y axis; `x` is the shared abscissa.
    Vertical { x: f64, length: f64 },
    /// Parallel to the x axis; `y` is the shared ordinate.
    Horizontal { y: f64, length: f64 },
    /// General line `y = slope * x + intercept`.
    Sloped {
        slope: f64,
        intercept: f64,
        length: f64,
    },
}

impl LineSpec {
    /// Euclidean distance between the two defining points, or -1 for
    /// the degenerate case.
    pub fn length(&self) -> f64 {
        match *self {
            LineSpec::Degenerate => -1.0,
            LineSpec::Vertical { length, .. }
            | LineSpec::Horizontal { length, .. }
            | LineSpec::Sloped { length, .. } => length,
        }
    }
}

/// Classify the line through `a` and `b`.
pub fn line_spec(a: Point, b: Point) -> LineSpec {
    if a == b {
        LineSpec::Degenerate
    } else if a.x == b.x {
        LineSpec::Vertical {
            x: a.x,
            length: (b.y - a.y).abs(),
        }
    } else if a.y == b.y {
        LineSpec::Horizontal {
            y: a.y,
            length: (b.x - a.x).abs(),
        }
    } else {
        let slope = (b.y - a.y) / (b.x - a.x);
        LineSpec::Sloped {
            slope,
            intercept: a.y - slope * a.x,
            length: line_length(a, b),
        }
    }
}

/// Euclidean distance between two points. Pure and total.
pub fn line_length(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Order-independent range check: is `v` between `lo` and `hi`?
fn between(lo: f64, hi: f64, v: f64) -> bool {
    (lo <= v && v <= hi) || (hi <= v && v <= lo)
}

/// Test whether `p` lies on the segment from `a` to `b`.
///
/// Constant-axis coordinates are matched exactly (inputs are expected
/// to be rounded); sloped lines use an absolute residual tolerance
/// combined with both bounding-box range checks.
pub fn is_point_on_line(a: Point, b: Point, p: Point, tolerance: f64) -> bool {
    match line_spec(a, b) {
        LineSpec::Degenerate => a == p,
        LineSpec::Vertical { x, .. } => p.x == x && between(a.y, b.y, p.y),
        LineSpec::Horizontal { y, .. } => p.y == y && between(a.x, b.x, p.x),
        LineSpec::Sloped {
            slope, intercept, ..
        } => {
            (p.y - (slope * p.x + intercept)).abs() < tolerance
                && between(a.x, b.x, p.x)
                && between(a.y, b.y, p.y)
        }
    }
}

/// Orthogonal projection of `q` onto the *infinite* line through `a`
/// and `b`.
///
/// The result is not clamped to the segment; callers that need segment
/// membership must verify it with [`is_point_on_line`]. For the
/// degenerate line the projection is `a` itself.
pub fn nearest_point_on_line(a: Point, b: Point, q: Point) -> Point {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let denom = dx * dx + dy * dy;
    if denom == 0.0 {
        return a;
    }
    // Axis-aligned lines project exactly onto the constant axis; the
    // containment test matches that coordinate exactly, so it must not
    // pick up rounding noise from the general formula.
    if dy == 0.0 {
        return Point::new(q.x, a.y);
    }
    if dx == 0.0 {
        return Point::new(a.x, q.y);
    }
    let t = ((a.x - q.x) * dy + (q.y - a.y) * dx) / denom;
    Point::new(t * dy + q.x, -t * dx + q.y)
}

/// Points at arc-length `distance` from `a` toward `b`, constrained to
/// lie between the two endpoints.
///
/// Axis-aligned lines use direct coordinate arithmetic. Sloped lines
/// solve the circle/line quadratic and keep only roots bounded between
/// `a.x` and `b.x`; zero, one or two points may come back and the
/// caller must disambiguate. The degenerate line yields no points.
pub fn points_at_distance(a: Point, b: Point, distance: f64) -> Vec<Point> {
    match line_spec(a, b) {
        LineSpec::Degenerate => Vec::new(),
        LineSpec::Vertical { x, .. } => {
            let y = if a.y <= b.y {
                a.y + distance
            } else {
                a.y - distance
            };
            vec![Point::new(x, y)]
        }
        LineSpec::Horizontal { y, .. } => {
            let x = if a.x <= b.x {
                a.x + distance
            } else {
                a.x - distance
            };
            vec![Point::new(x, y)]
        }
        LineSpec::Sloped {
            slope, intercept, ..
        } => {
            // (x - a.x)^2 + (slope * x + intercept - a.y)^2 = distance^2
            let k = intercept - a.y;
            let qa = 1.0 + slope * slope;
            let qb = 2.0 * (slope * k - a.x);
            let qc = a.x * a.x + k * k - distance * distance;
            // The line passes through the circle's centre, so the
            // discriminant is non-negative up to rounding error.
            let disc = (qb * qb - 4.0 * qa * qc).max(0.0);
            let sqrt = disc.sqrt();
            let mut roots = vec![(-qb + sqrt) / (2.0 * qa)];
            if sqrt > 0.0 {
                roots.push((-qb - sqrt) / (2.0 * qa));
            }
            roots
                .into_iter()
                .filter(|&x| between(a.x, b.x, x))
                .map(|x| Point::new(x, slope * x + intercept))
                .collect()
        }
    }
}
