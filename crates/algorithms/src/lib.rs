//! # NetGIS Algorithms
//!
//! Network-geometry algorithms over attributed polyline graphs:
//!
//! - **index**: bounding-box R-tree over edges with k-nearest queries
//! - **metrics**: per-edge length and mid-length center annotation
//! - **split**: cutting edges at fixed arc-length intervals or at
//!   externally supplied points
//! - **intersect**: re-cutting edges at shared junction vertices
//! - **join**: matching point features to their nearest edge, with
//!   nearest-id assignment, join counts and point snapping
//! - **kde**: network kernel density estimation over lixel graphs
//!
//! All algorithms are batch transformations: they consume complete
//! in-memory graphs and return new graphs or enriched copies.

pub mod index;
pub mod intersect;
pub mod join;
pub mod kde;
pub mod metrics;
pub mod split;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::index::EdgeIndex;
    pub use crate::intersect::by_geometry;
    pub use crate::join::{
        join_count, nearest, snap_to_network, spatial_join, JoinOutcome, JoinParams, UNMATCHED,
    };
    pub use crate::kde::{attach_density, gaussian_kernel, network_kde, KdeParams, Kernel};
    pub use crate::metrics::{add_center, add_distance};
    pub use crate::split::{at_points, by_distance};
    pub use netgis_core::prelude::*;
}
