//! # NetGIS Core
//!
//! Core types for the NetGIS network-geometry library.
//!
//! This crate provides:
//! - [`geometry`]: 2D primitives (line classification, projection,
//!   arc-distance search) over rounded-coordinate points
//! - [`graph`]: attributed polyline graphs (`LineGraph`) and point
//!   feature sets (`PointGraph`)
//! - [`config`]: the tolerance/precision configuration threaded
//!   through every algorithm
//! - [`error`]: the shared error type
//!
//! Graphs are built by external readers (shapefile/CSV adapters) and
//! handed to the algorithms in `netgis-algorithms`; every algorithm
//! returns a new graph rather than mutating shared state.

pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;

pub use config::SpatialConfig;
pub use error::{Error, Result};
pub use geometry::{NodeKey, Point};
pub use graph::{AttributeValue, Edge, LineGraph, PointFeature, PointGraph};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::SpatialConfig;
    pub use crate::error::{Error, Result};
    pub use crate::geometry::{NodeKey, Point};
    pub use crate::graph::{AttributeValue, Edge, LineGraph, PointFeature, PointGraph};
}
