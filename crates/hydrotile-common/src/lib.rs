//! # hydrotile-common
//!
//! Shared types for the hydrotile terrain pipeline: the supported DEM
//! products and their configuration, bounding boxes and boundary
//! specifications, the routing-algorithm selector, and threshold flow
//! accumulation (TFA) ranges.
//!
//! These types carry no I/O of their own; the fetch and pipeline crates
//! consume them.

mod bounds;
mod product;
mod routing;
mod tfa;

pub use bounds::{Boundary, BoundingBox, SpatialInputError};
pub use product::{Product, ProductConfig, UnknownProductError};
pub use routing::{RoutingMethod, UnknownRoutingError};
pub use tfa::{TfaRange, TfaRangeError};
