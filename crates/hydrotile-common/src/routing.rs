//! Flow-routing algorithm selection.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error for an unrecognized routing algorithm name.
#[derive(Debug, Error)]
#[error("Unknown routing algorithm {0:?} (expected D8 or MFD)")]
pub struct UnknownRoutingError(pub String);

/// Which flow-routing algorithm the pipeline uses.
///
/// The two variants play an identical role in the pipeline but have
/// different call signatures on the geoprocessing side, and stream
/// extraction differs: MFD extraction is delegated to the external
/// toolchain while D8 extraction is computed locally by thresholding
/// flow accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingMethod {
    /// Single flow direction (each pixel drains to one neighbor).
    D8,
    /// Multiple flow direction (flow is apportioned among neighbors).
    Mfd,
}

impl RoutingMethod {
    /// Lowercase identifier used in artifact names.
    pub const fn slug(&self) -> &'static str {
        match self {
            RoutingMethod::D8 => "d8",
            RoutingMethod::Mfd => "mfd",
        }
    }
}

impl fmt::Display for RoutingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for RoutingMethod {
    type Err = UnknownRoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "d8" => Ok(RoutingMethod::D8),
            "mfd" => Ok(RoutingMethod::Mfd),
            other => Err(UnknownRoutingError(other.to_string())),
        }
    }
}
