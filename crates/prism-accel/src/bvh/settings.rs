//! Build parameters.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{AccelError, Result};

/// Default leaf capacity.
pub const DEFAULT_MAX_PRIMS_IN_NODE: usize = 4;

/// Largest leaf capacity a build will honor.
pub const MAX_PRIMS_IN_NODE_LIMIT: usize = 255;

/// Strategy used to build the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMethod {
    /// Top-down build minimizing the surface area heuristic.
    #[default]
    Sah,
    /// Morton-ordered treelets combined with an SAH upper tree.
    Hlbvh,
    /// Split at the spatial midpoint of the centroid bounds.
    Middle,
    /// Split at the centroid median.
    #[serde(rename = "equal", alias = "equalcounts")]
    EqualCounts,
}

impl SplitMethod {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            SplitMethod::Sah => "sah",
            SplitMethod::Hlbvh => "hlbvh",
            SplitMethod::Middle => "middle",
            SplitMethod::EqualCounts => "equal",
        }
    }
}

impl FromStr for SplitMethod {
    type Err = AccelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sah" => Ok(SplitMethod::Sah),
            "hlbvh" => Ok(SplitMethod::Hlbvh),
            "middle" => Ok(SplitMethod::Middle),
            "equal" | "equalcounts" | "equal_counts" => Ok(SplitMethod::EqualCounts),
            _ => Err(AccelError::UnknownSplitMethod(s.to_string())),
        }
    }
}

impl fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// BVH build parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhSettings {
    /// Maximum primitives per leaf. Builds clamp this to `[1, 255]`.
    pub max_prims_in_node: usize,
    /// Construction strategy.
    pub split_method: SplitMethod,
}

impl Default for BvhSettings {
    fn default() -> Self {
        Self {
            max_prims_in_node: DEFAULT_MAX_PRIMS_IN_NODE,
            split_method: SplitMethod::Sah,
        }
    }
}

impl BvhSettings {
    /// Settings with the given leaf capacity and method.
    pub fn new(max_prims_in_node: usize, split_method: SplitMethod) -> Self {
        Self {
            max_prims_in_node,
            split_method,
        }
    }

    /// Settings from loosely typed scene parameters. An unknown method
    /// name falls back to SAH with a warning.
    pub fn from_params(max_prims_in_node: usize, split_method: &str) -> Self {
        let split_method = split_method.parse().unwrap_or_else(|err: AccelError| {
            warn!("{err}, using sah");
            SplitMethod::Sah
        });
        Self {
            max_prims_in_node,
            split_method,
        }
    }

    /// Strict check for callers that prefer rejection over clamping.
    pub fn validate(&self) -> Result<()> {
        if self.max_prims_in_node == 0 || self.max_prims_in_node > MAX_PRIMS_IN_NODE_LIMIT {
            return Err(AccelError::InvalidSettings(format!(
                "max_prims_in_node must be between 1 and {MAX_PRIMS_IN_NODE_LIMIT}, got {}",
                self.max_prims_in_node
            )));
        }
        Ok(())
    }

    /// Leaf capacity a build will actually use.
    pub fn effective_max_prims(&self) -> usize {
        clamp_max_prims(self.max_prims_in_node)
    }
}

/// Clamp a leaf capacity into `[1, 255]`, logging when it changes.
pub(crate) fn clamp_max_prims(max_prims_in_node: usize) -> usize {
    let clamped = max_prims_in_node.clamp(1, MAX_PRIMS_IN_NODE_LIMIT);
    if clamped != max_prims_in_node {
        warn!("max_prims_in_node {max_prims_in_node} out of range, clamped to {clamped}");
    }
    clamped
}
