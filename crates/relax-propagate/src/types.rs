//! Configuration and bookkeeping types for ReLU relaxation.
//!
//! This module contains the data structures used to configure a relaxation
//! run and to report which relaxation cases it went through.

use relax_core::{RelaxError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Which side of the expression's bound a coefficient is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundSide {
    /// Coefficient of an expression that lower-bounds the target.
    Lower,
    /// Coefficient of an expression that upper-bounds the target.
    Upper,
}

/// Which branch of the relaxation produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelaxCase {
    /// Incoming coefficient was exactly zero.
    ZeroCoefficient,
    /// `ub <= 0`: ReLU is identically zero.
    Inactive,
    /// `lb > 0`: ReLU is the identity.
    Active,
    /// Straddling neuron, coefficient sign selects the triangle chord.
    Triangle,
    /// Straddling neuron, either relaxation is sound; kept the coefficient.
    AreaPassThrough,
    /// Straddling neuron, either relaxation is sound; zeroed the coefficient.
    AreaZero,
    /// Straddling neuron and coefficient; contribution folded into the constant.
    StraddleFold,
}

impl RelaxCase {
    pub const ALL: [RelaxCase; 7] = [
        RelaxCase::ZeroCoefficient,
        RelaxCase::Inactive,
        RelaxCase::Active,
        RelaxCase::Triangle,
        RelaxCase::AreaPassThrough,
        RelaxCase::AreaZero,
        RelaxCase::StraddleFold,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RelaxCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelaxCase::ZeroCoefficient => "zero-coeff",
            RelaxCase::Inactive => "inactive",
            RelaxCase::Active => "active",
            RelaxCase::Triangle => "triangle",
            RelaxCase::AreaPassThrough => "area-pass",
            RelaxCase::AreaZero => "area-zero",
            RelaxCase::StraddleFold => "fold",
        };
        f.write_str(name)
    }
}

/// Per-case counters for a relaxation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaxStats {
    counts: [usize; 7],
}

impl RelaxStats {
    #[inline]
    pub fn record(&mut self, case: RelaxCase) {
        self.counts[case.index()] += 1;
    }

    #[inline]
    pub fn count(&self, case: RelaxCase) -> usize {
        self.counts[case.index()]
    }

    /// Total number of relaxed coefficients.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Coefficients attached to straddling neurons.
    pub fn unstable(&self) -> usize {
        self.count(RelaxCase::Triangle)
            + self.count(RelaxCase::AreaPassThrough)
            + self.count(RelaxCase::AreaZero)
            + self.count(RelaxCase::StraddleFold)
    }

    pub fn merge(&self, other: &RelaxStats) -> RelaxStats {
        let mut counts = self.counts;
        for (c, o) in counts.iter_mut().zip(other.counts.iter()) {
            *c += o;
        }
        RelaxStats { counts }
    }
}

impl fmt::Display for RelaxStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for case in RelaxCase::ALL {
            let n = self.count(case);
            if n == 0 {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", case, n)?;
            first = false;
        }
        if first {
            f.write_str("empty")?;
        }
        Ok(())
    }
}

/// Configuration for ReLU relaxation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaxConfig {
    /// Compare triangle areas to choose between zeroing and passing through a
    /// coefficient when both are sound. Affects tightness only.
    #[serde(default)]
    pub use_area_heuristic: bool,

    /// Minimum number of expressions before enabling parallelism.
    /// Below this threshold, serial execution is used to avoid overhead.
    #[serde(default = "default_min_rows_for_parallel")]
    pub min_rows_for_parallel: usize,

    /// Maximum number of threads to use.
    /// None means use rayon's global pool.
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Validate bounds and coefficients before relaxing.
    #[serde(default = "default_validate_inputs")]
    pub validate_inputs: bool,
}

fn default_min_rows_for_parallel() -> usize {
    4
}

fn default_validate_inputs() -> bool {
    true
}

impl Default for RelaxConfig {
    fn default() -> Self {
        Self {
            use_area_heuristic: false,
            min_rows_for_parallel: default_min_rows_for_parallel(),
            max_threads: None,
            validate_inputs: default_validate_inputs(),
        }
    }
}

impl RelaxConfig {
    /// Config with the area heuristic switched on.
    pub fn with_area_heuristic(mut self, enabled: bool) -> Self {
        self.use_area_heuristic = enabled;
        self
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| RelaxError::Config(format!("Failed to read config: {}", e)))?;
        serde_json::from_str(&json)
            .map_err(|e| RelaxError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RelaxError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| RelaxError::Config(format!("Failed to write config: {}", e)))
    }
}
