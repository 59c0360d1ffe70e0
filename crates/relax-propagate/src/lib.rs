//! Sound ReLU relaxation for backward symbolic bound propagation.
//!
//! When a backward pass pushes an affine expression through a ReLU layer,
//! every coefficient attached to a neuron must be replaced by a linear
//! relaxation that keeps the expression a guaranteed bound:
//! - [`relu::relax_lower`]: coefficient of an expression bounding from below
//! - [`relu::relax_upper`]: coefficient of an expression bounding from above
//!
//! All arithmetic uses directed rounding from [`relax_core::rounding`], so the
//! relaxations stay sound under floating-point error.
//!
//! # Layer batches
//!
//! For a whole layer at once, use [`batch::relax_relu_layer`], which runs
//! expressions in parallel while keeping results deterministic.

pub mod batch;
pub mod relu;
pub mod types;

pub use batch::{relax_relu_layer, relax_row, IntervalExprBatch};

pub use relu::{
    relax, relax_lower, relax_lower_in_place, relax_upper, relax_upper_in_place, RelaxOutcome,
    TriangleChord,
};

pub use types::{BoundSide, RelaxCase, RelaxConfig, RelaxStats};

// Re-export relax_core types for tests and downstream use
pub use relax_core::{
    CoefficientInterval, ConcreteBound, ConstantAccumulator, ConstantDelta, RelaxError, Result,
};

#[cfg(test)]
mod tests;
