//! Relaxation of a whole ReLU layer's worth of symbolic expressions.
//!
//! An [`IntervalExprBatch`] holds `num_exprs` affine expressions over the
//! `num_neurons` outputs of one ReLU layer:
//!
//! ```text
//! expr_i(y) in [inf_cst_i, sup_cst_i] + sum_j [inf_coeff_ij, sup_coeff_ij] * y_j
//! ```
//!
//! [`relax_relu_layer`] rewrites every coefficient with the kernels from
//! [`crate::relu`], turning the expressions into expressions over the
//! layer's pre-activations.
//!
//! # Determinism
//!
//! Each expression owns its constant accumulator, so expressions never share
//! mutable state and run in parallel without atomics. Within one expression
//! coefficients fold left to right by neuron index. Serial and parallel runs
//! therefore produce bit-identical results.
//!
//! # Example
//! ```ignore
//! use relax_propagate::{relax_relu_layer, BoundSide, IntervalExprBatch, RelaxConfig};
//!
//! let mut batch = IntervalExprBatch::from_point(coeffs, csts);
//! let stats = relax_relu_layer(&mut batch, &pre_bounds, BoundSide::Lower, &RelaxConfig::default())?;
//! println!("{}", stats);
//! ```

use crate::relu::relax;
use crate::types::{BoundSide, RelaxConfig, RelaxStats};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use relax_core::rounding::{add_rd, add_ru, interval_mul};
use relax_core::{
    validate_bounds, CoefficientInterval, ConcreteBound, ConstantAccumulator, RelaxError, Result,
};
use tracing::{debug, trace, warn};

/// Batch of interval-coefficient affine expressions over one layer.
///
/// Shape conventions:
/// - For E expressions over N neurons: inf_coeff/sup_coeff are (E, N),
///   inf_cst/sup_cst are (E,)
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalExprBatch {
    /// Lower coefficient endpoints: shape (num_exprs, num_neurons)
    pub inf_coeff: Array2<f32>,
    /// Upper coefficient endpoints: shape (num_exprs, num_neurons)
    pub sup_coeff: Array2<f32>,
    /// Lower constant endpoints: shape (num_exprs,)
    pub inf_cst: Array1<f32>,
    /// Upper constant endpoints: shape (num_exprs,)
    pub sup_cst: Array1<f32>,
}

impl IntervalExprBatch {
    /// Create a batch, checking shapes and that every interval is ordered and finite.
    pub fn new(
        inf_coeff: Array2<f32>,
        sup_coeff: Array2<f32>,
        inf_cst: Array1<f32>,
        sup_cst: Array1<f32>,
    ) -> Result<Self> {
        let batch = Self {
            inf_coeff,
            sup_coeff,
            inf_cst,
            sup_cst,
        };
        batch.validate()?;
        Ok(batch)
    }

    /// Create a batch with point coefficients and constants.
    pub fn from_point(coeffs: Array2<f32>, csts: Array1<f32>) -> Self {
        Self {
            inf_coeff: coeffs.clone(),
            sup_coeff: coeffs,
            inf_cst: csts.clone(),
            sup_cst: csts,
        }
    }

    /// Number of expressions (rows).
    pub fn num_exprs(&self) -> usize {
        self.inf_coeff.nrows()
    }

    /// Number of neurons (columns).
    pub fn num_neurons(&self) -> usize {
        self.inf_coeff.ncols()
    }

    #[inline]
    pub fn coefficient(&self, expr: usize, neuron: usize) -> CoefficientInterval {
        CoefficientInterval {
            inf: self.inf_coeff[[expr, neuron]],
            sup: self.sup_coeff[[expr, neuron]],
        }
    }

    #[inline]
    pub fn constant(&self, expr: usize) -> ConstantAccumulator {
        ConstantAccumulator {
            inf: self.inf_cst[expr],
            sup: self.sup_cst[expr],
        }
    }

    /// Check that coefficient and constant arrays agree in shape.
    pub fn check_shapes(&self) -> Result<()> {
        let coeff_shape = self.inf_coeff.shape();
        if self.sup_coeff.shape() != coeff_shape {
            return Err(RelaxError::shape_mismatch(
                coeff_shape.to_vec(),
                self.sup_coeff.shape().to_vec(),
            ));
        }
        for cst in [&self.inf_cst, &self.sup_cst] {
            if cst.len() != self.num_exprs() {
                return Err(RelaxError::shape_mismatch(
                    vec![self.num_exprs()],
                    vec![cst.len()],
                ));
            }
        }
        Ok(())
    }

    /// Check shapes and that every interval is ordered and finite.
    pub fn validate(&self) -> Result<()> {
        self.check_shapes()?;
        for (&inf, &sup) in self.inf_coeff.iter().zip(self.sup_coeff.iter()) {
            CoefficientInterval::try_new(inf, sup)?;
        }
        for (&inf, &sup) in self.inf_cst.iter().zip(self.sup_cst.iter()) {
            ConstantAccumulator::try_new(inf, sup)?;
        }
        Ok(())
    }

    /// Sound range of every expression for inputs in the given box.
    ///
    /// For each expression, the lower end sums the minimum corner product of
    /// every coefficient with its input interval (rounded down) onto the
    /// constant's lower end; the upper end is the dual.
    pub fn concretize(&self, inputs: &[ConcreteBound]) -> Result<Vec<ConcreteBound>> {
        if inputs.len() != self.num_neurons() {
            return Err(RelaxError::shape_mismatch(
                vec![self.num_neurons()],
                vec![inputs.len()],
            ));
        }

        Ok((0..self.num_exprs())
            .map(|i| {
                let acc = self.constant(i);
                let (mut lower, mut upper) = (acc.inf, acc.sup);
                for (j, input) in inputs.iter().enumerate() {
                    let c = self.coefficient(i, j);
                    let (lo, hi) = interval_mul(c.inf, c.sup, input.lb, input.ub);
                    lower = add_rd(lower, lo);
                    upper = add_ru(upper, hi);
                }
                ConcreteBound {
                    lb: lower,
                    ub: upper,
                }
            })
            .collect())
    }
}

/// Relax one expression's coefficients in neuron order.
///
/// `coeffs[j]` belongs to the neuron bounded by `bounds[j]`; all constant
/// contributions fold into `acc`. For orchestrators that keep their own
/// expression buffers.
pub fn relax_row(
    coeffs: &mut [CoefficientInterval],
    acc: &mut ConstantAccumulator,
    bounds: &[ConcreteBound],
    side: BoundSide,
    use_area_heuristic: bool,
) -> RelaxStats {
    debug_assert_eq!(coeffs.len(), bounds.len());

    let mut stats = RelaxStats::default();
    for (coeff, &bound) in coeffs.iter_mut().zip(bounds.iter()) {
        let outcome = relax(side, *coeff, bound, use_area_heuristic);
        outcome.apply(coeff, acc);
        stats.record(outcome.case);
    }
    stats
}

/// Relaxed row produced by a worker, written back after the parallel section.
struct RowRelaxation {
    coeffs: Vec<CoefficientInterval>,
    acc: ConstantAccumulator,
    stats: RelaxStats,
}

/// Relax every coefficient of `batch` through a ReLU layer with pre-activation
/// bounds `bounds` (one per neuron).
///
/// Returns per-case counts. Fails without touching `batch` if its arrays or
/// the bounds disagree in shape, or (with `config.validate_inputs`) if any
/// bound or interval is reversed or non-finite.
pub fn relax_relu_layer(
    batch: &mut IntervalExprBatch,
    bounds: &[ConcreteBound],
    side: BoundSide,
    config: &RelaxConfig,
) -> Result<RelaxStats> {
    let num_exprs = batch.num_exprs();
    let num_neurons = batch.num_neurons();

    batch.check_shapes()?;
    if bounds.len() != num_neurons {
        return Err(RelaxError::shape_mismatch(
            vec![num_neurons],
            vec![bounds.len()],
        ));
    }
    if config.validate_inputs {
        validate_bounds(bounds)?;
        batch.validate()?;
    }
    if num_neurons == 0 || num_exprs == 0 {
        warn!(
            "ReLU relaxation called on empty batch ({} exprs x {} neurons)",
            num_exprs, num_neurons
        );
        return Ok(RelaxStats::default());
    }

    let use_parallel = num_exprs >= config.min_rows_for_parallel;
    debug!(
        "Relaxing {:?} coefficients: {} exprs x {} neurons, {}",
        side,
        num_exprs,
        num_neurons,
        if use_parallel { "parallel" } else { "serial" }
    );

    let use_area_heuristic = config.use_area_heuristic;
    let source: &IntervalExprBatch = &*batch;
    let relax_one = |i: usize| -> RowRelaxation {
        let mut coeffs: Vec<CoefficientInterval> =
            (0..num_neurons).map(|j| source.coefficient(i, j)).collect();
        let mut acc = source.constant(i);
        let stats = relax_row(&mut coeffs, &mut acc, bounds, side, use_area_heuristic);
        trace!("Expr {}: {} -> cst [{}, {}]", i, stats, acc.inf, acc.sup);
        RowRelaxation { coeffs, acc, stats }
    };

    let rows: Vec<RowRelaxation> = if use_parallel {
        let pool = match config.max_threads {
            Some(max_threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(max_threads)
                    .build()
                    .map_err(|e| {
                        RelaxError::Config(format!("Failed to create thread pool: {}", e))
                    })?,
            ),
            None => None,
        };
        match pool {
            Some(pool) => pool.install(|| {
                (0..num_exprs)
                    .into_par_iter()
                    .map(relax_one)
                    .collect::<Vec<_>>()
            }),
            None => (0..num_exprs)
                .into_par_iter()
                .map(relax_one)
                .collect::<Vec<_>>(),
        }
    } else {
        (0..num_exprs).map(relax_one).collect()
    };

    let mut stats = RelaxStats::default();
    for (i, row) in rows.into_iter().enumerate() {
        for (j, c) in row.coeffs.iter().enumerate() {
            batch.inf_coeff[[i, j]] = c.inf;
            batch.sup_coeff[[i, j]] = c.sup;
        }
        batch.inf_cst[i] = row.acc.inf;
        batch.sup_cst[i] = row.acc.sup;
        stats = stats.merge(&row.stats);
    }

    debug!("ReLU relaxation done: {}", stats);
    Ok(stats)
}
