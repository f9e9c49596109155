/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements greedy center selection with an incrementally updated Newton basis.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # pgreedy
//!
//! Adaptive alternative to the dense factorization: input centers are picked
//! one at a time by maximising the power function, an upper bound on the
//! pointwise interpolation error. Each selection appends one column to a
//! Newton basis and one row to a lower-triangular coefficient matrix, so
//! evaluation reduces to two triangular products and a matrix-vector product
//! with the kernel evaluation matrix.
//!
//! Requires a strictly positive definite kernel and no polynomial term; both
//! are enforced by the mapping configuration.
//!
//! # References
//! 1. Santin, G., Haasdonk, B. Kernel methods for surrogate modeling;
//!    the P-Greedy selection rule and Newton basis update.

use crate::{
    error::MappingError,
    progress::{ProgressMsg, ProgressSink},
};
use faer::{Mat, MatRef};
use ferreus_mapping_utils::{
    argmax, build_kernel_matrix, get_distance, kernel_phi, select_mat_rows, KernelParams,
};
use std::sync::Arc;

/// Hard cap on the number of selected centers.
const MAX_ITERATIONS: usize = 1000;

/// Selection stops once the largest power function value falls below this.
const POWER_TOLERANCE: f64 = 1E-10;

/// Reduced interpolation operator built by greedy center selection.
pub(crate) struct PGreedySolver {
    /// Input indices of the selected centers, in selection order.
    greedy_ids: Vec<usize>,

    /// Lower-triangular coefficient matrix of the Newton basis.
    cut: Mat<f64>,

    /// Kernel evaluations between the selected centers and the output
    /// points, `|greedy_ids| x out_size`.
    kernel_eval: Mat<f64>,

    /// Power function over the input vertices after the final iteration.
    power_function: Vec<f64>,

    in_size: usize,
    out_size: usize,
}

impl PGreedySolver {
    /// Selects the centers and builds the evaluation structures. Input and
    /// output coordinates are expected to be projected onto the active axes.
    pub(crate) fn new(
        in_points: &Mat<f64>,
        out_points: &Mat<f64>,
        params: &KernelParams,
        progress: Option<&Arc<dyn ProgressSink>>,
        mesh_name: &str,
    ) -> Result<Self, MappingError> {
        let in_size = in_points.nrows();
        if in_size == 0 {
            return Err(MappingError::precondition(format!(
                "cannot build a mapping operator from the empty mesh {:?}",
                mesh_name
            )));
        }

        // Maximal number of used basis functions.
        let width = in_size.min(MAX_ITERATIONS);

        let phi_zero = kernel_phi(0.0, params);
        let mut power_function = vec![phi_zero; in_size];
        let mut basis_matrix = Mat::<f64>::zeros(in_size, width);
        let mut cut = Mat::<f64>::zeros(width, width);
        let mut center_bits = vec![false; in_size];
        let mut greedy_ids: Vec<usize> = Vec::new();
        let mut v = vec![0.0; in_size];

        // Iterative selection of new centers.
        for n in 0..width {
            let Some(i) = argmax(&power_function, &center_bits) else {
                break;
            };
            let p_max = power_function[i];

            if p_max < POWER_TOLERANCE {
                break;
            }

            greedy_ids.push(i);

            // Kernel column of the selected center against every input vertex.
            for j in 0..in_size {
                v[j] = kernel_phi(get_distance(in_points.row(i), in_points.row(j)), params);
            }

            // Orthogonalise against the previous basis columns and update the
            // power function. The selected index itself is still unselected
            // here, which drives its power to zero.
            let sqrt_p = p_max.sqrt();
            for j in 0..in_size {
                if center_bits[j] {
                    continue;
                }
                let mut projection = 0.0;
                for k in 0..n {
                    projection += basis_matrix[(j, k)] * basis_matrix[(i, k)];
                }
                v[j] = (v[j] - projection) / sqrt_p;
                power_function[j] -= v[j] * v[j];
            }

            center_bits[i] = true;
            for j in 0..in_size {
                basis_matrix[(j, n)] = v[j];
            }

            // New row of the triangular coefficient matrix:
            // cut[n, 0..n] = -basis[i, 0..n] * cut[0..n, 0..n], row / v[i].
            let v_i = v[i];
            for k in 0..n {
                let mut acc = 0.0;
                for l in k..n {
                    acc += basis_matrix[(i, l)] * cut[(l, k)];
                }
                cut[(n, k)] = -acc / v_i;
            }
            cut[(n, n)] = 1.0 / v_i;

            if let Some(sink) = progress {
                sink.emit(ProgressMsg::GreedyIteration {
                    iteration: n,
                    power_max: p_max,
                });
            }
        }

        let centers = select_mat_rows(in_points, &greedy_ids);
        let kernel_eval = build_kernel_matrix(&centers, out_points, params);

        Ok(Self {
            greedy_ids,
            cut,
            kernel_eval,
            power_function,
            in_size,
            out_size: out_points.nrows(),
        })
    }

    pub(crate) fn system_size(&self) -> usize {
        self.in_size
    }

    pub(crate) fn eval_size(&self) -> usize {
        self.out_size
    }

    /// Interpolates `values` given at the input vertices onto the output
    /// points. One column per value dimension.
    pub(crate) fn solve_consistent(&self, values: MatRef<f64>) -> Mat<f64> {
        assert_eq!(values.nrows(), self.in_size, "value count must match the input size");

        let k = self.greedy_ids.len();
        let num_cols = values.ncols();

        // Restrict the data to the selected centers.
        let y = Mat::<f64>::from_fn(k, num_cols, |i, j| *values.get(self.greedy_ids[i], j));

        let cut_block = self.cut.submatrix(0, 0, k, k);
        let forward: Mat<f64> = cut_block * &y;
        let coefficients: Mat<f64> = cut_block.transpose() * &forward;

        self.kernel_eval.transpose() * &coefficients
    }

    #[cfg(test)]
    fn greedy_ids(&self) -> &[usize] {
        &self.greedy_ids
    }

    #[cfg(test)]
    fn power_function(&self) -> &[f64] {
        &self.power_function
    }
}
