/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the dense radial basis function system: assembly, factorization, and application.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # rbf_solver
//!
//! Builds the dense interpolation operator between two point sets. The kernel
//! matrix over the system points is factorised once per `compute_mapping` and
//! cached; consistent application solves against per-column right-hand sides
//! and multiplies by the evaluation matrix, conservative application applies
//! the transpose of that operator.

use crate::{
    error::MappingError,
    mapping_config::Polynomial,
    polynomials,
};
use faer::{
    concat,
    linalg::solvers::{ColPivQr, Llt, Qr, Solve, SolveLstsq},
    Mat, MatRef, Side,
};
use ferreus_mapping_utils::{
    build_kernel_matrix, build_kernel_matrix_symmetric, is_strictly_positive_definite,
    select_mat_columns, KernelParams,
};

/// Relative threshold on the diagonal of R below which the pivoted QR
/// factorization is treated as rank deficient.
const RANK_TOLERANCE: f64 = 1E-10;

/// Cached factorization of the (possibly augmented) kernel system.
enum SystemFactorization {
    /// Cholesky of the plain kernel matrix; strictly positive definite
    /// kernels without augmentation.
    Cholesky(Llt<f64>),

    /// Column-pivoted QR of the full system otherwise.
    PivotedQr(ColPivQr<f64>),
}

/// Polynomial contribution attached to the kernel system.
enum PolynomialTerm {
    None,

    /// The linear monomial block is part of the augmented saddle-point
    /// system; `q_eval` evaluates it at the evaluation points.
    Integrated { q_eval: Mat<f64>, basis_size: usize },

    /// The polynomial is fitted by least squares up front and its
    /// contribution subtracted from the right-hand side.
    Separate {
        q_system: Mat<f64>,
        q_eval: Mat<f64>,
        fit: Qr<f64>,
    },
}

/// Dense direct solver for one mapping direction.
///
/// `system_points` carry the kernel matrix; `eval_points` are where the
/// interpolant is evaluated. Both are expected to be projected onto the
/// active axes already.
pub(crate) struct RbfDirectSolver {
    eval_matrix: Mat<f64>,
    factorization: SystemFactorization,
    polynomial: PolynomialTerm,
    system_size: usize,
}

impl RbfDirectSolver {
    pub(crate) fn new(
        system_points: &Mat<f64>,
        eval_points: &Mat<f64>,
        params: &KernelParams,
        polynomial: Polynomial,
        mesh_name: &str,
    ) -> Result<Self, MappingError> {
        if system_points.nrows() == 0 {
            return Err(MappingError::precondition(format!(
                "cannot build a mapping operator from the empty mesh {:?}",
                mesh_name
            )));
        }

        let kernel_matrix = build_kernel_matrix_symmetric(system_points, params);
        let eval_matrix = build_kernel_matrix(eval_points, system_points, params);
        let system_size = system_points.nrows();
        let spd = is_strictly_positive_definite(params);

        let (factorization, polynomial) = match polynomial {
            Polynomial::Off => (
                factor_kernel(kernel_matrix, spd, mesh_name)?,
                PolynomialTerm::None,
            ),
            Polynomial::Integrated => {
                let (q_system, q_eval) = monomial_blocks(system_points, eval_points, false);
                let basis_size = q_system.ncols();

                // Augmented saddle-point system [C Q; Q^T 0].
                let q_t = q_system.transpose().to_owned();
                let zero_block = Mat::<f64>::zeros(basis_size, basis_size);
                let augmented = concat![[kernel_matrix, q_system], [q_t, zero_block]];

                (
                    SystemFactorization::PivotedQr(factor_pivoted_qr(&augmented, mesh_name)?),
                    PolynomialTerm::Integrated { q_eval, basis_size },
                )
            }
            Polynomial::SeparateConstant | Polynomial::Separate => {
                let constant_only = polynomial == Polynomial::SeparateConstant;
                let (q_system, q_eval) =
                    monomial_blocks(system_points, eval_points, constant_only);
                let fit = q_system.qr();

                (
                    factor_kernel(kernel_matrix, spd, mesh_name)?,
                    PolynomialTerm::Separate { q_system, q_eval, fit },
                )
            }
        };

        Ok(Self {
            eval_matrix,
            factorization,
            polynomial,
            system_size,
        })
    }

    /// Number of system (input-side) points.
    pub(crate) fn system_size(&self) -> usize {
        self.system_size
    }

    /// Number of evaluation (output-side) points.
    pub(crate) fn eval_size(&self) -> usize {
        self.eval_matrix.nrows()
    }

    /// Interpolates `values` given at the system points onto the evaluation
    /// points. One column per value dimension.
    pub(crate) fn solve_consistent(&self, values: MatRef<f64>) -> Mat<f64> {
        assert_eq!(values.nrows(), self.system_size, "value count must match the system size");

        match &self.polynomial {
            PolynomialTerm::None => {
                let alpha = self.solve_system(&values.to_owned());
                &self.eval_matrix * &alpha
            }
            PolynomialTerm::Integrated { q_eval, basis_size } => {
                let rhs = concat![
                    [values.to_owned()],
                    [Mat::<f64>::zeros(*basis_size, values.ncols())]
                ];
                let solution = self.solve_system(&rhs);
                let alpha = solution.subrows(0, self.system_size).to_owned();
                let beta = solution
                    .subrows(self.system_size, *basis_size)
                    .to_owned();
                &self.eval_matrix * &alpha + q_eval * &beta
            }
            PolynomialTerm::Separate { q_system, q_eval, fit } => {
                let beta = fit.solve_lstsq(values.to_owned());
                let residual = values.to_owned() - q_system * &beta;
                let alpha = self.solve_system(&residual);
                &self.eval_matrix * &alpha + q_eval * &beta
            }
        }
    }

    /// Applies the transpose of the consistent operator: `values` given at
    /// the evaluation points become a source term redistributed onto the
    /// system points, preserving the column sums enforced by the polynomial
    /// constraint rows.
    pub(crate) fn solve_conservative(&self, values: MatRef<f64>) -> Mat<f64> {
        assert_eq!(
            values.nrows(),
            self.eval_matrix.nrows(),
            "value count must match the evaluation size"
        );

        let kernel_rhs: Mat<f64> = self.eval_matrix.transpose() * values;

        match &self.polynomial {
            PolynomialTerm::None => self.solve_system(&kernel_rhs),
            PolynomialTerm::Integrated { q_eval, .. } => {
                let poly_rhs: Mat<f64> = q_eval.transpose() * values;
                let rhs = concat![[kernel_rhs], [poly_rhs]];
                let solution = self.solve_system(&rhs);
                solution.subrows(0, self.system_size).to_owned()
            }
            PolynomialTerm::Separate { .. } => {
                unreachable!("separated polynomial is rejected for conservative mappings")
            }
        }
    }

    fn solve_system(&self, rhs: &Mat<f64>) -> Mat<f64> {
        match &self.factorization {
            SystemFactorization::Cholesky(llt) => llt.solve(rhs),
            SystemFactorization::PivotedQr(qr) => qr.solve(rhs),
        }
    }
}

/// Evaluates the monomial blocks on both point sets, reduced to the column
/// subset that is linearly independent on the system points.
///
/// Point sets that degenerate under the active metric (collinear meshes in
/// 2D, coplanar meshes in 3D) leave dependent monomial columns behind; a
/// rank-revealing QR with column pivoting identifies a unisolvent subset so
/// the augmented system stays regular.
fn monomial_blocks(
    system_points: &Mat<f64>,
    eval_points: &Mat<f64>,
    constant_only: bool,
) -> (Mat<f64>, Mat<f64>) {
    let q_full = polynomials::evaluate_monomials(system_points, constant_only);

    let qr = q_full.col_piv_qr();
    let r = qr.thin_R();
    let threshold = RANK_TOLERANCE * r.get(0, 0).abs();
    let rank = r
        .diagonal()
        .column_vector()
        .iter()
        .filter(|val| val.abs() > threshold)
        .count();

    let (piv_fwd, _) = qr.P().arrays();
    let mut columns: Vec<usize> = piv_fwd[..rank].to_vec();
    columns.sort();

    let q_system = select_mat_columns(&q_full, &columns);
    let q_eval = select_mat_columns(
        &polynomials::evaluate_monomials(eval_points, constant_only),
        &columns,
    );

    (q_system, q_eval)
}

/// Factors the plain kernel matrix: Cholesky for strictly positive definite
/// kernels, column-pivoted QR otherwise.
fn factor_kernel(
    kernel_matrix: Mat<f64>,
    spd: bool,
    mesh_name: &str,
) -> Result<SystemFactorization, MappingError> {
    if spd {
        match kernel_matrix.llt(Side::Lower) {
            Ok(llt) => Ok(SystemFactorization::Cholesky(llt)),
            Err(_) => Err(MappingError::numerical(
                mesh_name,
                "kernel matrix is numerically indefinite; input vertices may coincide \
                 under the active-axis metric",
            )),
        }
    } else {
        Ok(SystemFactorization::PivotedQr(factor_pivoted_qr(
            &kernel_matrix,
            mesh_name,
        )?))
    }
}

/// Column-pivoted QR with a rank check on the diagonal of R.
fn factor_pivoted_qr(matrix: &Mat<f64>, mesh_name: &str) -> Result<ColPivQr<f64>, MappingError> {
    let qr = matrix.col_piv_qr();

    let r = qr.thin_R();
    let threshold = RANK_TOLERANCE * r.get(0, 0).abs();
    let rank = r
        .diagonal()
        .column_vector()
        .iter()
        .filter(|val| val.abs() > threshold)
        .count();

    if rank < matrix.ncols() {
        return Err(MappingError::numerical(
            mesh_name,
            format!(
                "kernel system is rank deficient ({} of {}); input vertices may coincide \
                 under the active-axis metric",
                rank,
                matrix.ncols()
            ),
        ));
    }

    Ok(qr)
}
