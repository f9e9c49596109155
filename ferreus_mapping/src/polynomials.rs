/////////////////////////////////////////////////////////////////////////////////////////////
//
// Evaluates the monomial bases used for polynomial terms in the kernel systems.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::Mat;

/// Evaluates the monomial basis `{1}` or `{1, x, y[, z]}` at every point.
///
/// `points` is expected to already be projected onto the active axes, so the
/// linear columns match the distance metric of the kernel system.
pub(crate) fn evaluate_monomials(points: &Mat<f64>, constant_only: bool) -> Mat<f64> {
    let (n, d) = points.shape();
    let basis_size = match constant_only {
        true => 1,
        false => 1 + d,
    };

    let mut monomials = Mat::<f64>::zeros(n, basis_size);

    // constant column
    monomials.col_mut(0).fill(1.0);

    // linear columns
    if !constant_only {
        monomials.subcols_mut(1, d).copy_from(&points.as_ref());
    }

    monomials
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use faer::{mat, utils::approx::*};

    #[test]
    fn monomials_constant() {
        let points = mat![[1.0, 2.0], [3.0, 4.0f64]];
        let expected = mat![[1.0], [1.0f64]];

        let monomials = evaluate_monomials(&points, true);

        let approx_eq = CwiseMat(ApproxEq::eps());
        assert!(&monomials ~ &expected);
    }

    #[test]
    fn monomials_linear_2d() {
        let points = mat![[1.0, 2.0], [3.0, 4.0f64]];
        // Basis: [1, x, y]
        let expected = mat![[1.0, 1.0, 2.0], [1.0, 3.0, 4.0f64]];

        let monomials = evaluate_monomials(&points, false);

        let approx_eq = CwiseMat(ApproxEq::eps());
        assert!(&monomials ~ &expected);
    }

    #[test]
    fn monomials_linear_3d() {
        let points = mat![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0f64]];
        // Basis: [1, x, y, z]
        let expected = mat![[1.0, 1.0, 2.0, 3.0], [1.0, 4.0, 5.0, 6.0f64]];

        let monomials = evaluate_monomials(&points, false);

        let approx_eq = CwiseMat(ApproxEq::eps());
        assert!(&monomials ~ &expected);
    }
}
