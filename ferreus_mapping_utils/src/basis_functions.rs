/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the concrete radial basis functions of the mapping kernel catalog.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    constants::DECAY_CUTOFF_THRESHOLD, kernel_helpers::KernelParams, BasisFunction,
    KernelFromParams,
};

/// Gaussian kernel with `phi(r) = exp(-(s r)^2)` for shape parameter `s`.
///
/// Strictly positive definite. The effective support radius is derived from
/// the shape parameter as the distance at which the profile falls below
/// [`DECAY_CUTOFF_THRESHOLD`].
#[derive(Clone, Debug, Copy)]
pub struct GaussianKernel {
    pub shape_parameter: f64,

    // derived (computed once)
    s2: f64,      // s^2
    support: f64, // sqrt(-ln(threshold)) / s
}

impl GaussianKernel {
    pub fn new(shape_parameter: f64) -> Self {
        assert!(shape_parameter > 0.0, "Gaussian shape parameter must be positive");
        Self {
            shape_parameter,
            s2: shape_parameter * shape_parameter,
            support: (-DECAY_CUTOFF_THRESHOLD.ln()).sqrt() / shape_parameter,
        }
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        (-self.s2 * r * r).exp()
    }
}

impl BasisFunction for GaussianKernel {
    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        self.phi(r)
    }

    #[inline(always)]
    fn is_strictly_positive_definite(&self) -> bool {
        true
    }

    #[inline(always)]
    fn support_radius(&self) -> Option<f64> {
        Some(self.support)
    }
}

impl KernelFromParams for GaussianKernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        GaussianKernel::new(p.shape_parameter)
    }
}

/// Thin plate spline kernel with `phi(r) = r^2 ln r` and `phi(0) = 0`.
///
/// Conditionally positive definite of order two; requires polynomial
/// augmentation.
#[derive(Clone, Debug, Copy)]
pub struct ThinPlateSplineKernel;

impl ThinPlateSplineKernel {
    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        match r.abs() < f64::EPSILON {
            true => 0.0,
            false => r * r * r.ln(),
        }
    }
}

impl BasisFunction for ThinPlateSplineKernel {
    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        self.phi(r)
    }

    #[inline(always)]
    fn is_strictly_positive_definite(&self) -> bool {
        false
    }
}

impl KernelFromParams for ThinPlateSplineKernel {
    #[inline(always)]
    fn from_params(_: &KernelParams) -> Self {
        ThinPlateSplineKernel
    }
}

/// Multiquadric kernel with `phi(r) = sqrt(r^2 + c^2)`.
///
/// Conditionally positive definite; requires polynomial augmentation.
#[derive(Clone, Debug, Copy)]
pub struct MultiquadricKernel {
    c2: f64, // c^2
}

impl MultiquadricKernel {
    pub fn new(c: f64) -> Self {
        Self { c2: c * c }
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        (r * r + self.c2).sqrt()
    }
}

impl BasisFunction for MultiquadricKernel {
    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        self.phi(r)
    }

    #[inline(always)]
    fn is_strictly_positive_definite(&self) -> bool {
        false
    }
}

impl KernelFromParams for MultiquadricKernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        MultiquadricKernel::new(p.shape_parameter)
    }
}

/// Inverse multiquadric kernel with `phi(r) = 1 / sqrt(r^2 + c^2)`.
///
/// Strictly positive definite.
#[derive(Clone, Debug, Copy)]
pub struct InverseMultiquadricKernel {
    c2: f64, // c^2
}

impl InverseMultiquadricKernel {
    pub fn new(c: f64) -> Self {
        assert!(c > 0.0, "inverse multiquadric shape parameter must be positive");
        Self { c2: c * c }
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        1.0 / (r * r + self.c2).sqrt()
    }
}

impl BasisFunction for InverseMultiquadricKernel {
    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        self.phi(r)
    }

    #[inline(always)]
    fn is_strictly_positive_definite(&self) -> bool {
        true
    }
}

impl KernelFromParams for InverseMultiquadricKernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        InverseMultiquadricKernel::new(p.shape_parameter)
    }
}

/// Volume spline kernel with `phi(r) = r`.
///
/// Conditionally positive definite; requires polynomial augmentation.
#[derive(Clone, Debug, Copy)]
pub struct VolumeSplineKernel;

impl VolumeSplineKernel {
    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        r
    }
}

impl BasisFunction for VolumeSplineKernel {
    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        self.phi(r)
    }

    #[inline(always)]
    fn is_strictly_positive_definite(&self) -> bool {
        false
    }
}

impl KernelFromParams for VolumeSplineKernel {
    #[inline(always)]
    fn from_params(_: &KernelParams) -> Self {
        VolumeSplineKernel
    }
}

/// Compact thin plate spline of continuity C2, zero for `r >= support_radius`.
///
/// With `p = r / support_radius`:
/// `phi = 1 - 30 p^2 - 10 p^3 + 45 p^4 - 6 p^5 - 60 p^3 ln p`.
#[derive(Clone, Debug, Copy)]
pub struct CompactThinPlateSplineC2Kernel {
    pub support: f64,
    inv_support: f64,
}

impl CompactThinPlateSplineC2Kernel {
    pub fn new(support_radius: f64) -> Self {
        assert!(support_radius > 0.0, "support radius must be positive");
        Self {
            support: support_radius,
            inv_support: 1.0 / support_radius,
        }
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        let p = r * self.inv_support;
        if p >= 1.0 {
            return 0.0;
        }
        // p^3 ln p -> 0 as p -> 0
        let log_term = match p < f64::EPSILON {
            true => 0.0,
            false => 60.0 * p.powi(3) * p.ln(),
        };
        1.0 - 30.0 * p.powi(2) - 10.0 * p.powi(3) + 45.0 * p.powi(4) - 6.0 * p.powi(5) - log_term
    }
}

impl BasisFunction for CompactThinPlateSplineC2Kernel {
    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        self.phi(r)
    }

    #[inline(always)]
    fn is_strictly_positive_definite(&self) -> bool {
        true
    }

    #[inline(always)]
    fn support_radius(&self) -> Option<f64> {
        Some(self.support)
    }
}

impl KernelFromParams for CompactThinPlateSplineC2Kernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        CompactThinPlateSplineC2Kernel::new(p.support_radius)
    }
}

/// Compact polynomial of continuity C0, `phi = (1 - p)^2` inside the support.
#[derive(Clone, Debug, Copy)]
pub struct CompactPolynomialC0Kernel {
    pub support: f64,
    inv_support: f64,
}

impl CompactPolynomialC0Kernel {
    pub fn new(support_radius: f64) -> Self {
        assert!(support_radius > 0.0, "support radius must be positive");
        Self {
            support: support_radius,
            inv_support: 1.0 / support_radius,
        }
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        let p = r * self.inv_support;
        match p >= 1.0 {
            true => 0.0,
            false => (1.0 - p).powi(2),
        }
    }
}

impl BasisFunction for CompactPolynomialC0Kernel {
    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        self.phi(r)
    }

    #[inline(always)]
    fn is_strictly_positive_definite(&self) -> bool {
        true
    }

    #[inline(always)]
    fn support_radius(&self) -> Option<f64> {
        Some(self.support)
    }
}

impl KernelFromParams for CompactPolynomialC0Kernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        CompactPolynomialC0Kernel::new(p.support_radius)
    }
}

/// Compact polynomial of continuity C6,
/// `phi = (1 - p)^8 (32 p^3 + 25 p^2 + 8 p + 1)` inside the support.
#[derive(Clone, Debug, Copy)]
pub struct CompactPolynomialC6Kernel {
    pub support: f64,
    inv_support: f64,
}

impl CompactPolynomialC6Kernel {
    pub fn new(support_radius: f64) -> Self {
        assert!(support_radius > 0.0, "support radius must be positive");
        Self {
            support: support_radius,
            inv_support: 1.0 / support_radius,
        }
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        let p = r * self.inv_support;
        match p >= 1.0 {
            true => 0.0,
            false => (1.0 - p).powi(8) * (32.0 * p.powi(3) + 25.0 * p.powi(2) + 8.0 * p + 1.0),
        }
    }
}

impl BasisFunction for CompactPolynomialC6Kernel {
    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        self.phi(r)
    }

    #[inline(always)]
    fn is_strictly_positive_definite(&self) -> bool {
        true
    }

    #[inline(always)]
    fn support_radius(&self) -> Option<f64> {
        Some(self.support)
    }
}

impl KernelFromParams for CompactPolynomialC6Kernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        CompactPolynomialC6Kernel::new(p.support_radius)
    }
}
