/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the capability traits implemented by every radial basis function.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::kernel_helpers::KernelParams;

/// Capability interface shared by all radial basis functions.
pub trait BasisFunction {
    /// Evaluates the radial profile at distance `r`.
    fn evaluate(&self, r: f64) -> f64;

    /// Whether the kernel matrix built from distinct points is guaranteed
    /// symmetric positive definite without polynomial augmentation.
    fn is_strictly_positive_definite(&self) -> bool;

    /// Radius beyond which the kernel's influence is zero or negligible.
    ///
    /// `None` means the influence never becomes negligible (growing or
    /// slowly decaying kernels).
    fn support_radius(&self) -> Option<f64> {
        None
    }
}

/// Converts a shared [`KernelParams`] configuration into a concrete kernel type.
pub trait KernelFromParams: Sized {
    /// Constructs `Self` from a set of uniform kernel parameters.
    fn from_params(p: &KernelParams) -> Self;
}
