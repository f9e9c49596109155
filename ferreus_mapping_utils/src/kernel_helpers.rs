/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides parameter and builder types for configuring radial basis functions.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::utils::KernelType;
use serde::{Deserialize, Serialize};

/// Defines the [`KernelType`] to use, along with the parameter values
/// consumed by the individual kernels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KernelParams {
    /// KernelType enum variant to use.
    pub kernel_type: KernelType,

    /// Shape parameter of the Gaussian and (inverse) multiquadric kernels.
    ///
    /// For the Gaussian it controls how quickly the profile decays; the
    /// effective support radius is derived from it. For the multiquadrics it
    /// is the additive constant `c` inside the square root.
    pub shape_parameter: f64,

    /// Support radius of the compact kernels. The kernel evaluates to zero
    /// at and beyond this distance.
    pub support_radius: f64,
}

impl KernelParams {
    /// Begins building a [`KernelParams`] instance for the given kernel type.
    pub fn builder(kernel_type: KernelType) -> KernelParamsBuilder {
        KernelParamsBuilder {
            kernel_type,
            shape_parameter: 1.0,
            support_radius: 1.0,
        }
    }
}

/// Builder for [`KernelParams`] that provides sensible defaults.
#[derive(Debug, Clone, Copy)]
pub struct KernelParamsBuilder {
    kernel_type: KernelType,
    shape_parameter: f64,
    support_radius: f64,
}

impl KernelParamsBuilder {
    /// Sets the `shape_parameter` on the builder.
    pub fn shape_parameter(mut self, v: f64) -> Self {
        self.shape_parameter = v;
        self
    }

    /// Sets the `support_radius` on the builder.
    pub fn support_radius(mut self, v: f64) -> Self {
        self.support_radius = v;
        self
    }

    /// Finalises the builder into a [`KernelParams`] value.
    pub fn build(self) -> KernelParams {
        assert!(self.shape_parameter > 0.0);
        assert!(self.support_radius > 0.0);
        KernelParams {
            kernel_type: self.kernel_type,
            shape_parameter: self.shape_parameter,
            support_radius: self.support_radius,
        }
    }
}
