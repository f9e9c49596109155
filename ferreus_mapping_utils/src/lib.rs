/////////////////////////////////////////////////////////////////////////////////////////////
//
// Re-exports the kernel catalog, parameters, and helper functions used across the mapping crates.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Utilities for the [`ferreus_mapping`] crate
//!
//! Provides the radial basis function catalog, the uniform kernel parameter
//! set used by the mapping configuration, and dense kernel matrix assembly.

mod basis_functions;
mod constants;
mod kernel_helpers;
mod traits;
mod utils;

/// Implemented radial basis functions for use in the [`ferreus_mapping`] crate.
pub mod kernels {
    pub use super::basis_functions::*;
}

pub use {
    constants::DECAY_CUTOFF_THRESHOLD,
    kernel_helpers::KernelParams,
    traits::{BasisFunction, KernelFromParams},
    utils::{
        argmax, build_kernel_matrix, build_kernel_matrix_symmetric, get_distance,
        get_pointarray_extents, is_strictly_positive_definite, kernel_phi, kernel_support_radius,
        select_mat_columns, select_mat_rows, KernelType,
    },
};
