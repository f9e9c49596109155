/////////////////////////////////////////////////////////////////////////////////////////////
//
// Specifies constraint, polynomial, and solver options for configuring mappings.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Specifies constraint, polynomial, and solver options for configuring mappings.

use crate::error::MappingError;
use ferreus_mapping_utils::{
    is_strictly_positive_definite, kernel_support_radius, KernelParams,
};
use serde::{Deserialize, Serialize};

/// The interpolation constraint of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    /// Pointwise interpolation of the input field onto the output mesh.
    Consistent,

    /// Transpose of a consistent operator; preserves global sums. Used when
    /// the coupled field represents a flux or force.
    Conservative,

    /// Consistent interpolation followed by a global rescale so that the
    /// mesh-integrated field agrees across meshes.
    ScaledConsistent,
}

/// Polynomial treatment of the radial basis function system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polynomial {
    /// No polynomial contribution. Requires a strictly positive definite
    /// kernel.
    Off,

    /// A constant is fitted by least squares and subtracted from the
    /// right-hand side before the kernel solve.
    SeparateConstant,

    /// The linear polynomial `{1, x, y[, z]}` is integrated into the kernel
    /// system as an augmented saddle-point block.
    Integrated,

    /// The linear polynomial is fitted by least squares and subtracted from
    /// the right-hand side before the kernel solve.
    Separate,
}

/// Selects the algorithm used to build the interpolation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RbfSolverKind {
    /// Dense factorization of the full kernel system.
    Direct,

    /// Greedy center selection with an incrementally built Newton basis.
    PGreedy,
}

/// A convenience builder for constructing a [`MappingSettings`] instance.
///
/// The builder should be called via the [`MappingSettings::builder`] method.
///
/// See [`MappingSettings`] for details on each field.
#[derive(Debug, Clone, Copy)]
pub struct MappingSettingsBuilder {
    constraint: Constraint,
    dimensions: usize,
    kernel_params: KernelParams,
    dead_axis: [bool; 3],
    polynomial: Polynomial,
    solver_kind: RbfSolverKind,
    support_radius_override: Option<f64>,
}

impl MappingSettingsBuilder {
    fn new(constraint: Constraint, dimensions: usize, kernel_params: KernelParams) -> Self {
        Self {
            constraint,
            dimensions,
            kernel_params,
            dead_axis: [false; 3],
            polynomial: Polynomial::Integrated,
            solver_kind: RbfSolverKind::Direct,
            support_radius_override: None,
        }
    }

    /// Marks spatial axes to drop from the distance metric.
    pub fn dead_axis(mut self, dead_axis: [bool; 3]) -> Self {
        self.dead_axis = dead_axis;
        self
    }

    /// Sets the polynomial mode.
    pub fn polynomial(mut self, polynomial: Polynomial) -> Self {
        self.polynomial = polynomial;
        self
    }

    /// Sets the solver kind.
    pub fn solver_kind(mut self, solver_kind: RbfSolverKind) -> Self {
        self.solver_kind = solver_kind;
        self
    }

    /// Overrides the effective support radius used for vertex tagging.
    pub fn support_radius_override(mut self, radius: f64) -> Self {
        self.support_radius_override = Some(radius);
        self
    }

    /// Builds and returns a [`MappingSettings`] instance.
    pub fn build(self) -> MappingSettings {
        MappingSettings {
            constraint: self.constraint,
            dimensions: self.dimensions,
            kernel_params: self.kernel_params,
            dead_axis: self.dead_axis,
            polynomial: self.polynomial,
            solver_kind: self.solver_kind,
            support_radius_override: self.support_radius_override,
        }
    }
}

/// Configuration of a single radial basis function mapping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MappingSettings {
    /// The interpolation constraint.
    pub constraint: Constraint,

    /// The spatial dimension of the coupled meshes (2 or 3).
    pub dimensions: usize,

    /// The radial basis function and its parameters.
    pub kernel_params: KernelParams,

    /// Axes dropped from the distance metric, e.g. to couple a planar
    /// geometry embedded in 3D space.
    pub dead_axis: [bool; 3],

    /// Polynomial treatment of the kernel system.
    pub polynomial: Polynomial,

    /// The operator construction algorithm.
    pub solver_kind: RbfSolverKind,

    /// Optional override of the effective support radius used for tagging.
    pub support_radius_override: Option<f64>,
}

impl MappingSettings {
    /// Returns a new [`MappingSettingsBuilder`] for the given constraint,
    /// mesh dimension, and kernel.
    pub fn builder(
        constraint: Constraint,
        dimensions: usize,
        kernel_params: KernelParams,
    ) -> MappingSettingsBuilder {
        MappingSettingsBuilder::new(constraint, dimensions, kernel_params)
    }

    /// Validates the configuration, reporting incompatible combinations.
    pub(crate) fn validate(&self) -> Result<(), MappingError> {
        if !(2..=3).contains(&self.dimensions) {
            return Err(MappingError::configuration(format!(
                "unsupported mesh dimension {}",
                self.dimensions
            )));
        }

        let active = self.active_axes();
        if active.iter().filter(|a| **a).count() == 0 {
            return Err(MappingError::configuration(
                "every spatial axis is marked dead",
            ));
        }

        let spd = is_strictly_positive_definite(&self.kernel_params);
        if !spd && self.polynomial == Polynomial::Off {
            return Err(MappingError::configuration(format!(
                "kernel {:?} is only conditionally positive definite and requires \
                 polynomial augmentation",
                self.kernel_params.kernel_type
            )));
        }

        if self.constraint == Constraint::Conservative
            && matches!(self.polynomial, Polynomial::Separate | Polynomial::SeparateConstant)
        {
            return Err(MappingError::configuration(
                "the separated polynomial is only defined for the consistent direction",
            ));
        }

        if self.solver_kind == RbfSolverKind::PGreedy {
            if self.polynomial != Polynomial::Off {
                return Err(MappingError::configuration(
                    "greedy center selection requires the polynomial to be off",
                ));
            }
            if !spd {
                return Err(MappingError::configuration(
                    "greedy center selection requires a strictly positive definite kernel",
                ));
            }
            if self.constraint == Constraint::Conservative {
                return Err(MappingError::configuration(
                    "conservative coupling is not available with greedy center selection; \
                     use the direct solver",
                ));
            }
        }

        Ok(())
    }

    /// Per-axis activity flags restricted to the mesh dimension.
    pub(crate) fn active_axes(&self) -> Vec<bool> {
        (0..self.dimensions).map(|d| !self.dead_axis[d]).collect()
    }

    /// Column indices of the active axes.
    pub(crate) fn active_columns(&self) -> Vec<usize> {
        self.active_axes()
            .iter()
            .enumerate()
            .filter_map(|(d, active)| active.then_some(d))
            .collect()
    }

    /// The radius beyond which the kernel's influence is treated as zero for
    /// vertex tagging. `None` means no vertex can be pruned.
    pub(crate) fn effective_support(&self) -> Option<f64> {
        self.support_radius_override
            .or_else(|| kernel_support_radius(&self.kernel_params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferreus_mapping_utils::KernelType;

    fn gaussian() -> KernelParams {
        KernelParams::builder(KernelType::Gaussian)
            .shape_parameter(4.5)
            .build()
    }

    #[test]
    fn default_settings_validate() {
        let settings = MappingSettings::builder(Constraint::Consistent, 2, gaussian()).build();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn conditionally_pd_kernel_requires_polynomial() {
        let tps = KernelParams::builder(KernelType::ThinPlateSpline).build();
        let settings = MappingSettings::builder(Constraint::Consistent, 2, tps)
            .polynomial(Polynomial::Off)
            .build();
        assert!(matches!(
            settings.validate(),
            Err(MappingError::Configuration { .. })
        ));
    }

    #[test]
    fn greedy_rejects_polynomial_and_conservative() {
        let with_poly = MappingSettings::builder(Constraint::Consistent, 2, gaussian())
            .solver_kind(RbfSolverKind::PGreedy)
            .build();
        assert!(with_poly.validate().is_err());

        let conservative = MappingSettings::builder(Constraint::Conservative, 2, gaussian())
            .solver_kind(RbfSolverKind::PGreedy)
            .polynomial(Polynomial::Off)
            .build();
        assert!(conservative.validate().is_err());

        let consistent = MappingSettings::builder(Constraint::Consistent, 2, gaussian())
            .solver_kind(RbfSolverKind::PGreedy)
            .polynomial(Polynomial::Off)
            .build();
        assert!(consistent.validate().is_ok());
    }

    #[test]
    fn dead_axis_projection_columns() {
        let settings = MappingSettings::builder(Constraint::Consistent, 3, gaussian())
            .dead_axis([false, true, false])
            .build();
        assert_eq!(settings.active_columns(), vec![0, 2]);

        let all_dead = MappingSettings::builder(Constraint::Consistent, 2, gaussian())
            .dead_axis([true, true, false])
            .build();
        assert!(all_dead.validate().is_err());
    }

    #[test]
    fn effective_support_prefers_override() {
        let settings = MappingSettings::builder(Constraint::Consistent, 2, gaussian())
            .support_radius_override(2.5)
            .build();
        assert_eq!(settings.effective_support(), Some(2.5));

        // Gaussian with shape 4.5 decays below the cutoff near one.
        let derived = MappingSettings::builder(Constraint::Consistent, 2, gaussian()).build();
        let rho = derived.effective_support().unwrap();
        assert!((rho - 1.0).abs() < 0.05);

        // Growing kernels have no derivable support.
        let tps = KernelParams::builder(KernelType::ThinPlateSpline).build();
        let unbounded = MappingSettings::builder(Constraint::Consistent, 2, tps).build();
        assert_eq!(unbounded.effective_support(), None);
    }
}
