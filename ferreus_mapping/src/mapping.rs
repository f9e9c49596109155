/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the mapping driver: operator construction, application, tagging, and rescaling.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # mapping
//!
//! The mapping driver binds an input and an output mesh, builds the
//! interpolation operator on `compute_mapping`, and applies it per data
//! field on `map`. For the conservative constraint the geometric roles are
//! swapped so that the kernel system lives on the receiving mesh and the
//! applied operator is the transpose of its consistent counterpart. The
//! scaled-consistent constraint post-applies a global rescale so that the
//! surface integral of the output field matches the input field.

use crate::{
    distribution::{Collective, SerialCollective},
    error::MappingError,
    mapping_config::{Constraint, MappingSettings, RbfSolverKind},
    mesh::{DataId, Mesh, PtrMesh},
    pgreedy::PGreedySolver,
    progress::{ProgressMsg, ProgressSink},
    rbf_solver::RbfDirectSolver,
};
use faer::Mat;
use ferreus_mapping_utils::select_mat_columns;
use std::rc::Rc;
use std::sync::Arc;

/// Common contract of all mesh-to-mesh data mappings.
pub trait Mapping {
    /// Binds the input and output mesh references.
    fn set_meshes(&mut self, input: PtrMesh, output: PtrMesh);

    /// The interpolation constraint of this mapping.
    fn constraint(&self) -> Constraint;

    /// Builds the mapping operator from the currently bound meshes.
    ///
    /// Fails if the meshes are unset. A repeated call rebuilds the operator
    /// from the current mesh state.
    fn compute_mapping(&mut self) -> Result<(), MappingError>;

    /// Whether a computed operator is available.
    fn has_computed_mapping(&self) -> bool;

    /// Applies the operator to the input data field and writes the output
    /// data field.
    fn map(&mut self, input_data: DataId, output_data: DataId) -> Result<(), MappingError>;

    /// Discards the operator state.
    fn clear(&mut self);

    /// First tagging round: marks the vertices that must participate in the
    /// mapping given the effective kernel support.
    fn tag_mesh_first_round(&mut self) -> Result<(), MappingError>;

    /// Second tagging round: extends the first round by one support-radius
    /// hop, as needed by the conservative adjoint.
    fn tag_mesh_second_round(&mut self) -> Result<(), MappingError>;
}

/// The computed operator of a radial basis function mapping.
enum RbfOperator {
    Direct(RbfDirectSolver),
    Greedy(PGreedySolver),
}

/// Convenience builder for constructing a [`RadialBasisMapping`].
///
/// The builder should be called via the [`RadialBasisMapping::builder`]
/// method.
pub struct RadialBasisMappingBuilder {
    settings: MappingSettings,
    collective: Rc<dyn Collective>,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl RadialBasisMappingBuilder {
    fn new(settings: MappingSettings) -> Self {
        Self {
            settings,
            collective: Rc::new(SerialCollective),
            progress_callback: None,
        }
    }

    /// Sets the collective used by the scaled-consistent reduction. Defaults
    /// to the single-process collective.
    pub fn collective(mut self, collective: Rc<dyn Collective>) -> Self {
        self.collective = collective;
        self
    }

    /// Optional callback for reporting mapping progress.
    pub fn progress_callback(mut self, progress_callback: Arc<dyn ProgressSink>) -> Self {
        self.progress_callback = Some(progress_callback);
        self
    }

    /// Builds and returns the configured [`RadialBasisMapping`].
    pub fn build(self) -> RadialBasisMapping {
        RadialBasisMapping {
            settings: self.settings,
            input: None,
            output: None,
            operator: None,
            collective: self.collective,
            progress_callback: self.progress_callback,
        }
    }
}

/// Mapping driven by a radial basis function interpolant.
pub struct RadialBasisMapping {
    settings: MappingSettings,
    input: Option<PtrMesh>,
    output: Option<PtrMesh>,
    operator: Option<RbfOperator>,
    collective: Rc<dyn Collective>,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl RadialBasisMapping {
    /// Creates a new [`RadialBasisMappingBuilder`] for the given settings.
    pub fn builder(settings: MappingSettings) -> RadialBasisMappingBuilder {
        RadialBasisMappingBuilder::new(settings)
    }

    /// Creates a mapping with default collective and no progress reporting.
    pub fn new(settings: MappingSettings) -> Self {
        RadialBasisMappingBuilder::new(settings).build()
    }

    fn meshes(&self) -> Result<(PtrMesh, PtrMesh), MappingError> {
        match (&self.input, &self.output) {
            (Some(input), Some(output)) => Ok((Rc::clone(input), Rc::clone(output))),
            _ => Err(MappingError::precondition(
                "meshes must be set before using the mapping",
            )),
        }
    }

    /// The mesh whose vertices are tagged, and the mesh providing the
    /// bounding box. The taggable side is the communicated one: the input
    /// mesh for consistent couplings, the output mesh for the conservative
    /// adjoint.
    fn tagging_roles(&self) -> Result<(PtrMesh, PtrMesh), MappingError> {
        let (input, output) = self.meshes()?;
        match self.settings.constraint {
            Constraint::Conservative => Ok((output, input)),
            _ => Ok((input, output)),
        }
    }

    fn tag_round(&mut self, round: usize, inflate: bool) -> Result<(), MappingError> {
        let (filter, other) = self.tagging_roles()?;
        let mut filter_mesh = filter.borrow_mut();

        let num_tagged = match self.settings.effective_support() {
            None => {
                // Influence never becomes negligible: every vertex may
                // contribute to the mapping.
                for vertex in filter_mesh.vertices_mut() {
                    vertex.tag();
                }
                filter_mesh.vertices().len()
            }
            Some(rho) => {
                let bounding_box = match inflate {
                    true => other.borrow().bounding_box().expanded_by(rho),
                    false => other.borrow().bounding_box(),
                };
                let mut tagged = 0;
                for vertex in filter_mesh.vertices_mut() {
                    if bounding_box.distance(vertex.coords()) <= rho {
                        vertex.tag();
                    }
                    if vertex.is_tagged() {
                        tagged += 1;
                    }
                }
                tagged
            }
        };

        if let Some(sink) = &self.progress_callback {
            sink.emit(ProgressMsg::VerticesTagged { round, num_tagged });
        }

        Ok(())
    }
}

impl Mapping for RadialBasisMapping {
    fn set_meshes(&mut self, input: PtrMesh, output: PtrMesh) {
        self.input = Some(input);
        self.output = Some(output);
    }

    fn constraint(&self) -> Constraint {
        self.settings.constraint
    }

    fn compute_mapping(&mut self) -> Result<(), MappingError> {
        self.operator = None;
        self.settings.validate()?;

        let (input, output) = self.meshes()?;
        let in_mesh = input.borrow();
        let out_mesh = output.borrow();

        if in_mesh.dimensions() != self.settings.dimensions
            || out_mesh.dimensions() != self.settings.dimensions
        {
            return Err(MappingError::configuration(format!(
                "meshes {:?}/{:?} do not match the configured dimension {}",
                in_mesh.name(),
                out_mesh.name(),
                self.settings.dimensions
            )));
        }

        let columns = self.settings.active_columns();
        let in_points = select_mat_columns(&in_mesh.coordinate_matrix(), &columns);
        let out_points = select_mat_columns(&out_mesh.coordinate_matrix(), &columns);

        let operator = match self.settings.solver_kind {
            RbfSolverKind::Direct => {
                // The conservative adjoint builds the kernel system on the
                // receiving mesh and evaluates towards the source mesh.
                let (system_points, eval_points, system_mesh) =
                    match self.settings.constraint {
                        Constraint::Conservative => (&out_points, &in_points, out_mesh.name()),
                        _ => (&in_points, &out_points, in_mesh.name()),
                    };
                RbfOperator::Direct(RbfDirectSolver::new(
                    system_points,
                    eval_points,
                    &self.settings.kernel_params,
                    self.settings.polynomial,
                    system_mesh,
                )?)
            }
            RbfSolverKind::PGreedy => RbfOperator::Greedy(PGreedySolver::new(
                &in_points,
                &out_points,
                &self.settings.kernel_params,
                self.progress_callback.as_ref(),
                in_mesh.name(),
            )?),
        };

        if let Some(sink) = &self.progress_callback {
            sink.emit(ProgressMsg::MappingComputed {
                input_size: in_mesh.vertices().len(),
                output_size: out_mesh.vertices().len(),
            });
        }

        self.operator = Some(operator);
        Ok(())
    }

    fn has_computed_mapping(&self) -> bool {
        self.operator.is_some()
    }

    fn map(&mut self, input_data: DataId, output_data: DataId) -> Result<(), MappingError> {
        let (input, output) = self.meshes()?;

        {
            let operator = self.operator.as_ref().ok_or_else(|| {
                MappingError::precondition("map called before compute_mapping")
            })?;

            let in_mesh = input.borrow();
            let mut out_mesh = output.borrow_mut();

            let in_field = in_mesh.data(input_data).ok_or_else(|| {
                MappingError::precondition(format!("unknown input data id {}", input_data))
            })?;
            let value_dimensions = in_field.dimensions();

            {
                let out_field = out_mesh.data(output_data).ok_or_else(|| {
                    MappingError::precondition(format!("unknown output data id {}", output_data))
                })?;
                if out_field.dimensions() != value_dimensions {
                    return Err(MappingError::precondition(format!(
                        "value dimensions differ: input {} vs output {}",
                        value_dimensions,
                        out_field.dimensions()
                    )));
                }
                if out_field.values().len()
                    != out_mesh.vertices().len() * value_dimensions
                {
                    return Err(MappingError::precondition(
                        "output field size does not match the output mesh",
                    ));
                }
            }
            if in_field.values().len() != in_mesh.vertices().len() * value_dimensions {
                return Err(MappingError::precondition(
                    "input field size does not match the input mesh",
                ));
            }

            // Guard against mesh mutation between compute_mapping and map.
            let (system_size, eval_size) = match operator {
                RbfOperator::Direct(solver) => (solver.system_size(), solver.eval_size()),
                RbfOperator::Greedy(solver) => (solver.system_size(), solver.eval_size()),
            };
            let (expected_in, expected_out) = match self.settings.constraint {
                Constraint::Conservative => (eval_size, system_size),
                _ => (system_size, eval_size),
            };
            if in_mesh.vertices().len() != expected_in
                || out_mesh.vertices().len() != expected_out
            {
                return Err(MappingError::precondition(
                    "mesh sizes changed since compute_mapping; recompute the mapping",
                ));
            }

            let in_values = Mat::from_fn(
                in_mesh.vertices().len(),
                value_dimensions,
                |i, j| in_field.values()[i * value_dimensions + j],
            );

            let result = match (operator, self.settings.constraint) {
                (RbfOperator::Direct(solver), Constraint::Conservative) => {
                    solver.solve_conservative(in_values.as_ref())
                }
                (RbfOperator::Direct(solver), _) => solver.solve_consistent(in_values.as_ref()),
                (RbfOperator::Greedy(solver), _) => solver.solve_consistent(in_values.as_ref()),
            };

            let out_field = out_mesh.data_mut(output_data).unwrap();
            let out_values = out_field.values_mut();
            for i in 0..result.nrows() {
                for j in 0..value_dimensions {
                    out_values[i * value_dimensions + j] = result[(i, j)];
                }
            }
        }

        if self.settings.constraint == Constraint::ScaledConsistent {
            scale_consistent_output(
                &input,
                &output,
                input_data,
                output_data,
                self.collective.as_ref(),
            )?;
        }

        Ok(())
    }

    fn clear(&mut self) {
        self.operator = None;
    }

    fn tag_mesh_first_round(&mut self) -> Result<(), MappingError> {
        self.tag_round(1, false)
    }

    fn tag_mesh_second_round(&mut self) -> Result<(), MappingError> {
        self.tag_round(2, true)
    }
}

/// Rescales the output field so that its surface integral matches the input
/// field's, per value dimension.
///
/// Input-side contributions only count edges (2D) or triangles (3D) that are
/// fully owned by this rank; output-side contributions count
/// unconditionally. Both integrals are reduce-summed across the ranks of the
/// participant before forming the scale. A zero output integral leaves that
/// dimension untouched.
pub(crate) fn scale_consistent_output(
    input: &PtrMesh,
    output: &PtrMesh,
    input_data: DataId,
    output_data: DataId,
    collective: &dyn Collective,
) -> Result<(), MappingError> {
    let in_mesh = input.borrow();
    let mut out_mesh = output.borrow_mut();

    let in_field = in_mesh.data(input_data).ok_or_else(|| {
        MappingError::precondition(format!("unknown input data id {}", input_data))
    })?;
    let value_dimensions = in_field.dimensions();

    let input_integral = surface_integral(&in_mesh, in_field.values(), value_dimensions, true);
    let output_integral = {
        let out_field = out_mesh.data(output_data).ok_or_else(|| {
            MappingError::precondition(format!("unknown output data id {}", output_data))
        })?;
        surface_integral(&out_mesh, out_field.values(), value_dimensions, false)
    };

    let mut global_input = vec![0.0; value_dimensions];
    let mut global_output = vec![0.0; value_dimensions];
    collective.allreduce_sum(&input_integral, &mut global_input)?;
    collective.allreduce_sum(&output_integral, &mut global_output)?;

    let out_field = out_mesh.data_mut(output_data).unwrap();
    let out_values = out_field.values_mut();
    for dim in 0..value_dimensions {
        if global_output[dim] == 0.0 {
            continue;
        }
        let scale = global_input[dim] / global_output[dim];
        let mut i = dim;
        while i < out_values.len() {
            out_values[i] *= scale;
            i += value_dimensions;
        }
    }

    Ok(())
}

/// Per-dimension surface integral of a field: edge-lengths times mean edge
/// values in 2D, triangle areas times mean corner values in 3D.
fn surface_integral(
    mesh: &Mesh,
    values: &[f64],
    value_dimensions: usize,
    owned_only: bool,
) -> Vec<f64> {
    let mut integral = vec![0.0; value_dimensions];
    let vertices = mesh.vertices();

    if mesh.dimensions() == 2 {
        for edge in mesh.edges() {
            let (a, b) = (edge.vertex(0), edge.vertex(1));
            if owned_only && !(vertices[a].is_owner() && vertices[b].is_owner()) {
                continue;
            }
            for dim in 0..value_dimensions {
                integral[dim] += 0.5
                    * edge.length()
                    * (values[a * value_dimensions + dim] + values[b * value_dimensions + dim]);
            }
        }
    } else {
        for triangle in mesh.triangles() {
            let (a, b, c) = (triangle.vertex(0), triangle.vertex(1), triangle.vertex(2));
            if owned_only
                && !(vertices[a].is_owner() && vertices[b].is_owner() && vertices[c].is_owner())
            {
                continue;
            }
            for dim in 0..value_dimensions {
                integral[dim] += triangle.area()
                    * (values[a * value_dimensions + dim]
                        + values[b * value_dimensions + dim]
                        + values[c * value_dimensions + dim])
                    / 3.0;
            }
        }
    }

    integral
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping_config::Polynomial;
    use crate::mesh::Mesh;
    use ferreus_mapping_utils::{KernelParams, KernelType};

    fn gaussian(shape: f64) -> KernelParams {
        KernelParams::builder(KernelType::Gaussian)
            .shape_parameter(shape)
            .build()
    }

    fn tps() -> KernelParams {
        KernelParams::builder(KernelType::ThinPlateSpline).build()
    }

    /// Unit square input mesh with scalar values {1, 2, 2, 1}.
    fn square_input() -> (PtrMesh, DataId) {
        let mesh = Mesh::shared("InMesh", 2);
        {
            let mut m = mesh.borrow_mut();
            m.create_vertex(&[0.0, 0.0]);
            m.create_vertex(&[1.0, 0.0]);
            m.create_vertex(&[1.0, 1.0]);
            m.create_vertex(&[0.0, 1.0]);
            m.assign_global_indices(0);
        }
        let data = mesh.borrow_mut().create_data("InData", 1);
        mesh.borrow_mut().allocate_data_values();
        mesh.borrow_mut()
            .data_mut(data)
            .unwrap()
            .set_values(&[1.0, 2.0, 2.0, 1.0]);
        (mesh, data)
    }

    fn single_vertex_output(coords: &[f64]) -> (PtrMesh, DataId) {
        let mesh = Mesh::shared("OutMesh", coords.len());
        mesh.borrow_mut().create_vertex(coords);
        let data = mesh.borrow_mut().create_data("OutData", 1);
        mesh.borrow_mut().allocate_data_values();
        (mesh, data)
    }

    fn map_square_to(position: &[f64; 2], params: KernelParams) -> f64 {
        let (in_mesh, in_data) = square_input();
        let (out_mesh, out_data) = single_vertex_output(position);

        let settings = MappingSettings::builder(Constraint::Consistent, 2, params).build();
        let mut mapping = RadialBasisMapping::new(settings);
        mapping.set_meshes(in_mesh, Rc::clone(&out_mesh));

        assert!(!mapping.has_computed_mapping());
        mapping.compute_mapping().unwrap();
        assert!(mapping.has_computed_mapping());
        mapping.map(in_data, out_data).unwrap();

        let value = out_mesh.borrow().data(out_data).unwrap().values()[0];
        value
    }

    #[test]
    fn serial_2d_consistent_square() {
        for params in [tps(), gaussian(2.0)] {
            assert!((map_square_to(&[0.0, 0.0], params) - 1.0).abs() < 1e-7);
            assert!((map_square_to(&[0.0, 0.5], params) - 1.0).abs() < 1e-7);
            assert!((map_square_to(&[1.0, 0.5], params) - 2.0).abs() < 1e-7);
            assert!((map_square_to(&[0.5, 0.0], params) - 1.5).abs() < 1e-7);
            assert!((map_square_to(&[0.5, 0.5], params) - 1.5).abs() < 1e-7);
            assert!((map_square_to(&[0.5, 1.0], params) - 1.5).abs() < 1e-7);
        }
    }

    #[test]
    fn serial_2d_consistent_vector_field() {
        let in_mesh = Mesh::shared("InMesh", 2);
        {
            let mut m = in_mesh.borrow_mut();
            m.create_vertex(&[0.0, 0.0]);
            m.create_vertex(&[1.0, 0.0]);
            m.create_vertex(&[1.0, 1.0]);
            m.create_vertex(&[0.0, 1.0]);
        }
        let in_data = in_mesh.borrow_mut().create_data("InData", 2);
        in_mesh.borrow_mut().allocate_data_values();
        in_mesh
            .borrow_mut()
            .data_mut(in_data)
            .unwrap()
            .set_values(&[1.0, 4.0, 2.0, 5.0, 2.0, 5.0, 1.0, 4.0]);

        let out_mesh = Mesh::shared("OutMesh", 2);
        out_mesh.borrow_mut().create_vertex(&[0.5, 0.5]);
        let out_data = out_mesh.borrow_mut().create_data("OutData", 2);
        out_mesh.borrow_mut().allocate_data_values();

        let settings = MappingSettings::builder(Constraint::Consistent, 2, tps()).build();
        let mut mapping = RadialBasisMapping::new(settings);
        mapping.set_meshes(in_mesh, Rc::clone(&out_mesh));
        mapping.compute_mapping().unwrap();
        mapping.map(in_data, out_data).unwrap();

        let out = out_mesh.borrow();
        let values = out.data(out_data).unwrap().values().to_vec();
        assert!((values[0] - 1.5).abs() < 1e-7);
        assert!((values[1] - 4.5).abs() < 1e-7);
    }

    #[test]
    fn serial_2d_conservative_sum() {
        let in_mesh = Mesh::shared("InMesh", 2);
        in_mesh.borrow_mut().create_vertex(&[0.5, 0.0]);
        in_mesh.borrow_mut().create_vertex(&[0.5, 1.0]);
        let in_data = in_mesh.borrow_mut().create_data("InData", 1);
        in_mesh.borrow_mut().allocate_data_values();
        in_mesh
            .borrow_mut()
            .data_mut(in_data)
            .unwrap()
            .set_values(&[1.0, 2.0]);

        let out_mesh = Mesh::shared("OutMesh", 2);
        {
            let mut m = out_mesh.borrow_mut();
            m.create_vertex(&[0.0, 0.0]);
            m.create_vertex(&[1.0, 0.0]);
            m.create_vertex(&[1.0, 1.0]);
            m.create_vertex(&[0.0, 1.0]);
        }
        let out_data = out_mesh.borrow_mut().create_data("OutData", 1);
        out_mesh.borrow_mut().allocate_data_values();

        let settings =
            MappingSettings::builder(Constraint::Conservative, 2, gaussian(1.0)).build();
        let mut mapping = RadialBasisMapping::new(settings);
        mapping.set_meshes(in_mesh, Rc::clone(&out_mesh));
        mapping.compute_mapping().unwrap();
        mapping.map(in_data, out_data).unwrap();

        let out = out_mesh.borrow();
        let values = out.data(out_data).unwrap().values().to_vec();
        let expected = [0.5, 0.5, 1.0, 1.0];
        for (value, reference) in values.iter().zip(expected.iter()) {
            assert!((value - reference).abs() < 1e-6);
        }
        let sum: f64 = values.iter().sum();
        assert!((sum - 3.0).abs() < 1e-9);
    }

    #[test]
    fn dead_axis_2d() {
        // Input vertices along y = 1, output at (0, 3): with the y axis
        // projected out, the output coincides with the first input vertex.
        let in_mesh = Mesh::shared("InMesh", 2);
        {
            let mut m = in_mesh.borrow_mut();
            m.create_vertex(&[0.0, 1.0]);
            m.create_vertex(&[1.0, 1.0]);
            m.create_vertex(&[2.0, 1.0]);
            m.create_vertex(&[3.0, 1.0]);
        }
        let in_data = in_mesh.borrow_mut().create_data("InData", 1);
        in_mesh.borrow_mut().allocate_data_values();
        in_mesh
            .borrow_mut()
            .data_mut(in_data)
            .unwrap()
            .set_values(&[1.0, 2.0, 2.0, 1.0]);

        let (out_mesh, out_data) = single_vertex_output(&[0.0, 3.0]);

        let settings = MappingSettings::builder(Constraint::Consistent, 2, tps())
            .dead_axis([false, true, false])
            .build();
        let mut mapping = RadialBasisMapping::new(settings);
        mapping.set_meshes(in_mesh, Rc::clone(&out_mesh));
        mapping.compute_mapping().unwrap();
        mapping.map(in_data, out_data).unwrap();

        let value = out_mesh.borrow().data(out_data).unwrap().values()[0];
        assert!((value - 1.0).abs() < 1e-7);
    }

    #[test]
    fn dead_axis_3d_linear_reproduction() {
        // Input data is linear in (x, z); with y dead the integrated linear
        // polynomial reproduces it exactly everywhere.
        let in_mesh = Mesh::shared("InMesh", 3);
        {
            let mut m = in_mesh.borrow_mut();
            m.create_vertex(&[0.0, 3.0, 0.0]);
            m.create_vertex(&[1.0, 3.0, 0.0]);
            m.create_vertex(&[0.0, 3.0, 1.0]);
            m.create_vertex(&[1.0, 3.0, 1.0]);
        }
        let in_data = in_mesh.borrow_mut().create_data("InData", 1);
        in_mesh.borrow_mut().allocate_data_values();
        in_mesh
            .borrow_mut()
            .data_mut(in_data)
            .unwrap()
            .set_values(&[1.0, 2.0, 3.0, 4.0]);

        let out_mesh = Mesh::shared("OutMesh", 3);
        {
            let mut m = out_mesh.borrow_mut();
            m.create_vertex(&[0.0, 2.9, 0.0]);
            m.create_vertex(&[0.8, 2.9, 0.1]);
            m.create_vertex(&[0.1, 2.9, 0.9]);
            m.create_vertex(&[1.1, 2.9, 1.1]);
        }
        let out_data = out_mesh.borrow_mut().create_data("OutData", 1);
        out_mesh.borrow_mut().allocate_data_values();

        let compact = KernelParams::builder(KernelType::CompactPolynomialC6)
            .support_radius(1.2)
            .build();
        let settings = MappingSettings::builder(Constraint::Consistent, 3, compact)
            .dead_axis([false, true, false])
            .build();
        let mut mapping = RadialBasisMapping::new(settings);
        mapping.set_meshes(in_mesh, Rc::clone(&out_mesh));
        mapping.compute_mapping().unwrap();
        mapping.map(in_data, out_data).unwrap();

        let out = out_mesh.borrow();
        let values = out.data(out_data).unwrap().values().to_vec();
        let expected = [1.0, 2.0, 2.9, 4.3];
        for (value, reference) in values.iter().zip(expected.iter()) {
            assert!((value - reference).abs() < 1e-7);
        }
    }

    fn integral_2d(mesh: &Mesh, values: &[f64]) -> f64 {
        surface_integral(mesh, values, 1, false)[0]
    }

    #[test]
    fn scaled_consistent_2d_matches_integrals() {
        let in_mesh = Mesh::shared("InMesh", 2);
        let in_data;
        {
            let mut m = in_mesh.borrow_mut();
            let v1 = m.create_vertex(&[0.0, 0.0]);
            let v2 = m.create_vertex(&[1.0, 0.0]);
            let v3 = m.create_vertex(&[1.0, 1.0]);
            let v4 = m.create_vertex(&[0.0, 1.0]);
            m.create_edge(v1, v2);
            m.create_edge(v2, v3);
            m.create_edge(v3, v4);
            m.create_edge(v1, v4);
            in_data = m.create_data("InData", 1);
            m.allocate_data_values();
            m.data_mut(in_data).unwrap().set_values(&[1.0, 2.0, 2.0, 1.0]);
        }

        // Slightly offset quadrilateral.
        let out_mesh = Mesh::shared("OutMesh", 2);
        let out_data;
        {
            let mut m = out_mesh.borrow_mut();
            let v1 = m.create_vertex(&[0.0, 0.0]);
            let v2 = m.create_vertex(&[0.0, 1.0]);
            let v3 = m.create_vertex(&[1.1, 1.1]);
            let v4 = m.create_vertex(&[0.1, 1.1]);
            m.create_edge(v1, v2);
            m.create_edge(v2, v3);
            m.create_edge(v3, v4);
            m.create_edge(v1, v4);
            out_data = m.create_data("OutData", 1);
            m.allocate_data_values();
        }

        let settings =
            MappingSettings::builder(Constraint::ScaledConsistent, 2, tps()).build();
        let mut mapping = RadialBasisMapping::new(settings);
        mapping.set_meshes(Rc::clone(&in_mesh), Rc::clone(&out_mesh));
        mapping.compute_mapping().unwrap();
        mapping.map(in_data, out_data).unwrap();

        let input_integral = {
            let m = in_mesh.borrow();
            let values = m.data(in_data).unwrap().values().to_vec();
            integral_2d(&m, &values)
        };
        let output_integral = {
            let m = out_mesh.borrow();
            let values = m.data(out_data).unwrap().values().to_vec();
            integral_2d(&m, &values)
        };
        assert!((input_integral - output_integral).abs() < 1e-9);
    }

    #[test]
    fn scaled_consistent_3d_matches_integrals() {
        let in_mesh = Mesh::shared("InMesh", 3);
        let in_data;
        {
            let mut m = in_mesh.borrow_mut();
            let v1 = m.create_vertex(&[0.0, 0.0, 0.0]);
            let v2 = m.create_vertex(&[1.0, 0.0, 0.0]);
            let v3 = m.create_vertex(&[0.0, 1.0, 0.5]);
            let v4 = m.create_vertex(&[2.0, 0.0, 0.0]);
            let v5 = m.create_vertex(&[0.0, 2.0, 0.0]);
            let v6 = m.create_vertex(&[0.0, 2.0, 1.0]);
            m.create_triangle(v1, v2, v3);
            m.create_triangle(v4, v5, v6);
            in_data = m.create_data("InData", 1);
            m.allocate_data_values();
            m.data_mut(in_data)
                .unwrap()
                .set_values(&[1.0, 2.0, 4.0, 6.0, 8.0, 9.0]);
        }

        let out_mesh = Mesh::shared("OutMesh", 3);
        let out_data;
        {
            let mut m = out_mesh.borrow_mut();
            let v1 = m.create_vertex(&[0.0, 0.0, 0.0]);
            let v2 = m.create_vertex(&[1.0, 0.0, 0.0]);
            let v3 = m.create_vertex(&[0.0, 1.1, 0.6]);
            m.create_triangle(v1, v2, v3);
            out_data = m.create_data("OutData", 1);
            m.allocate_data_values();
        }

        let settings =
            MappingSettings::builder(Constraint::ScaledConsistent, 3, tps()).build();
        let mut mapping = RadialBasisMapping::new(settings);
        mapping.set_meshes(Rc::clone(&in_mesh), Rc::clone(&out_mesh));
        mapping.compute_mapping().unwrap();
        mapping.map(in_data, out_data).unwrap();

        let input_integral = {
            let m = in_mesh.borrow();
            let values = m.data(in_data).unwrap().values().to_vec();
            surface_integral(&m, &values, 1, false)[0]
        };
        let output_integral = {
            let m = out_mesh.borrow();
            let values = m.data(out_data).unwrap().values().to_vec();
            surface_integral(&m, &values, 1, false)[0]
        };
        assert!((input_integral - output_integral).abs() < 1e-9);
    }

    #[test]
    fn scaled_consistent_input_integral_skips_unowned_edges() {
        let mesh = Mesh::shared("InMesh", 2);
        let data;
        {
            let mut m = mesh.borrow_mut();
            let v1 = m.create_vertex(&[0.0, 0.0]);
            let v2 = m.create_vertex(&[1.0, 0.0]);
            let v3 = m.create_vertex(&[2.0, 0.0]);
            m.create_edge(v1, v2);
            m.create_edge(v2, v3);
            m.vertices_mut()[2].set_owner(false);
            data = m.create_data("InData", 1);
            m.allocate_data_values();
            m.data_mut(data).unwrap().set_values(&[1.0, 1.0, 1.0]);
        }

        let m = mesh.borrow();
        let values = m.data(data).unwrap().values().to_vec();
        // Only the fully-owned first edge contributes.
        assert_eq!(surface_integral(&m, &values, 1, true)[0], 1.0);
        assert_eq!(surface_integral(&m, &values, 1, false)[0], 2.0);
    }

    #[test]
    fn scaled_consistent_zero_output_integral_is_a_noop() {
        let in_mesh = Mesh::shared("InMesh", 2);
        let in_data;
        {
            let mut m = in_mesh.borrow_mut();
            let v1 = m.create_vertex(&[0.0, 0.0]);
            let v2 = m.create_vertex(&[1.0, 0.0]);
            m.create_edge(v1, v2);
            in_data = m.create_data("InData", 1);
            m.allocate_data_values();
            m.data_mut(in_data).unwrap().set_values(&[1.0, 1.0]);
        }

        // Output mesh without edges: its integral is zero.
        let out_mesh = Mesh::shared("OutMesh", 2);
        let out_data;
        {
            let mut m = out_mesh.borrow_mut();
            m.create_vertex(&[0.5, 0.0]);
            out_data = m.create_data("OutData", 1);
            m.allocate_data_values();
        }

        let settings =
            MappingSettings::builder(Constraint::ScaledConsistent, 2, gaussian(1.0)).build();
        let mut mapping = RadialBasisMapping::new(settings);
        mapping.set_meshes(in_mesh, Rc::clone(&out_mesh));
        mapping.compute_mapping().unwrap();
        mapping.map(in_data, out_data).unwrap();

        // The consistent result survives unscaled.
        let value = out_mesh.borrow().data(out_data).unwrap().values()[0];
        assert!((value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn map_requires_computed_mapping() {
        let (in_mesh, in_data) = square_input();
        let (out_mesh, out_data) = single_vertex_output(&[0.5, 0.5]);

        let settings = MappingSettings::builder(Constraint::Consistent, 2, tps()).build();
        let mut mapping = RadialBasisMapping::new(settings);
        mapping.set_meshes(in_mesh, out_mesh);

        assert!(matches!(
            mapping.map(in_data, out_data),
            Err(MappingError::Precondition { .. })
        ));
    }

    #[test]
    fn compute_requires_meshes() {
        let settings = MappingSettings::builder(Constraint::Consistent, 2, tps()).build();
        let mut mapping = RadialBasisMapping::new(settings);
        assert!(matches!(
            mapping.compute_mapping(),
            Err(MappingError::Precondition { .. })
        ));
    }

    #[test]
    fn map_rejects_value_dimension_mismatch() {
        let (in_mesh, in_data) = square_input();
        let out_mesh = Mesh::shared("OutMesh", 2);
        out_mesh.borrow_mut().create_vertex(&[0.5, 0.5]);
        let out_data = out_mesh.borrow_mut().create_data("OutData", 2);
        out_mesh.borrow_mut().allocate_data_values();

        let settings = MappingSettings::builder(Constraint::Consistent, 2, tps()).build();
        let mut mapping = RadialBasisMapping::new(settings);
        mapping.set_meshes(in_mesh, out_mesh);
        mapping.compute_mapping().unwrap();

        assert!(matches!(
            mapping.map(in_data, out_data),
            Err(MappingError::Precondition { .. })
        ));
    }

    #[test]
    fn clear_discards_the_operator() {
        let (in_mesh, in_data) = square_input();
        let (out_mesh, out_data) = single_vertex_output(&[0.5, 0.5]);

        let settings = MappingSettings::builder(Constraint::Consistent, 2, tps()).build();
        let mut mapping = RadialBasisMapping::new(settings);
        mapping.set_meshes(in_mesh, out_mesh);
        mapping.compute_mapping().unwrap();
        assert!(mapping.has_computed_mapping());

        mapping.clear();
        assert!(!mapping.has_computed_mapping());
        assert!(mapping.map(in_data, out_data).is_err());

        // Recompute restores the operator.
        mapping.compute_mapping().unwrap();
        assert!(mapping.has_computed_mapping());
    }

    #[test]
    fn numerical_failure_leaves_the_mapping_cleared() {
        let in_mesh = Mesh::shared("InMesh", 2);
        in_mesh.borrow_mut().create_vertex(&[0.0, 0.0]);
        in_mesh.borrow_mut().create_vertex(&[0.0, 0.0]);
        in_mesh.borrow_mut().create_data("InData", 1);
        in_mesh.borrow_mut().allocate_data_values();

        let (out_mesh, _) = single_vertex_output(&[0.5, 0.5]);

        let settings = MappingSettings::builder(Constraint::Consistent, 2, gaussian(2.0))
            .polynomial(Polynomial::Off)
            .build();
        let mut mapping = RadialBasisMapping::new(settings);
        mapping.set_meshes(in_mesh, out_mesh);

        assert!(matches!(
            mapping.compute_mapping(),
            Err(MappingError::Numerical { .. })
        ));
        assert!(!mapping.has_computed_mapping());
    }

    /// Eight input vertices on a 4 x 2 grid with values 1..8, one column of
    /// the output mesh per emulated rank. The input mesh is fully
    /// replicated, so each rank reproduces its own output slice exactly.
    #[test]
    fn replicated_input_mesh_reproduces_per_rank_outputs() {
        for rank in 0..4usize {
            let in_mesh = Mesh::shared("InMesh", 2);
            let in_data;
            {
                let mut m = in_mesh.borrow_mut();
                for i in 0..4 {
                    for j in 0..2 {
                        m.create_vertex(&[i as f64, j as f64]);
                    }
                }
                in_data = m.create_data("InData", 1);
                m.allocate_data_values();
                m.data_mut(in_data)
                    .unwrap()
                    .set_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
            }

            let out_mesh = Mesh::shared("OutMesh", 2);
            let out_data;
            {
                let mut m = out_mesh.borrow_mut();
                m.create_vertex(&[rank as f64, 0.0]);
                m.create_vertex(&[rank as f64, 1.0]);
                out_data = m.create_data("OutData", 1);
                m.allocate_data_values();
            }

            let settings =
                MappingSettings::builder(Constraint::Consistent, 2, gaussian(5.0)).build();
            let mut mapping = RadialBasisMapping::new(settings);
            mapping.set_meshes(in_mesh, Rc::clone(&out_mesh));
            mapping.compute_mapping().unwrap();
            mapping.map(in_data, out_data).unwrap();

            let out = out_mesh.borrow();
            let values = out.data(out_data).unwrap().values().to_vec();
            let expected = [(rank * 2 + 1) as f64, (rank * 2 + 2) as f64];
            assert!((values[0] - expected[0]).abs() < 1e-6);
            assert!((values[1] - expected[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn mapping_is_deterministic() {
        let run = || {
            let (in_mesh, in_data) = square_input();
            let (out_mesh, out_data) = single_vertex_output(&[0.3, 0.7]);
            let settings =
                MappingSettings::builder(Constraint::Consistent, 2, gaussian(2.0)).build();
            let mut mapping = RadialBasisMapping::new(settings);
            mapping.set_meshes(in_mesh, Rc::clone(&out_mesh));
            mapping.compute_mapping().unwrap();
            mapping.map(in_data, out_data).unwrap();
            let value = out_mesh.borrow().data(out_data).unwrap().values()[0];
            value
        };

        let first = run();
        let second = run();
        assert!(first == second, "outputs must be bitwise reproducible");
    }

    mod tagging {
        use super::*;

        /// Input vertices on the axes around a single output vertex at the
        /// origin; the Gaussian with shape 4.5 has an effective support of
        /// roughly one.
        fn tagging_setup(constraint: Constraint) -> (RadialBasisMapping, PtrMesh) {
            let near_far = Mesh::shared("InMesh", 2);
            {
                let mut m = near_far.borrow_mut();
                m.create_vertex(&[-1.0, 0.0]); // first round
                m.create_vertex(&[-2.0, 0.0]); // second round
                m.create_vertex(&[1.0, 0.0]); // first round
                m.create_vertex(&[2.0, 0.0]); // second round
                m.create_vertex(&[0.0, -1.0]); // first round
                m.create_vertex(&[0.0, -2.0]); // second round
                m.create_vertex(&[0.0, 1.0]); // first round
                m.create_vertex(&[0.0, 2.0]); // second round
            }

            let origin = Mesh::shared("OutMesh", 2);
            origin.borrow_mut().create_vertex(&[0.0, 0.0]);

            let settings = MappingSettings::builder(constraint, 2, gaussian(4.5)).build();
            let mut mapping = RadialBasisMapping::new(settings);
            match constraint {
                // The conservative adjoint tags the output side, so the
                // vertex cloud becomes the output mesh there.
                Constraint::Conservative => {
                    mapping.set_meshes(origin, Rc::clone(&near_far));
                }
                _ => {
                    mapping.set_meshes(Rc::clone(&near_far), origin);
                }
            }
            (mapping, near_far)
        }

        fn tagged_flags(mesh: &PtrMesh) -> Vec<bool> {
            mesh.borrow().vertices().iter().map(|v| v.is_tagged()).collect()
        }

        #[test]
        fn two_round_tagging_consistent() {
            let (mut mapping, cloud) = tagging_setup(Constraint::Consistent);

            mapping.tag_mesh_first_round().unwrap();
            assert_eq!(
                tagged_flags(&cloud),
                vec![true, false, true, false, true, false, true, false],
                "first round tags exactly the vertices within the support"
            );

            mapping.tag_mesh_second_round().unwrap();
            assert_eq!(
                tagged_flags(&cloud),
                vec![true; 8],
                "second round adds the vertices within twice the support"
            );
        }

        #[test]
        fn two_round_tagging_conservative_swaps_roles() {
            let (mut mapping, cloud) = tagging_setup(Constraint::Conservative);

            mapping.tag_mesh_first_round().unwrap();
            assert_eq!(
                tagged_flags(&cloud),
                vec![true, false, true, false, true, false, true, false]
            );

            mapping.tag_mesh_second_round().unwrap();
            assert_eq!(tagged_flags(&cloud), vec![true; 8]);
        }

        #[test]
        fn unbounded_kernel_tags_everything() {
            let cloud = Mesh::shared("InMesh", 2);
            cloud.borrow_mut().create_vertex(&[100.0, 100.0]);
            cloud.borrow_mut().create_vertex(&[-50.0, 0.0]);

            let origin = Mesh::shared("OutMesh", 2);
            origin.borrow_mut().create_vertex(&[0.0, 0.0]);

            let settings = MappingSettings::builder(Constraint::Consistent, 2, tps()).build();
            let mut mapping = RadialBasisMapping::new(settings);
            mapping.set_meshes(Rc::clone(&cloud), origin);

            mapping.tag_mesh_first_round().unwrap();
            assert_eq!(tagged_flags(&cloud), vec![true, true]);
        }

        #[test]
        fn support_override_narrows_tagging() {
            let cloud = Mesh::shared("InMesh", 2);
            cloud.borrow_mut().create_vertex(&[0.4, 0.0]);
            cloud.borrow_mut().create_vertex(&[1.5, 0.0]);

            let origin = Mesh::shared("OutMesh", 2);
            origin.borrow_mut().create_vertex(&[0.0, 0.0]);

            let settings = MappingSettings::builder(Constraint::Consistent, 2, tps())
                .support_radius_override(0.5)
                .build();
            let mut mapping = RadialBasisMapping::new(settings);
            mapping.set_meshes(Rc::clone(&cloud), origin);

            mapping.tag_mesh_first_round().unwrap();
            assert_eq!(tagged_flags(&cloud), vec![true, false]);
        }

        #[test]
        fn empty_other_mesh_tags_nothing() {
            let cloud = Mesh::shared("InMesh", 2);
            cloud.borrow_mut().create_vertex(&[0.0, 0.0]);

            let empty = Mesh::shared("OutMesh", 2);

            let settings =
                MappingSettings::builder(Constraint::Consistent, 2, gaussian(4.5)).build();
            let mut mapping = RadialBasisMapping::new(settings);
            mapping.set_meshes(Rc::clone(&cloud), empty);

            mapping.tag_mesh_first_round().unwrap();
            mapping.tag_mesh_second_round().unwrap();
            assert_eq!(tagged_flags(&cloud), vec![false]);
        }
    }
}
