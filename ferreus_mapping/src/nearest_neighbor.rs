/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the nearest-neighbor reference mapping over a spatial R-tree index.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # nearest_neighbor
//!
//! Reference mapper that precomputes, per local vertex, the index of the
//! closest vertex of the opposite mesh. Consistent application is a gather,
//! conservative application a scatter-accumulate. Tagging marks exactly the
//! vertices whose ids appear in the precomputed index list, since only those
//! can affect or be affected by the mapping.

use crate::{
    distribution::{Collective, SerialCollective},
    error::MappingError,
    mapping::{scale_consistent_output, Mapping},
    mapping_config::Constraint,
    mesh::{DataId, PtrMesh},
    rtree::NdPointTree,
};
use std::collections::HashSet;
use std::rc::Rc;

/// Mapping that copies each value from its nearest vertex.
pub struct NearestNeighborMapping {
    constraint: Constraint,
    dimensions: usize,
    input: Option<PtrMesh>,
    output: Option<PtrMesh>,

    /// Per consistent output vertex (resp. conservative input vertex), the
    /// id of the closest vertex in the opposite mesh.
    vertex_indices: Vec<usize>,

    has_computed: bool,
    collective: Rc<dyn Collective>,
}

impl NearestNeighborMapping {
    pub fn new(constraint: Constraint, dimensions: usize) -> Self {
        Self::with_collective(constraint, dimensions, Rc::new(SerialCollective))
    }

    /// Creates a mapping with an explicit collective for the
    /// scaled-consistent reduction.
    pub fn with_collective(
        constraint: Constraint,
        dimensions: usize,
        collective: Rc<dyn Collective>,
    ) -> Self {
        assert!(
            (2..=3).contains(&dimensions),
            "Unsupported number of dimensions: {}",
            dimensions
        );
        Self {
            constraint,
            dimensions,
            input: None,
            output: None,
            vertex_indices: Vec::new(),
            has_computed: false,
            collective,
        }
    }

    fn meshes(&self) -> Result<(PtrMesh, PtrMesh), MappingError> {
        match (&self.input, &self.output) {
            (Some(input), Some(output)) => Ok((Rc::clone(input), Rc::clone(output))),
            _ => Err(MappingError::precondition(
                "meshes must be set before using the mapping",
            )),
        }
    }

    /// The mesh whose vertices are looked up (queried against the index of
    /// the other mesh).
    fn query_roles(&self) -> Result<(PtrMesh, PtrMesh), MappingError> {
        let (input, output) = self.meshes()?;
        match self.constraint {
            Constraint::Conservative => Ok((input, output)),
            _ => Ok((output, input)),
        }
    }
}

impl Mapping for NearestNeighborMapping {
    fn set_meshes(&mut self, input: PtrMesh, output: PtrMesh) {
        self.input = Some(input);
        self.output = Some(output);
    }

    fn constraint(&self) -> Constraint {
        self.constraint
    }

    fn compute_mapping(&mut self) -> Result<(), MappingError> {
        let (query, indexed) = self.query_roles()?;
        let indexed_mesh = indexed.borrow();
        let query_mesh = query.borrow();

        if indexed_mesh.vertices().is_empty() {
            return Err(MappingError::precondition(format!(
                "cannot search for nearest vertices in the empty mesh {:?}",
                indexed_mesh.name()
            )));
        }

        let tree = NdPointTree::build(
            self.dimensions,
            indexed_mesh.vertices().iter().map(|v| (v.id(), v.coords())),
        );

        self.vertex_indices = query_mesh
            .vertices()
            .iter()
            .map(|v| tree.nearest(v.coords()).unwrap())
            .collect();

        self.has_computed = true;
        Ok(())
    }

    fn has_computed_mapping(&self) -> bool {
        self.has_computed
    }

    fn map(&mut self, input_data: DataId, output_data: DataId) -> Result<(), MappingError> {
        if !self.has_computed {
            return Err(MappingError::precondition("map called before compute_mapping"));
        }

        let (input, output) = self.meshes()?;

        {
            let in_mesh = input.borrow();
            let mut out_mesh = output.borrow_mut();

            let in_field = in_mesh.data(input_data).ok_or_else(|| {
                MappingError::precondition(format!("unknown input data id {}", input_data))
            })?;
            let value_dimensions = in_field.dimensions();
            let in_values = in_field.values().to_vec();

            let out_mesh_vertex_count = out_mesh.vertices().len();
            let out_field = out_mesh.data_mut(output_data).ok_or_else(|| {
                MappingError::precondition(format!("unknown output data id {}", output_data))
            })?;
            if out_field.dimensions() != value_dimensions {
                return Err(MappingError::precondition(format!(
                    "value dimensions differ: input {} vs output {}",
                    value_dimensions,
                    out_field.dimensions()
                )));
            }

            if in_values.len() != in_mesh.vertices().len() * value_dimensions {
                return Err(MappingError::precondition(
                    "input field size does not match the input mesh",
                ));
            }
            if out_field.values().len() != out_mesh_vertex_count * value_dimensions {
                return Err(MappingError::precondition(
                    "output field size does not match the output mesh",
                ));
            }

            let out_values = out_field.values_mut();
            match self.constraint {
                Constraint::Consistent | Constraint::ScaledConsistent => {
                    for (i, &input_index) in self.vertex_indices.iter().enumerate() {
                        for dim in 0..value_dimensions {
                            out_values[i * value_dimensions + dim] =
                                in_values[input_index * value_dimensions + dim];
                        }
                    }
                }
                Constraint::Conservative => {
                    out_values.fill(0.0);
                    for (i, &output_index) in self.vertex_indices.iter().enumerate() {
                        for dim in 0..value_dimensions {
                            out_values[output_index * value_dimensions + dim] +=
                                in_values[i * value_dimensions + dim];
                        }
                    }
                }
            }
        }

        if self.constraint == Constraint::ScaledConsistent {
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
        self.vertex_indices.clear();
        self.has_computed = false;
    }

    fn tag_mesh_first_round(&mut self) -> Result<(), MappingError> {
        self.compute_mapping()?;

        // Only vertices referenced by the precomputed index list can take
        // part in the mapping.
        let (_, indexed) = self.query_roles()?;
        let referenced: HashSet<usize> = self.vertex_indices.iter().cloned().collect();
        for vertex in indexed.borrow_mut().vertices_mut() {
            if referenced.contains(&vertex.id()) {
                vertex.tag();
            }
        }

        self.clear();
        Ok(())
    }

    fn tag_mesh_second_round(&mut self) -> Result<(), MappingError> {
        // No second layer needed for nearest-neighbor mappings.
        Ok(())
    }
}
