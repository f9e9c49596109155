/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API and high-level documentation for mesh-to-mesh data mapping.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Radial basis function mesh mapping for distributed coupling.
//!
//! This crate maps scalar or vector data between two surface meshes via a
//! globally-defined radial basis function interpolant. It is the mapping core
//! of a partitioned multi-physics coupling: each participant holds its own
//! discretisation of the coupling surface, and data written on one mesh is
//! reconstructed at the vertices of the other.
//!
//! Three interpolation constraints are supported:
//!
//! - **consistent** - pointwise interpolation; preserves values where the
//!   meshes coincide,
//! - **conservative** - the transpose of a consistent operator; preserves the
//!   global sum of the coupled quantity,
//! - **scaled-consistent** - consistent interpolation followed by a global
//!   rescale that equates the surface integrals of the input and output
//!   fields.
//!
//! The interpolation operator is either a dense factorization of the full
//! kernel system (Cholesky for strictly positive definite kernels, pivoted QR
//! with optional polynomial augmentation otherwise) or a reduced operator
//! built by greedy center selection. A nearest-neighbor mapper over a spatial
//! R-tree is provided as a cheap reference.
//!
//! In a distributed run, a designated primary rank gathers the owned data
//! slices of all worker ranks into a globally-indexed buffer, exchanges it
//! with the peer participant, and scatters the per-rank slices back; see
//! [`GatherScatterDistributor`]. A two-round vertex tagging protocol prunes
//! remote vertices that cannot influence the local mesh given the kernel's
//! effective support.
//!
//! # Example
//!
//! ```
//! use ferreus_mapping::{
//!     Constraint, Mapping, MappingSettings, Mesh, RadialBasisMapping,
//! };
//! use ferreus_mapping_utils::{KernelParams, KernelType};
//!
//! // Unit square input mesh with a scalar field.
//! let in_mesh = Mesh::shared("InMesh", 2);
//! let in_data = {
//!     let mut m = in_mesh.borrow_mut();
//!     m.create_vertex(&[0.0, 0.0]);
//!     m.create_vertex(&[1.0, 0.0]);
//!     m.create_vertex(&[1.0, 1.0]);
//!     m.create_vertex(&[0.0, 1.0]);
//!     let data = m.create_data("InData", 1);
//!     m.allocate_data_values();
//!     m.data_mut(data).unwrap().set_values(&[1.0, 2.0, 2.0, 1.0]);
//!     data
//! };
//!
//! // Output mesh with a single vertex at the center.
//! let out_mesh = Mesh::shared("OutMesh", 2);
//! let out_data = {
//!     let mut m = out_mesh.borrow_mut();
//!     m.create_vertex(&[0.5, 0.5]);
//!     let data = m.create_data("OutData", 1);
//!     m.allocate_data_values();
//!     data
//! };
//!
//! let kernel = KernelParams::builder(KernelType::ThinPlateSpline).build();
//! let settings = MappingSettings::builder(Constraint::Consistent, 2, kernel).build();
//!
//! let mut mapping = RadialBasisMapping::new(settings);
//! mapping.set_meshes(in_mesh, out_mesh.clone());
//! mapping.compute_mapping().unwrap();
//! mapping.map(in_data, out_data).unwrap();
//!
//! let value = out_mesh.borrow().data(out_data).unwrap().values()[0];
//! assert!((value - 1.5).abs() < 1e-7);
//! ```

pub mod progress;

mod common;

mod distribution;

mod error;

mod mapping;

mod mapping_config;

mod mesh;

mod nearest_neighbor;

mod pgreedy;

mod polynomials;

mod rbf_solver;

mod rtree;

pub use {
    common::generate_random_points,
    distribution::{
        Collective, GatherScatterDistributor, RankContext, SerialCollective, Transport,
        PRIMARY_RANK,
    },
    error::{MappingError, TransportError},
    mapping::{Mapping, RadialBasisMapping, RadialBasisMappingBuilder},
    mapping_config::{Constraint, MappingSettings, MappingSettingsBuilder, Polynomial, RbfSolverKind},
    mesh::{BoundingBox, DataField, DataId, Edge, Mesh, PtrMesh, Triangle, Vertex, VertexId},
    nearest_neighbor::NearestNeighborMapping,
};
