/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the gather-scatter data distribution between the primary rank and its workers.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # distribution
//!
//! The primary rank holds the authoritative, globally-indexed view of a
//! mesh's data values; worker ranks hold only their owned slices. On the send
//! path the primary gathers every rank's slice into a global buffer (summing
//! contributions at shared global indices) and forwards it to the peer
//! participant. On the receive path it accepts the global buffer from the
//! peer and scatters the per-rank slices back.
//!
//! The accumulation on the send path is deliberate: conservative coupling can
//! list one global vertex in several ranks' distributions. Consistent
//! couplings should arrange the distribution so that at most one rank owns
//! each global index, which also makes the exchange bitwise reproducible.

use crate::error::{MappingError, TransportError};
use crate::mesh::Mesh;

/// Rank of the primary process within a participant.
pub const PRIMARY_RANK: usize = 0;

/// Explicit description of the process layout of one participant.
///
/// Passed to the distributor and the scaled-consistent reducer rather than
/// being global state.
#[derive(Debug, Clone, Copy)]
pub struct RankContext {
    /// This process's rank within the participant.
    pub rank: usize,

    /// Number of ranks in the participant.
    pub size: usize,
}

impl RankContext {
    /// Context of a single-process participant.
    pub fn serial() -> Self {
        Self { rank: 0, size: 1 }
    }

    pub fn new(rank: usize, size: usize) -> Self {
        assert!(rank < size, "rank must be smaller than the participant size");
        Self { rank, size }
    }

    /// Whether this process gathers and scatters for the participant.
    pub fn is_primary(&self) -> bool {
        self.rank == PRIMARY_RANK
    }
}

/// Reliable typed channel for floating-point arrays.
///
/// Both primitives block until the peer has matched the exchange.
pub trait Transport {
    fn send(&self, buffer: &[f64], peer: usize) -> Result<(), TransportError>;
    fn receive(&self, buffer: &mut [f64], peer: usize) -> Result<(), TransportError>;
}

/// Collective reduction across the ranks of one participant.
pub trait Collective {
    /// Element-wise sum of `local` over all ranks, written to `global` on
    /// every rank.
    fn allreduce_sum(&self, local: &[f64], global: &mut [f64]) -> Result<(), TransportError>;
}

/// Collective for a single-process participant: the local contribution is
/// the global result.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialCollective;

impl Collective for SerialCollective {
    fn allreduce_sum(&self, local: &[f64], global: &mut [f64]) -> Result<(), TransportError> {
        global.copy_from_slice(local);
        Ok(())
    }
}

/// Gather-scatter exchange of mesh data values with the peer participant.
pub struct GatherScatterDistributor<'a> {
    context: RankContext,

    /// Channel between the primary and the workers of this participant.
    intra: &'a dyn Transport,

    /// Channel between this participant's primary and the peer participant's
    /// primary.
    peer: &'a dyn Transport,
}

impl<'a> GatherScatterDistributor<'a> {
    pub fn new(context: RankContext, intra: &'a dyn Transport, peer: &'a dyn Transport) -> Self {
        Self { context, intra, peer }
    }

    /// Gathers the local slices of all ranks into a globally-indexed buffer
    /// on the primary and forwards it to the peer participant.
    ///
    /// `items` is this rank's slice, ordered like its entry of the vertex
    /// distribution, `value_dimension` components per vertex.
    pub fn send(
        &self,
        items: &[f64],
        value_dimension: usize,
        mesh: &Mesh,
    ) -> Result<(), MappingError> {
        if !self.context.is_primary() {
            if !items.is_empty() {
                self.intra.send(items, PRIMARY_RANK)?;
            }
            return Ok(());
        }

        let distribution = mesh.vertex_distribution();
        assert_eq!(
            distribution.len(),
            self.context.size,
            "vertex distribution must list every rank"
        );

        let global_size = mesh.global_vertex_count() * value_dimension;
        let mut global_items = vec![0.0; global_size];

        // Primary's own contribution.
        accumulate_slice(&mut global_items, items, &distribution[PRIMARY_RANK], value_dimension);

        // Worker contributions, accumulated at their global positions.
        for rank in 1..self.context.size {
            let slice_size = distribution[rank].len() * value_dimension;
            if slice_size == 0 {
                continue;
            }
            let mut worker_items = vec![0.0; slice_size];
            self.intra.receive(&mut worker_items, rank)?;
            accumulate_slice(&mut global_items, &worker_items, &distribution[rank], value_dimension);
        }

        self.peer.send(&global_items, PRIMARY_RANK)?;
        Ok(())
    }

    /// Receives the globally-indexed buffer from the peer participant on the
    /// primary and scatters each rank's slice back.
    pub fn receive(
        &self,
        items: &mut [f64],
        value_dimension: usize,
        mesh: &Mesh,
    ) -> Result<(), MappingError> {
        if !self.context.is_primary() {
            if !items.is_empty() {
                self.intra.receive(items, PRIMARY_RANK)?;
            }
            return Ok(());
        }

        let distribution = mesh.vertex_distribution();
        assert_eq!(
            distribution.len(),
            self.context.size,
            "vertex distribution must list every rank"
        );

        let global_size = mesh.global_vertex_count() * value_dimension;
        let mut global_items = vec![0.0; global_size];
        self.peer.receive(&mut global_items, PRIMARY_RANK)?;

        // Primary's own slice.
        extract_slice(&global_items, items, &distribution[PRIMARY_RANK], value_dimension);

        // Worker slices.
        for rank in 1..self.context.size {
            let slice_size = distribution[rank].len() * value_dimension;
            if slice_size == 0 {
                continue;
            }
            let mut worker_items = vec![0.0; slice_size];
            extract_slice(&global_items, &mut worker_items, &distribution[rank], value_dimension);
            self.intra.send(&worker_items, rank)?;
        }

        Ok(())
    }
}

/// Adds a rank's slice into the global buffer at its global indices.
fn accumulate_slice(
    global: &mut [f64],
    slice: &[f64],
    global_indices: &[usize],
    value_dimension: usize,
) {
    assert_eq!(slice.len(), global_indices.len() * value_dimension);
    for (i, &global_index) in global_indices.iter().enumerate() {
        for d in 0..value_dimension {
            global[global_index * value_dimension + d] += slice[i * value_dimension + d];
        }
    }
}

/// Copies a rank's slice out of the global buffer.
fn extract_slice(
    global: &[f64],
    slice: &mut [f64],
    global_indices: &[usize],
    value_dimension: usize,
) {
    assert_eq!(slice.len(), global_indices.len() * value_dimension);
    for (i, &global_index) in global_indices.iter().enumerate() {
        for d in 0..value_dimension {
            slice[i * value_dimension + d] = global[global_index * value_dimension + d];
        }
    }
}
