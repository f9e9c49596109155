/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines the error types reported by mappings and the data distributor.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use std::error::Error;
use std::fmt;

/// Failure of a blocking transport primitive.
///
/// Surfaced by the gather-scatter distributor; the enclosing solve must be
/// retried from `compute_mapping`.
#[derive(Debug)]
pub struct TransportError {
    /// Rank of the peer the exchange was directed at.
    pub peer: usize,

    /// Human-readable description from the transport layer.
    pub reason: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport exchange with rank {} failed: {}", self.peer, self.reason)
    }
}

impl Error for TransportError {}

/// Errors reported by mapping operations.
///
/// Mappings are deterministic given their inputs; nothing is recovered
/// locally. A `Numerical` failure leaves the mapping cleared, a
/// `Precondition` failure leaves it untouched.
#[derive(Debug)]
pub enum MappingError {
    /// Incompatible combination of mesh dimension, kernel, polynomial mode,
    /// constraint, or solver kind.
    Configuration { detail: String },

    /// An operation was called outside its contract, e.g. `map` before
    /// `compute_mapping` or mismatched value dimensions.
    Precondition { detail: String },

    /// Singular or near-singular factorization, typically caused by
    /// coincident input vertices under the active-axis metric.
    Numerical { mesh: String, detail: String },

    /// Failure surfaced from the transport layer.
    Transport { source: TransportError },
}

impl MappingError {
    pub(crate) fn configuration(detail: impl Into<String>) -> Self {
        MappingError::Configuration { detail: detail.into() }
    }

    pub(crate) fn precondition(detail: impl Into<String>) -> Self {
        MappingError::Precondition { detail: detail.into() }
    }

    pub(crate) fn numerical(mesh: impl Into<String>, detail: impl Into<String>) -> Self {
        MappingError::Numerical {
            mesh: mesh.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingError::Configuration { detail } => {
                write!(f, "invalid mapping configuration: {}", detail)
            }
            MappingError::Precondition { detail } => {
                write!(f, "mapping precondition violated: {}", detail)
            }
            MappingError::Numerical { mesh, detail } => {
                write!(f, "numerical failure on mesh {:?}: {}", mesh, detail)
            }
            MappingError::Transport { source } => write!(f, "{}", source),
        }
    }
}

impl Error for MappingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MappingError::Transport { source } => Some(source),
            _ => None,
        }
    }
}

impl From<TransportError> for MappingError {
    fn from(source: TransportError) -> Self {
        MappingError::Transport { source }
    }
}
