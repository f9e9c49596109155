/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines shared numeric constants for the kernel catalog.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

/// Relative threshold below which a decaying kernel's contribution is treated
/// as zero. Used to derive the effective support radius of the Gaussian.
pub const DECAY_CUTOFF_THRESHOLD: f64 = 1E-9;
