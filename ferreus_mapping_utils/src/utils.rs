/////////////////////////////////////////////////////////////////////////////////////////////
//
// Supplies matrix selection helpers, distance routines, and the kernel registry dispatch.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{BasisFunction, KernelFromParams, KernelParams};
use faer::{Mat, RowRef};
use serde::{Deserialize, Serialize};

/// Returns an owned `Mat<T>` from a subset of row indices.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use ferreus_mapping_utils::select_mat_rows;
///
/// let matrix = mat![
///     [0.0, 1.0],
///     [1.0, 1.0],
///     [2.0, 2.0],
///     [3.0, 3.0f64],
/// ];
///
/// let wanted_rows = vec![0usize, 2];
///
/// let sub_matrix = select_mat_rows(&matrix, &wanted_rows);
///
/// assert_eq!(
///     sub_matrix,
///     mat![
///         [0.0, 1.0],
///         [2.0, 2.0f64],
///     ]
/// );
/// ```
#[inline(always)]
pub fn select_mat_rows<T>(existing_mat: &Mat<T>, row_indices: &Vec<usize>) -> Mat<T>
where
    T: Clone,
{
    Mat::from_fn(row_indices.len(), existing_mat.ncols(), |i, j| {
        existing_mat.get(row_indices[i], j).clone()
    })
}

/// Returns an owned `Mat<T>` from a subset of column indices.
///
/// Used to project coordinate matrices onto their active axes by dropping
/// dead-axis columns.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use ferreus_mapping_utils::select_mat_columns;
///
/// let matrix = mat![
///     [0.0, 1.0, 2.0],
///     [3.0, 4.0, 5.0f64],
/// ];
///
/// let wanted_columns = vec![0usize, 2];
///
/// let sub_matrix = select_mat_columns(&matrix, &wanted_columns);
///
/// assert_eq!(
///     sub_matrix,
///     mat![
///         [0.0, 2.0],
///         [3.0, 5.0f64],
///     ]
/// );
/// ```
#[inline(always)]
pub fn select_mat_columns<T>(existing_mat: &Mat<T>, column_indices: &Vec<usize>) -> Mat<T>
where
    T: Clone,
{
    Mat::from_fn(existing_mat.nrows(), column_indices.len(), |i, j| {
        existing_mat.get(i, column_indices[j]).clone()
    })
}

/// Returns the index of the maximum value in a slice, skipping masked entries.
///
/// Entries whose `mask` value is `true` are ignored. Returns `None` when
/// every entry is masked or the slice is empty.
#[inline(always)]
pub fn argmax(data: &[f64], mask: &[bool]) -> Option<usize> {
    let mut max_index = None;
    let mut max_value = f64::NEG_INFINITY;

    for (idx, &value) in data.iter().enumerate() {
        if mask[idx] {
            continue;
        }
        if value > max_value {
            max_value = value;
            max_index = Some(idx);
        }
    }

    max_index
}

/// Computes the axis aligned bounding box (AABB) extents of a matrix of points.
///
/// Returns a flat vector containing the minimum and maximum values along each
/// column (dimension) of the input matrix, arranged as:
///
/// `[min_0, min_1, ..., min_n, max_0, max_1, ..., max_n]`
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use ferreus_mapping_utils::get_pointarray_extents;
///
/// let points = mat![
///     [1.0, 2.0],
///     [3.0, -1.0],
///     [0.5, 4.0f64]
/// ];
/// let extents = get_pointarray_extents(&points);
/// assert_eq!(extents, vec![0.5, -1.0, 3.0, 4.0]);
/// ```
#[inline(always)]
pub fn get_pointarray_extents<T>(points: &Mat<T>) -> Vec<T>
where
    T: PartialOrd + Clone,
{
    let ncols = points.shape().1;

    let mut extents: Vec<T> = vec![points.get(0, 0).clone(); 2 * ncols];

    for col in 0..ncols {
        extents[col] = points.get(0, col).clone();
        extents[col + ncols] = points.get(0, col).clone();
    }

    for row in points.row_iter() {
        for (col, item) in row.iter().enumerate() {
            if item < &extents[col] {
                extents[col] = item.clone();
            }
            if item > &extents[col + ncols] {
                extents[col + ncols] = item.clone();
            }
        }
    }

    extents
}

/// Calculates the euclidean distance between two points.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use ferreus_mapping_utils::get_distance;
///
/// let points = mat![
///     [1.0, 2.0],
///     [4.0, 6.0],
/// ];
///
/// let target = points.row(0);
/// let source = points.row(1);
///
/// let dist = get_distance(target, source);
///
/// assert_eq!(dist, 5.0);
/// ```
#[inline(always)]
pub fn get_distance(target: RowRef<f64>, source: RowRef<f64>) -> f64 {
    let mut dist = 0.0;
    for (t, s) in target.iter().zip(source.iter()) {
        let diff = t - s;
        dist += diff * diff;
    }
    dist.sqrt()
}

/// Builds a dense kernel matrix using a typed kernel.
#[inline(always)]
pub fn build_kernel_matrix_typed<K>(
    target_points: &Mat<f64>,
    source_points: &Mat<f64>,
    kernel: &K,
) -> Mat<f64>
where
    K: BasisFunction,
{
    let m = target_points.nrows();
    let n = source_points.nrows();

    let mut a_matrix = Mat::<f64>::zeros(m, n);

    for j in 0..n {
        let source = source_points.row(j);

        for i in 0..m {
            let target = target_points.row(i);

            a_matrix[(i, j)] = kernel.evaluate(get_distance(target, source));
        }
    }

    a_matrix
}

/// Builds a symmetric kernel matrix using a typed kernel, evaluating each
/// pair once and writing both triangles.
#[inline(always)]
pub fn build_kernel_matrix_symmetric_typed<K>(points: &Mat<f64>, kernel: &K) -> Mat<f64>
where
    K: BasisFunction,
{
    let n = points.nrows();

    let mut a_matrix = Mat::<f64>::zeros(n, n);

    for j in 0..n {
        let source = points.row(j);

        for i in j..n {
            let target = points.row(i);
            let k_val = kernel.evaluate(get_distance(target, source));

            a_matrix[(i, j)] = k_val;
            a_matrix[(j, i)] = k_val;
        }
    }

    a_matrix
}

// K-free dispatchers generated from the kernel registry below.
// Assumes each kernel type implements `KernelFromParams::from_params(&KernelParams) -> K`
// and the `BasisFunction` capability trait.
macro_rules! for_each_kernel {
    ( registry = [ $( ($V:ident, $Kty:path) ),* $(,)? ] ) => {

        /// Runtime kernel selector built from the kernel registry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum KernelType {
            $( $V, )*
        }

        /// Evaluates the selected kernel function at distance `r`.
        #[inline(always)]
        pub fn kernel_phi(r: f64, params: &KernelParams) -> f64 {
            match params.kernel_type {
                $(
                    KernelType::$V => {
                        let k = <$Kty as KernelFromParams>::from_params(params);
                        k.evaluate(r)
                    }
                ),*
            }
        }

        /// Whether the selected kernel is strictly positive definite.
        #[inline(always)]
        pub fn is_strictly_positive_definite(params: &KernelParams) -> bool {
            match params.kernel_type {
                $(
                    KernelType::$V => {
                        let k = <$Kty as KernelFromParams>::from_params(params);
                        k.is_strictly_positive_definite()
                    }
                ),*
            }
        }

        /// The effective support radius of the selected kernel, if any.
        #[inline(always)]
        pub fn kernel_support_radius(params: &KernelParams) -> Option<f64> {
            match params.kernel_type {
                $(
                    KernelType::$V => {
                        let k = <$Kty as KernelFromParams>::from_params(params);
                        k.support_radius()
                    }
                ),*
            }
        }

        /// Builds a dense rectangular kernel matrix for the selected kernel,
        /// with entries `phi(||target_i - source_j||)`.
        #[inline(always)]
        pub fn build_kernel_matrix(
            target_points: &Mat<f64>,
            source_points: &Mat<f64>,
            params: &KernelParams,
        ) -> Mat<f64> {
            match params.kernel_type {
                $(
                    KernelType::$V => {
                        let k = <$Kty as KernelFromParams>::from_params(params);
                        build_kernel_matrix_typed(target_points, source_points, &k)
                    }
                ),*
            }
        }

        /// Builds the symmetric kernel matrix over a single point set.
        #[inline(always)]
        pub fn build_kernel_matrix_symmetric(
            points: &Mat<f64>,
            params: &KernelParams,
        ) -> Mat<f64> {
            match params.kernel_type {
                $(
                    KernelType::$V => {
                        let k = <$Kty as KernelFromParams>::from_params(params);
                        build_kernel_matrix_symmetric_typed(points, &k)
                    }
                ),*
            }
        }
    };
}

for_each_kernel! {
    registry = [
        (Gaussian,                 crate::kernels::GaussianKernel),
        (ThinPlateSpline,          crate::kernels::ThinPlateSplineKernel),
        (Multiquadric,             crate::kernels::MultiquadricKernel),
        (InverseMultiquadric,      crate::kernels::InverseMultiquadricKernel),
        (VolumeSpline,             crate::kernels::VolumeSplineKernel),
        (CompactThinPlateSplineC2, crate::kernels::CompactThinPlateSplineC2Kernel),
        (CompactPolynomialC0,      crate::kernels::CompactPolynomialC0Kernel),
        (CompactPolynomialC6,      crate::kernels::CompactPolynomialC6Kernel),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use faer::{mat, utils::approx::*};

    #[test]
    fn argmax_skips_masked_entries() {
        let data = [1.0, 5.0, 3.0];
        assert!(argmax(&data, &[false, false, false]) == Some(1));
        assert!(argmax(&data, &[false, true, false]) == Some(2));
        assert!(argmax(&data, &[true, true, true]) == None);
    }

    #[test]
    fn symmetric_matrix_matches_rectangular() {
        let points = mat![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0f64],
        ];
        let params = KernelParams::builder(KernelType::Gaussian)
            .shape_parameter(2.0)
            .build();

        let sym = build_kernel_matrix_symmetric(&points, &params);
        let rect = build_kernel_matrix(&points, &points, &params);

        let approx_eq = CwiseMat(ApproxEq::eps() * 16.0);
        assert!(&sym ~ &rect);
    }

    #[test]
    fn kernel_phi_dispatches_per_type() {
        let gauss = KernelParams::builder(KernelType::Gaussian)
            .shape_parameter(1.0)
            .build();
        assert!(kernel_phi(0.0, &gauss) == 1.0);

        let volume = KernelParams::builder(KernelType::VolumeSpline).build();
        assert!(kernel_phi(2.5, &volume) == 2.5);

        let compact = KernelParams::builder(KernelType::CompactPolynomialC0)
            .support_radius(2.0)
            .build();
        assert!(kernel_phi(3.0, &compact) == 0.0);
    }

    #[test]
    fn support_radius_dispatch() {
        let tps = KernelParams::builder(KernelType::ThinPlateSpline).build();
        assert!(kernel_support_radius(&tps) == None);
        assert!(!is_strictly_positive_definite(&tps));

        let compact = KernelParams::builder(KernelType::CompactPolynomialC6)
            .support_radius(1.2)
            .build();
        assert!(kernel_support_radius(&compact) == Some(1.2));
        assert!(is_strictly_positive_definite(&compact));
    }
}
