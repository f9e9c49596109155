/////////////////////////////////////////////////////////////////////////////////////////////
//
// Wraps the `rstar` crate to build spatial R-trees for nearest-vertex queries.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # rtree
//!
//! Wrapper module for the rstar crate.
//!
//! Builds an R-tree over vertex coordinates and answers nearest-vertex
//! queries, dispatching on the spatial dimension of the mesh.

use rstar::primitives::GeomWithData;
use rstar::RTree;

type Point2 = GeomWithData<[f64; 2], usize>;
type Point3 = GeomWithData<[f64; 3], usize>;

pub(crate) enum NdPointTree {
    D2(RTree<Point2>),
    D3(RTree<Point3>),
}

impl NdPointTree {
    /// Bulk-loads an R-tree from `(index, coords)` pairs. Coordinates are
    /// zero-padded to three components; only the leading `dimensions` are
    /// used.
    pub fn build<'a, I>(dimensions: usize, items: I) -> NdPointTree
    where
        I: IntoIterator<Item = (usize, &'a [f64; 3])>,
    {
        match dimensions {
            2 => {
                let points = items
                    .into_iter()
                    .map(|(idx, c)| GeomWithData::new([c[0], c[1]], idx))
                    .collect::<Vec<_>>();
                NdPointTree::D2(RTree::bulk_load(points))
            }
            3 => {
                let points = items
                    .into_iter()
                    .map(|(idx, c)| GeomWithData::new([c[0], c[1], c[2]], idx))
                    .collect::<Vec<_>>();
                NdPointTree::D3(RTree::bulk_load(points))
            }
            _ => panic!("Unsupported dimensions for NdPointTree"),
        }
    }

    /// Returns the index of the vertex closest to `query`, or `None` for an
    /// empty tree.
    pub fn nearest(&self, query: &[f64; 3]) -> Option<usize> {
        match self {
            NdPointTree::D2(tree) => tree
                .nearest_neighbor(&[query[0], query[1]])
                .map(|item| item.data),
            NdPointTree::D3(tree) => tree
                .nearest_neighbor(&[query[0], query[1], query[2]])
                .map(|item| item.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_in_2d() {
        let coords = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
        ];
        let tree = NdPointTree::build(2, coords.iter().enumerate());

        assert_eq!(tree.nearest(&[0.1, 0.1, 0.0]), Some(0));
        assert_eq!(tree.nearest(&[0.9, -0.2, 0.0]), Some(1));
        assert_eq!(tree.nearest(&[0.2, 1.5, 0.0]), Some(2));
    }

    #[test]
    fn nearest_in_3d() {
        let coords = [
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let tree = NdPointTree::build(3, coords.iter().enumerate());

        assert_eq!(tree.nearest(&[0.0, 0.0, 0.8]), Some(1));
        assert_eq!(tree.nearest(&[0.1, 0.1, 0.1]), Some(0));
    }

    #[test]
    fn empty_tree_has_no_nearest() {
        let tree = NdPointTree::build(2, std::iter::empty());
        assert_eq!(tree.nearest(&[0.0, 0.0, 0.0]), None);
    }
}
