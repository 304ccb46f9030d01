// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial index for tolerance-based vertex snapping.
//!
//! Uses a grid-based spatial hash for O(1) average-case nearest-vertex
//! queries. Wall endpoints that miss each other by less than the tolerance
//! are identified as the same node of the planar arrangement.

use nalgebra::Point2;
use rustc_hash::FxHashMap;

/// Vertex store with a square-cell grid over the plane.
///
/// Lookups check the 3x3 neighborhood of the query cell, so `cell_size`
/// must be >= the snapping tolerance.
#[derive(Debug)]
pub struct VertexIndex {
    cell_size: f64,
    tolerance: f64,
    grid: FxHashMap<(i64, i64), Vec<usize>>,
    vertices: Vec<Point2<f64>>,
}

impl VertexIndex {
    pub fn new(tolerance: f64) -> Self {
        let tolerance = tolerance.max(1e-12);
        Self {
            cell_size: tolerance,
            tolerance,
            grid: FxHashMap::default(),
            vertices: Vec::new(),
        }
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Index of a vertex within tolerance of `p`.
    pub fn find_near(&self, p: &Point2<f64>) -> Option<usize> {
        let (cx, cy) = self.cell_coords(p);
        let tol_sq = self.tolerance * self.tolerance;

        let mut best: Option<(usize, f64)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(ids) = self.grid.get(&(cx + dx, cy + dy)) {
                    for &id in ids {
                        let dist_sq = (self.vertices[id] - p).norm_squared();
                        let closer = best.map_or(true, |(_, d)| dist_sq < d);
                        if dist_sq <= tol_sq && closer {
                            best = Some((id, dist_sq));
                        }
                    }
                }
            }
        }

        best.map(|(id, _)| id)
    }

    /// Returns an existing vertex within tolerance of `p`, or adds a new one.
    pub fn find_or_insert(&mut self, p: Point2<f64>) -> usize {
        if let Some(existing) = self.find_near(&p) {
            return existing;
        }
        let id = self.vertices.len();
        self.vertices.push(p);
        let cell = self.cell_coords(&p);
        self.grid.entry(cell).or_default().push(id);
        id
    }

    fn cell_coords(&self, p: &Point2<f64>) -> (i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }
}
