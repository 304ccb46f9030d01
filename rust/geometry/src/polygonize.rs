// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar polygonization of line work
//!
//! Builds the planar arrangement of a set of segments and returns its bounded
//! faces. Used to recover rooms from wall lines when a drawing has no room
//! outlines.
//!
//! 1. Every segment is split at every point where another segment crosses
//!    or touches it.
//! 2. Endpoints closer than the snapping tolerance are merged.
//! 3. Dangling edges are pruned repeatedly, they cannot bound a face.
//! 4. Faces are traced on the half-edge structure: leaving a vertex, always
//!    take the next edge clockwise from the one we arrived on. Bounded faces
//!    come out counter-clockwise, the outer face of each connected component
//!    comes out clockwise.
//! 5. Clockwise rings nested inside a bounded face are its holes.

use std::collections::{BTreeSet, VecDeque};

use nalgebra::Point2;
use rustc_hash::FxHashSet;

use crate::bool2d::{compute_signed_area, point_in_contour};
use crate::error::{Error, Result};
use crate::primitives::{Crossing, Segment, EPSILON_2D};
use crate::spatial::VertexIndex;

/// A bounded face of the arrangement
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarFace {
    /// Counter-clockwise outer ring
    pub exterior: Vec<Point2<f64>>,
    /// Clockwise rings of nested components
    pub holes: Vec<Vec<Point2<f64>>>,
    /// Exterior area minus hole areas
    pub area: f64,
}

/// Polygonize `segments`, merging vertices closer than `snap_tolerance`.
pub fn polygonize(segments: &[Segment], snap_tolerance: f64) -> Result<Vec<PlanarFace>> {
    if !snap_tolerance.is_finite() || snap_tolerance <= 0.0 {
        return Err(Error::InvalidTolerance(snap_tolerance));
    }
    if segments.iter().any(|s| !s.is_finite()) {
        return Err(Error::NonFinite("segment"));
    }

    let segments: Vec<Segment> = segments
        .iter()
        .copied()
        .filter(|s| s.length() > snap_tolerance)
        .collect();
    if segments.len() < 3 {
        return Ok(Vec::new());
    }

    let (vertices, edges) = build_arrangement(&segments, snap_tolerance);
    let adjacency = prune_dangles(vertices.len(), &edges);
    let rings = trace_faces(&vertices, &adjacency);

    let mut faces: Vec<PlanarFace> = Vec::new();
    let mut clockwise: Vec<Vec<Point2<f64>>> = Vec::new();
    for ring in rings {
        let area = compute_signed_area(&ring);
        if area > EPSILON_2D {
            faces.push(PlanarFace {
                exterior: ring,
                holes: Vec::new(),
                area,
            });
        } else if area < -EPSILON_2D {
            clockwise.push(ring);
        }
    }

    // A clockwise ring inside a bounded face is the outline of a nested
    // component; the smallest enclosing face owns it as a hole.
    for ring in clockwise {
        let Some(corner) = ring.first() else { continue };
        let owner = faces
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                !f.exterior.iter().any(|v| (v - corner).norm() <= snap_tolerance)
                    && point_in_contour(corner, &f.exterior)
            })
            .min_by(|(_, a), (_, b)| {
                compute_signed_area(&a.exterior).total_cmp(&compute_signed_area(&b.exterior))
            })
            .map(|(i, _)| i);
        if let Some(i) = owner {
            faces[i].area -= compute_signed_area(&ring).abs();
            faces[i].holes.push(ring);
        }
    }

    Ok(faces)
}

/// Split, snap and deduplicate. Returns vertex positions and undirected
/// edges as ordered index pairs.
fn build_arrangement(
    segments: &[Segment],
    tolerance: f64,
) -> (Vec<Point2<f64>>, BTreeSet<(usize, usize)>) {
    let mut splits: Vec<Vec<f64>> = vec![vec![0.0, 1.0]; segments.len()];

    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            let (si, sj) = (&segments[i], &segments[j]);
            match si.crossing(sj) {
                Some(Crossing::Point { t, u }) => {
                    splits[i].push(t);
                    splits[j].push(u);
                }
                Some(Crossing::Overlap) | None => {}
            }
            // Endpoints resting on the other segment: T-junctions, collinear
            // overlaps and near misses inside the tolerance.
            for p in [sj.a, sj.b] {
                if si.distance_to_point(&p) <= tolerance {
                    splits[i].push(si.project(&p));
                }
            }
            for p in [si.a, si.b] {
                if sj.distance_to_point(&p) <= tolerance {
                    splits[j].push(sj.project(&p));
                }
            }
        }
    }

    let mut index = VertexIndex::new(tolerance);
    let mut edges = BTreeSet::new();
    for (segment, params) in segments.iter().zip(splits.iter_mut()) {
        params.sort_by(f64::total_cmp);
        params.dedup_by(|a, b| (*a - *b).abs() <= EPSILON_2D);

        let ids: Vec<usize> = params
            .iter()
            .map(|&t| index.find_or_insert(segment.point_at(t)))
            .collect();
        for pair in ids.windows(2) {
            let (u, v) = (pair[0], pair[1]);
            if u != v {
                edges.insert((u.min(v), u.max(v)));
            }
        }
    }

    (index.vertices().to_vec(), edges)
}

/// Adjacency lists after iteratively removing degree-one vertices.
fn prune_dangles(vertex_count: usize, edges: &BTreeSet<(usize, usize)>) -> Vec<BTreeSet<usize>> {
    let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); vertex_count];
    for &(u, v) in edges {
        adjacency[u].insert(v);
        adjacency[v].insert(u);
    }

    let mut queue: VecDeque<usize> = (0..vertex_count)
        .filter(|&v| adjacency[v].len() == 1)
        .collect();
    while let Some(v) = queue.pop_front() {
        let Some(&n) = adjacency[v].iter().next() else {
            continue;
        };
        adjacency[v].clear();
        adjacency[n].remove(&v);
        if adjacency[n].len() == 1 {
            queue.push_back(n);
        }
    }

    adjacency
}

/// Walk every directed edge once, collecting the rings of all faces.
fn trace_faces(vertices: &[Point2<f64>], adjacency: &[BTreeSet<usize>]) -> Vec<Vec<Point2<f64>>> {
    // Neighbors sorted counter-clockwise by angle.
    let sorted: Vec<Vec<usize>> = adjacency
        .iter()
        .enumerate()
        .map(|(v, neighbors)| {
            let mut list: Vec<usize> = neighbors.iter().copied().collect();
            list.sort_by(|&a, &b| {
                angle(&vertices[v], &vertices[a]).total_cmp(&angle(&vertices[v], &vertices[b]))
            });
            list
        })
        .collect();

    let mut visited: FxHashSet<(usize, usize)> = FxHashSet::default();
    let mut rings = Vec::new();
    let max_steps = adjacency.iter().map(BTreeSet::len).sum::<usize>() + 1;

    for (start, neighbors) in sorted.iter().enumerate() {
        for &first in neighbors {
            if visited.contains(&(start, first)) {
                continue;
            }

            let mut ring = Vec::new();
            let (mut u, mut v) = (start, first);
            for _ in 0..max_steps {
                if !visited.insert((u, v)) {
                    break;
                }
                ring.push(vertices[u]);
                let around = &sorted[v];
                let Some(pos) = around.iter().position(|&w| w == u) else {
                    break;
                };
                let next = around[(pos + around.len() - 1) % around.len()];
                u = v;
                v = next;
            }

            if ring.len() >= 3 {
                rings.push(ring);
            }
        }
    }

    rings
}

#[inline]
fn angle(from: &Point2<f64>, to: &Point2<f64>) -> f64 {
    (to.y - from.y).atan2(to.x - from.x)
}
