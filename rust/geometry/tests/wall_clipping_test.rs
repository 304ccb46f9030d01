// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use dxf2bim_core::{Point2D, Point3D};
use dxf2bim_geometry::{
    polygonize, polygon_chain_distance, ExtrudedSolid, Placement, Point2, Segment, Solid, Vector2,
};

fn wall_along(start: (f64, f64), end: (f64, f64)) -> (ExtrudedSolid, Segment) {
    let segment = Segment::from_points(&Point2D::new(start.0, start.1), &Point2D::new(end.0, end.1));
    let mid = segment.midpoint();
    let placement = Placement::oriented(Point3D::new(mid.x, mid.y, 0.0), segment.vector());
    let solid = ExtrudedSolid::rectangle(segment.length(), 0.2, placement, 2.7).unwrap();
    (solid, segment)
}

#[test]
fn test_plan_room_with_two_openings() {
    let walls = [
        wall_along((0.0, 0.0), (6.0, 0.0)),
        wall_along((6.0, 0.0), (6.0, 4.0)),
        wall_along((6.0, 4.0), (0.0, 4.0)),
        wall_along((0.0, 4.0), (0.0, 0.0)),
    ];

    let segments: Vec<Segment> = walls.iter().map(|(_, s)| *s).collect();
    let faces = polygonize(&segments, 0.01).unwrap();
    assert_eq!(faces.len(), 1);
    assert_relative_eq!(faces[0].area, 24.0, epsilon = 1e-6);

    // Every wall bounds the recovered room.
    for segment in &segments {
        assert!(polygon_chain_distance(&faces[0].exterior, &[*segment]) <= 1e-9);
    }

    let (host, host_segment) = &walls[0];
    let dir = host_segment.direction().unwrap();
    let opening = |offset: f64, width: f64, height: f64, z: f64| {
        let at = host_segment.point_at(0.5) + dir * offset;
        let placement = Placement::oriented(Point3D::new(at.x, at.y, z), dir);
        Solid::from(ExtrudedSolid::rectangle(width, 0.2, placement, height).unwrap())
    };

    let door = opening(-1.5, 0.9, 2.1, 0.0);
    let window = opening(1.5, 1.2, 1.2, 0.9);
    let clipped = Solid::difference(host.clone().into(), vec![door, window]);

    let unclipped = host.volume();
    let expected = unclipped - 0.9 * 0.2 * 2.1 - 1.2 * 0.2 * 1.2;
    assert!(clipped.volume() < unclipped);
    assert_relative_eq!(clipped.volume(), expected, epsilon = 1e-9);
    assert_eq!(clipped.leaves().len(), 3);
}

#[test]
fn test_unclipped_wall_is_untouched() {
    let (solid, _) = wall_along((0.0, 0.0), (3.0, 3.0));
    let base = Solid::from(solid.clone());
    let same = Solid::difference(base.clone(), Vec::new());
    assert_eq!(same, base);
    assert!(!same.is_boolean());
    assert_relative_eq!(same.volume(), solid.volume());
}

#[test]
fn test_placement_round_trip() {
    let placement = Placement::oriented(Point3D::new(10.0, 5.0, 1.0), Vector2::new(0.0, 2.0));
    assert_relative_eq!(placement.angle_degrees(), 90.0);
    let world = Point2::new(10.0, 7.0);
    let local = placement.to_local(&nalgebra_point(world, 1.0));
    assert_relative_eq!(local.x, 2.0, epsilon = 1e-12);
    assert_relative_eq!(local.y, 0.0, epsilon = 1e-12);
}

fn nalgebra_point(p: Point2<f64>, z: f64) -> dxf2bim_geometry::Point3<f64> {
    dxf2bim_geometry::Point3::new(p.x, p.y, z)
}
