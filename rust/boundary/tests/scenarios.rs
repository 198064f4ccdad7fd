// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reference scenarios for spreading, sequencing and proximity.

use approx::assert_relative_eq;
use marginline_boundary::{minimum_spanning_order, refine_order, tour_length};
use marginline_topology::{Mesh, MeshArena, PositionKey, Volume};
use nalgebra::Point3;
use rustc_hash::FxHashSet;

#[test]
fn icosahedron_spread_reaches_every_vertex() {
    let mut arena = MeshArena::new();
    let key = arena.insert(Mesh::icosahedron(1.0)).unwrap();
    let ctx = arena.get(key).unwrap();

    let seed = ctx.mesh().position_key(3);
    let spread = ctx.spread_vertices([seed], |_, _| true);
    assert_eq!(spread.visited.len(), 12);
    assert!(spread.frontier.is_empty());
}

#[test]
fn grid_frontier_is_the_blocking_column() {
    let mut arena = MeshArena::new();
    let key = arena.insert(Mesh::grid(4, 1.0)).unwrap();
    let ctx = arena.get(key).unwrap();
    assert_eq!(ctx.point_map().len(), 25);

    let spread = ctx.spread_vertices([PositionKey::new(0.0, 2.0, 0.0)], |_, n| n.coords()[0] < 3.0);
    let column: FxHashSet<_> = (0..=4).map(|y| PositionKey::new(3.0, y as f32, 0.0)).collect();
    assert_eq!(spread.frontier, column);
    assert!(spread.visited.is_disjoint(&spread.frontier));
}

#[test]
fn hexagon_tour_is_its_perimeter() {
    let side = 1.5;
    let hex: Vec<_> = [4, 1, 3, 0, 5, 2]
        .iter()
        .map(|&k| {
            let a = k as f64 * std::f64::consts::FRAC_PI_3;
            Point3::new(side * a.cos(), side * a.sin(), 0.0)
        })
        .collect();

    let initial = minimum_spanning_order(&hex);
    let refined = refine_order(&hex, &initial, 10_000);
    let mut sorted = refined.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..6).collect::<Vec<_>>());
    assert_relative_eq!(tour_length(&hex, &refined), 6.0 * side, epsilon = 1e-9);
}

#[test]
fn zero_radius_sphere_matches_only_exact_vertex() {
    let mut arena = MeshArena::new();
    let key = arena.insert(Mesh::grid(4, 1.0)).unwrap();
    let ctx = arena.get(key).unwrap();

    let hits = ctx.points_within(&Volume::sphere(Point3::new(1.0, 3.0, 0.0), 0.0));
    assert_eq!(hits.len(), 1);
    assert!(hits.contains(&PositionKey::new(1.0, 3.0, 0.0)));

    let near = ctx.points_within(&Volume::sphere(Point3::new(1.0, 3.0, 1e-6), 0.0));
    assert!(near.is_empty());
}

#[test]
fn proximity_is_exact_at_volume_boundary() {
    let mut arena = MeshArena::new();
    let key = arena.insert(Mesh::grid(6, 1.0)).unwrap();
    let ctx = arena.get(key).unwrap();

    // every vertex at distance exactly 2 is included, none at sqrt(5)
    let hits = ctx.points_within(&Volume::sphere(Point3::new(3.0, 3.0, 0.0), 2.0));
    assert!(hits.contains(&PositionKey::new(5.0, 3.0, 0.0)));
    assert!(hits.contains(&PositionKey::new(3.0, 1.0, 0.0)));
    assert!(!hits.contains(&PositionKey::new(5.0, 4.0, 0.0)));
    assert!(!hits.contains(&PositionKey::new(0.0, 0.0, 0.0)));
    assert_eq!(hits.len(), 13);
}
