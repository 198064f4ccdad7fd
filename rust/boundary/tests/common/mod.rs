// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use marginline_topology::{Mesh, MeshContext, PositionKey};
use nalgebra::Point3;

pub const DOME_CENTER: (f64, f64) = (5.0, 5.0);
pub const DOME_RADIUS: f64 = 3.0;

/// 10 x 10 plate (spacing 0.5) with a paraboloid cap of height 3 and radius 3
/// in the middle, like a prepared tooth on a gum line.
pub fn dome() -> MeshContext {
    let mesh = Mesh::height_field(20, 0.5, |x, y| {
        let r2 = (x - DOME_CENTER.0).powi(2) + (y - DOME_CENTER.1).powi(2);
        if r2 < DOME_RADIUS * DOME_RADIUS {
            DOME_RADIUS - r2 / DOME_RADIUS
        } else {
            0.0
        }
    });
    MeshContext::new(mesh).expect("dome mesh is valid")
}

/// Horizontal distance from the dome axis.
pub fn radial(p: &Point3<f64>) -> f64 {
    ((p.x - DOME_CENTER.0).powi(2) + (p.y - DOME_CENTER.1).powi(2)).sqrt()
}

pub fn key_radial(key: &PositionKey) -> f64 {
    radial(&key.to_point())
}

/// Mesh vertices whose horizontal distance from the axis passes `keep`.
pub fn vertices_where(ctx: &MeshContext, keep: impl Fn(f64) -> bool) -> Vec<Point3<f64>> {
    let mut pts: Vec<_> = ctx
        .point_map()
        .keys()
        .filter(|k| keep(key_radial(k)))
        .collect();
    pts.sort_unstable();
    pts.into_iter().map(|k| k.to_point()).collect()
}
